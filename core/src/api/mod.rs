pub mod client;
pub mod config;

pub use client::ApiClient;
pub use config::{ApiConfig, NoToken, StaticToken, TokenFile, TokenProvider};
