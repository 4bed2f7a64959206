pub mod client;
pub mod event;

pub use client::{ChannelHandle, RealtimeChannel};
pub use event::{
    event_queue, ChannelEvent, ConnectionState, ControlMessage, EventSender, EventStream,
    PeriodicStats, ServerMessage,
};
