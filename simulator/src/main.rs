use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use generator::movement::MovementModel;
use generator::profile::build_dataset;
use gui_bridge::bridge::GuiBridge;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::runtime::Builder as TokioBuilder;
use tokio::signal;
use workflow::config::{SimulatorConfig, DEFAULT_BIND};
use workflow::runner::Runner;

mod generator {
    pub mod movement;
    pub mod profile;
}
mod gui_bridge {
    pub mod bridge;
    pub mod model;
}
mod workflow {
    pub mod config;
    pub mod runner;
}

#[derive(Parser)]
#[command(author, version, about = "Synthetic transport survey backend for the dashboard")]
struct Args {
    /// Print an analytics summary of the generated survey and exit unless --serve is set
    #[arg(long, default_value_t = false)]
    offline: bool,
    /// Load the simulator config from YAML
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_BIND)]
    bind: SocketAddr,
    #[arg(long, default_value_t = 7)]
    seed: u64,
    /// Milliseconds between live trip movements
    #[arg(long, default_value_t = 2_000)]
    tick_ms: u64,
    /// Require `Authorization: Bearer <token>` on HTTP routes
    #[arg(long)]
    token: Option<String>,
    /// Days covered by the offline mode split
    #[arg(long, default_value_t = 30)]
    days: u32,
    /// Serve the HTTP API and live socket until Ctrl+C
    #[arg(long, default_value_t = false)]
    serve: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = if let Some(path) = args.config {
        SimulatorConfig::load(path)?
    } else {
        SimulatorConfig::from_args(args.bind, args.tick_ms, args.seed, args.token)
    };

    let dataset = build_dataset(&config.generator, Utc::now());
    let runner = Runner::new(dataset);

    if args.offline {
        println!("Offline survey -> {}", runner.offline_report(args.days, Utc::now()));
    }
    if args.serve {
        let runtime = TokioBuilder::new_multi_thread()
            .enable_all()
            .build()
            .context("creating server runtime")?;
        runtime.block_on(async move {
            let bridge = GuiBridge::new(runner, config.token.clone());
            if config.token.is_some() {
                bridge.publish_status("bearer token required on HTTP routes");
            }
            let movement = bridge.spawn_movement(
                MovementModel::new(config.movement.clone(), config.generator.seed),
                config.tick(),
                config.periodic(),
            );
            let shutdown = async {
                if let Err(err) = signal::ctrl_c().await {
                    log::warn!("awaiting Ctrl+C failed: {}", err);
                }
            };
            bridge.publish_status("running (Ctrl+C to stop)...");
            let served = bridge.serve(config.bind, shutdown).await;
            movement.abort();
            served
        })?;
    } else if !args.offline {
        println!("Nothing to do: pass --serve and/or --offline.");
    }

    Ok(())
}
