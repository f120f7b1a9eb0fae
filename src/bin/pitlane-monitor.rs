//! Console monitor for a running telemetry session
//!
//! Usage:
//!   pitlane-monitor                      # defaults: stream channel next to the binary
//!   pitlane-monitor --config pitlane.yaml
//!   pitlane-monitor --config pitlane.yaml --rate 2

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use pitlane::{Pitlane, PitlaneConfig, UpdateRate};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "pitlane-monitor")]
#[command(about = "Print live standings from F1 Manager telemetry")]
#[command(version)]
struct Args {
    /// YAML configuration file; defaults apply when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Standings refreshes per second
    #[arg(short, long, default_value_t = 1)]
    rate: u32,

    /// Log filter used when RUST_LOG is unset
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = match &args.config {
        Some(path) => {
            PitlaneConfig::load(path).with_context(|| format!("loading configuration from {}", path.display()))?
        }
        None => PitlaneConfig::default(),
    };

    let session = Pitlane::start(config).await.context("starting telemetry session")?;
    let mut snapshots = session.subscribe(UpdateRate::Max(args.rate));
    let mut status = session.status_updates();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Received shutdown signal");
                break;
            }
            Some(update) = status.next() => {
                info!(connected = update.connected, "{}", update);
            }
            snapshot = snapshots.next() => {
                let Some(snapshot) = snapshot else {
                    warn!("Snapshot stream ended");
                    break;
                };
                let session_info = &snapshot.session;
                info!(
                    track = %session_info.track_name,
                    session = %session_info.session_type,
                    elapsed = session_info.time_elapsed,
                    cars = session_info.cars_on_grid,
                    "Standings"
                );
                for car in snapshot.running_order() {
                    println!(
                        "P{:<2} {:<4} {:<24} lap {:>3}  {:>8.3}  {:<12} {:>3} pts",
                        car.position,
                        car.driver_code,
                        car.team_name,
                        car.lap,
                        car.gap_to_leader,
                        car.compound,
                        car.points
                    );
                }
            }
        }
    }

    if let Err(e) = session.shutdown().await {
        warn!(error = %e, "Frame reader had to be aborted");
    }
    Ok(())
}
