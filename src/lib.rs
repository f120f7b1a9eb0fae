//! Telemetry ingestion and race-state aggregation for F1 Manager 2024.
//!
//! Pitlane reads the frames an external plugin publishes while the game runs,
//! turns them into consistent per-competitor session state and keeps the
//! derived views a dashboard needs: standings, gaps, personal bests, points and
//! a bounded lap/turn history.
//!
//! # Features
//!
//! - **Frame sources**: length-prefixed JSON channel file, memory-mapped packed
//!   record, or a named shared-memory mapping on Windows
//! - **Aggregation**: lap/turn transitions, sector and lap bests, tire age,
//!   speed trap and championship points under one frame lock
//! - **Reference data**: driver, team and scoring rules read from the game's
//!   compressed save container
//! - **Throttled subscriptions**: latest-wins snapshot streams at any rate
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use pitlane::{Pitlane, PitlaneConfig, UpdateRate};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> pitlane::Result<()> {
//!     let session = Pitlane::start(PitlaneConfig::default()).await?;
//!     let mut snapshots = session.subscribe(UpdateRate::Max(10));
//!
//!     while let Some(snapshot) = snapshots.next().await {
//!         for car in snapshot.running_order() {
//!             println!("P{} {} +{:.3}", car.position, car.driver_code, car.gap_to_leader);
//!         }
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

pub mod config;
pub mod status;

// Frame sources and the polling task
pub mod driver;
pub mod provider;
pub mod providers;
pub mod session;
pub mod stream;

// Save container and reference data
pub mod archive;
pub mod reference;

pub mod aggregator;

// Platform-specific modules
#[cfg(windows)]
pub mod windows;

pub use error::*;
pub use types::*;

pub use config::PitlaneConfig;
pub use session::{Pitlane, PitlaneSession};
pub use status::ConnectionStatus;
