//! Timed replay of captured 802.11 frames.
//!
//! airreplay reads a radiotap packet capture and injects every frame through a
//! monitor-mode interface, reproducing the spacing between frames as it was
//! recorded.
//!
//! # Features
//!
//! - **Timing**: absolute deadlines derived from one clock offset, so sleep
//!   jitter never accumulates over long captures
//! - **Short writes**: frames the driver only partly accepts are resubmitted
//!   after a short backoff and counted
//! - **Channel following**: optionally retunes the radio to the channel
//!   recorded in each frame's radiotap header
//! - **Testable seams**: capture sources, injection sinks and the process
//!   spawner are traits with in-memory implementations
//!
//! ## Example
//!
//! ```rust,no_run
//! use airreplay::{InjectionRetrier, PcapFileSource, ReplayConfig, ReplayScheduler};
//!
//! # #[cfg(target_os = "linux")]
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ReplayConfig::default();
//!     let source = PcapFileSource::open("beacons.pcap")?;
//!     let sink = airreplay::inject::PacketSocketSink::open(&config.interface)?;
//!
//!     let retrier = InjectionRetrier::new(sink, config.retry_policy());
//!     let summary = ReplayScheduler::new(source, retrier, config.replay_options()).run().await?;
//!     println!("{}", summary);
//!     Ok(())
//! }
//! # #[cfg(not(target_os = "linux"))]
//! # fn main() {}
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Frame decoding and radio control
pub mod channel;
pub mod radiotap;

// Replay pipeline
pub mod config;
pub mod inject;
pub mod interface;
pub mod scheduler;
pub mod source;
pub mod sources;
pub mod staging;

// Core exports
pub use error::*;
pub use types::*;

pub use channel::{ChannelController, ChannelRequest, CommandSpawner, ProcessSpawner};
pub use config::ReplayConfig;
pub use inject::{InjectOutcome, InjectionRetrier, InjectionSink, RetryPolicy};
pub use scheduler::{ReplayOptions, ReplayScheduler, ReplayStats, ReplaySummary};
pub use source::{CaptureSource, LinkType};
pub use sources::{MemorySource, PcapFileSource};
pub use staging::StagedCapture;
