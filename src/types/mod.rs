//! Core types shared by the replay engine.
//!
//! - [`CaptureFrame`] is one captured frame plus its capture timestamp
//! - [`Timespec`] is the second + nanosecond representation used for capture
//!   timestamps, wall-clock deadlines and elapsed spans
//! - [`ClockOffset`] maps capture time onto replay wall-clock time
//!
//! ## Usage Example
//!
//! ```rust
//! use airreplay::types::{CaptureFrame, ClockOffset, Timespec};
//!
//! let first = CaptureFrame::new(vec![0u8; 32], Timespec::from_micros(100, 0));
//! let second = CaptureFrame::new(vec![0u8; 32], Timespec::from_micros(100, 250_000));
//!
//! let offset = ClockOffset::between(Timespec::new(5_000, 0), first.timestamp);
//! assert_eq!(offset.deadline(second.timestamp), Timespec::new(5_000, 250_000_000));
//! ```

mod frame;
mod time;

pub use frame::CaptureFrame;
pub use time::{ClockOffset, NANOS_PER_SEC, Timespec};
