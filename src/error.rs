//! Error types for frame replay.
//!
//! Every failure the engine can report is a variant of [`ReplayError`]. The
//! variants carry structured context so callers can decide whether to retry,
//! skip a frame, or abort the run.
//!
//! ## Error Categories
//!
//! - **Radiotap Errors**: the frame header cannot yield a channel number
//! - **Channel Errors**: the radio could not be retuned
//! - **Injection Errors**: the transmit path failed for good
//! - **Capture Errors**: the capture file could not be read or decoded
//! - **Setup Errors**: bad configuration or an unusable interface
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use airreplay::ReplayError;
//!
//! let error = ReplayError::injection_fatal("interface went down");
//! assert!(!error.is_retryable());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for replay operations.
pub type Result<T, E = ReplayError> = std::result::Result<T, E>;

/// Main error type for replay operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ReplayError {
    #[error("Channel {channel} is outside the supported range {min}..={max}")]
    InvalidChannelNumber { channel: u32, min: u8, max: u8 },

    #[error("Channel command failed for {interface} (channel {channel}, exit code {code:?})")]
    ChannelCommandFailed { interface: String, channel: u8, code: Option<i32> },

    #[error("Unsupported radiotap version {found} (expected 0)")]
    InvalidRadiotapVersion { found: u8 },

    #[error("Radiotap header has no channel field (present bitmap {present:#010x})")]
    ChannelFieldAbsent { present: u32 },

    #[error("Frequency {frequency} MHz does not map to a 2.4 GHz channel")]
    FrequencyNotFound { frequency: u16 },

    #[error("Radiotap header truncated: need {needed} bytes, frame has {available}")]
    RadiotapTruncated { needed: usize, available: usize },

    #[error("Short write: {written} of {expected} bytes accepted")]
    InjectionShortWrite { written: usize, expected: usize },

    #[error("Injection failed: {reason}")]
    InjectionFatal {
        reason: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Failed to spawn {program}")]
    SpawnFailure {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Capture error in {path}: {details}")]
    Capture {
        path: PathBuf,
        details: String,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Interface {name} unusable: {reason}")]
    Interface { name: String, reason: String },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("Replay cancelled")]
    Cancelled,
}

impl ReplayError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            ReplayError::InjectionShortWrite { .. } => true,
            ReplayError::ChannelCommandFailed { .. } => true,
            ReplayError::InvalidChannelNumber { .. } => false,
            ReplayError::InvalidRadiotapVersion { .. } => false,
            ReplayError::ChannelFieldAbsent { .. } => false,
            ReplayError::FrequencyNotFound { .. } => false,
            ReplayError::RadiotapTruncated { .. } => false,
            ReplayError::InjectionFatal { .. } => false,
            ReplayError::SpawnFailure { .. } => false,
            ReplayError::Capture { .. } => false,
            ReplayError::Interface { .. } => false,
            ReplayError::Config { .. } => false,
            ReplayError::Cancelled => false,
        }
    }

    /// Returns whether a frame-level decoding problem can be skipped while the
    /// run continues on the current channel.
    pub fn is_frame_local(&self) -> bool {
        matches!(
            self,
            ReplayError::ChannelFieldAbsent { .. }
                | ReplayError::FrequencyNotFound { .. }
                | ReplayError::RadiotapTruncated { .. }
                | ReplayError::InvalidChannelNumber { .. }
        )
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            ReplayError::InvalidChannelNumber { .. } => vec![
                "Use a 2.4 GHz channel between 1 and 11",
                "Check the radiotap channel field of the capture",
            ],
            ReplayError::ChannelCommandFailed { .. } => vec![
                "Check that the interface is in monitor mode",
                "Run with enough privileges to configure the radio",
                "Verify the channel command path",
            ],
            ReplayError::InvalidRadiotapVersion { .. }
            | ReplayError::ChannelFieldAbsent { .. }
            | ReplayError::RadiotapTruncated { .. } => vec![
                "Verify the capture uses the 802.11 + radiotap link type",
                "Disable channel following for this capture",
            ],
            ReplayError::FrequencyNotFound { .. } => vec![
                "Only 2.4 GHz captures can drive channel changes",
                "Disable channel following for this capture",
            ],
            ReplayError::InjectionShortWrite { .. } => {
                vec!["Wait for the transmit buffer to drain and resubmit"]
            }
            ReplayError::InjectionFatal { .. } => vec![
                "Check that the interface is up and in monitor mode",
                "Raise the attempt limit if short writes are expected",
                "Run with CAP_NET_RAW",
            ],
            ReplayError::SpawnFailure { .. } => vec![
                "Check that the command exists and is executable",
                "Configure the channel command path",
            ],
            ReplayError::Capture { .. } => vec![
                "Check the capture file exists and is readable",
                "Verify the file is a legacy pcap capture",
                "Ensure the staging directory has enough space",
            ],
            ReplayError::Interface { .. } => vec![
                "List interfaces under /sys/class/net",
                "Put the interface in monitor mode",
            ],
            ReplayError::Config { .. } => vec!["Fix the configuration value and retry"],
            ReplayError::Cancelled => vec!["Restart the replay"],
        }
    }

    /// Helper constructor for fatal injection errors.
    pub fn injection_fatal(reason: impl Into<String>) -> Self {
        ReplayError::InjectionFatal { reason: reason.into(), source: None }
    }

    /// Helper constructor for fatal injection errors with an I/O source.
    pub fn injection_io(reason: impl Into<String>, source: std::io::Error) -> Self {
        ReplayError::InjectionFatal { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for capture decoding errors.
    pub fn capture_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        ReplayError::Capture { path: path.into(), details: details.into(), source: None }
    }

    /// Helper constructor for capture I/O errors.
    pub fn capture_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ReplayError::Capture {
            path: path.into(),
            details: source.to_string(),
            source: Some(source),
        }
    }

    /// Helper constructor for interface errors.
    pub fn interface(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ReplayError::Interface { name: name.into(), reason: reason.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        ReplayError::Config { reason: reason.into() }
    }
}
