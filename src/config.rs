//! Replay configuration
//!
//! Every field has a default, so a YAML file only needs the values it wants to
//! change:
//!
//! ```yaml
//! interface: wlan0mon
//! follow_channel: true
//! max_attempts: 500
//! ```

use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::channel::DEFAULT_CHANNEL_COMMAND;
use crate::inject::RetryPolicy;
use crate::scheduler::ReplayOptions;
use crate::staging::DEFAULT_STAGING_DIR;
use crate::{ReplayError, Result, interface};

/// Interface used when none is configured.
pub const DEFAULT_INTERFACE: &str = "wlan0";

/// Settings for one replay run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReplayConfig {
    /// Interface frames are injected on
    pub interface: String,

    /// Wait for each frame's deadline; false replays as fast as possible
    pub enforce_timing: bool,

    /// Resubmit frames after a short write
    pub retry_on_short_write: bool,

    /// Attempts per frame before giving up (absent = unbounded)
    pub max_attempts: Option<u32>,

    /// Wait between short-write retries, in milliseconds
    pub retry_backoff_ms: u64,

    /// Sleep for each frame's airtime after submitting it
    pub airtime_pacing: bool,

    /// Retune the radio to the channel recorded in each frame
    pub follow_channel: bool,

    /// Tool used to change channels
    pub channel_command: PathBuf,

    /// Copy the capture here before replaying
    pub staging_dir: PathBuf,

    /// Whether to stage the capture at all
    pub stage_capture: bool,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            interface: DEFAULT_INTERFACE.to_string(),
            enforce_timing: true,
            retry_on_short_write: true,
            max_attempts: None,
            retry_backoff_ms: 10,
            airtime_pacing: true,
            follow_channel: false,
            channel_command: PathBuf::from(DEFAULT_CHANNEL_COMMAND),
            staging_dir: PathBuf::from(DEFAULT_STAGING_DIR),
            stage_capture: true,
        }
    }
}

impl ReplayConfig {
    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml_ng::from_str(yaml).map_err(|e| ReplayError::config(e.to_string()))
    }

    /// Load a YAML configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| ReplayError::config(format!("cannot read {}: {}", path.display(), e)))?;
        Self::from_yaml_str(&yaml)
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<()> {
        interface::validate_name(&self.interface)?;

        if self.max_attempts == Some(0) {
            return Err(ReplayError::config("max_attempts must be at least 1"));
        }
        if self.channel_command.as_os_str().is_empty() {
            return Err(ReplayError::config("channel_command is empty"));
        }
        Ok(())
    }

    /// Short-write handling derived from this configuration.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retry_on_short_write: self.retry_on_short_write,
            max_attempts: self.max_attempts.and_then(NonZeroU32::new),
            backoff: Duration::from_millis(self.retry_backoff_ms),
            airtime_pacing: self.airtime_pacing,
        }
    }

    /// Scheduler switches derived from this configuration.
    pub fn replay_options(&self) -> ReplayOptions {
        ReplayOptions {
            enforce_timing: self.enforce_timing,
            follow_channel: self.follow_channel,
            interface: self.interface.clone(),
        }
    }
}
