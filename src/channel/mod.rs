//! Radio channel control
//!
//! The radio is retuned by running an external wireless configuration tool
//! and waiting for it to finish. Process creation goes through
//! [`ProcessSpawner`] so the controller can be exercised without a radio.

mod spawner;

pub use spawner::{CommandSpawner, ProcessExit, ProcessSpawner};

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::{ReplayError, Result};

/// Lowest channel the controller will tune to.
pub const MIN_CHANNEL_24GHZ: u8 = 1;

/// Highest channel the controller will tune to.
pub const MAX_CHANNEL_24GHZ: u8 = 11;

/// Default wireless configuration tool.
pub const DEFAULT_CHANNEL_COMMAND: &str = "/sbin/iwconfig";

/// A validated request to tune `interface` to `channel`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRequest {
    channel: u8,
    interface: String,
}

impl ChannelRequest {
    /// Validate `channel` against the supported 2.4 GHz range.
    pub fn new(channel: u32, interface: impl Into<String>) -> Result<Self> {
        let in_range = (u32::from(MIN_CHANNEL_24GHZ)..=u32::from(MAX_CHANNEL_24GHZ))
            .contains(&channel);
        if !in_range {
            return Err(ReplayError::InvalidChannelNumber {
                channel,
                min: MIN_CHANNEL_24GHZ,
                max: MAX_CHANNEL_24GHZ,
            });
        }

        Ok(Self { channel: channel as u8, interface: interface.into() })
    }

    pub fn channel(&self) -> u8 {
        self.channel
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Arguments passed to the channel command.
    pub fn command_args(&self) -> Vec<String> {
        vec![
            self.interface.clone(),
            "set".to_string(),
            "channel".to_string(),
            self.channel.to_string(),
        ]
    }
}

/// Retunes the radio through an external command.
#[derive(Clone)]
pub struct ChannelController {
    spawner: Arc<dyn ProcessSpawner>,
    command: PathBuf,
}

impl std::fmt::Debug for ChannelController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelController").field("command", &self.command).finish_non_exhaustive()
    }
}

impl Default for ChannelController {
    fn default() -> Self {
        Self::new(Arc::new(CommandSpawner))
    }
}

impl ChannelController {
    /// Create a controller running [`DEFAULT_CHANNEL_COMMAND`] through `spawner`.
    pub fn new(spawner: Arc<dyn ProcessSpawner>) -> Self {
        Self { spawner, command: PathBuf::from(DEFAULT_CHANNEL_COMMAND) }
    }

    /// Use a different channel command.
    pub fn with_command(mut self, command: impl Into<PathBuf>) -> Self {
        self.command = command.into();
        self
    }

    pub fn command(&self) -> &Path {
        &self.command
    }

    /// Tune `interface` to `channel`, waiting for the command to finish.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::InvalidChannelNumber`] when `channel` is outside 1..=11
    /// - [`ReplayError::SpawnFailure`] when the command cannot be started
    /// - [`ReplayError::ChannelCommandFailed`] when it exits non-zero or abnormally
    pub async fn set_channel(&self, channel: u32, interface: &str) -> Result<()> {
        let request = ChannelRequest::new(channel, interface)?;
        self.apply(request).await
    }

    /// Execute an already validated request.
    pub async fn apply(&self, request: ChannelRequest) -> Result<()> {
        debug!("Switching {} to channel {}", request.interface(), request.channel());

        let exit = self.spawner.spawn(&self.command, &request.command_args()).await?;
        if !exit.success() {
            return Err(ReplayError::ChannelCommandFailed {
                interface: request.interface,
                channel: request.channel,
                code: exit.code(),
            });
        }

        info!("{} tuned to channel {}", request.interface(), request.channel());
        Ok(())
    }
}
