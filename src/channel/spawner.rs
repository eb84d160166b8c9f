//! Process spawning seam for external radio tools

use std::path::Path;
use std::process::Stdio;
use tracing::debug;

use crate::{ReplayError, Result};

/// Exit report of a finished child process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    code: Option<i32>,
}

impl ProcessExit {
    /// Child exited normally with `code`.
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Child was killed by a signal or otherwise ended without an exit code.
    pub fn abnormal() -> Self {
        Self { code: None }
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

impl From<std::process::ExitStatus> for ProcessExit {
    fn from(status: std::process::ExitStatus) -> Self {
        Self { code: status.code() }
    }
}

/// Starts a program, waits for it to terminate, and reports how it exited.
///
/// Spawn failures are reported as [`ReplayError::SpawnFailure`]; a program
/// that ran and failed is a successful spawn with a non-zero [`ProcessExit`].
#[async_trait::async_trait]
pub trait ProcessSpawner: Send + Sync {
    async fn spawn(&self, program: &Path, args: &[String]) -> Result<ProcessExit>;
}

/// [`ProcessSpawner`] backed by `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandSpawner;

#[async_trait::async_trait]
impl ProcessSpawner for CommandSpawner {
    async fn spawn(&self, program: &Path, args: &[String]) -> Result<ProcessExit> {
        debug!("Running {} {}", program.display(), args.join(" "));

        let status = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .status()
            .await
            .map_err(|source| ReplayError::SpawnFailure { program: program.to_path_buf(), source })?;

        Ok(status.into())
    }
}
