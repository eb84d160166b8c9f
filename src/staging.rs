//! Staging of the capture file on tmpfs
//!
//! Reading the capture from a memory-backed directory keeps disk latency out
//! of the replay loop. The staged copy is created exclusively under a random
//! name and removed when the guard is dropped.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::{ReplayError, Result};

/// Default staging directory (tmpfs on most Linux systems).
pub const DEFAULT_STAGING_DIR: &str = "/dev/shm";

/// A capture copied into a staging directory, deleted on drop.
#[derive(Debug)]
pub struct StagedCapture {
    file: NamedTempFile,
}

impl StagedCapture {
    /// Copy `capture` into a new hidden file inside `staging_dir`.
    ///
    /// The file is opened with `O_EXCL`, so an existing entry (or a symlink
    /// planted in a shared directory) is never written through.
    pub fn create(capture: &Path, staging_dir: &Path) -> Result<Self> {
        let staging_failed = |e: io::Error| ReplayError::Capture {
            path: capture.to_path_buf(),
            details: format!("failed to stage into {}: {}", staging_dir.display(), e),
            source: Some(e),
        };

        let mut original = File::open(capture).map_err(|e| ReplayError::capture_io(capture, e))?;
        let mut file = tempfile::Builder::new()
            .prefix(".airreplay-")
            .suffix(".pcap")
            .tempfile_in(staging_dir)
            .map_err(staging_failed)?;

        let bytes = io::copy(&mut original, &mut file).map_err(staging_failed)?;
        file.flush().map_err(staging_failed)?;

        debug!("Staged {} ({} bytes) at {}", capture.display(), bytes, file.path().display());
        Ok(Self { file })
    }

    /// Location of the staged copy.
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}
