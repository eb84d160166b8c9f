//! Replay counters and the end-of-run summary

use crate::inject::InjectOutcome;
use crate::types::Timespec;

/// Counters accumulated while replaying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    /// Frames accepted in full by the sink
    pub frames_sent: u64,

    /// Bytes accepted by the sink, partial submissions included
    pub bytes_sent: u64,

    /// Submissions that ended in a short write
    pub failed_attempts: u64,

    /// Successful channel changes
    pub channel_changes: u64,

    /// Frames whose channel could not be decoded or applied
    pub channel_misses: u64,
}

impl ReplayStats {
    pub fn record(&mut self, outcome: &InjectOutcome) {
        if outcome.delivered {
            self.frames_sent += 1;
        }
        self.bytes_sent += outcome.bytes_written;
        self.failed_attempts += u64::from(outcome.failed_attempts);
    }
}

/// Final report of a replay run.
///
/// [`Display`](std::fmt::Display) renders the single-line record consumed by
/// downstream tooling:
///
/// ```text
/// {"frames":12,"bytes":3408,"failed_attempts":0,"total_time":4.250000000}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: u64,
    pub bytes: u64,
    pub failed_attempts: u64,
    pub total_time: Timespec,

    /// Whether the run was cancelled before the capture was exhausted
    pub interrupted: bool,
}

impl ReplaySummary {
    pub fn new(stats: &ReplayStats, total_time: Timespec, interrupted: bool) -> Self {
        Self {
            frames: stats.frames_sent,
            bytes: stats.bytes_sent,
            failed_attempts: stats.failed_attempts,
            total_time,
            interrupted,
        }
    }
}

impl std::fmt::Display for ReplaySummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{\"frames\":{},\"bytes\":{},\"failed_attempts\":{},\"total_time\":{}}}",
            self.frames, self.bytes, self.failed_attempts, self.total_time
        )
    }
}
