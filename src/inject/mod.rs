//! Frame injection with short-write retry
//!
//! A transmit path may accept only part of a frame when its buffer is full.
//! [`InjectionRetrier`] treats such a short write as backpressure: it waits a
//! fixed backoff and resubmits the whole frame until one submission is
//! accepted in full.
//!
//! Every submission reaches the air, so a frame that needed three attempts
//! may have been partially transmitted twice before the complete copy. The
//! `bytes_written` total of [`InjectOutcome`] counts all of them.

#[cfg(target_os = "linux")]
mod packet_socket;

#[cfg(target_os = "linux")]
pub use packet_socket::PacketSocketSink;

use std::num::NonZeroU32;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::types::CaptureFrame;
use crate::{ReplayError, Result};

/// Default wait between short-write retries.
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(10);

/// Nominal link rate used for airtime pacing, in bits per second.
const PACING_BITS_PER_SEC: u64 = 1 << 20;

/// Transmit path that accepts raw frames.
///
/// Returning fewer bytes than submitted is a short write and will be retried.
/// Returning an error means the path is unusable and aborts the run.
pub trait InjectionSink: Send {
    fn inject(&mut self, frame: &[u8]) -> std::io::Result<usize>;
}

impl<T: InjectionSink + ?Sized> InjectionSink for Box<T> {
    fn inject(&mut self, frame: &[u8]) -> std::io::Result<usize> {
        (**self).inject(frame)
    }
}

/// How short writes are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Resubmit after a short write; when false every frame gets one attempt
    pub retry_on_short_write: bool,

    /// Upper bound on attempts per frame (`None` retries until cancelled)
    pub max_attempts: Option<NonZeroU32>,

    /// Wait between attempts so the transmit buffer can drain
    pub backoff: Duration,

    /// Sleep for the frame's airtime after every submission
    pub airtime_pacing: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_on_short_write: true,
            max_attempts: None,
            backoff: DEFAULT_RETRY_BACKOFF,
            airtime_pacing: true,
        }
    }
}

/// Result of delivering one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InjectOutcome {
    /// Bytes accepted by the sink over all attempts
    pub bytes_written: u64,

    /// Submissions made, successful one included
    pub attempts: u32,

    /// Submissions that ended in a short write
    pub failed_attempts: u32,

    /// Whether a full copy of the frame was accepted
    pub delivered: bool,
}

/// Time needed to put `len` bytes on the air at the nominal pacing rate.
pub fn airtime(len: usize) -> Duration {
    let micros = (len as u64).saturating_mul(8_000_000) / PACING_BITS_PER_SEC;
    Duration::from_micros(micros)
}

/// Delivers frames to an [`InjectionSink`], absorbing short writes.
pub struct InjectionRetrier<K> {
    sink: K,
    policy: RetryPolicy,
    cancel: CancellationToken,
}

impl<K: InjectionSink> InjectionRetrier<K> {
    pub fn new(sink: K, policy: RetryPolicy) -> Self {
        Self { sink, policy, cancel: CancellationToken::new() }
    }

    /// Abort backoff waits when `cancel` fires.
    pub fn set_cancellation(&mut self, cancel: CancellationToken) {
        self.cancel = cancel;
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Give the sink back.
    pub fn into_sink(self) -> K {
        self.sink
    }

    /// Submit `frame` until the sink accepts all of it.
    ///
    /// # Errors
    ///
    /// - [`ReplayError::InjectionFatal`] when the sink fails or the attempt
    ///   limit is reached
    /// - [`ReplayError::Cancelled`] when cancelled between attempts
    pub async fn inject(&mut self, frame: &CaptureFrame) -> Result<InjectOutcome> {
        let expected = frame.captured_len();
        let mut outcome = InjectOutcome::default();

        loop {
            outcome.attempts += 1;
            let written = self.sink.inject(&frame.data).map_err(|source| {
                ReplayError::injection_io(
                    format!("sink rejected a {}-byte frame", expected),
                    source,
                )
            })?;
            outcome.bytes_written += written as u64;

            if self.policy.airtime_pacing {
                self.pause(airtime(expected)).await?;
            }

            if written >= expected {
                outcome.delivered = true;
                trace!("Frame of {} bytes delivered after {} attempt(s)", expected, outcome.attempts);
                return Ok(outcome);
            }

            outcome.failed_attempts += 1;
            let short = ReplayError::InjectionShortWrite { written, expected };
            debug!("{} (attempt {})", short, outcome.attempts);

            if !self.policy.retry_on_short_write {
                warn!("Dropping frame after short write, retries disabled");
                return Ok(outcome);
            }

            if let Some(limit) = self.policy.max_attempts {
                if outcome.attempts >= limit.get() {
                    return Err(ReplayError::injection_fatal(format!(
                        "frame not accepted after {} attempts ({})",
                        outcome.attempts, short
                    )));
                }
            }

            self.pause(self.policy.backoff).await?;
        }
    }

    async fn pause(&self, duration: Duration) -> Result<()> {
        if duration.is_zero() {
            return Ok(());
        }

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ReplayError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
