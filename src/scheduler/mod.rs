//! Timed replay scheduler
//!
//! The scheduler pulls frames from a [`CaptureSource`] and injects each one at
//! the wall-clock time that reproduces the original capture spacing:
//!
//! 1. The first frame is sent at once and fixes the clock offset
//!    (wall-clock now minus its capture timestamp).
//! 2. In channel-following mode the radio is retuned whenever the frame's
//!    radiotap channel differs from the current one. Retuning happens before
//!    the wait, inside the gap to the previous frame.
//! 3. Every later frame is due at `capture timestamp + offset`; the scheduler
//!    sleeps until that absolute deadline.
//! 4. The frame is handed to the [`InjectionRetrier`] and the outcome is
//!    counted.
//!
//! Everything runs on one task; waiting, writing, retrying and retuning all
//! block the pipeline. A [`CancellationToken`] ends the run early and still
//! yields a summary of what was sent.

mod clock;
mod stats;

#[cfg(test)]
mod tests;

pub use clock::{Clock, DeadlineTimer, SystemClock};
pub use stats::{ReplayStats, ReplaySummary};

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::channel::ChannelController;
use crate::config::DEFAULT_INTERFACE;
use crate::inject::{InjectionRetrier, InjectionSink};
use crate::radiotap;
use crate::source::CaptureSource;
use crate::types::{CaptureFrame, ClockOffset, Timespec};
use crate::{ReplayError, Result};

/// Runtime switches of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayOptions {
    /// Wait for each frame's deadline; false sends back to back
    pub enforce_timing: bool,

    /// Retune the radio from each frame's radiotap channel
    pub follow_channel: bool,

    /// Interface handed to the channel controller
    pub interface: String,
}

impl Default for ReplayOptions {
    fn default() -> Self {
        Self { enforce_timing: true, follow_channel: false, interface: DEFAULT_INTERFACE.to_string() }
    }
}

/// When a frame should go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// First frame of the run, sent without waiting
    Immediate,

    /// Absolute wall-clock deadline
    At(Timespec),
}

/// Mutable state owned by one replay run.
#[derive(Debug, Clone, Default)]
pub struct ReplayState {
    offset: Option<ClockOffset>,
    last_deadline: Option<Timespec>,
    current_channel: Option<u8>,
    stats: ReplayStats,
}

impl ReplayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Work out when a frame captured at `capture` is due.
    ///
    /// The first call fixes the clock offset from `wall_now`; later calls
    /// ignore `wall_now` and only apply the offset.
    pub fn schedule(&mut self, capture: Timespec, wall_now: Timespec) -> Schedule {
        let Some(offset) = self.offset else {
            let offset = ClockOffset::between(wall_now, capture);
            debug!("Clock offset fixed at {}", offset.as_timespec());
            self.offset = Some(offset);
            self.last_deadline = Some(wall_now);
            return Schedule::Immediate;
        };

        let deadline = offset.deadline(capture);
        if let Some(last) = self.last_deadline {
            if deadline < last {
                debug!("Capture timestamp {} goes backwards, sending without delay", capture);
            }
        }
        self.last_deadline = Some(deadline);
        Schedule::At(deadline)
    }

    pub fn offset(&self) -> Option<ClockOffset> {
        self.offset
    }

    pub fn last_deadline(&self) -> Option<Timespec> {
        self.last_deadline
    }

    pub fn current_channel(&self) -> Option<u8> {
        self.current_channel
    }

    pub fn stats(&self) -> &ReplayStats {
        &self.stats
    }
}

/// Drives a capture onto an injection sink with the original timing.
pub struct ReplayScheduler<S, K> {
    source: S,
    retrier: InjectionRetrier<K>,
    options: ReplayOptions,
    channel: Option<ChannelController>,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
}

impl<S: CaptureSource, K: InjectionSink> ReplayScheduler<S, K> {
    pub fn new(source: S, retrier: InjectionRetrier<K>, options: ReplayOptions) -> Self {
        let cancel = CancellationToken::new();
        let mut retrier = retrier;
        retrier.set_cancellation(cancel.clone());

        Self { source, retrier, options, channel: None, clock: Arc::new(SystemClock), cancel }
    }

    /// Controller used when channel following is enabled.
    pub fn with_channel_controller(mut self, controller: ChannelController) -> Self {
        self.channel = Some(controller);
        self
    }

    /// Replace the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Stop the run when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.retrier.set_cancellation(cancel.clone());
        self.cancel = cancel;
        self
    }

    /// Token that stops this run.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Replay every frame of the source.
    ///
    /// # Errors
    ///
    /// Any fatal error aborts the run and the counters gathered so far are
    /// dropped. Cancellation is not an error: it returns the summary with
    /// `interrupted` set.
    pub async fn run(mut self) -> Result<ReplaySummary> {
        if self.options.follow_channel {
            if self.channel.is_none() {
                return Err(ReplayError::config("channel following needs a channel controller"));
            }
            let link_type = self.source.link_type();
            if !link_type.is_radiotap() {
                warn!("Channel following on a {} capture; frames carry no radiotap header", link_type);
            }
        }

        let start = self.clock.now();
        let timer = DeadlineTimer::anchor(start);
        let mut state = ReplayState::new();
        let mut interrupted = false;

        info!(
            "Replay started (timing {}, channel following {})",
            if self.options.enforce_timing { "on" } else { "off" },
            if self.options.follow_channel { "on" } else { "off" }
        );

        loop {
            if self.cancel.is_cancelled() {
                interrupted = true;
                break;
            }

            let frame = tokio::select! {
                _ = self.cancel.cancelled() => {
                    interrupted = true;
                    break;
                }
                frame = self.source.next_frame() => frame?,
            };
            let Some(frame) = frame else {
                break;
            };

            match self.process(&mut state, &timer, &frame).await {
                Ok(()) => {}
                Err(ReplayError::Cancelled) => {
                    interrupted = true;
                    break;
                }
                Err(e) => {
                    error!("Replay aborted after {} frames: {}", state.stats.frames_sent, e);
                    return Err(e);
                }
            }
        }

        let total_time = self.clock.now().elapsed_since(start);
        let summary = ReplaySummary::new(&state.stats, total_time, interrupted);

        if interrupted {
            warn!("Replay interrupted after {} frames", summary.frames);
        }
        info!(
            "Replay finished: {} frames, {} bytes, {} failed attempts, {} channel changes in {}s",
            summary.frames,
            summary.bytes,
            summary.failed_attempts,
            state.stats.channel_changes,
            total_time
        );

        Ok(summary)
    }

    async fn process(
        &mut self,
        state: &mut ReplayState,
        timer: &DeadlineTimer,
        frame: &CaptureFrame,
    ) -> Result<()> {
        let schedule = state.schedule(frame.timestamp, self.clock.now());

        // retune while the deadline is still ahead
        if self.options.follow_channel {
            self.follow_channel(state, frame).await?;
        }

        if let Schedule::At(deadline) = schedule {
            if self.options.enforce_timing {
                self.wait_until(timer, deadline).await?;
            }
        }

        let outcome = self.retrier.inject(frame).await?;
        state.stats.record(&outcome);

        trace!(
            "Frame {} ({} bytes) sent, {} failed attempts so far",
            state.stats.frames_sent,
            frame.captured_len(),
            state.stats.failed_attempts
        );
        Ok(())
    }

    async fn wait_until(&self, timer: &DeadlineTimer, deadline: Timespec) -> Result<()> {
        let when = timer.instant_for(deadline);

        tokio::select! {
            _ = self.cancel.cancelled() => Err(ReplayError::Cancelled),
            _ = tokio::time::sleep_until(when) => Ok(()),
        }
    }

    /// Retune before `frame` when its channel differs from the current one.
    ///
    /// Frames whose channel cannot be decoded or is outside the tunable range
    /// are sent on the current channel. A capture that is not radiotap at all
    /// or a failing channel command aborts the run.
    async fn follow_channel(&self, state: &mut ReplayState, frame: &CaptureFrame) -> Result<()> {
        let Some(controller) = &self.channel else {
            return Ok(());
        };

        let channel = match radiotap::channel_from_frame(&frame.data) {
            Ok(channel) => channel,
            Err(e) if e.is_frame_local() => {
                warn!("Keeping current channel for frame: {}", e);
                state.stats.channel_misses += 1;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if state.current_channel == Some(channel) {
            return Ok(());
        }

        match controller.set_channel(u32::from(channel), &self.options.interface).await {
            Ok(()) => {
                state.current_channel = Some(channel);
                state.stats.channel_changes += 1;
                Ok(())
            }
            Err(e) if e.is_frame_local() => {
                warn!("Keeping current channel for frame: {}", e);
                state.stats.channel_misses += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
