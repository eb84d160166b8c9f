//! Wall clock access and deadline mapping

use tokio::time::Instant;

use crate::types::Timespec;

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timespec;
}

/// The system real-time clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timespec {
        Timespec::now()
    }
}

/// Maps absolute wall-clock deadlines onto the runtime's monotonic timer.
///
/// One wall/monotonic pair is sampled when the replay starts; every deadline
/// is translated from that single anchor, so waiting on consecutive deadlines
/// never accumulates rounding from relative sleeps.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineTimer {
    wall: Timespec,
    instant: Instant,
}

impl DeadlineTimer {
    /// Anchor `wall` to the current monotonic instant.
    pub fn anchor(wall: Timespec) -> Self {
        Self { wall, instant: Instant::now() }
    }

    /// Monotonic instant at which `deadline` falls. Deadlines before the
    /// anchor map to the anchor itself.
    pub fn instant_for(&self, deadline: Timespec) -> Instant {
        match (deadline - self.wall).to_duration() {
            Some(ahead) => self.instant + ahead,
            None => self.instant,
        }
    }

    pub fn wall(&self) -> Timespec {
        self.wall
    }
}
