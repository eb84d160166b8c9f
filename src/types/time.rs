//! Second + nanosecond time arithmetic for replay deadlines

use std::ops::{Add, Sub};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Nanoseconds in one second.
pub const NANOS_PER_SEC: u32 = 1_000_000_000;

const NANOS_PER_MICRO: u32 = 1_000;

/// A point in time (or a signed span) split into whole seconds and a
/// sub-second nanosecond part.
///
/// The nanosecond part is always normalized into `0..NANOS_PER_SEC`; negative
/// spans carry their sign in `secs` only, so -0.3 s is `(-1, 700_000_000)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Timespec {
    secs: i64,
    nanos: u32,
}

impl Timespec {
    /// The zero instant / empty span.
    pub const ZERO: Timespec = Timespec { secs: 0, nanos: 0 };

    /// Build from seconds and nanoseconds, carrying whole seconds out of `nanos`.
    pub const fn new(secs: i64, nanos: u32) -> Self {
        let carry = (nanos / NANOS_PER_SEC) as i64;
        Self { secs: secs + carry, nanos: nanos % NANOS_PER_SEC }
    }

    /// Build from a microsecond-resolution timestamp (the classic pcap layout).
    pub fn from_micros(secs: i64, micros: u32) -> Self {
        let carry = i64::from(micros / 1_000_000);
        Self { secs: secs + carry, nanos: (micros % 1_000_000) * NANOS_PER_MICRO }
    }

    /// Build from a nanosecond-resolution timestamp.
    pub fn from_nanos(secs: i64, nanos: u32) -> Self {
        Self::new(secs, nanos)
    }

    /// Current wall-clock time (`CLOCK_REALTIME`).
    pub fn now() -> Self {
        match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(since) => Self::from_duration(since),
            Err(before) => Self::ZERO - Self::from_duration(before.duration()),
        }
    }

    pub fn from_duration(duration: Duration) -> Self {
        Self { secs: duration.as_secs() as i64, nanos: duration.subsec_nanos() }
    }

    pub fn secs(&self) -> i64 {
        self.secs
    }

    pub fn subsec_nanos(&self) -> u32 {
        self.nanos
    }

    pub fn is_negative(&self) -> bool {
        self.secs < 0
    }

    /// Span elapsed from `start` to `self`.
    pub fn elapsed_since(self, start: Timespec) -> Timespec {
        self - start
    }

    /// Convert a non-negative span into a [`Duration`].
    pub fn to_duration(self) -> Option<Duration> {
        if self.is_negative() { None } else { Some(Duration::new(self.secs as u64, self.nanos)) }
    }
}

impl Add for Timespec {
    type Output = Timespec;

    /// Carries into the seconds field when the nanosecond sum reaches a full second.
    fn add(self, other: Timespec) -> Timespec {
        let mut secs = self.secs + other.secs;
        let mut nanos = self.nanos + other.nanos;
        if nanos >= NANOS_PER_SEC {
            nanos -= NANOS_PER_SEC;
            secs += 1;
        }
        Timespec { secs, nanos }
    }
}

impl Sub for Timespec {
    type Output = Timespec;

    /// Borrows a second when `self`'s nanosecond part is the smaller one.
    fn sub(self, other: Timespec) -> Timespec {
        if self.nanos < other.nanos {
            Timespec {
                secs: self.secs - other.secs - 1,
                nanos: self.nanos + NANOS_PER_SEC - other.nanos,
            }
        } else {
            Timespec { secs: self.secs - other.secs, nanos: self.nanos - other.nanos }
        }
    }
}

impl std::fmt::Display for Timespec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.secs, self.nanos)
    }
}

/// Difference between the replay wall clock and the capture clock.
///
/// Adding the offset to a capture timestamp yields the absolute wall-clock
/// instant at which that frame is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockOffset(Timespec);

impl ClockOffset {
    /// Offset that maps `first_capture` onto `wall_now`.
    pub fn between(wall_now: Timespec, first_capture: Timespec) -> Self {
        Self(wall_now - first_capture)
    }

    /// Absolute deadline for a frame captured at `capture`.
    pub fn deadline(&self, capture: Timespec) -> Timespec {
        capture + self.0
    }

    pub fn as_timespec(&self) -> Timespec {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn elapsed_borrows_a_second() {
        let start = Timespec::new(10, 500_000_000);
        let end = Timespec::new(12, 100_000_000);
        assert_eq!(end.elapsed_since(start), Timespec::new(1, 600_000_000));
    }

    #[test]
    fn elapsed_without_borrow() {
        let start = Timespec::new(10, 100_000_000);
        let end = Timespec::new(12, 500_000_000);
        assert_eq!(end.elapsed_since(start), Timespec::new(2, 400_000_000));
    }

    #[test]
    fn deadline_carries_into_seconds() {
        let offset = ClockOffset::between(Timespec::new(1000, 900_000_000), Timespec::ZERO);
        let deadline = offset.deadline(Timespec::from_micros(5, 200_000));
        assert_eq!(deadline, Timespec::new(1006, 100_000_000));
    }

    #[test]
    fn microseconds_scale_to_nanoseconds() {
        let ts = Timespec::from_micros(3, 999_999);
        assert_eq!(ts.secs(), 3);
        assert_eq!(ts.subsec_nanos(), 999_999_000);

        let overflowing = Timespec::from_micros(3, 1_500_000);
        assert_eq!(overflowing, Timespec::new(4, 500_000_000));
    }

    #[test]
    fn negative_spans_keep_nanos_normalized() {
        let span = Timespec::new(1, 0) - Timespec::new(1, 300_000_000);
        assert_eq!(span, Timespec::new(-1, 700_000_000));
        assert!(span.is_negative());
        assert!(span.to_duration().is_none());
    }

    #[test]
    fn display_pads_nanoseconds() {
        assert_eq!(Timespec::new(1, 600_000_000).to_string(), "1.600000000");
        assert_eq!(Timespec::new(0, 42).to_string(), "0.000000042");
    }

    proptest! {
        #[test]
        fn offset_round_trips_first_frame(
            now_secs in 0i64..4_000_000_000i64,
            now_nanos in 0u32..NANOS_PER_SEC,
            cap_secs in 0i64..4_000_000_000i64,
            cap_micros in 0u32..1_000_000u32,
        ) {
            let now = Timespec::new(now_secs, now_nanos);
            let first = Timespec::from_micros(cap_secs, cap_micros);
            let offset = ClockOffset::between(now, first);
            prop_assert_eq!(offset.deadline(first), now);
        }

        #[test]
        fn add_then_sub_is_identity(
            a_secs in -1_000_000i64..1_000_000i64,
            a_nanos in 0u32..NANOS_PER_SEC,
            b_secs in -1_000_000i64..1_000_000i64,
            b_nanos in 0u32..NANOS_PER_SEC,
        ) {
            let a = Timespec::new(a_secs, a_nanos);
            let b = Timespec::new(b_secs, b_nanos);
            let sum = a + b;
            prop_assert!(sum.subsec_nanos() < NANOS_PER_SEC);
            prop_assert_eq!(sum - b, a);
        }
    }
}
