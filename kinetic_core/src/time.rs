// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host time and the millisecond boundary.
//!
//! The animator reads [`HostTime`] from a [`TimeSource`] in whatever ticks
//! the platform clock produces. A [`Timebase`] converts those ticks to
//! nanoseconds. Animation timelines are whole milliseconds, so most
//! conversions here go between ticks and milliseconds, rounding down.
//!
//! [`ManualClock`] is a settable source for tests and offline rendering.

use alloc::rc::Rc;
use core::cell::Cell;
use core::fmt;
use core::ops::Add;

const NANOS_PER_MILLI: u64 = 1_000_000;

/// `value * mul / div` through a `u128`, saturating at `u64::MAX`.
#[expect(
    clippy::cast_possible_truncation,
    reason = "checked against u64::MAX before narrowing"
)]
const fn scale(value: u64, mul: u32, div: u32) -> u64 {
    let wide = value as u128 * mul as u128 / div as u128;
    if wide > u64::MAX as u128 {
        u64::MAX
    } else {
        wide as u64
    }
}

/// A point on a platform clock, in that clock's ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// The raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Time since `earlier`, or zero if `earlier` is later.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }

    /// Whole milliseconds since `origin`, or zero if `origin` is later.
    #[inline]
    #[must_use]
    pub const fn millis_since(self, origin: Self, timebase: Timebase) -> u64 {
        self.saturating_duration_since(origin).to_millis(timebase)
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostTime({})", self.0)
    }
}

/// Ticks-to-nanoseconds ratio of a clock: `nanos = ticks * numer / denom`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Numerator of the ratio.
    pub numer: u32,
    /// Denominator of the ratio.
    pub denom: u32,
}

impl Timebase {
    /// Ticks are nanoseconds.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// Creates a timebase.
    ///
    /// # Panics
    ///
    /// Panics if either term is zero.
    #[inline]
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(numer != 0 && denom != 0, "timebase terms must be non-zero");
        Self { numer, denom }
    }

    /// Converts ticks to nanoseconds.
    #[inline]
    #[must_use]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        scale(ticks, self.numer, self.denom)
    }

    /// Converts nanoseconds to ticks.
    #[inline]
    #[must_use]
    pub const fn nanos_to_ticks(self, nanos: u64) -> u64 {
        scale(nanos, self.denom, self.numer)
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{})", self.numer, self.denom)
    }
}

/// A span of platform ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// The raw tick value.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// A duration of `nanos` nanoseconds.
    #[inline]
    #[must_use]
    pub const fn from_nanos(nanos: u64, timebase: Timebase) -> Self {
        Self(timebase.nanos_to_ticks(nanos))
    }

    /// This duration in nanoseconds.
    #[inline]
    #[must_use]
    pub const fn to_nanos(self, timebase: Timebase) -> u64 {
        timebase.ticks_to_nanos(self.0)
    }

    /// A duration of `millis` milliseconds.
    #[inline]
    #[must_use]
    pub const fn from_millis(millis: u64, timebase: Timebase) -> Self {
        Self::from_nanos(millis.saturating_mul(NANOS_PER_MILLI), timebase)
    }

    /// This duration in whole milliseconds.
    #[inline]
    #[must_use]
    pub const fn to_millis(self, timebase: Timebase) -> u64 {
        self.to_nanos(timebase) / NANOS_PER_MILLI
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Duration({})", self.0)
    }
}

/// A monotonic clock read by the animation scheduler.
pub trait TimeSource: fmt::Debug {
    /// The current time.
    fn now(&self) -> HostTime;

    /// How this source's ticks convert to nanoseconds.
    fn timebase(&self) -> Timebase;
}

/// A [`TimeSource`] that only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one clone and
/// hand the other to an [`Animator`](crate::Animator).
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<u64>>,
    timebase: Timebase,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Timebase::NANOS)
    }
}

impl ManualClock {
    /// Creates a clock at tick zero.
    #[must_use]
    pub fn new(timebase: Timebase) -> Self {
        Self {
            now: Rc::new(Cell::new(0)),
            timebase,
        }
    }

    /// Jumps to an absolute host time.
    pub fn set(&self, t: HostTime) {
        self.now.set(t.0);
    }

    /// Moves the clock forward by a tick duration.
    pub fn advance(&self, d: Duration) {
        self.now.set(self.now.get().saturating_add(d.0));
    }

    /// Moves the clock forward by whole milliseconds.
    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis, self.timebase));
    }
}

impl TimeSource for ManualClock {
    fn now(&self) -> HostTime {
        HostTime(self.now.get())
    }

    fn timebase(&self) -> Timebase {
        self.timebase
    }
}
