// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host clock reads.

use kinetic_core::time::{HostTime, TimeSource, Timebase};
use rustix::time::{ClockId as PosixClockId, Timespec, clock_gettime};

const NANOS_PER_SECOND: u128 = 1_000_000_000;

/// A [`TimeSource`] reading a POSIX clock, `CLOCK_MONOTONIC` by default.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MonotonicClock {
    clock_id: PosixClockId,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    /// Reads `CLOCK_MONOTONIC`.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_clock_id(PosixClockId::Monotonic)
    }

    /// Reads the given clock. It must not go backwards.
    #[must_use]
    pub const fn with_clock_id(clock_id: PosixClockId) -> Self {
        Self { clock_id }
    }

    /// The clock being read.
    #[must_use]
    pub const fn clock_id(&self) -> PosixClockId {
        self.clock_id
    }
}

impl TimeSource for MonotonicClock {
    fn now(&self) -> HostTime {
        timespec_to_host_time(clock_gettime(self.clock_id))
    }

    fn timebase(&self) -> Timebase {
        timebase()
    }
}

/// Returns the backend [`Timebase`]: host ticks are nanoseconds.
#[must_use]
pub const fn timebase() -> Timebase {
    Timebase::NANOS
}

/// Returns the current monotonic host time in nanoseconds.
#[must_use]
pub fn now() -> HostTime {
    MonotonicClock::new().now()
}

fn timespec_to_host_time(timespec: Timespec) -> HostTime {
    let seconds = u64::try_from(timespec.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(timespec.tv_nsec)
        .unwrap_or(0)
        .min(999_999_999);

    let ticks = u128::from(seconds)
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(u128::from(nanos));
    HostTime(u64::try_from(ticks).unwrap_or(u64::MAX))
}
