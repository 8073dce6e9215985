// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Blocking host loop.
//!
//! [`HostLoop`] owns no animation state. Each [`turn`](HostLoop::turn) asks
//! the animator when it next needs attention, sleeps until then, and polls
//! it. Start/stop requests made between turns are serviced on the next
//! turn without sleeping.

use std::time::Duration as StdDuration;

use kinetic_core::Animator;

/// Something that can block the calling thread.
pub trait Sleep {
    /// Blocks for `duration`.
    fn sleep(&mut self, duration: StdDuration);
}

/// Sleeps with [`std::thread::sleep`].
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadSleep;

impl Sleep for ThreadSleep {
    fn sleep(&mut self, duration: StdDuration) {
        std::thread::sleep(duration);
    }
}

/// Outcome of a single [`HostLoop::turn`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Turn {
    /// Nothing is scheduled; the loop did not block.
    Idle,
    /// The animator was polled but no tick was due.
    Polled,
    /// The animator ticked.
    Ticked,
}

/// Counters accumulated across turns.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Turns taken.
    pub turns: u64,
    /// Turns that blocked before polling.
    pub sleeps: u64,
    /// Turns whose poll ticked the animator.
    pub ticks: u64,
}

/// A blocking loop that drives an [`Animator`] from its own wakeups.
#[derive(Debug)]
pub struct HostLoop<S: Sleep = ThreadSleep> {
    sleeper: S,
    max_sleep: Option<StdDuration>,
    stats: LoopStats,
}

impl Default for HostLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl HostLoop {
    /// Creates a loop that sleeps the current thread.
    #[must_use]
    pub fn new() -> Self {
        Self::with_sleeper(ThreadSleep)
    }
}

impl<S: Sleep> HostLoop<S> {
    /// Creates a loop that blocks through `sleeper`.
    #[must_use]
    pub fn with_sleeper(sleeper: S) -> Self {
        Self {
            sleeper,
            max_sleep: None,
            stats: LoopStats::default(),
        }
    }

    /// Caps a single sleep, so the host regains control at least that often.
    #[must_use]
    pub fn with_max_sleep(mut self, max_sleep: StdDuration) -> Self {
        self.max_sleep = Some(max_sleep);
        self
    }

    /// Counters so far.
    #[must_use]
    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// The sleeper.
    pub fn sleeper_mut(&mut self) -> &mut S {
        &mut self.sleeper
    }

    /// Sleeps until the animator's next wakeup (if it lies in the future)
    /// and polls it.
    pub fn turn(&mut self, animator: &mut Animator) -> Turn {
        let Some(wake) = animator.next_wakeup() else {
            return Turn::Idle;
        };
        self.stats.turns += 1;

        let clock = animator.clock();
        let now = clock.now();
        if wake > now {
            let nanos = wake.saturating_duration_since(now).to_nanos(clock.timebase());
            let mut wait = StdDuration::from_nanos(nanos);
            if let Some(max) = self.max_sleep {
                wait = wait.min(max);
            }
            self.sleeper.sleep(wait);
            self.stats.sleeps += 1;
        }

        if animator.poll() {
            self.stats.ticks += 1;
            Turn::Ticked
        } else {
            Turn::Polled
        }
    }

    /// Turns until nothing is scheduled.
    ///
    /// Never returns while an infinitely looping animation runs; use
    /// [`run_while`](Self::run_while) for those.
    pub fn run_until_idle(&mut self, animator: &mut Animator) -> LoopStats {
        while self.turn(animator) != Turn::Idle {}
        self.stats
    }

    /// Turns while `keep_going` returns `true` after each turn, or until
    /// nothing is scheduled. Returns the last turn's outcome.
    pub fn run_while(
        &mut self,
        animator: &mut Animator,
        mut keep_going: impl FnMut(&mut Animator) -> bool,
    ) -> Turn {
        loop {
            let turn = self.turn(animator);
            if turn == Turn::Idle || !keep_going(animator) {
                return turn;
            }
        }
    }
}
