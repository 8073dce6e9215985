// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the animation scheduler.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! [`Animator`](crate::Animator) calls as it ticks, registers, and
//! transitions animations. All method bodies default to no-ops, so
//! implementing only the events you care about is fine.
//!
//! [`Tracer`] owns an optional boxed [`TraceSink`]. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! A sink installed into an animator is moved into it. To inspect a sink
//! afterwards, install an `Rc<RefCell<S>>`, which forwards every event to the
//! shared sink.
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) gates per-node [`TimeUpdate`] records.

use alloc::boxed::Box;
use alloc::rc::Rc;
#[cfg(feature = "trace-rich")]
use alloc::vec::Vec;
use core::cell::RefCell;

use crate::animation::{AnimationId, State};

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// How the scheduler is currently being woken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerMode {
    /// Nothing is registered; no wakeups are scheduled.
    Idle,
    /// The installed driver ticks at its own cadence.
    Driver,
    /// Only pause animations are running; a single wakeup is armed for the
    /// soonest one to finish.
    PauseTimer,
}

/// What happened to a top-level registration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RegistrationKind {
    /// Queued in the pending-start list.
    Deferred,
    /// Moved from the pending list into the live set.
    Activated,
    /// Removed from the live set or the pending list.
    Unregistered,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted at the start of every scheduler tick.
#[derive(Clone, Copy, Debug)]
pub struct TickEvent {
    /// Monotonic tick counter.
    pub tick_index: u64,
    /// Milliseconds since the time origin.
    pub elapsed_ms: u64,
    /// Milliseconds every live animation is advanced by.
    pub delta_ms: u64,
    /// Number of live top-level animations at tick start.
    pub animations: u32,
}

/// Emitted once per animation state transition.
#[derive(Clone, Copy, Debug)]
pub struct StateChangeEvent {
    /// The animation that transitioned.
    pub animation: AnimationId,
    /// State before the transition.
    pub old: State,
    /// State after the transition.
    pub new: State,
    /// Scheduler time (last tick) in milliseconds.
    pub elapsed_ms: u64,
}

/// Emitted when the scheduler switches wakeup strategy.
#[derive(Clone, Copy, Debug)]
pub struct TimerModeEvent {
    /// The mode now in effect.
    pub mode: TimerMode,
    /// Scheduler time (last tick) in milliseconds.
    pub elapsed_ms: u64,
    /// For [`TimerMode::PauseTimer`], milliseconds until the armed wakeup.
    pub wake_in_ms: Option<u64>,
}

/// Emitted when a top-level animation enters or leaves the scheduler.
#[derive(Clone, Copy, Debug)]
pub struct RegistrationEvent {
    /// The animation concerned.
    pub animation: AnimationId,
    /// What happened.
    pub kind: RegistrationKind,
    /// Scheduler time (last tick) in milliseconds.
    pub elapsed_ms: u64,
}

/// Per-tick bookkeeping, emitted after the tick's fan-out completes.
#[derive(Clone, Copy, Debug)]
pub struct TickSummary {
    /// Monotonic tick counter.
    pub tick_index: u64,
    /// Milliseconds since the time origin.
    pub elapsed_ms: u64,
    /// Milliseconds every live animation was advanced by.
    pub delta_ms: u64,
    /// Animations advanced this tick.
    pub advanced: u32,
    /// Snapshot entries skipped because they left the live set mid-tick.
    pub skipped: u32,
    /// Pending registrations folded into the live set after the tick.
    pub activated: u32,
    /// Running leaf animations after the tick.
    pub running_leaf: u32,
    /// Running pause animations after the tick.
    pub running_pause: u32,
}

/// A per-node time application record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct TimeUpdate {
    /// The animation whose time was applied.
    pub animation: AnimationId,
    /// Current time within the loop, in milliseconds.
    pub current_time: u32,
    /// Current loop index.
    pub current_loop: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the animation scheduler.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the start of each tick.
    fn on_tick(&mut self, e: &TickEvent) {
        _ = e;
    }

    /// Called on each animation state transition.
    fn on_state_change(&mut self, e: &StateChangeEvent) {
        _ = e;
    }

    /// Called when the wakeup strategy changes.
    fn on_timer_mode(&mut self, e: &TimerModeEvent) {
        _ = e;
    }

    /// Called when a top-level registration changes.
    fn on_registration(&mut self, e: &RegistrationEvent) {
        _ = e;
    }

    /// Called after each tick with its summary.
    fn on_tick_summary(&mut self, s: &TickSummary) {
        _ = s;
    }

    /// Called with the per-node time updates of a tick (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_time_updates(&mut self, tick_index: u64, updates: &[TimeUpdate]) {
        _ = (tick_index, updates);
    }
}

impl<S: TraceSink + ?Sized> TraceSink for Rc<RefCell<S>> {
    fn on_tick(&mut self, e: &TickEvent) {
        self.borrow_mut().on_tick(e);
    }

    fn on_state_change(&mut self, e: &StateChangeEvent) {
        self.borrow_mut().on_state_change(e);
    }

    fn on_timer_mode(&mut self, e: &TimerModeEvent) {
        self.borrow_mut().on_timer_mode(e);
    }

    fn on_registration(&mut self, e: &RegistrationEvent) {
        self.borrow_mut().on_registration(e);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.borrow_mut().on_tick_summary(s);
    }

    #[cfg(feature = "trace-rich")]
    fn on_time_updates(&mut self, tick_index: u64, updates: &[TimeUpdate]) {
        self.borrow_mut().on_time_updates(tick_index, updates);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Owning wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
#[derive(Default)]
pub struct Tracer {
    #[cfg(feature = "trace")]
    sink: Option<Box<dyn TraceSink>>,
    #[cfg(feature = "trace-rich")]
    time_updates: Vec<TimeUpdate>,
}

impl core::fmt::Debug for Tracer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer")
            .field("active", &self.is_active())
            .finish_non_exhaustive()
    }
}

impl Tracer {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        #[cfg(feature = "trace")]
        {
            Self {
                sink: Some(sink),
                #[cfg(feature = "trace-rich")]
                time_updates: Vec::new(),
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {}
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns whether events reach a sink.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        #[cfg(feature = "trace")]
        {
            self.sink.is_some()
        }
        #[cfg(not(feature = "trace"))]
        {
            false
        }
    }

    /// Removes and returns the sink, leaving the tracer inactive.
    #[inline]
    pub fn take_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        #[cfg(feature = "trace")]
        {
            self.sink.take()
        }
        #[cfg(not(feature = "trace"))]
        {
            None
        }
    }

    /// Emits a [`TickEvent`].
    #[inline]
    pub fn tick(&mut self, e: &TickEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_tick(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`StateChangeEvent`].
    #[inline]
    pub fn state_change(&mut self, e: &StateChangeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_state_change(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TimerModeEvent`].
    #[inline]
    pub fn timer_mode(&mut self, e: &TimerModeEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_timer_mode(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RegistrationEvent`].
    #[inline]
    pub fn registration(&mut self, e: &RegistrationEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_registration(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TickSummary`].
    #[inline]
    pub fn tick_summary(&mut self, s: &TickSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_tick_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Buffers a per-node time update until the end of the tick (requires
    /// `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn time_update(&mut self, u: TimeUpdate) {
        if self.sink.is_some() {
            self.time_updates.push(u);
        }
    }

    /// Emits and clears the buffered time updates (requires `trace-rich`
    /// feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn flush_time_updates(&mut self, tick_index: u64) {
        if let Some(s) = &mut self.sink
            && !self.time_updates.is_empty()
        {
            s.on_time_updates(tick_index, &self.time_updates);
        }
        self.time_updates.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
