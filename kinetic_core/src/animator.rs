// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The animator: animation arena, state machine, and scheduler in one object.
//!
//! An [`Animator`] owns every animation node, the [`UnifiedTimer`]
//! bookkeeping, the installed [`AnimationDriver`], the [`TimeSource`] it
//! reads, and the [`Tracer`]. It is constructed explicitly and passed to
//! whatever owns the host event loop; there is no global instance.
//!
//! # State machine
//!
//! Every node is `Stopped`, `Paused`, or `Running`:
//!
//! - [`start`](Animator::start) moves Stopped → Running, rewinding to the
//!   beginning of the timeline (or its end when the direction is backward).
//!   It is a no-op on Running and Paused nodes, and on nodes whose total
//!   duration is zero.
//! - [`pause`](Animator::pause) / [`resume`](Animator::resume) toggle
//!   Running ↔ Paused and keep timing.
//! - [`stop`](Animator::stop) moves to Stopped and resets timing to zero.
//!   Reaching the end of the timeline also stops the node, but keeps the
//!   final timing values and delivers [`Notification::Finished`].
//!
//! Top-level nodes (not in a group, or in a stopped group) register with
//! the unified timer when they start running; group children are driven by
//! their group instead.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::any::Any;
use core::cell::RefCell;
use core::fmt;

use crate::animation::notify::Listener;
use crate::animation::store::{AnimationStore, Body, Registration};
use crate::animation::{
    Animation, AnimationId, Context, Direction, GroupKind, INVALID, ListenerId, LoopCount,
    Notification, NotifyKind, PauseAnimation, State,
};
use crate::dirty;
use crate::driver::{AnimationDriver, DefaultDriver};
use crate::error::AnimationError;
use crate::time::{Duration, TimeSource};
use crate::timer::{TimerConfig, UnifiedTimer};
#[cfg(feature = "trace-rich")]
use crate::trace::TimeUpdate;
use crate::trace::{StateChangeEvent, TraceSink, Tracer};

/// Why a node is being stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StopCause {
    /// The caller stopped it; timing resets.
    User,
    /// The timeline reached its end; timing is kept and `Finished` fires.
    Completed,
    /// An enclosing group stopped it; timing is kept.
    Group,
}

/// Owns animation nodes and drives them from a single timer.
pub struct Animator {
    pub(crate) store: AnimationStore,
    pub(crate) timer: UnifiedTimer,
    pub(crate) driver: Box<dyn AnimationDriver>,
    pub(crate) clock: Box<dyn TimeSource>,
    pub(crate) tracer: Tracer,
}

impl fmt::Debug for Animator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Animator")
            .field("timer", &self.timer)
            .field("driver", &self.driver)
            .field("clock", &self.clock)
            .field("tracer", &self.tracer)
            .finish_non_exhaustive()
    }
}

impl Animator {
    /// Creates an animator with [`TimerConfig::DEFAULT`] reading `clock`.
    #[must_use]
    pub fn new(clock: impl TimeSource + 'static) -> Self {
        Self::with_config(clock, TimerConfig::DEFAULT)
    }

    /// Creates an animator with the given timer configuration.
    ///
    /// A [`DefaultDriver`] ticking every `config.timing_interval_ms` is
    /// installed.
    #[must_use]
    pub fn with_config(clock: impl TimeSource + 'static, config: TimerConfig) -> Self {
        let interval = Duration::from_millis(config.timing_interval_ms.into(), clock.timebase());
        Self {
            store: AnimationStore::new(),
            timer: UnifiedTimer::new(config),
            driver: Box::new(DefaultDriver::new(interval)),
            clock: Box::new(clock),
            tracer: Tracer::none(),
        }
    }

    /// Routes trace events to `sink` (effective with the `trace` feature).
    pub fn set_trace_sink(&mut self, sink: Box<dyn TraceSink>) {
        self.tracer = Tracer::new(sink);
    }

    /// Detaches and returns the trace sink, if any.
    pub fn take_trace_sink(&mut self) -> Option<Box<dyn TraceSink>> {
        self.tracer.take_sink()
    }

    /// The time source this animator reads.
    #[must_use]
    pub fn clock(&self) -> &dyn TimeSource {
        self.clock.as_ref()
    }

    // -- Creation --

    /// Creates a leaf node driven by `animation`.
    pub fn create(&mut self, animation: impl Animation) -> AnimationId {
        self.create_boxed(Box::new(animation))
    }

    /// Creates a leaf node from an already boxed behavior.
    pub fn create_boxed(&mut self, animation: Box<dyn Animation>) -> AnimationId {
        self.store.alloc(Body::Leaf(Some(animation)))
    }

    /// Creates a [`PauseAnimation`] lasting `duration` milliseconds per loop.
    pub fn create_pause(&mut self, duration: u32) -> AnimationId {
        self.create(PauseAnimation::new(duration))
    }

    /// Creates an empty group.
    pub fn create_group(&mut self, kind: GroupKind) -> AnimationId {
        self.store.alloc(Body::Group(kind))
    }

    /// Destroys a stopped, childless node, detaching it from its group.
    pub fn destroy(&mut self, id: AnimationId) -> Result<(), AnimationError> {
        let idx = self.store.validate(id)?;
        if self.store.state[idx as usize] != State::Stopped {
            return Err(AnimationError::NotStopped(id));
        }
        if self.store.first_child[idx as usize] != INVALID {
            return Err(AnimationError::HasChildren(id));
        }
        if self.store.parent[idx as usize] != INVALID {
            self.store.unlink(idx);
        }
        self.store.free(idx);
        Ok(())
    }

    /// Returns whether the handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: AnimationId) -> bool {
        self.store.is_alive(id)
    }

    // -- Property getters --

    /// Playback state, or `None` for a stale handle.
    #[must_use]
    pub fn state(&self, id: AnimationId) -> Option<State> {
        self.get(id, |s, i| s.state[i])
    }

    /// Direction of travel.
    #[must_use]
    pub fn direction(&self, id: AnimationId) -> Option<Direction> {
        self.get(id, |s, i| s.direction[i])
    }

    /// Loop count.
    #[must_use]
    pub fn loop_count(&self, id: AnimationId) -> Option<LoopCount> {
        self.get(id, |s, i| s.loop_count[i])
    }

    /// Zero-based index of the current loop.
    #[must_use]
    pub fn current_loop(&self, id: AnimationId) -> Option<u32> {
        self.get(id, |s, i| s.current_loop[i])
    }

    /// Milliseconds into the current loop.
    #[must_use]
    pub fn current_time(&self, id: AnimationId) -> Option<u32> {
        self.get(id, |s, i| s.current_time[i])
    }

    /// Milliseconds into the whole timeline, across loops.
    #[must_use]
    pub fn total_current_time(&self, id: AnimationId) -> Option<u32> {
        self.get(id, |s, i| s.total_current_time[i])
    }

    /// Per-loop duration in milliseconds; `Ok(None)` when undefined.
    pub fn duration(&self, id: AnimationId) -> Result<Option<u32>, AnimationError> {
        let idx = self.store.validate(id)?;
        Ok(self.store.duration_at(idx))
    }

    /// Duration across all loops; `Ok(None)` when infinite.
    pub fn total_duration(&self, id: AnimationId) -> Result<Option<u32>, AnimationError> {
        let idx = self.store.validate(id)?;
        Ok(self.store.total_duration_at(idx))
    }

    /// Whether the node is a group.
    #[must_use]
    pub fn is_group(&self, id: AnimationId) -> bool {
        self.get(id, |s, i| matches!(s.body[i], Body::Group(_)))
            .unwrap_or(false)
    }

    /// Whether the node is a pause animation.
    #[must_use]
    pub fn is_pause(&self, id: AnimationId) -> bool {
        self.get(id, |s, i| s.is_pause[i]).unwrap_or(false)
    }

    /// Whether the node is registered with the timer as a top-level
    /// animation (live or pending).
    #[must_use]
    pub fn has_registered_timer(&self, id: AnimationId) -> bool {
        self.get(id, |s, i| s.registration[i] != Registration::None)
            .unwrap_or(false)
    }

    /// Borrows a leaf's behavior as its concrete type.
    #[must_use]
    pub fn animation<T: Animation>(&self, id: AnimationId) -> Option<&T> {
        let idx = self.store.validate(id).ok()?;
        match &self.store.body[idx as usize] {
            Body::Leaf(Some(b)) => {
                let any: &dyn Any = b.as_ref();
                any.downcast_ref::<T>()
            }
            _ => None,
        }
    }

    /// Mutates a leaf's behavior as its concrete type, then resamples its
    /// duration (and every enclosing group's).
    ///
    /// Returns `None` for stale handles, groups, type mismatches, and leaves
    /// whose hook is currently running.
    pub fn with_animation_mut<T: Animation, R>(
        &mut self,
        id: AnimationId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Option<R> {
        let idx = self.store.validate(id).ok()?;
        let out = match &mut self.store.body[idx as usize] {
            Body::Leaf(Some(b)) => {
                let any: &mut dyn Any = b.as_mut();
                f(any.downcast_mut::<T>()?)
            }
            _ => return None,
        };
        self.store.invalidate_duration(idx);
        self.refresh_pause_timer();
        Some(out)
    }

    /// Changes the duration of a pause animation. Returns `false` if `id` is
    /// not a live [`PauseAnimation`].
    pub fn set_pause_duration(&mut self, id: AnimationId, duration: u32) -> bool {
        self.with_animation_mut::<PauseAnimation, _>(id, |p| p.set_duration(duration))
            .is_some()
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `TickChanges`) rather than
    // `AnimationId` handles, skipping generation validation.

    /// State at raw slot `idx`.
    #[must_use]
    pub fn state_at(&self, idx: u32) -> Option<State> {
        self.store.state.get(idx as usize).copied()
    }

    /// Current loop time at raw slot `idx`.
    #[must_use]
    pub fn current_time_at(&self, idx: u32) -> Option<u32> {
        self.store.current_time.get(idx as usize).copied()
    }

    /// Current loop index at raw slot `idx`.
    #[must_use]
    pub fn current_loop_at(&self, idx: u32) -> Option<u32> {
        self.store.current_loop.get(idx as usize).copied()
    }

    // -- State machine --

    /// Starts a stopped node.
    ///
    /// Returns `Ok(false)` without effect if the node is already Running or
    /// Paused, or if its total duration is zero.
    pub fn start(&mut self, id: AnimationId) -> Result<bool, AnimationError> {
        let idx = self.store.validate(id)?;
        if self.store.state[idx as usize] != State::Stopped
            || self.store.total_duration_at(idx) == Some(0)
        {
            return Ok(false);
        }
        self.set_state(id, State::Running, StopCause::User);
        Ok(true)
    }

    /// Pauses a running node, keeping its timing.
    pub fn pause(&mut self, id: AnimationId) -> Result<bool, AnimationError> {
        let idx = self.store.validate(id)?;
        if self.store.state[idx as usize] != State::Running {
            return Ok(false);
        }
        self.set_state(id, State::Paused, StopCause::User);
        Ok(true)
    }

    /// Resumes a paused node.
    pub fn resume(&mut self, id: AnimationId) -> Result<bool, AnimationError> {
        let idx = self.store.validate(id)?;
        if self.store.state[idx as usize] != State::Paused {
            return Ok(false);
        }
        self.set_state(id, State::Running, StopCause::User);
        Ok(true)
    }

    /// Stops a running or paused node and resets its timing to zero.
    ///
    /// Does not deliver [`Notification::Finished`].
    pub fn stop(&mut self, id: AnimationId) -> Result<bool, AnimationError> {
        let idx = self.store.validate(id)?;
        if self.store.state[idx as usize] == State::Stopped {
            return Ok(false);
        }
        self.set_state(id, State::Stopped, StopCause::User);
        Ok(true)
    }

    /// Moves the node to `msecs` milliseconds into its whole timeline.
    ///
    /// Does not change state (except that a running node reaching its end
    /// stops). Works on stopped nodes too, which primes their value.
    pub fn set_current_time(&mut self, id: AnimationId, msecs: u32) -> Result<(), AnimationError> {
        self.store.validate(id)?;
        self.apply_current_time(id, msecs);
        Ok(())
    }

    /// Sets the loop count using the signed convention: negative is
    /// infinite, zero is rejected.
    pub fn set_loop_count(&mut self, id: AnimationId, count: i32) -> Result<(), AnimationError> {
        let idx = self.store.validate(id)?;
        let count = LoopCount::from_raw(count)?;
        self.store.loop_count[idx as usize] = count;
        self.store.invalidate_duration(idx);
        self.refresh_pause_timer();
        Ok(())
    }

    /// Changes the direction of travel.
    ///
    /// A stopped node is moved to the start of its timeline in the new
    /// direction. A registered node is first brought up to date with the
    /// old direction.
    pub fn set_direction(
        &mut self,
        id: AnimationId,
        direction: Direction,
    ) -> Result<(), AnimationError> {
        self.store.validate(id)?;
        self.set_direction_internal(id, direction);
        Ok(())
    }

    // -- Listeners --

    /// Calls `f` each time the node reaches the end of its timeline.
    pub fn on_finished(
        &mut self,
        id: AnimationId,
        mut f: impl FnMut(&mut Self, AnimationId) + 'static,
    ) -> Result<ListenerId, AnimationError> {
        self.listen(id, NotifyKind::Finished, move |a, id, _| f(a, id))
    }

    /// Calls `f(animator, id, new, old)` on every state transition.
    pub fn on_state_changed(
        &mut self,
        id: AnimationId,
        mut f: impl FnMut(&mut Self, AnimationId, State, State) + 'static,
    ) -> Result<ListenerId, AnimationError> {
        self.listen(id, NotifyKind::StateChanged, move |a, id, n| {
            if let Notification::StateChanged { new, old } = *n {
                f(a, id, new, old);
            }
        })
    }

    /// Calls `f` with the new loop index whenever the node changes loop.
    pub fn on_current_loop_changed(
        &mut self,
        id: AnimationId,
        mut f: impl FnMut(&mut Self, AnimationId, u32) + 'static,
    ) -> Result<ListenerId, AnimationError> {
        self.listen(id, NotifyKind::CurrentLoopChanged, move |a, id, n| {
            if let Notification::CurrentLoopChanged(current_loop) = *n {
                f(a, id, current_loop);
            }
        })
    }

    /// Calls `f` with the new direction whenever it changes.
    pub fn on_direction_changed(
        &mut self,
        id: AnimationId,
        mut f: impl FnMut(&mut Self, AnimationId, Direction) + 'static,
    ) -> Result<ListenerId, AnimationError> {
        self.listen(id, NotifyKind::DirectionChanged, move |a, id, n| {
            if let Notification::DirectionChanged(direction) = *n {
                f(a, id, direction);
            }
        })
    }

    /// Subscribes a raw callback to one notification channel.
    pub fn listen(
        &mut self,
        id: AnimationId,
        kind: NotifyKind,
        f: impl FnMut(&mut Self, AnimationId, &Notification) + 'static,
    ) -> Result<ListenerId, AnimationError> {
        let idx = self.store.validate(id)?;
        let listener_id = ListenerId(self.store.next_listener);
        self.store.next_listener += 1;
        self.store.listeners[idx as usize].push(Listener {
            id: listener_id,
            kind,
            callback: Rc::new(RefCell::new(Box::new(f))),
        });
        Ok(listener_id)
    }

    /// Unsubscribes a listener. Returns `false` if it was not registered on
    /// this node.
    pub fn remove_listener(&mut self, id: AnimationId, listener: ListenerId) -> bool {
        let Ok(idx) = self.store.validate(id) else {
            return false;
        };
        let list = &mut self.store.listeners[idx as usize];
        let before = list.len();
        list.retain(|l| l.id != listener);
        list.len() != before
    }

    // -- Internals --

    fn get<T>(&self, id: AnimationId, f: impl FnOnce(&AnimationStore, usize) -> T) -> Option<T> {
        self.store
            .validate(id)
            .ok()
            .map(|idx| f(&self.store, idx as usize))
    }

    /// True if the node has no group, or its group is stopped.
    pub(crate) fn is_top_level(&self, idx: u32) -> bool {
        let p = self.store.parent[idx as usize];
        p == INVALID || self.store.state[p as usize] == State::Stopped
    }

    fn still(&self, id: AnimationId, state: State) -> bool {
        self.store.is_alive(id) && self.store.state[id.idx as usize] == state
    }

    /// Moves a group child to Running from either Stopped or Paused.
    ///
    /// Unlike [`start`](Self::start), zero-length children do run, so the
    /// group's next time application finishes them.
    pub(crate) fn run_node(&mut self, id: AnimationId) {
        if self.store.is_alive(id) && self.store.state[id.idx as usize] != State::Running {
            self.set_state(id, State::Running, StopCause::User);
        }
    }

    /// Stops a group child if it is live and not already stopped, keeping
    /// its timing.
    pub(crate) fn halt_node(&mut self, id: AnimationId) {
        if self.store.is_alive(id) && self.store.state[id.idx as usize] != State::Stopped {
            self.set_state(id, State::Stopped, StopCause::Group);
        }
    }

    /// Pauses a node if it is live and running.
    pub(crate) fn suspend_node(&mut self, id: AnimationId) {
        if self.store.is_alive(id) && self.store.state[id.idx as usize] == State::Running {
            self.set_state(id, State::Paused, StopCause::User);
        }
    }

    /// The state transition at the heart of every lifecycle operation.
    pub(crate) fn set_state(&mut self, id: AnimationId, new: State, cause: StopCause) {
        let i = id.idx as usize;
        let old = self.store.state[i];
        if old == new {
            return;
        }

        if old == State::Stopped {
            // Rewind to the start of the timeline in the node's direction.
            let t = match self.store.direction[i] {
                Direction::Forward => 0,
                Direction::Backward => match self.store.loop_count[i] {
                    LoopCount::Infinite => self.store.duration_at(id.idx),
                    LoopCount::Finite(_) => self.store.total_duration_at(id.idx),
                }
                .unwrap_or(0),
            };
            self.store.total_current_time[i] = t;
            self.store.current_time[i] = self.store.duration_at(id.idx).map_or(t, |d| t.min(d));
            self.store.last_loop[i] = match self.store.direction[i] {
                Direction::Forward => 0,
                Direction::Backward => self.store.loop_count[i].last_loop(),
            };
            self.store.last_current_time[i] = self.store.current_time[i];
            self.store.current_child[i] = INVALID;
        }
        if new == State::Stopped && cause == StopCause::User {
            self.store.total_current_time[i] = 0;
            self.store.current_time[i] = 0;
            self.store.current_loop[i] = 0;
        }

        self.store.state[i] = new;
        self.store.dirty.mark(id.idx, dirty::STATE);
        self.tracer.state_change(&StateChangeEvent {
            animation: id,
            old,
            new,
            elapsed_ms: self.timer.last_tick,
        });

        let is_top_level = self.is_top_level(id.idx);
        if old == State::Running {
            if new == State::Paused
                && self.store.registration[i] != Registration::None
                && self.timer.is_pause_timer_active
            {
                self.ensure_timer_update_if_paused();
            }
            self.unregister_animation(id);
        } else if new == State::Running {
            self.register_animation(id, is_top_level);
        }

        self.dispatch_update_state(id, new, old);
        if !self.still(id, new) {
            return;
        }

        self.notify(id, Notification::StateChanged { new, old });
        if !self.still(id, new) {
            return;
        }

        match new {
            State::Running if old == State::Stopped && is_top_level => {
                // Apply the rewound time now that the node is running.
                self.ensure_timer_update_if_paused();
                if self.still(id, new) {
                    let t = self.store.total_current_time[i];
                    self.apply_current_time(id, t);
                }
            }
            State::Stopped if cause == StopCause::Completed => {
                self.notify(id, Notification::Finished);
            }
            _ => {}
        }
    }

    /// Moves the node to `msecs` into its timeline, applying loop
    /// wraparound, and stops it if a running node reached its end.
    pub(crate) fn apply_current_time(&mut self, id: AnimationId, msecs: u32) {
        let idx = id.idx;
        let i = idx as usize;
        let dura = self.store.duration_at(idx);
        let total_dura = self.store.total_duration_at(idx);
        let msecs = total_dura.map_or(msecs, |t| msecs.min(t));
        self.store.total_current_time[i] = msecs;

        let old_loop = self.store.current_loop[i];
        let loop_count = self.store.loop_count[i];
        let direction = self.store.direction[i];
        let (current_loop, current_time) = match dura {
            None | Some(0) => (0, msecs),
            Some(d) => {
                let lp = msecs / d;
                if loop_count.get() == Some(lp) {
                    // At the very end.
                    (loop_count.last_loop(), d)
                } else if direction == Direction::Forward || msecs == 0 {
                    (lp, msecs % d)
                } else {
                    // Backward: a loop boundary belongs to the earlier loop.
                    let t = (msecs - 1) % d + 1;
                    (if t == d { lp - 1 } else { lp }, t)
                }
            }
        };
        self.store.current_loop[i] = current_loop;
        self.store.current_time[i] = current_time;
        self.store.dirty.mark(idx, dirty::TIME);
        #[cfg(feature = "trace-rich")]
        self.tracer.time_update(TimeUpdate {
            animation: id,
            current_time,
            current_loop,
        });

        self.dispatch_update_current_time(id, current_time);
        if !self.store.is_alive(id) {
            return;
        }

        let new_loop = self.store.current_loop[i];
        if new_loop != old_loop {
            self.notify(id, Notification::CurrentLoopChanged(new_loop));
            if !self.store.is_alive(id) {
                return;
            }
        }

        if self.store.state[i] == State::Stopped {
            return;
        }
        let total = self.store.total_current_time[i];
        let at_end = match self.store.direction[i] {
            Direction::Forward => total_dura == Some(total),
            Direction::Backward => total == 0,
        };
        if at_end {
            self.set_state(id, State::Stopped, StopCause::Completed);
        }
    }

    pub(crate) fn set_direction_internal(&mut self, id: AnimationId, direction: Direction) {
        let i = id.idx as usize;
        if self.store.direction[i] == direction {
            return;
        }

        if self.store.state[i] == State::Stopped {
            match direction {
                Direction::Backward => {
                    self.store.current_time[i] = self.store.duration_at(id.idx).unwrap_or(0);
                    self.store.current_loop[i] = self.store.loop_count[i].last_loop();
                }
                Direction::Forward => {
                    self.store.current_time[i] = 0;
                    self.store.current_loop[i] = 0;
                }
            }
        }

        // Catch up with the old direction before switching.
        let registered = self.store.registration[i] != Registration::None;
        if registered {
            self.ensure_timer_update_if_paused();
            if !self.store.is_alive(id) {
                return;
            }
        }

        self.store.direction[i] = direction;
        self.dispatch_update_direction(id, direction);
        if !self.store.is_alive(id) {
            return;
        }

        if registered {
            self.refresh_pause_timer();
        }
        self.notify(id, Notification::DirectionChanged(direction));
    }

    // -- Hook dispatch --

    fn dispatch_update_current_time(&mut self, id: AnimationId, current_time: u32) {
        match self.store.body[id.idx as usize] {
            Body::Group(GroupKind::Parallel) => self.update_parallel(id, current_time),
            Body::Group(GroupKind::Sequential) => self.update_sequential(id, current_time),
            Body::Leaf(_) => self.with_detached(id, |behavior, cx| {
                behavior.update_current_time(cx, current_time);
            }),
        }
    }

    fn dispatch_update_state(&mut self, id: AnimationId, new: State, old: State) {
        match self.store.body[id.idx as usize] {
            Body::Group(GroupKind::Parallel) => self.parallel_state_changed(id, new, old),
            Body::Group(GroupKind::Sequential) => self.sequential_state_changed(id, new, old),
            Body::Leaf(_) => self.with_detached(id, |behavior, cx| {
                behavior.update_state(cx, new, old);
            }),
        }
    }

    fn dispatch_update_direction(&mut self, id: AnimationId, direction: Direction) {
        match self.store.body[id.idx as usize] {
            Body::Group(GroupKind::Parallel) => self.parallel_direction_changed(id, direction),
            Body::Group(GroupKind::Sequential) => self.sequential_direction_changed(id, direction),
            Body::Leaf(_) => self.with_detached(id, |behavior, _| {
                behavior.update_direction(direction);
            }),
        }
    }

    /// Runs `f` with the leaf's behavior detached from the arena, so the
    /// hook can borrow the animator mutably.
    fn with_detached(
        &mut self,
        id: AnimationId,
        f: impl FnOnce(&mut dyn Animation, &mut Context<'_>),
    ) {
        let i = id.idx as usize;
        let behavior = match &mut self.store.body[i] {
            Body::Leaf(slot) => slot.take(),
            Body::Group(_) => None,
        };
        // Already detached: a re-entrant call for the same node.
        let Some(mut behavior) = behavior else {
            return;
        };
        {
            let mut cx = Context::new(self, id);
            f(behavior.as_mut(), &mut cx);
        }
        if self.store.is_alive(id)
            && let Body::Leaf(slot) = &mut self.store.body[i]
            && slot.is_none()
        {
            *slot = Some(behavior);
        }
    }

    /// Delivers `n` to the node's listeners for that channel.
    pub(crate) fn notify(&mut self, id: AnimationId, n: Notification) {
        let i = id.idx as usize;
        if self.store.listeners[i].is_empty() {
            return;
        }
        let kind = n.kind();
        let snapshot: Vec<_> = self.store.listeners[i]
            .iter()
            .filter(|l| l.kind == kind)
            .map(|l| (l.id, Rc::clone(&l.callback)))
            .collect();
        for (listener_id, callback) in snapshot {
            if !self.store.is_alive(id) {
                break;
            }
            // Removed by an earlier listener in this dispatch.
            if !self.store.listeners[i].iter().any(|l| l.id == listener_id) {
                continue;
            }
            // A listener is never re-entered by a notification it caused.
            let Ok(mut guard) = callback.try_borrow_mut() else {
                continue;
            };
            let f = &mut *guard;
            f(self, id, &n);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::time::ManualClock;

    /// A leaf that records every time it is applied.
    #[derive(Debug, Default)]
    pub(crate) struct Recording {
        pub(crate) duration: Option<u32>,
        pub(crate) times: Vec<u32>,
        pub(crate) states: Vec<(State, State)>,
        pub(crate) directions: Vec<Direction>,
    }

    impl Recording {
        pub(crate) fn new(duration: u32) -> Self {
            Self {
                duration: Some(duration),
                ..Self::default()
            }
        }
    }

    impl Animation for Recording {
        fn duration(&self) -> Option<u32> {
            self.duration
        }

        fn update_current_time(&mut self, _cx: &mut Context<'_>, current_time: u32) {
            self.times.push(current_time);
        }

        fn update_state(&mut self, _cx: &mut Context<'_>, new: State, old: State) {
            self.states.push((new, old));
        }

        fn update_direction(&mut self, direction: Direction) {
            self.directions.push(direction);
        }
    }

    pub(crate) fn animator() -> (Animator, ManualClock) {
        let clock = ManualClock::default();
        (Animator::new(clock.clone()), clock)
    }

    type Log = Rc<RefCell<Vec<&'static str>>>;

    fn log_all(a: &mut Animator, id: AnimationId) -> Log {
        let log: Log = Rc::default();
        let l = Rc::clone(&log);
        a.on_finished(id, move |_, _| l.borrow_mut().push("finished"))
            .unwrap();
        let l = Rc::clone(&log);
        a.on_state_changed(id, move |_, _, new, _| {
            l.borrow_mut().push(match new {
                State::Running => "running",
                State::Paused => "paused",
                State::Stopped => "stopped",
            });
        })
        .unwrap();
        let l = Rc::clone(&log);
        a.on_current_loop_changed(id, move |_, _, _| l.borrow_mut().push("loop"))
            .unwrap();
        log
    }

    #[test]
    fn new_node_is_stopped_at_zero() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        assert_eq!(a.state(id), Some(State::Stopped));
        assert_eq!(a.direction(id), Some(Direction::Forward));
        assert_eq!(a.loop_count(id), Some(LoopCount::ONCE));
        assert_eq!(a.current_time(id), Some(0));
        assert_eq!(a.current_loop(id), Some(0));
        assert_eq!(a.duration(id), Ok(Some(100)));
        assert!(!a.is_group(id));
        assert!(!a.is_pause(id));
    }

    #[test]
    fn start_applies_time_zero_and_registers() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        assert_eq!(a.start(id), Ok(true));
        assert_eq!(a.state(id), Some(State::Running));
        assert!(a.has_registered_timer(id));
        let rec = a.animation::<Recording>(id).unwrap();
        assert_eq!(rec.times, vec![0]);
        assert_eq!(rec.states, vec![(State::Running, State::Stopped)]);
    }

    #[test]
    fn start_while_running_or_paused_is_noop() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.start(id).unwrap();
        a.set_current_time(id, 40).unwrap();
        assert_eq!(a.start(id), Ok(false));
        assert_eq!(a.current_time(id), Some(40), "no restart");

        a.pause(id).unwrap();
        assert_eq!(a.start(id), Ok(false));
        assert_eq!(a.state(id), Some(State::Paused));
    }

    #[test]
    fn zero_duration_never_starts() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(0));
        assert_eq!(a.start(id), Ok(false));
        assert_eq!(a.state(id), Some(State::Stopped));
        assert!(!a.has_registered_timer(id));
    }

    #[test]
    fn pause_resume_keep_timing() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.start(id).unwrap();
        a.set_current_time(id, 30).unwrap();
        assert_eq!(a.pause(id), Ok(true));
        assert!(!a.has_registered_timer(id));
        assert_eq!(a.pause(id), Ok(false));
        assert_eq!(a.resume(id), Ok(true));
        assert_eq!(a.resume(id), Ok(false));
        assert_eq!(a.current_time(id), Some(30));
        assert!(a.has_registered_timer(id));
    }

    #[test]
    fn user_stop_resets_without_finished() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_loop_count(id, 3).unwrap();
        let log = log_all(&mut a, id);
        a.start(id).unwrap();
        a.set_current_time(id, 150).unwrap();
        assert_eq!(a.stop(id), Ok(true));
        assert_eq!(a.current_time(id), Some(0));
        assert_eq!(a.current_loop(id), Some(0));
        assert_eq!(a.total_current_time(id), Some(0));
        assert!(!a.has_registered_timer(id));
        assert_eq!(*log.borrow(), vec!["running", "loop", "stopped"]);
        assert_eq!(a.stop(id), Ok(false));
    }

    #[test]
    fn natural_completion_keeps_end_values_and_finishes() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_loop_count(id, 2).unwrap();
        let log = log_all(&mut a, id);
        a.start(id).unwrap();
        a.set_current_time(id, 500).unwrap();
        assert_eq!(a.state(id), Some(State::Stopped));
        assert_eq!(a.current_loop(id), Some(1));
        assert_eq!(a.current_time(id), Some(100));
        assert_eq!(a.total_current_time(id), Some(200));
        assert_eq!(
            *log.borrow(),
            vec!["running", "loop", "stopped", "finished"]
        );
    }

    #[test]
    fn loop_wraparound() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_loop_count(id, 4).unwrap();
        a.start(id).unwrap();
        for k in 1..4 {
            a.set_current_time(id, k * 100).unwrap();
            assert_eq!(a.current_loop(id), Some(k));
            assert_eq!(a.current_time(id), Some(0));
            assert_eq!(a.state(id), Some(State::Running));
        }
        a.set_current_time(id, 400).unwrap();
        assert_eq!(a.state(id), Some(State::Stopped));
        assert_eq!(a.current_loop(id), Some(3));
        assert_eq!(a.current_time(id), Some(100));
    }

    #[test]
    fn backward_boundary_belongs_to_earlier_loop() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_loop_count(id, 3).unwrap();
        a.set_direction(id, Direction::Backward).unwrap();
        a.start(id).unwrap();
        assert_eq!(a.total_current_time(id), Some(300));
        assert_eq!(a.current_loop(id), Some(2));
        assert_eq!(a.current_time(id), Some(100));

        a.set_current_time(id, 200).unwrap();
        assert_eq!(a.current_loop(id), Some(1));
        assert_eq!(a.current_time(id), Some(100));

        a.set_current_time(id, 150).unwrap();
        assert_eq!(a.current_loop(id), Some(1));
        assert_eq!(a.current_time(id), Some(50));

        a.set_current_time(id, 0).unwrap();
        assert_eq!(a.state(id), Some(State::Stopped));
        assert_eq!(a.current_loop(id), Some(0));
        assert_eq!(a.current_time(id), Some(0));
    }

    #[test]
    fn set_current_time_on_stopped_node_primes_without_running() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_current_time(id, 100).unwrap();
        assert_eq!(a.state(id), Some(State::Stopped));
        assert_eq!(a.current_time(id), Some(100));
        assert_eq!(a.animation::<Recording>(id).unwrap().times, vec![100]);
    }

    #[test]
    fn set_current_time_clamps_to_total() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_current_time(id, 9_999).unwrap();
        assert_eq!(a.total_current_time(id), Some(100));
    }

    #[test]
    fn undefined_duration_never_wraps() {
        let (mut a, _) = animator();
        let id = a.create(Recording {
            duration: None,
            ..Recording::default()
        });
        a.start(id).unwrap();
        a.set_current_time(id, 12_345).unwrap();
        assert_eq!(a.current_time(id), Some(12_345));
        assert_eq!(a.current_loop(id), Some(0));
        assert_eq!(a.state(id), Some(State::Running));
        assert_eq!(a.total_duration(id), Ok(None));
    }

    #[test]
    fn infinite_loop_count() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_loop_count(id, -1).unwrap();
        assert_eq!(a.total_duration(id), Ok(None));
        a.start(id).unwrap();
        a.set_current_time(id, 1_050).unwrap();
        assert_eq!(a.current_loop(id), Some(10));
        assert_eq!(a.current_time(id), Some(50));
        assert_eq!(a.state(id), Some(State::Running));
    }

    #[test]
    fn zero_loop_count_is_rejected() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_loop_count(id, 2).unwrap();
        assert_eq!(
            a.set_loop_count(id, 0),
            Err(AnimationError::InvalidLoopCount)
        );
        assert_eq!(a.loop_count(id).and_then(LoopCount::get), Some(2));
    }

    #[test]
    fn set_direction_on_stopped_node_moves_to_end() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.set_loop_count(id, 3).unwrap();
        let seen: Rc<RefCell<Vec<Direction>>> = Rc::default();
        let s = Rc::clone(&seen);
        a.on_direction_changed(id, move |_, _, d| s.borrow_mut().push(d))
            .unwrap();

        a.set_direction(id, Direction::Backward).unwrap();
        assert_eq!(a.current_time(id), Some(100));
        assert_eq!(a.current_loop(id), Some(2));
        a.set_direction(id, Direction::Backward).unwrap();
        a.set_direction(id, Direction::Forward).unwrap();
        assert_eq!(a.current_time(id), Some(0));
        assert_eq!(a.current_loop(id), Some(0));

        assert_eq!(*seen.borrow(), vec![Direction::Backward, Direction::Forward]);
        assert_eq!(
            a.animation::<Recording>(id).unwrap().directions,
            vec![Direction::Backward, Direction::Forward]
        );
    }

    #[test]
    fn stale_handles_are_rejected() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.destroy(id).unwrap();
        assert!(!a.is_alive(id));
        assert_eq!(a.start(id), Err(AnimationError::Stale(id)));
        assert_eq!(a.stop(id), Err(AnimationError::Stale(id)));
        assert_eq!(a.set_current_time(id, 1), Err(AnimationError::Stale(id)));
        assert_eq!(a.state(id), None);
        assert_eq!(a.duration(id), Err(AnimationError::Stale(id)));
        assert!(a.on_finished(id, |_, _| {}).is_err());
        assert!(a.animation::<Recording>(id).is_none());
        assert_eq!(a.destroy(id), Err(AnimationError::Stale(id)));
    }

    #[test]
    fn destroy_requires_stopped_node() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        a.start(id).unwrap();
        assert_eq!(a.destroy(id), Err(AnimationError::NotStopped(id)));
        a.stop(id).unwrap();
        assert_eq!(a.destroy(id), Ok(()));
    }

    #[test]
    fn with_animation_mut_resamples_duration() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        let out = a.with_animation_mut::<Recording, _>(id, |p| {
            p.duration = Some(250);
            7
        });
        assert_eq!(out, Some(7));
        assert_eq!(a.duration(id), Ok(Some(250)));
        assert!(a.with_animation_mut::<PauseAnimation, _>(id, |_| ()).is_none());
    }

    #[test]
    fn pause_duration_setter() {
        let (mut a, _) = animator();
        let p = a.create_pause(100);
        assert!(a.is_pause(p));
        assert!(a.set_pause_duration(p, 40));
        assert_eq!(a.duration(p), Ok(Some(40)));
        let leaf = a.create(Recording::new(1));
        assert!(!a.set_pause_duration(leaf, 40));
    }

    #[test]
    fn removed_listener_stops_firing() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        let count = Rc::new(RefCell::new(0));
        let c = Rc::clone(&count);
        let lid = a
            .on_state_changed(id, move |_, _, _, _| *c.borrow_mut() += 1)
            .unwrap();
        a.start(id).unwrap();
        assert!(a.remove_listener(id, lid));
        assert!(!a.remove_listener(id, lid));
        a.stop(id).unwrap();
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn listener_may_restart_finished_node() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(100));
        let restarts = Rc::new(RefCell::new(0));
        let r = Rc::clone(&restarts);
        a.on_finished(id, move |a, id| {
            let mut n = r.borrow_mut();
            if *n < 2 {
                *n += 1;
                a.start(id).unwrap();
            }
        })
        .unwrap();
        a.start(id).unwrap();
        a.set_current_time(id, 100).unwrap();
        assert_eq!(a.state(id), Some(State::Running), "restarted");
        assert_eq!(a.current_time(id), Some(0));
        a.set_current_time(id, 100).unwrap();
        a.set_current_time(id, 100).unwrap();
        assert_eq!(a.state(id), Some(State::Stopped));
        assert_eq!(*restarts.borrow(), 2);
    }

    /// A leaf that stops itself once it passes `stop_at`.
    #[derive(Debug)]
    struct SelfStopper {
        stop_at: u32,
    }

    impl Animation for SelfStopper {
        fn duration(&self) -> Option<u32> {
            Some(1_000)
        }

        fn update_current_time(&mut self, cx: &mut Context<'_>, current_time: u32) {
            if current_time >= self.stop_at {
                let id = cx.id();
                cx.animator().stop(id).unwrap();
            }
        }
    }

    #[test]
    fn hook_may_stop_its_own_node() {
        let (mut a, _) = animator();
        let id = a.create(SelfStopper { stop_at: 50 });
        a.start(id).unwrap();
        a.set_current_time(id, 60).unwrap();
        assert_eq!(a.state(id), Some(State::Stopped));
        assert_eq!(a.current_time(id), Some(0));
        assert!(a.animation::<SelfStopper>(id).is_some(), "behavior reattached");
    }
}
