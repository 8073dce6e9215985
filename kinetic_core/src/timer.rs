// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The unified timer: one clock driving every top-level animation.
//!
//! Top-level nodes register when they start running. Registrations are not
//! live immediately: they are queued and folded into the live set by the
//! next *start/stop flush*, which the host triggers through
//! [`Animator::poll`] (or implicitly through any of the `advance` calls).
//! A node that starts while a tick is in progress is therefore first
//! advanced by the following tick.
//!
//! Each tick computes one delta and applies it to a snapshot of the live
//! set, in registration order. Nodes that leave the live set mid-tick are
//! skipped.
//!
//! When only [`PauseAnimation`](crate::animation::PauseAnimation)s are
//! running, the driver is stopped and a single wakeup is armed for the
//! soonest one to finish.

use alloc::vec::Vec;
use core::mem;

use crate::Animator;
use crate::animation::store::{Body, Registration};
use crate::animation::{AnimationId, Direction, State};
use crate::animator::StopCause;
use crate::time::{Duration, HostTime};
use crate::trace::{
    RegistrationEvent, RegistrationKind, TickEvent, TickSummary, TimerMode, TimerModeEvent,
};

/// Tick pacing configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimerConfig {
    /// Nominal tick period in milliseconds, used by [`DefaultDriver`] and by
    /// consistent timing.
    ///
    /// [`DefaultDriver`]: crate::driver::DefaultDriver
    pub timing_interval_ms: u32,
    /// Advance by exactly `timing_interval_ms` per tick instead of the
    /// measured elapsed time. Ignored while the pause timer is active.
    pub consistent_timing: bool,
    /// Divide every delta by `slowdown_factor`.
    pub slow_mode: bool,
    /// Time dilation for `slow_mode`. Non-positive values freeze time.
    pub slowdown_factor: f32,
}

impl TimerConfig {
    /// Measured deltas at a 16 ms nominal interval.
    pub const DEFAULT: Self = Self {
        timing_interval_ms: 16,
        consistent_timing: false,
        slow_mode: false,
        slowdown_factor: 5.0,
    };

    /// Fixed 16 ms steps regardless of wall-clock time, for offline
    /// rendering and reproducible captures.
    #[must_use]
    pub const fn consistent() -> Self {
        Self {
            consistent_timing: true,
            ..Self::DEFAULT
        }
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Bookkeeping for registered animations and wakeup strategy.
#[derive(Debug)]
pub struct UnifiedTimer {
    pub(crate) config: TimerConfig,
    /// Live top-level nodes, in registration order.
    pub(crate) animations: Vec<AnimationId>,
    /// Top-level nodes waiting for the next start/stop flush.
    pub(crate) animations_to_start: Vec<AnimationId>,
    pub(crate) running_pause_animations: Vec<AnimationId>,
    pub(crate) running_leaf_animations: u32,
    pub(crate) inside_tick: bool,
    pub(crate) is_pause_timer_active: bool,
    pub(crate) pause_deadline: Option<HostTime>,
    /// Set when a flush is owed; the time of the first request.
    pub(crate) start_stop_requested_at: Option<HostTime>,
    /// Zero point of the millisecond timeline; `None` while idle.
    pub(crate) time_origin: Option<HostTime>,
    pub(crate) last_tick: u64,
    pub(crate) tick_index: u64,
    pub(crate) mode: TimerMode,
}

impl UnifiedTimer {
    pub(crate) fn new(config: TimerConfig) -> Self {
        Self {
            config,
            animations: Vec::new(),
            animations_to_start: Vec::new(),
            running_pause_animations: Vec::new(),
            running_leaf_animations: 0,
            inside_tick: false,
            is_pause_timer_active: false,
            pause_deadline: None,
            start_stop_requested_at: None,
            time_origin: None,
            last_tick: 0,
            tick_index: 0,
            mode: TimerMode::Idle,
        }
    }

    /// Current configuration.
    #[must_use]
    pub fn config(&self) -> &TimerConfig {
        &self.config
    }

    /// Live top-level nodes in registration order.
    #[must_use]
    pub fn animations(&self) -> &[AnimationId] {
        &self.animations
    }

    /// Top-level nodes queued for the next flush.
    #[must_use]
    pub fn pending(&self) -> &[AnimationId] {
        &self.animations_to_start
    }

    /// Running non-group, non-pause nodes.
    #[must_use]
    pub fn running_leaf_animations(&self) -> u32 {
        self.running_leaf_animations
    }

    /// Running pause nodes.
    #[must_use]
    pub fn running_pause_animations(&self) -> &[AnimationId] {
        &self.running_pause_animations
    }

    /// Whether the single-shot pause wakeup is armed instead of the driver.
    #[must_use]
    pub fn is_pause_timer_active(&self) -> bool {
        self.is_pause_timer_active
    }

    /// Milliseconds since the time origin at the last tick.
    #[must_use]
    pub fn last_tick(&self) -> u64 {
        self.last_tick
    }

    /// Number of ticks that advanced time.
    #[must_use]
    pub fn tick_index(&self) -> u64 {
        self.tick_index
    }

    /// How the timer is currently being woken.
    #[must_use]
    pub fn mode(&self) -> TimerMode {
        self.mode
    }
}

impl Animator {
    /// The unified timer's bookkeeping.
    #[must_use]
    pub fn timer(&self) -> &UnifiedTimer {
        &self.timer
    }

    /// Number of top-level nodes registered with the timer, live or pending.
    #[must_use]
    pub fn running_animation_count(&self) -> usize {
        self.timer.animations.len() + self.timer.animations_to_start.len()
    }

    /// Changes the nominal tick interval (and the default driver's period).
    pub fn set_timing_interval(&mut self, ms: u32) {
        self.timer.config.timing_interval_ms = ms;
        let interval = Duration::from_millis(ms.into(), self.clock.timebase());
        self.driver.set_interval(interval);
    }

    /// Toggles fixed-step timing.
    pub fn set_consistent_timing(&mut self, consistent: bool) {
        self.timer.config.consistent_timing = consistent;
    }

    /// Toggles time dilation by the configured slowdown factor.
    pub fn set_slow_mode(&mut self, slow: bool) {
        self.timer.config.slow_mode = slow;
    }

    /// Changes the slow-mode divisor.
    pub fn set_slowdown_factor(&mut self, factor: f32) {
        self.timer.config.slowdown_factor = factor;
    }

    // -- Host API --

    /// Services the timer: flushes pending registrations, then ticks if the
    /// pause wakeup has passed or the driver reports a due tick.
    ///
    /// Returns whether a tick ran.
    pub fn poll(&mut self) -> bool {
        if self.timer.start_stop_requested_at.is_some() {
            self.flush_start_stop();
        }
        let now = self.clock.now();
        let due = if self.timer.is_pause_timer_active {
            self.timer.pause_deadline.is_some_and(|d| now >= d)
        } else {
            self.driver.poll(now)
        };
        due && self.tick(None, false)
    }

    /// When the host should call [`poll`](Self::poll) next.
    ///
    /// `None` means nothing is scheduled. A time in the past means "now".
    #[must_use]
    pub fn next_wakeup(&self) -> Option<HostTime> {
        if let Some(t) = self.timer.start_stop_requested_at {
            return Some(t);
        }
        match self.timer.mode {
            TimerMode::PauseTimer => self.timer.pause_deadline,
            TimerMode::Driver => self.driver.next_tick(),
            TimerMode::Idle => None,
        }
    }

    /// Flushes pending registrations and ticks with the clock's elapsed time.
    pub fn advance(&mut self) -> bool {
        self.flush_start_stop();
        self.tick(None, false)
    }

    /// Flushes pending registrations and ticks `ms` milliseconds past the
    /// last tick.
    ///
    /// Consistent timing and slow mode still shape the applied delta.
    pub fn advance_by(&mut self, ms: u64) -> bool {
        self.flush_start_stop();
        let step = self.timer.last_tick.saturating_add(ms);
        self.tick(Some(step), false)
    }

    /// Flushes pending registrations and ticks to `elapsed_ms` milliseconds
    /// since the time origin, or to the clock's elapsed time for `None`.
    pub fn update_animations_time(&mut self, elapsed_ms: Option<u64>) -> bool {
        self.flush_start_stop();
        self.tick(elapsed_ms, false)
    }

    /// Brings every live node up to the current clock time, ignoring
    /// consistent timing. Useful before reading animation state out of band.
    pub fn ensure_timer_update(&mut self) -> bool {
        self.tick(None, true)
    }

    /// Stops every registered node and the driver, returning to idle.
    pub fn shutdown(&mut self) {
        let ids: Vec<AnimationId> = self
            .timer
            .animations
            .iter()
            .chain(&self.timer.animations_to_start)
            .copied()
            .collect();
        for id in ids {
            if self.store.is_alive(id) && self.store.state[id.idx as usize] != State::Stopped {
                self.set_state(id, State::Stopped, StopCause::User);
            }
        }
        self.timer.animations.clear();
        self.timer.animations_to_start.clear();
        self.timer.running_pause_animations.clear();
        self.timer.running_leaf_animations = 0;
        self.timer.start_stop_requested_at = None;
        self.go_idle();
    }

    // -- Internals --

    /// Milliseconds between the time origin and `at`.
    pub(crate) fn elapsed_at(&self, at: HostTime) -> u64 {
        self.timer
            .time_origin
            .map_or(0, |origin| at.millis_since(origin, self.clock.timebase()))
    }

    fn request_start_stop(&mut self) {
        if self.timer.start_stop_requested_at.is_none() {
            self.timer.start_stop_requested_at = Some(self.clock.now());
        }
    }

    pub(crate) fn register_animation(&mut self, id: AnimationId, is_top_level: bool) {
        let i = id.idx as usize;
        if matches!(self.store.body[i], Body::Leaf(_)) {
            if self.store.is_pause[i] {
                self.timer.running_pause_animations.push(id);
            } else {
                self.timer.running_leaf_animations += 1;
            }
        }
        if is_top_level && self.store.registration[i] == Registration::None {
            self.store.registration[i] = Registration::Pending;
            self.timer.animations_to_start.push(id);
            self.request_start_stop();
            self.tracer.registration(&RegistrationEvent {
                animation: id,
                kind: RegistrationKind::Deferred,
                elapsed_ms: self.timer.last_tick,
            });
        }
    }

    pub(crate) fn unregister_animation(&mut self, id: AnimationId) {
        let i = id.idx as usize;
        if matches!(self.store.body[i], Body::Leaf(_)) {
            if self.store.is_pause[i] {
                self.timer.running_pause_animations.retain(|&p| p != id);
            } else {
                self.timer.running_leaf_animations =
                    self.timer.running_leaf_animations.saturating_sub(1);
            }
        }
        match self.store.registration[i] {
            Registration::None => return,
            Registration::Live => {
                self.timer.animations.retain(|&a| a != id);
                if self.timer.animations.is_empty() {
                    self.request_start_stop();
                }
            }
            Registration::Pending => self.timer.animations_to_start.retain(|&a| a != id),
        }
        self.store.registration[i] = Registration::None;
        self.tracer.registration(&RegistrationEvent {
            animation: id,
            kind: RegistrationKind::Unregistered,
            elapsed_ms: self.timer.last_tick,
        });
    }

    /// Folds pending registrations into the live set and picks a wakeup
    /// strategy. Returns how many registrations became live.
    pub(crate) fn flush_start_stop(&mut self) -> u32 {
        let requested_at = self.timer.start_stop_requested_at.take();
        let mut activated = 0;
        for id in mem::take(&mut self.timer.animations_to_start) {
            let i = id.idx as usize;
            if self.store.is_alive(id) && self.store.registration[i] == Registration::Pending {
                self.store.registration[i] = Registration::Live;
                self.timer.animations.push(id);
                activated += 1;
                self.tracer.registration(&RegistrationEvent {
                    animation: id,
                    kind: RegistrationKind::Activated,
                    elapsed_ms: self.timer.last_tick,
                });
            }
        }
        if self.timer.animations.is_empty() {
            self.go_idle();
        } else {
            if self.timer.time_origin.is_none() {
                self.timer.time_origin = Some(requested_at.unwrap_or_else(|| self.clock.now()));
                self.timer.last_tick = 0;
            }
            self.restart_animation_timer();
        }
        activated
    }

    /// Advances every live node by one delta.
    ///
    /// `step` is an absolute time in milliseconds since the origin; `None`
    /// reads the clock. `force_real` bypasses consistent timing.
    pub(crate) fn tick(&mut self, step: Option<u64>, force_real: bool) -> bool {
        if self.timer.inside_tick {
            return false;
        }
        let total = step.unwrap_or_else(|| self.elapsed_at(self.clock.now()));
        let config = self.timer.config;
        let mut delta =
            if config.consistent_timing && !self.timer.is_pause_timer_active && !force_real {
                u64::from(config.timing_interval_ms)
            } else {
                total.saturating_sub(self.timer.last_tick)
            };
        if config.slow_mode {
            delta = dilate(delta, config.slowdown_factor);
        }
        self.timer.last_tick = self.timer.last_tick.max(total);

        let mut advanced = 0;
        let mut skipped = 0;
        if delta != 0 {
            self.timer.inside_tick = true;
            self.timer.tick_index += 1;
            let snapshot = self.timer.animations.clone();
            self.tracer.tick(&TickEvent {
                tick_index: self.timer.tick_index,
                elapsed_ms: self.timer.last_tick,
                delta_ms: delta,
                animations: u32::try_from(snapshot.len()).unwrap_or(u32::MAX),
            });
            let step = u32::try_from(delta).unwrap_or(u32::MAX);
            for id in snapshot {
                if !self.store.is_alive(id)
                    || self.store.registration[id.idx as usize] != Registration::Live
                {
                    skipped += 1;
                    continue;
                }
                let i = id.idx as usize;
                let t = self.store.total_current_time[i];
                let next = match self.store.direction[i] {
                    Direction::Forward => t.saturating_add(step),
                    Direction::Backward => t.saturating_sub(step),
                };
                self.apply_current_time(id, next);
                advanced += 1;
            }
            self.timer.inside_tick = false;
        }

        let activated = if self.timer.start_stop_requested_at.is_some() {
            self.flush_start_stop()
        } else {
            self.restart_animation_timer();
            0
        };

        if delta != 0 {
            self.tracer.tick_summary(&TickSummary {
                tick_index: self.timer.tick_index,
                elapsed_ms: self.timer.last_tick,
                delta_ms: delta,
                advanced,
                skipped,
                activated,
                running_leaf: self.timer.running_leaf_animations,
                running_pause: u32::try_from(self.timer.running_pause_animations.len())
                    .unwrap_or(u32::MAX),
            });
            #[cfg(feature = "trace-rich")]
            self.tracer.flush_time_updates(self.timer.tick_index);
        }
        delta != 0
    }

    /// Chooses between the driver and the pause wakeup from the running
    /// counts.
    ///
    /// The driver keeps running while any top-level node is live, even if
    /// none of the running leaves is visible. Only [`go_idle`] stops it for
    /// good.
    ///
    /// [`go_idle`]: Self::go_idle
    pub(crate) fn restart_animation_timer(&mut self) {
        if self.timer.animations.is_empty() {
            return;
        }
        let now = self.clock.now();
        if self.timer.running_leaf_animations == 0
            && !self.timer.running_pause_animations.is_empty()
        {
            let closest = self.closest_pause_time_to_finish();
            self.driver.stop();
            self.timer.is_pause_timer_active = true;
            self.timer.pause_deadline =
                Some(now + Duration::from_millis(closest.into(), self.clock.timebase()));
            self.set_mode(TimerMode::PauseTimer, Some(closest.into()));
        } else if !self.driver.is_running() || self.timer.is_pause_timer_active {
            self.timer.is_pause_timer_active = false;
            self.timer.pause_deadline = None;
            self.driver.start(now);
            self.set_mode(TimerMode::Driver, None);
        }
    }

    /// Catches live nodes up with real time, but only while the pause wakeup
    /// stands in for regular ticks.
    pub(crate) fn ensure_timer_update_if_paused(&mut self) {
        if self.timer.is_pause_timer_active {
            self.tick(None, false);
        }
    }

    /// Re-arms the pause wakeup after something changed a pause node's
    /// remaining time.
    pub(crate) fn refresh_pause_timer(&mut self) {
        if self.timer.is_pause_timer_active && !self.timer.inside_tick {
            self.restart_animation_timer();
        }
    }

    fn closest_pause_time_to_finish(&self) -> u32 {
        self.timer
            .running_pause_animations
            .iter()
            .filter_map(|id| self.store.remaining_in_loop(id.idx))
            .min()
            .unwrap_or(0)
    }

    fn go_idle(&mut self) {
        debug_assert!(
            self.timer.animations.is_empty(),
            "going idle with live registrations"
        );
        self.driver.stop();
        self.timer.is_pause_timer_active = false;
        self.timer.pause_deadline = None;
        self.timer.time_origin = None;
        self.set_mode(TimerMode::Idle, None);
    }

    fn set_mode(&mut self, mode: TimerMode, wake_in_ms: Option<u64>) {
        if self.timer.mode == mode && mode != TimerMode::PauseTimer {
            return;
        }
        self.timer.mode = mode;
        self.tracer.timer_mode(&TimerModeEvent {
            mode,
            elapsed_ms: self.timer.last_tick,
            wake_in_ms,
        });
    }
}

/// Divides `delta` by `factor`, rounding to nearest.
fn dilate(delta: u64, factor: f32) -> u64 {
    if factor <= 0.0 {
        return 0;
    }
    #[expect(
        clippy::cast_possible_truncation,
        reason = "a dilated delta is never larger than the input"
    )]
    let scaled = (delta as f64 / f64::from(factor) + 0.5) as u64;
    scaled
}
