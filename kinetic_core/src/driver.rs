// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pluggable tick sources for the unified timer.
//!
//! An [`AnimationDriver`] decides *when* the animator ticks. The animator
//! owns exactly one driver at a time: [`DefaultDriver`] paces itself from a
//! fixed interval and is polled by the host, [`VsyncDriver`] ticks only when
//! a display [`FrameTick`] arrives.
//!
//! The animator starts the driver while leaf animations run and stops it
//! when nothing needs per-frame updates.

use alloc::boxed::Box;
use core::fmt;

use crate::Animator;
use crate::output::OutputId;
use crate::time::{Duration, HostTime};
use crate::timing::FrameTick;

/// A source of animation ticks.
pub trait AnimationDriver: fmt::Debug {
    /// Begins ticking.
    fn start(&mut self, now: HostTime);

    /// Stops ticking.
    fn stop(&mut self);

    /// Whether the driver is currently ticking.
    fn is_running(&self) -> bool;

    /// When a self-scheduled driver next wants to tick.
    fn next_tick(&self) -> Option<HostTime> {
        None
    }

    /// Returns `true` if a self-scheduled tick is due at `now`.
    fn poll(&mut self, now: HostTime) -> bool {
        _ = now;
        false
    }

    /// Offers a display frame. Returns the time the animations should be
    /// advanced to, or `None` to ignore the frame.
    fn frame_tick(&mut self, tick: &FrameTick) -> Option<HostTime> {
        _ = tick;
        None
    }

    /// Changes the nominal tick period.
    fn set_interval(&mut self, interval: Duration) {
        _ = interval;
    }
}

/// Recurring interval timer, polled by the host.
#[derive(Clone, Copy, Debug)]
pub struct DefaultDriver {
    interval: Duration,
    next: Option<HostTime>,
}

impl DefaultDriver {
    /// Creates a stopped driver ticking every `interval`.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: None,
        }
    }

    /// The tick period.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

impl AnimationDriver for DefaultDriver {
    fn start(&mut self, now: HostTime) {
        self.next = Some(now + self.interval);
    }

    fn stop(&mut self) {
        self.next = None;
    }

    fn is_running(&self) -> bool {
        self.next.is_some()
    }

    fn next_tick(&self) -> Option<HostTime> {
        self.next
    }

    fn poll(&mut self, now: HostTime) -> bool {
        let Some(next) = self.next else {
            return false;
        };
        if now < next {
            return false;
        }
        // Missed ticks collapse into one.
        let period = self.interval.ticks().max(1);
        let behind = now.saturating_duration_since(next).ticks() / period;
        self.next = Some(HostTime(next.ticks() + (behind + 1) * period));
        true
    }

    fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}

/// Ticks once per presented display frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct VsyncDriver {
    output: Option<OutputId>,
    running: bool,
    last_frame: Option<u64>,
}

impl VsyncDriver {
    /// Accepts frames from any output.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            output: None,
            running: false,
            last_frame: None,
        }
    }

    /// Accepts frames from `output` only.
    #[must_use]
    pub const fn for_output(output: OutputId) -> Self {
        Self {
            output: Some(output),
            running: false,
            last_frame: None,
        }
    }
}

impl AnimationDriver for VsyncDriver {
    fn start(&mut self, _now: HostTime) {
        self.running = true;
        self.last_frame = None;
    }

    fn stop(&mut self) {
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn frame_tick(&mut self, tick: &FrameTick) -> Option<HostTime> {
        if !self.running || self.output.is_some_and(|o| o != tick.output) {
            return None;
        }
        if self.last_frame.is_some_and(|last| tick.frame_index <= last) {
            return None;
        }
        self.last_frame = Some(tick.frame_index);
        Some(tick.target_time())
    }
}

impl Animator {
    /// The installed driver.
    #[must_use]
    pub fn driver(&self) -> &dyn AnimationDriver {
        self.driver.as_ref()
    }

    /// Replaces the driver and returns the previous one.
    ///
    /// If the previous driver was running it is stopped and the new one is
    /// started in its place.
    pub fn install_driver(&mut self, driver: Box<dyn AnimationDriver>) -> Box<dyn AnimationDriver> {
        let mut old = core::mem::replace(&mut self.driver, driver);
        if old.is_running() {
            old.stop();
            self.driver.start(self.clock.now());
        }
        old
    }

    /// Reinstalls a [`DefaultDriver`] at the configured interval and
    /// returns the driver it replaces.
    pub fn uninstall_driver(&mut self) -> Box<dyn AnimationDriver> {
        let interval = Duration::from_millis(
            self.timer.config.timing_interval_ms.into(),
            self.clock.timebase(),
        );
        self.install_driver(Box::new(DefaultDriver::new(interval)))
    }

    /// Milliseconds elapsed on the scheduler's clock since it was started.
    ///
    /// Zero while nothing has been registered since the last idle period.
    #[must_use]
    pub fn elapsed(&self) -> u64 {
        self.elapsed_at(self.clock.now())
    }

    /// Feeds a display frame to the driver. Returns whether a tick ran.
    pub fn on_frame_tick(&mut self, tick: &FrameTick) -> bool {
        let Some(target) = self.driver.frame_tick(tick) else {
            return false;
        };
        self.flush_start_stop();
        let elapsed = self.elapsed_at(target);
        self.tick(Some(elapsed), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::State;
    use crate::animator::tests::{Recording, animator};
    use crate::time::{ManualClock, TimeSource, Timebase};
    use crate::timing::TimingConfidence;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n, Timebase::NANOS)
    }

    fn frame(index: u64, now_ms: u64, present_ms: u64) -> FrameTick {
        FrameTick {
            now: HostTime(0) + ms(now_ms),
            predicted_present: Some(HostTime(0) + ms(present_ms)),
            refresh_interval: Some(ms(16).ticks()),
            confidence: TimingConfidence::Predictive,
            frame_index: index,
            output: OutputId(0),
        }
    }

    #[test]
    fn default_driver_collapses_missed_ticks() {
        let mut d = DefaultDriver::new(ms(16));
        assert!(!d.poll(HostTime(0)), "stopped");
        d.start(HostTime(0));
        assert!(!d.poll(HostTime(0) + ms(10)));
        assert!(d.poll(HostTime(0) + ms(16)));
        assert_eq!(d.next_tick(), Some(HostTime(0) + ms(32)));
        assert!(d.poll(HostTime(0) + ms(100)));
        assert_eq!(d.next_tick(), Some(HostTime(0) + ms(112)));
        d.stop();
        assert_eq!(d.next_tick(), None);
    }

    #[test]
    fn polling_default_driver_advances_animations() {
        let (mut a, clock) = animator();
        let id = a.create(Recording::new(1_000));
        a.start(id).unwrap();
        a.poll();
        clock.advance_millis(10);
        assert!(!a.poll());
        clock.advance_millis(10);
        assert!(a.poll());
        assert_eq!(a.current_time(id), Some(20));
    }

    #[test]
    fn vsync_driver_filters_frames() {
        let mut d = VsyncDriver::for_output(OutputId(0));
        assert_eq!(d.frame_tick(&frame(1, 0, 16)), None, "stopped");
        d.start(HostTime(0));
        assert_eq!(d.frame_tick(&frame(1, 0, 16)), Some(HostTime(0) + ms(16)));
        assert_eq!(d.frame_tick(&frame(1, 0, 16)), None, "duplicate");
        let mut other = frame(2, 16, 32);
        other.output = OutputId(1);
        assert_eq!(d.frame_tick(&other), None, "other output");
        let mut pacing = frame(3, 40, 48);
        pacing.confidence = TimingConfidence::PacingOnly;
        assert_eq!(d.frame_tick(&pacing), Some(HostTime(0) + ms(40)));
    }

    #[test]
    fn frame_ticks_drive_installed_vsync_driver() {
        let (mut a, _) = animator();
        let old = a.install_driver(Box::new(VsyncDriver::new()));
        assert!(!old.is_running());
        let id = a.create(Recording::new(1_000));
        a.start(id).unwrap();
        a.poll();
        assert!(a.driver().is_running());
        assert_eq!(a.next_wakeup(), None, "vsync is not self-scheduled");

        assert!(a.on_frame_tick(&frame(1, 0, 16)));
        assert_eq!(a.current_time(id), Some(16));
        assert!(a.on_frame_tick(&frame(2, 16, 33)));
        assert_eq!(a.current_time(id), Some(33));
        assert!(!a.on_frame_tick(&frame(2, 16, 33)));
    }

    #[test]
    fn install_transfers_running_state() {
        let (mut a, _) = animator();
        let id = a.create(Recording::new(1_000));
        a.start(id).unwrap();
        a.poll();
        let old = a.install_driver(Box::new(VsyncDriver::new()));
        assert!(!old.is_running());
        assert!(a.driver().is_running());
        let vsync = a.uninstall_driver();
        assert!(!vsync.is_running());
        assert!(a.driver().is_running());
        assert_eq!(a.state(id), Some(State::Running));
    }

    #[test]
    fn elapsed_counts_from_first_start() {
        let (mut a, clock) = animator();
        clock.advance_millis(500);
        assert_eq!(a.elapsed(), 0, "never started");
        let id = a.create(Recording::new(1_000));
        a.start(id).unwrap();
        a.poll();
        clock.advance_millis(30);
        assert_eq!(a.elapsed(), 30);
        a.stop(id).unwrap();
        a.poll();
        assert_eq!(a.elapsed(), 0, "idle resets the origin");
    }

    #[test]
    fn timing_interval_reaches_default_driver() {
        let clock = ManualClock::default();
        let mut a = Animator::new(clock.clone());
        a.set_timing_interval(40);
        let id = a.create(Recording::new(1_000));
        a.start(id).unwrap();
        a.poll();
        assert_eq!(
            a.next_wakeup(),
            Some(clock.now() + Duration::from_millis(40, clock.timebase()))
        );
    }
}
