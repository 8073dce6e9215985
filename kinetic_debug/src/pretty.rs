// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Times are
//! scheduler milliseconds since the timer's origin.

use std::io::Write;

use kinetic_core::animation::State;
use kinetic_core::trace::{
    RegistrationEvent, RegistrationKind, StateChangeEvent, TickEvent, TickSummary, TimeUpdate,
    TimerMode, TimerModeEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}

fn state_name(state: State) -> &'static str {
    match state {
        State::Stopped => "stopped",
        State::Paused => "paused",
        State::Running => "running",
    }
}

fn mode_name(mode: TimerMode) -> &'static str {
    match mode {
        TimerMode::Idle => "idle",
        TimerMode::Driver => "driver",
        TimerMode::PauseTimer => "pause-timer",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_tick(&mut self, e: &TickEvent) {
        let _ = writeln!(
            self.writer,
            "[tick] #{} at={}ms delta={}ms animations={}",
            e.tick_index, e.elapsed_ms, e.delta_ms, e.animations,
        );
    }

    fn on_state_change(&mut self, e: &StateChangeEvent) {
        let _ = writeln!(
            self.writer,
            "[state] {:?} {} -> {} at={}ms",
            e.animation,
            state_name(e.old),
            state_name(e.new),
            e.elapsed_ms,
        );
    }

    fn on_timer_mode(&mut self, e: &TimerModeEvent) {
        match e.wake_in_ms {
            Some(wake) => {
                let _ = writeln!(
                    self.writer,
                    "[mode] {} at={}ms wake_in={wake}ms",
                    mode_name(e.mode),
                    e.elapsed_ms,
                );
            }
            None => {
                let _ = writeln!(
                    self.writer,
                    "[mode] {} at={}ms",
                    mode_name(e.mode),
                    e.elapsed_ms,
                );
            }
        }
    }

    fn on_registration(&mut self, e: &RegistrationEvent) {
        let kind = match e.kind {
            RegistrationKind::Deferred => "deferred",
            RegistrationKind::Activated => "activated",
            RegistrationKind::Unregistered => "unregistered",
        };
        let _ = writeln!(
            self.writer,
            "[register] {:?} {kind} at={}ms",
            e.animation, e.elapsed_ms,
        );
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        let _ = writeln!(
            self.writer,
            "[summary] #{} advanced={} skipped={} activated={} leaf={} pause={}",
            s.tick_index, s.advanced, s.skipped, s.activated, s.running_leaf, s.running_pause,
        );
    }

    fn on_time_updates(&mut self, tick_index: u64, updates: &[TimeUpdate]) {
        let _ = writeln!(
            self.writer,
            "[times] #{tick_index} updates={}",
            updates.len(),
        );
    }
}
