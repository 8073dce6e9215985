// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Rich time updates ([`on_time_updates`](TraceSink::on_time_updates)) store
//! only the count.

use kinetic_core::animation::{AnimationId, State};
use kinetic_core::trace::{
    RegistrationEvent, RegistrationKind, StateChangeEvent, TickEvent, TickSummary, TimeUpdate,
    TimerMode, TimerModeEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_TICK: u8 = 1;
const TAG_STATE_CHANGE: u8 = 2;
const TAG_TIMER_MODE: u8 = 3;
const TAG_REGISTRATION: u8 = 4;
const TAG_TICK_SUMMARY: u8 = 5;
const TAG_TIME_UPDATES_COUNT: u8 = 6;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// Discards everything recorded so far.
    pub fn clear(&mut self) {
        self.buf.clear();
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_option_u64(&mut self, v: Option<u64>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u64(val);
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_id(&mut self, id: AnimationId) {
        self.write_u32(id.index());
        self.write_u32(id.generation());
    }

    fn write_state(&mut self, s: State) {
        self.write_u8(s.code());
    }

    fn write_mode(&mut self, m: TimerMode) {
        self.write_u8(match m {
            TimerMode::Idle => 0,
            TimerMode::Driver => 1,
            TimerMode::PauseTimer => 2,
        });
    }

    fn write_registration_kind(&mut self, k: RegistrationKind) {
        self.write_u8(match k {
            RegistrationKind::Deferred => 0,
            RegistrationKind::Activated => 1,
            RegistrationKind::Unregistered => 2,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_tick(&mut self, e: &TickEvent) {
        self.write_u8(TAG_TICK);
        self.write_u64(e.tick_index);
        self.write_u64(e.elapsed_ms);
        self.write_u64(e.delta_ms);
        self.write_u32(e.animations);
    }

    fn on_state_change(&mut self, e: &StateChangeEvent) {
        self.write_u8(TAG_STATE_CHANGE);
        self.write_id(e.animation);
        self.write_state(e.old);
        self.write_state(e.new);
        self.write_u64(e.elapsed_ms);
    }

    fn on_timer_mode(&mut self, e: &TimerModeEvent) {
        self.write_u8(TAG_TIMER_MODE);
        self.write_mode(e.mode);
        self.write_u64(e.elapsed_ms);
        self.write_option_u64(e.wake_in_ms);
    }

    fn on_registration(&mut self, e: &RegistrationEvent) {
        self.write_u8(TAG_REGISTRATION);
        self.write_id(e.animation);
        self.write_registration_kind(e.kind);
        self.write_u64(e.elapsed_ms);
    }

    fn on_tick_summary(&mut self, s: &TickSummary) {
        self.write_u8(TAG_TICK_SUMMARY);
        self.write_u64(s.tick_index);
        self.write_u64(s.elapsed_ms);
        self.write_u64(s.delta_ms);
        self.write_u32(s.advanced);
        self.write_u32(s.skipped);
        self.write_u32(s.activated);
        self.write_u32(s.running_leaf);
        self.write_u32(s.running_pause);
    }

    fn on_time_updates(&mut self, tick_index: u64, updates: &[TimeUpdate]) {
        self.write_u8(TAG_TIME_UPDATES_COUNT);
        self.write_u64(tick_index);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "time update count capped at u32::MAX for recording"
        )]
        self.write_u32(updates.len().min(u32::MAX as usize) as u32);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`TickEvent`].
    Tick(TickEvent),
    /// A [`StateChangeEvent`].
    StateChange(StateChangeEvent),
    /// A [`TimerModeEvent`].
    TimerMode(TimerModeEvent),
    /// A [`RegistrationEvent`].
    Registration(RegistrationEvent),
    /// A [`TickSummary`].
    TickSummary(TickSummary),
    /// Time-update count for a tick.
    TimeUpdatesCount {
        /// Tick counter.
        tick_index: u64,
        /// Number of nodes whose time was applied.
        count: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first truncated or unrecognized record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_u8(&mut self) -> Option<u8> {
        if self.remaining() < 1 {
            return None;
        }
        let v = self.data[self.pos];
        self.pos += 1;
        Some(v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        if self.remaining() < 4 {
            return None;
        }
        let v = u32::from_le_bytes(self.data[self.pos..self.pos + 4].try_into().ok()?);
        self.pos += 4;
        Some(v)
    }

    fn read_u64(&mut self) -> Option<u64> {
        if self.remaining() < 8 {
            return None;
        }
        let v = u64::from_le_bytes(self.data[self.pos..self.pos + 8].try_into().ok()?);
        self.pos += 8;
        Some(v)
    }

    fn read_option_u64(&mut self) -> Option<Option<u64>> {
        let present = self.read_u8()?;
        let val = self.read_u64()?;
        Some(if present != 0 { Some(val) } else { None })
    }

    fn read_id(&mut self) -> Option<AnimationId> {
        let idx = self.read_u32()?;
        let generation = self.read_u32()?;
        Some(AnimationId::from_raw(idx, generation))
    }

    fn read_state(&mut self) -> Option<State> {
        State::from_code(self.read_u8()?)
    }

    fn read_mode(&mut self) -> Option<TimerMode> {
        Some(match self.read_u8()? {
            0 => TimerMode::Idle,
            1 => TimerMode::Driver,
            _ => TimerMode::PauseTimer,
        })
    }

    fn read_registration_kind(&mut self) -> Option<RegistrationKind> {
        Some(match self.read_u8()? {
            0 => RegistrationKind::Deferred,
            1 => RegistrationKind::Activated,
            _ => RegistrationKind::Unregistered,
        })
    }

    fn decode_tick(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Tick(TickEvent {
            tick_index: self.read_u64()?,
            elapsed_ms: self.read_u64()?,
            delta_ms: self.read_u64()?,
            animations: self.read_u32()?,
        }))
    }

    fn decode_state_change(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::StateChange(StateChangeEvent {
            animation: self.read_id()?,
            old: self.read_state()?,
            new: self.read_state()?,
            elapsed_ms: self.read_u64()?,
        }))
    }

    fn decode_timer_mode(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TimerMode(TimerModeEvent {
            mode: self.read_mode()?,
            elapsed_ms: self.read_u64()?,
            wake_in_ms: self.read_option_u64()?,
        }))
    }

    fn decode_registration(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Registration(RegistrationEvent {
            animation: self.read_id()?,
            kind: self.read_registration_kind()?,
            elapsed_ms: self.read_u64()?,
        }))
    }

    fn decode_tick_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::TickSummary(TickSummary {
            tick_index: self.read_u64()?,
            elapsed_ms: self.read_u64()?,
            delta_ms: self.read_u64()?,
            advanced: self.read_u32()?,
            skipped: self.read_u32()?,
            activated: self.read_u32()?,
            running_leaf: self.read_u32()?,
            running_pause: self.read_u32()?,
        }))
    }

    fn decode_time_updates_count(&mut self) -> Option<RecordedEvent> {
        let tick_index = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::TimeUpdatesCount { tick_index, count })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_TICK => self.decode_tick(),
            TAG_STATE_CHANGE => self.decode_state_change(),
            TAG_TIMER_MODE => self.decode_timer_mode(),
            TAG_REGISTRATION => self.decode_registration(),
            TAG_TICK_SUMMARY => self.decode_tick_summary(),
            TAG_TIME_UPDATES_COUNT => self.decode_time_updates_count(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
