// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! Scheduler events go on thread 0. Each animation gets its own track
//! (thread `index + 1`) on which its running spans are drawn as
//! begin/end pairs.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use kinetic_core::animation::State;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
///
/// Timestamps are scheduler milliseconds, written as microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::Tick(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "Tick",
                    "cat": "Timer",
                    "ts": ms_to_us(e.elapsed_ms),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "tick_index": e.tick_index,
                        "delta_ms": e.delta_ms,
                        "animations": e.animations,
                    }
                }));
            }
            RecordedEvent::StateChange(e) => {
                let name = format!("{:?}", e.animation);
                let tid = u64::from(e.animation.index()) + 1;
                let ts = ms_to_us(e.elapsed_ms);
                if e.old == State::Running {
                    events.push(json!({
                        "ph": "E",
                        "name": name,
                        "cat": "Animation",
                        "ts": ts,
                        "pid": 0,
                        "tid": tid,
                    }));
                }
                if e.new == State::Running {
                    events.push(json!({
                        "ph": "B",
                        "name": name,
                        "cat": "Animation",
                        "ts": ts,
                        "pid": 0,
                        "tid": tid,
                    }));
                }
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.new),
                    "cat": "State",
                    "ts": ts,
                    "pid": 0,
                    "tid": tid,
                    "s": "t",
                    "args": {
                        "old": format!("{:?}", e.old),
                    }
                }));
            }
            RecordedEvent::TimerMode(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.mode),
                    "cat": "Mode",
                    "ts": ms_to_us(e.elapsed_ms),
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "wake_in_ms": e.wake_in_ms,
                    }
                }));
            }
            RecordedEvent::Registration(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": format!("{:?}", e.kind),
                    "cat": "Registration",
                    "ts": ms_to_us(e.elapsed_ms),
                    "pid": 0,
                    "tid": u64::from(e.animation.index()) + 1,
                    "s": "t",
                }));
            }
            RecordedEvent::TickSummary(s) => {
                events.push(json!({
                    "ph": "C",
                    "name": "Animations",
                    "cat": "Summary",
                    "ts": ms_to_us(s.elapsed_ms),
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "leaf": s.running_leaf,
                        "pause": s.running_pause,
                    }
                }));
                events.push(json!({
                    "ph": "i",
                    "name": "TickSummary",
                    "cat": "Summary",
                    "ts": ms_to_us(s.elapsed_ms),
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "tick_index": s.tick_index,
                        "delta_ms": s.delta_ms,
                        "advanced": s.advanced,
                        "skipped": s.skipped,
                        "activated": s.activated,
                    }
                }));
            }
            RecordedEvent::TimeUpdatesCount { tick_index, count } => {
                events.push(json!({
                    "ph": "i",
                    "name": "TimeUpdates",
                    "cat": "Rich",
                    "ts": 0,
                    "pid": 0,
                    "tid": 0,
                    "s": "p",
                    "args": {
                        "tick_index": tick_index,
                        "count": count,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ms_to_us(ms: u64) -> u64 {
    ms.saturating_mul(1000)
}
