// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation timing for frame-synchronized user interfaces.
//!
//! `kinetic_core` runs trees of animations off a single clock. It is
//! `no_std` compatible (with `alloc`) and stores animation nodes in
//! struct-of-arrays storage addressed by generational handles.
//!
//! # Architecture
//!
//! The crate is organized around one explicitly constructed [`Animator`]
//! that the host event loop owns:
//!
//! ```text
//!   Host event loop
//!       │  poll() / on_frame_tick() / advance()
//!       ▼
//!   AnimationDriver ──► UnifiedTimer tick ──► delta
//!                                               │
//!                 ┌─────────────────────────────┘
//!                 ▼
//!   top-level nodes ──► groups ──► leaf Animation::update_current_time()
//!                                               │
//!                 ┌─────────────────────────────┘
//!                 ▼
//!   Notifications / TickChanges ──► host
//! ```
//!
//! **[`animation`]**: Node handles, node kinds, the [`Animation`] behavior
//! trait, and change reports.
//!
//! **[`Animator`]**: The state machine (start, pause, resume, stop, seek),
//! group topology, listeners, and the unified timer.
//!
//! **[`timer`]**: Tick pacing configuration and scheduler inspection.
//!
//! **[`driver`]**: The [`AnimationDriver`](driver::AnimationDriver) trait
//! plus an interval driver and a display-frame driver.
//!
//! **[`dirty`]**: Dirty channels via `understory_dirty`. Group durations
//! are cached and invalidated through dependency edges.
//!
//! **[`time`]** / **[`timing`]**: Host ticks, timebases, time sources, and
//! display frame ticks.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! scheduler instrumentation, with a zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node time
//!   update events.
//!
//! [`Animation`]: animation::Animation

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod animation;
mod animator;
pub mod dirty;
pub mod driver;
pub mod error;
mod group;
pub mod output;
pub mod time;
pub mod timer;
pub mod timing;
pub mod trace;

pub use animator::Animator;
