// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! POSIX backend for kinetic.
//!
//! This crate provides host integration for a plain POSIX process:
//!
//! - [`MonotonicClock`], a [`TimeSource`](kinetic_core::time::TimeSource)
//!   backed by `clock_gettime`
//! - [`HostLoop`], a blocking loop that sleeps until
//!   [`Animator::next_wakeup`](kinetic_core::Animator::next_wakeup) and then
//!   polls the animator
//!
//! Display-synchronized hosts install a
//! [`VsyncDriver`](kinetic_core::driver::VsyncDriver) and feed frame ticks
//! instead; the vsync driver never schedules wakeups of its own.

mod host_loop;
mod time;

pub use host_loop::{HostLoop, LoopStats, Sleep, ThreadSleep, Turn};
pub use time::{MonotonicClock, now, timebase};
