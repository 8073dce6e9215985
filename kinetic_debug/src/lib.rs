// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, and Chrome trace export for kinetic
//! scheduler diagnostics.
//!
//! This crate provides [`TraceSink`](kinetic_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//!
//! Sinks are moved into the animator. To read a recording back afterwards,
//! install it as an `Rc<RefCell<RecorderSink>>` and keep a clone.

pub mod chrome;
pub mod pretty;
pub mod recorder;
