// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The animation arena uses multi-channel dirty tracking (via
//! [`understory_dirty`]) for two jobs: keeping cached group durations
//! coherent, and reporting what changed since the host last looked.
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`DURATION`] is marked with
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and has dependency edges
//!   from group to child. A duration change on a deeply nested node marks
//!   every enclosing group, whose cached duration is then recomputed
//!   children-first.
//!
//! - **Local-only**: [`TIME`] and [`STATE`] mark just the node whose current
//!   time was applied or whose state changed.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on group membership changes and
//!   on node creation/destruction.
//!
//! # Consumption
//!
//! [`DURATION`] is drained internally after every mutation that can change a
//! duration. The other channels are drained by
//! [`Animator::take_changes`](crate::Animator::take_changes) and surfaced as
//! [`TickChanges`](crate::animation::TickChanges).

use understory_dirty::Channel;

/// Per-loop or total duration may have changed; propagates to enclosing
/// groups.
pub const DURATION: Channel = Channel::new(0);

/// The node's current time was applied.
pub const TIME: Channel = Channel::new(1);

/// The node changed state.
pub const STATE: Channel = Channel::new(2);

/// Group membership changed, or a node was created or destroyed.
pub const TOPOLOGY: Channel = Channel::new(3);
