// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation node data model.
//!
//! An *animation node* is either a leaf or a group. Each node has:
//!
//! - An identity ([`AnimationId`]), a generational handle that becomes stale
//!   when the node is destroyed.
//! - Topology: a parent group plus first-child and sibling links. Group
//!   children are kept in insertion order.
//! - A **behavior**: leaves carry a boxed [`Animation`] that reports its
//!   duration and receives time updates; groups carry a [`GroupKind`] and
//!   derive their duration from their children.
//! - **Timing state** owned by the animator: [`State`], [`Direction`],
//!   [`LoopCount`], current loop, current time, and total current time.
//!
//! Nodes live in struct-of-arrays storage inside the
//! [`Animator`](crate::Animator), which exposes every operation on them.
//!
//! # Dirty tracking
//!
//! Mutations mark the channels in [`dirty`](crate::dirty):
//!
//! - **DURATION** propagates from a child to every enclosing group, so a
//!   group's cached duration is recomputed when a descendant changes.
//! - **TIME** / **STATE** are local and feed [`TickChanges`].
//! - **TOPOLOGY** records creation, destruction, and membership edits.

mod behavior;
mod changes;
mod id;
mod kind;
pub(crate) mod notify;
pub(crate) mod store;
mod traverse;

pub use behavior::{Animation, Context, PauseAnimation};
pub use changes::TickChanges;
pub use id::{AnimationId, INVALID, ListenerId};
pub use kind::{Direction, GroupKind, LoopCount, State};
pub use notify::{Notification, NotifyKind};
pub use traverse::Children;
