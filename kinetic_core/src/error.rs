// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Errors reported by [`Animator`](crate::Animator) operations.
//!
//! Every error is a caller contract violation. The animator rejects the
//! operation and leaves its state untouched.

use thiserror::Error;

use crate::animation::AnimationId;

/// A rejected animation operation.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationError {
    /// The handle refers to a destroyed animation.
    #[error("stale animation handle {0:?}")]
    Stale(AnimationId),

    /// A loop count of zero was requested.
    #[error("loop count must not be zero")]
    InvalidLoopCount,

    /// The node is not a group, so it cannot have children.
    #[error("{0:?} is not a group")]
    NotAGroup(AnimationId),

    /// The node already belongs to a group.
    #[error("{0:?} already belongs to a group")]
    AlreadyInGroup(AnimationId),

    /// The node is not a child of the given group.
    #[error("{child:?} is not a child of {group:?}")]
    NotInGroup {
        /// The group that was named.
        group: AnimationId,
        /// The node that was expected in it.
        child: AnimationId,
    },

    /// Adding the child would make a group its own ancestor.
    #[error("adding {child:?} to {group:?} would create a cycle")]
    WouldCycle {
        /// The prospective group.
        group: AnimationId,
        /// The prospective child.
        child: AnimationId,
    },

    /// The group still has children and cannot be destroyed.
    #[error("{0:?} still has children")]
    HasChildren(AnimationId),

    /// The node must be stopped for this operation.
    #[error("{0:?} is not stopped")]
    NotStopped(AnimationId),
}
