// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The leaf animation contract.

use core::any::Any;
use core::fmt;

use super::id::AnimationId;
use super::kind::{Direction, State};
use crate::Animator;

/// Behavior of a leaf animation node.
///
/// A leaf reports its per-loop duration and applies its effect whenever the
/// scheduler (or an enclosing group) moves it to a new point in its
/// timeline. Hooks receive a [`Context`] that gives mutable access to the
/// whole [`Animator`], so a hook may start, stop, or create other nodes, or
/// stop its own node.
///
/// While a hook runs, its behavior is detached from the arena. Re-entrant
/// calls that would invoke a hook of the *same* node are skipped.
pub trait Animation: Any + fmt::Debug {
    /// Per-loop duration in milliseconds, or `None` when undefined/infinite.
    ///
    /// The value is sampled when the node is created and whenever it is
    /// mutated through [`Animator::with_animation_mut`].
    fn duration(&self) -> Option<u32>;

    /// Applies the animation's effect at `current_time` milliseconds into the
    /// current loop.
    fn update_current_time(&mut self, cx: &mut Context<'_>, current_time: u32);

    /// Called after the node's state changed from `old` to `new`.
    fn update_state(&mut self, cx: &mut Context<'_>, new: State, old: State) {
        _ = (cx, new, old);
    }

    /// Called after the node's direction changed.
    fn update_direction(&mut self, direction: Direction) {
        _ = direction;
    }

    /// Whether this animation only marks the passage of time.
    ///
    /// Pause animations need no per-frame updates, which lets the scheduler
    /// sleep until the soonest one finishes.
    fn is_pause(&self) -> bool {
        false
    }
}

/// Access to the animator from inside an [`Animation`] hook.
pub struct Context<'a> {
    animator: &'a mut Animator,
    id: AnimationId,
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<'a> Context<'a> {
    pub(crate) fn new(animator: &'a mut Animator, id: AnimationId) -> Self {
        Self { animator, id }
    }

    /// The node whose hook is running.
    #[must_use]
    pub fn id(&self) -> AnimationId {
        self.id
    }

    /// The animator that owns the node.
    pub fn animator(&mut self) -> &mut Animator {
        self.animator
    }
}

/// An animation whose only effect is the passage of time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PauseAnimation {
    duration: u32,
}

impl PauseAnimation {
    /// Creates a pause lasting `duration` milliseconds per loop.
    #[must_use]
    pub const fn new(duration: u32) -> Self {
        Self { duration }
    }

    /// Changes the per-loop duration.
    pub fn set_duration(&mut self, duration: u32) {
        self.duration = duration;
    }
}

impl Animation for PauseAnimation {
    fn duration(&self) -> Option<u32> {
        Some(self.duration)
    }

    fn update_current_time(&mut self, cx: &mut Context<'_>, current_time: u32) {
        _ = (cx, current_time);
    }

    fn is_pause(&self) -> bool {
        true
    }
}
