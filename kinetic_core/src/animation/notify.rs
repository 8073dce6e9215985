// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Typed notification channels.
//!
//! Each node carries an ordered list of listeners. A listener subscribes to
//! exactly one [`NotifyKind`] and receives the animator mutably, so it may
//! start or stop other nodes (or its own). Listeners are dispatched from a
//! snapshot: listeners added during dispatch fire from the next notification
//! on, removed ones stop firing immediately, and a listener is never
//! re-entered by a notification it caused.

use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;

use super::id::{AnimationId, ListenerId};
use super::kind::{Direction, State};
use crate::Animator;

/// A notification delivered to listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notification {
    /// The node reached the end of its timeline and stopped by itself.
    Finished,
    /// The node transitioned between states.
    StateChanged {
        /// State after the transition.
        new: State,
        /// State before the transition.
        old: State,
    },
    /// The node entered a different loop.
    CurrentLoopChanged(u32),
    /// The node's direction changed.
    DirectionChanged(Direction),
}

impl Notification {
    /// The channel this notification is delivered on.
    #[must_use]
    pub const fn kind(&self) -> NotifyKind {
        match self {
            Self::Finished => NotifyKind::Finished,
            Self::StateChanged { .. } => NotifyKind::StateChanged,
            Self::CurrentLoopChanged(_) => NotifyKind::CurrentLoopChanged,
            Self::DirectionChanged(_) => NotifyKind::DirectionChanged,
        }
    }
}

/// A notification channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotifyKind {
    /// See [`Notification::Finished`].
    Finished,
    /// See [`Notification::StateChanged`].
    StateChanged,
    /// See [`Notification::CurrentLoopChanged`].
    CurrentLoopChanged,
    /// See [`Notification::DirectionChanged`].
    DirectionChanged,
}

pub(crate) type Callback = dyn FnMut(&mut Animator, AnimationId, &Notification);

pub(crate) struct Listener {
    pub(crate) id: ListenerId,
    pub(crate) kind: NotifyKind,
    pub(crate) callback: Rc<RefCell<Box<Callback>>>,
}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}
