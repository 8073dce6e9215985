// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation and listener identity types.

use core::fmt;

/// Sentinel value indicating "no node" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to an animation node in an [`Animator`](crate::Animator).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a node is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId {
    /// Slot index into the arena's arrays.
    pub(crate) idx: u32,
    /// Generation counter; must match the arena's generation for this slot.
    pub(crate) generation: u32,
}

impl AnimationId {
    /// Reassembles a handle from its parts (for decoding recorded traces).
    ///
    /// A handle built this way is only live if the arena still holds the
    /// same generation in that slot.
    #[inline]
    #[must_use]
    pub const fn from_raw(idx: u32, generation: u32) -> Self {
        Self { idx, generation }
    }

    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for AnimationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AnimationId({}@gen{})", self.idx, self.generation)
    }
}

/// A handle to a registered notification callback.
///
/// Returned by the `on_*` registration methods of
/// [`Animator`](crate::Animator); pass it to
/// [`remove_listener`](crate::Animator::remove_listener) to unregister.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub(crate) u64);

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}
