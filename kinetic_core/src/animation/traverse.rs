// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Group traversal utilities.

use super::id::{AnimationId, INVALID};
use super::store::AnimationStore;

/// An iterator over the direct children of a group, in play order.
///
/// Created by [`Animator::children`](crate::Animator::children).
#[derive(Debug)]
pub struct Children<'a> {
    store: &'a AnimationStore,
    current: u32,
}

impl<'a> Children<'a> {
    pub(crate) fn new(store: &'a AnimationStore, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }

    pub(crate) fn empty(store: &'a AnimationStore) -> Self {
        Self::new(store, INVALID)
    }
}

impl Iterator for Children<'_> {
    type Item = AnimationId;

    fn next(&mut self) -> Option<AnimationId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(self.store.handle(idx))
    }
}
