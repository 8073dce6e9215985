// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays animation storage with allocation, topology, and the
//! cached duration tree.

use alloc::boxed::Box;
use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use super::behavior::Animation;
use super::id::{AnimationId, INVALID};
use super::kind::{Direction, GroupKind, LoopCount, State};
use super::notify::Listener;
use super::traverse::Children;
use crate::dirty;
use crate::error::AnimationError;

/// What a slot holds.
#[derive(Debug)]
pub(crate) enum Body {
    /// A leaf. `None` while its behavior is detached to run a hook.
    Leaf(Option<Box<dyn Animation>>),
    /// A group of children.
    Group(GroupKind),
}

/// A node's standing with the unified timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Registration {
    /// Not registered as a top-level animation.
    #[default]
    None,
    /// Queued to join the live set after the current tick.
    Pending,
    /// In the live set; advanced on every tick.
    Live,
}

/// Struct-of-arrays storage for all animation nodes.
///
/// Nodes are addressed by [`AnimationId`] handles. Internally, each node
/// occupies a slot in parallel arrays. Destroyed nodes are recycled via a
/// free list, and generation counters prevent stale handle access.
#[derive(Debug)]
pub(crate) struct AnimationStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Behavior --
    pub(crate) body: Vec<Body>,
    pub(crate) is_pause: Vec<bool>,

    // -- Timeline --
    pub(crate) state: Vec<State>,
    pub(crate) direction: Vec<Direction>,
    pub(crate) loop_count: Vec<LoopCount>,
    pub(crate) current_loop: Vec<u32>,
    pub(crate) current_time: Vec<u32>,
    pub(crate) total_current_time: Vec<u32>,
    pub(crate) registration: Vec<Registration>,

    // -- Group propagation bookkeeping --
    pub(crate) last_loop: Vec<u32>,
    pub(crate) last_current_time: Vec<u32>,
    pub(crate) current_child: Vec<u32>,

    // -- Cached per-loop durations --
    pub(crate) duration: Vec<Option<u32>>,
    pub(crate) duration_stale: Vec<bool>,

    // -- Observers --
    pub(crate) listeners: Vec<Vec<Listener>>,
    pub(crate) next_listener: u64,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl AnimationStore {
    pub(crate) fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            body: Vec::new(),
            is_pause: Vec::new(),
            state: Vec::new(),
            direction: Vec::new(),
            loop_count: Vec::new(),
            current_loop: Vec::new(),
            current_time: Vec::new(),
            total_current_time: Vec::new(),
            registration: Vec::new(),
            last_loop: Vec::new(),
            last_current_time: Vec::new(),
            current_child: Vec::new(),
            duration: Vec::new(),
            duration_stale: Vec::new(),
            listeners: Vec::new(),
            next_listener: 0,
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation --

    /// Allocates a slot for `body` and returns its handle.
    ///
    /// The node starts Stopped, Forward, looping once, at time zero.
    pub(crate) fn alloc(&mut self, body: Body) -> AnimationId {
        let is_pause = matches!(&body, Body::Leaf(Some(b)) if b.is_pause());
        let idx = if let Some(idx) = self.free_list.pop() {
            let i = idx as usize;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.body[i] = body;
            self.is_pause[i] = is_pause;
            self.state[i] = State::Stopped;
            self.direction[i] = Direction::Forward;
            self.loop_count[i] = LoopCount::ONCE;
            self.current_loop[i] = 0;
            self.current_time[i] = 0;
            self.total_current_time[i] = 0;
            self.registration[i] = Registration::None;
            self.last_loop[i] = 0;
            self.last_current_time[i] = 0;
            self.current_child[i] = INVALID;
            self.duration[i] = None;
            self.duration_stale[i] = true;
            self.listeners[i].clear();
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.body.push(body);
            self.is_pause.push(is_pause);
            self.state.push(State::Stopped);
            self.direction.push(Direction::Forward);
            self.loop_count.push(LoopCount::ONCE);
            self.current_loop.push(0);
            self.current_time.push(0);
            self.total_current_time.push(0);
            self.registration.push(Registration::None);
            self.last_loop.push(0);
            self.last_current_time.push(0);
            self.current_child.push(INVALID);
            self.duration.push(None);
            self.duration_stale.push(true);
            self.listeners.push(Vec::new());
            self.generation.push(0);
            self.alive.push(true);
            idx
        };

        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
        self.invalidate_duration(idx);
        self.handle(idx)
    }

    /// Frees a detached, childless slot.
    pub(crate) fn free(&mut self, idx: u32) {
        let i = idx as usize;
        debug_assert!(
            self.parent[i] == INVALID && self.first_child[i] == INVALID,
            "freeing an attached node"
        );
        self.dirty.remove_key(idx);
        self.body[i] = Body::Leaf(None);
        self.listeners[i].clear();
        self.alive[i] = false;
        // Bump generation so old handles immediately fail validation.
        self.generation[i] = self.generation[i].wrapping_add(1);
        self.free_list.push(idx);
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the handle refers to a live node.
    pub(crate) fn is_alive(&self, id: AnimationId) -> bool {
        id.idx < self.len
            && self.alive[id.idx as usize]
            && self.generation[id.idx as usize] == id.generation
    }

    /// Returns the slot index of a live handle.
    pub(crate) fn validate(&self, id: AnimationId) -> Result<u32, AnimationError> {
        if self.is_alive(id) {
            Ok(id.idx)
        } else {
            Err(AnimationError::Stale(id))
        }
    }

    /// Returns the current handle for a live slot.
    pub(crate) fn handle(&self, idx: u32) -> AnimationId {
        AnimationId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    // -- Topology --

    /// Appends `child` to `group`'s child list.
    pub(crate) fn link_last(&mut self, group: u32, child: u32) {
        let (g, c) = (group as usize, child as usize);
        self.parent[c] = group;
        self.prev_sibling[c] = INVALID;
        self.next_sibling[c] = INVALID;

        if self.first_child[g] == INVALID {
            self.first_child[g] = child;
        } else {
            // Walk to last child.
            let mut last = self.first_child[g];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = child;
            self.prev_sibling[c] = last;
        }
        self.after_link(group, child);
    }

    /// Inserts `child` before `sibling` in `sibling`'s group.
    pub(crate) fn link_before(&mut self, child: u32, sibling: u32) {
        let (c, s) = (child as usize, sibling as usize);
        let group = self.parent[s];
        self.parent[c] = group;
        self.next_sibling[c] = sibling;
        self.prev_sibling[c] = self.prev_sibling[s];

        if self.prev_sibling[s] != INVALID {
            self.next_sibling[self.prev_sibling[s] as usize] = child;
        } else {
            // `sibling` was the first child.
            self.first_child[group as usize] = child;
        }
        self.prev_sibling[s] = child;
        self.after_link(group, child);
    }

    fn after_link(&mut self, group: u32, child: u32) {
        // The group's duration depends on the child's total duration.
        let _ = self.dirty.add_dependency(group, child, dirty::DURATION);
        self.dirty.mark(group, dirty::TOPOLOGY);
        self.invalidate_duration(group);
    }

    /// Removes `child` from its group's child list.
    pub(crate) fn unlink(&mut self, child: u32) {
        let c = child as usize;
        let group = self.parent[c];
        let prev = self.prev_sibling[c];
        let next = self.next_sibling[c];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[group as usize] = next;
        }
        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }
        if self.current_child[group as usize] == child {
            self.current_child[group as usize] = INVALID;
        }

        self.parent[c] = INVALID;
        self.prev_sibling[c] = INVALID;
        self.next_sibling[c] = INVALID;

        self.dirty.remove_dependency(group, child, dirty::DURATION);
        self.dirty.mark(group, dirty::TOPOLOGY);
        self.invalidate_duration(group);
    }

    /// Returns whether `ancestor` is `idx` or encloses it.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: u32, idx: u32) -> bool {
        let mut cur = idx;
        while cur != INVALID {
            if cur == ancestor {
                return true;
            }
            cur = self.parent[cur as usize];
        }
        false
    }

    /// Returns an iterator over the direct children of a slot.
    pub(crate) fn children_of(&self, idx: u32) -> Children<'_> {
        Children::new(self, self.first_child[idx as usize])
    }

    /// Returns a snapshot of the direct children of a slot.
    pub(crate) fn child_ids(&self, idx: u32) -> Vec<AnimationId> {
        self.children_of(idx).collect()
    }

    pub(crate) fn group_kind(&self, idx: u32) -> Option<GroupKind> {
        match self.body[idx as usize] {
            Body::Group(kind) => Some(kind),
            Body::Leaf(_) => None,
        }
    }

    // -- Durations --

    /// Marks `idx` and every enclosing group as needing a duration refresh,
    /// then refreshes.
    pub(crate) fn invalidate_duration(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::DURATION, &EagerPolicy);
        self.refresh_durations();
    }

    /// Recomputes every stale cached duration, children first.
    pub(crate) fn refresh_durations(&mut self) {
        let affected: Vec<u32> = self
            .dirty
            .drain(dirty::DURATION)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &affected {
            if self.alive[idx as usize] {
                self.duration_stale[idx as usize] = true;
            }
        }
        for &idx in &affected {
            if self.alive[idx as usize] {
                self.fill_duration(idx);
            }
        }
    }

    fn fill_duration(&mut self, idx: u32) -> Option<u32> {
        let i = idx as usize;
        if !self.duration_stale[i] {
            return self.duration[i];
        }
        let d = match &self.body[i] {
            Body::Leaf(Some(b)) => b.duration(),
            // Detached to run a hook; keep the last sampled value.
            Body::Leaf(None) => self.duration[i],
            Body::Group(kind) => {
                let kind = *kind;
                let mut acc = Some(0_u32);
                let mut c = self.first_child[i];
                while c != INVALID {
                    self.fill_duration(c);
                    acc = match (acc, self.total_duration_at(c)) {
                        (Some(a), Some(t)) => Some(match kind {
                            GroupKind::Parallel => a.max(t),
                            GroupKind::Sequential => a.saturating_add(t),
                        }),
                        _ => None,
                    };
                    c = self.next_sibling[c as usize];
                }
                acc
            }
        };
        self.duration[i] = d;
        self.duration_stale[i] = false;
        d
    }

    /// Per-loop duration of a slot.
    pub(crate) fn duration_at(&self, idx: u32) -> Option<u32> {
        self.duration[idx as usize]
    }

    /// Duration across all loops; `None` when infinite.
    ///
    /// Zero per-loop duration is zero in total, unless the node loops
    /// forever.
    pub(crate) fn total_duration_at(&self, idx: u32) -> Option<u32> {
        let i = idx as usize;
        match (self.duration[i], self.loop_count[i]) {
            (_, LoopCount::Infinite) | (None, _) => None,
            (Some(d), LoopCount::Finite(n)) => Some(d.saturating_mul(n.get())),
        }
    }

    /// Milliseconds until the node reaches the end of its current loop in its
    /// direction of travel.
    pub(crate) fn remaining_in_loop(&self, idx: u32) -> Option<u32> {
        let i = idx as usize;
        match self.direction[i] {
            Direction::Forward => self
                .duration[i]
                .map(|d| d.saturating_sub(self.current_time[i])),
            Direction::Backward => Some(self.current_time[i]),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::PauseAnimation;

    fn pause(store: &mut AnimationStore, ms: u32) -> AnimationId {
        store.alloc(Body::Leaf(Some(Box::new(PauseAnimation::new(ms)))))
    }

    #[test]
    fn alloc_and_free() {
        let mut store = AnimationStore::new();
        let id = pause(&mut store, 10);
        assert!(store.is_alive(id));
        assert!(store.is_pause[id.idx as usize]);
        store.free(id.idx);
        assert!(!store.is_alive(id));
        assert_eq!(store.validate(id), Err(AnimationError::Stale(id)));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = AnimationStore::new();
        let id1 = pause(&mut store, 10);
        store.free(id1.idx);
        let id2 = pause(&mut store, 20);
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn raw_handle_to_freed_slot_is_stale() {
        let mut store = AnimationStore::new();
        let id = pause(&mut store, 10);
        store.free(id.idx);
        let forged = AnimationId::from_raw(id.idx, store.generation[id.idx as usize]);
        assert!(!store.is_alive(forged));
    }

    #[test]
    fn sequential_duration_sums_and_tracks_children() {
        let mut store = AnimationStore::new();
        let group = store.alloc(Body::Group(GroupKind::Sequential));
        let a = pause(&mut store, 100);
        let b = pause(&mut store, 250);
        assert_eq!(store.duration_at(group.idx), Some(0), "empty group");

        store.link_last(group.idx, a.idx);
        store.link_last(group.idx, b.idx);
        assert_eq!(store.duration_at(group.idx), Some(350));

        store.loop_count[a.idx as usize] = LoopCount::from_raw(3).unwrap();
        store.invalidate_duration(a.idx);
        assert_eq!(store.duration_at(group.idx), Some(550));

        store.unlink(b.idx);
        assert_eq!(store.duration_at(group.idx), Some(300));
    }

    #[test]
    fn parallel_duration_is_max() {
        let mut store = AnimationStore::new();
        let group = store.alloc(Body::Group(GroupKind::Parallel));
        let a = pause(&mut store, 100);
        let b = pause(&mut store, 250);
        store.link_last(group.idx, a.idx);
        store.link_last(group.idx, b.idx);
        assert_eq!(store.duration_at(group.idx), Some(250));
    }

    #[test]
    fn infinite_child_makes_group_infinite() {
        let mut store = AnimationStore::new();
        let group = store.alloc(Body::Group(GroupKind::Parallel));
        let a = pause(&mut store, 100);
        store.link_last(group.idx, a.idx);
        store.loop_count[a.idx as usize] = LoopCount::Infinite;
        store.invalidate_duration(a.idx);
        assert_eq!(store.total_duration_at(a.idx), None);
        assert_eq!(store.duration_at(group.idx), None);
    }

    #[test]
    fn nested_invalidation_reaches_every_ancestor() {
        let mut store = AnimationStore::new();
        let outer = store.alloc(Body::Group(GroupKind::Sequential));
        let inner = store.alloc(Body::Group(GroupKind::Parallel));
        let leaf = pause(&mut store, 40);
        let tail = pause(&mut store, 10);
        store.link_last(inner.idx, leaf.idx);
        store.link_last(outer.idx, inner.idx);
        store.link_last(outer.idx, tail.idx);
        assert_eq!(store.duration_at(outer.idx), Some(50));

        if let Body::Leaf(Some(b)) = &mut store.body[leaf.idx as usize] {
            let any: &mut dyn core::any::Any = b.as_mut();
            any.downcast_mut::<PauseAnimation>().unwrap().set_duration(90);
        }
        store.invalidate_duration(leaf.idx);
        assert_eq!(store.duration_at(inner.idx), Some(90));
        assert_eq!(store.duration_at(outer.idx), Some(100));
    }

    #[test]
    fn link_before_orders_children() {
        let mut store = AnimationStore::new();
        let group = store.alloc(Body::Group(GroupKind::Sequential));
        let a = pause(&mut store, 1);
        let b = pause(&mut store, 2);
        let c = pause(&mut store, 3);
        store.link_last(group.idx, a.idx);
        store.link_last(group.idx, c.idx);
        store.link_before(b.idx, c.idx);
        assert_eq!(store.child_ids(group.idx), alloc::vec![a, b, c]);

        store.unlink(c.idx);
        store.link_before(c.idx, a.idx);
        assert_eq!(store.child_ids(group.idx), alloc::vec![c, a, b]);
    }

    #[test]
    fn ancestry() {
        let mut store = AnimationStore::new();
        let outer = store.alloc(Body::Group(GroupKind::Sequential));
        let inner = store.alloc(Body::Group(GroupKind::Parallel));
        store.link_last(outer.idx, inner.idx);
        assert!(store.is_ancestor_or_self(outer.idx, inner.idx));
        assert!(store.is_ancestor_or_self(inner.idx, inner.idx));
        assert!(!store.is_ancestor_or_self(inner.idx, outer.idx));
    }
}
