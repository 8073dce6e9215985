// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animation groups: topology and time propagation.
//!
//! A group is a node whose timeline is made of its children's timelines.
//!
//! - A **parallel** group plays every child at once. Its per-loop duration
//!   is the longest child total duration. Each child receives the group's
//!   loop time; a shorter child finishes when that time passes its end.
//! - A **sequential** group plays children one after another. Its per-loop
//!   duration is the sum of child total durations. The child whose window
//!   contains the group time is the *current child*; children skipped over
//!   are driven to their end (or back to their start when seeking
//!   backwards).
//!
//! Children of a running group are never registered with the timer as
//! top-level nodes: the group forwards time to them.

use crate::Animator;
use crate::animation::{AnimationId, Children, Direction, INVALID, State};
use crate::error::AnimationError;

impl Animator {
    // -- Topology --

    /// Appends `child` to `group`.
    ///
    /// A running `child` is stopped first, since it is no longer top-level.
    pub fn add_child(&mut self, group: AnimationId, child: AnimationId) -> Result<(), AnimationError> {
        let (g, c) = self.check_adoptable(group, child)?;
        self.halt_node(child);
        self.store.link_last(g, c);
        Ok(())
    }

    /// Inserts `child` into `group` before `before`.
    pub fn insert_child(
        &mut self,
        group: AnimationId,
        child: AnimationId,
        before: AnimationId,
    ) -> Result<(), AnimationError> {
        let (g, c) = self.check_adoptable(group, child)?;
        let b = self.store.validate(before)?;
        if self.store.parent[b as usize] != g {
            return Err(AnimationError::NotInGroup {
                group,
                child: before,
            });
        }
        self.halt_node(child);
        self.store.link_before(c, b);
        Ok(())
    }

    /// Detaches `child` from `group`, stopping it if it is running.
    pub fn remove_child(
        &mut self,
        group: AnimationId,
        child: AnimationId,
    ) -> Result<(), AnimationError> {
        let g = self.store.validate(group)?;
        let c = self.store.validate(child)?;
        if self.store.parent[c as usize] != g {
            return Err(AnimationError::NotInGroup { group, child });
        }
        self.halt_node(child);
        // The child may have been moved by a listener while stopping.
        if self.store.is_alive(child) && self.store.parent[c as usize] == g {
            self.store.unlink(c);
        }
        Ok(())
    }

    /// Iterates the direct children of `id` in play order.
    ///
    /// Empty for leaves and stale handles.
    #[must_use]
    pub fn children(&self, id: AnimationId) -> Children<'_> {
        match self.store.validate(id) {
            Ok(idx) => self.store.children_of(idx),
            Err(_) => Children::empty(&self.store),
        }
    }

    /// The group that contains `id`, if any.
    #[must_use]
    pub fn group_of(&self, id: AnimationId) -> Option<AnimationId> {
        let idx = self.store.validate(id).ok()?;
        let p = self.store.parent[idx as usize];
        (p != INVALID).then(|| self.store.handle(p))
    }

    /// The child a sequential group is currently playing.
    #[must_use]
    pub fn current_child(&self, group: AnimationId) -> Option<AnimationId> {
        let idx = self.store.validate(group).ok()?;
        let c = self.store.current_child[idx as usize];
        (c != INVALID).then(|| self.store.handle(c))
    }

    fn check_adoptable(
        &self,
        group: AnimationId,
        child: AnimationId,
    ) -> Result<(u32, u32), AnimationError> {
        let g = self.store.validate(group)?;
        let c = self.store.validate(child)?;
        if self.store.group_kind(g).is_none() {
            return Err(AnimationError::NotAGroup(group));
        }
        if self.store.parent[c as usize] != INVALID {
            return Err(AnimationError::AlreadyInGroup(child));
        }
        if self.store.is_ancestor_or_self(c, g) {
            return Err(AnimationError::WouldCycle { group, child });
        }
        Ok((g, c))
    }

    // -- Shared --

    /// Brings a child into the group's running or paused state.
    fn apply_group_state(&mut self, group: AnimationId, child: AnimationId) {
        match self.store.state[group.idx as usize] {
            State::Running => self.run_node(child),
            State::Paused => self.suspend_node(child),
            State::Stopped => {}
        }
    }

    fn child_total(&self, child: AnimationId) -> Option<u32> {
        self.store.total_duration_at(child.idx)
    }

    // -- Parallel --

    pub(crate) fn update_parallel(&mut self, group: AnimationId, current_time: u32) {
        let children = self.store.child_ids(group.idx);
        if children.is_empty() {
            return;
        }
        let g = group.idx as usize;
        let current_loop = self.store.current_loop[g];
        let last_loop = self.store.last_loop[g];

        if current_loop > last_loop {
            // Finish the loop that was wrapped past.
            if let Some(d) = self.store.duration_at(group.idx)
                && d > 0
            {
                for &child in &children {
                    if self.store.is_alive(child)
                        && self.store.state[child.idx as usize] != State::Stopped
                    {
                        self.apply_current_time(child, d);
                    }
                }
            }
        } else if current_loop < last_loop {
            // Seeking backwards across a loop boundary: rewind everything.
            for &child in &children {
                if !self.store.is_alive(child) {
                    continue;
                }
                self.apply_group_state(group, child);
                self.apply_current_time(child, 0);
                self.halt_node(child);
            }
        }

        if !self.store.is_alive(group) {
            return;
        }
        let last_current_time = self.store.last_current_time[g];
        for &child in &children {
            if !self.store.is_alive(child) {
                continue;
            }
            let dura = self.child_total(child);
            let start_if_at_end = dura.is_some_and(|d| last_current_time > d);
            if current_loop > last_loop || self.should_start(group, child, start_if_at_end) {
                self.apply_group_state(group, child);
            }
            if self.store.is_alive(child)
                && self.store.state[child.idx as usize] == self.store.state[g]
            {
                self.apply_current_time(child, current_time);
                if let Some(d) = dura
                    && d > 0
                    && current_time > d
                {
                    self.halt_node(child);
                }
            }
        }
        if self.store.is_alive(group) {
            self.store.last_loop[g] = self.store.current_loop[g];
            self.store.last_current_time[g] = current_time;
        }
    }

    /// Whether a parallel child should be (re)started at the group's current
    /// loop time.
    fn should_start(&self, group: AnimationId, child: AnimationId, start_if_at_end: bool) -> bool {
        let Some(d) = self.child_total(child) else {
            return true;
        };
        let t = self.store.current_time[group.idx as usize];
        if start_if_at_end {
            return t <= d;
        }
        match self.store.direction[group.idx as usize] {
            Direction::Forward => t < d,
            Direction::Backward => t > 0 && t <= d,
        }
    }

    pub(crate) fn parallel_state_changed(&mut self, group: AnimationId, new: State, old: State) {
        let children = self.store.child_ids(group.idx);
        match new {
            State::Stopped => {
                for child in children {
                    self.halt_node(child);
                }
            }
            State::Paused => {
                for child in children {
                    self.suspend_node(child);
                }
            }
            State::Running => {
                let direction = self.store.direction[group.idx as usize];
                for child in children {
                    if !self.store.is_alive(child) {
                        continue;
                    }
                    if old == State::Stopped {
                        self.halt_node(child);
                    }
                    self.set_direction_internal(child, direction);
                    if self.should_start(group, child, old == State::Stopped) {
                        self.run_node(child);
                    }
                }
            }
        }
    }

    pub(crate) fn parallel_direction_changed(&mut self, group: AnimationId, direction: Direction) {
        let g = group.idx as usize;
        if self.store.state[g] != State::Stopped {
            for child in self.store.child_ids(group.idx) {
                if self.store.is_alive(child) {
                    self.set_direction_internal(child, direction);
                }
            }
            return;
        }
        match direction {
            Direction::Forward => {
                self.store.last_loop[g] = 0;
                self.store.last_current_time[g] = 0;
            }
            Direction::Backward => {
                self.store.last_loop[g] = self.store.loop_count[g].last_loop();
                self.store.last_current_time[g] = self.store.duration_at(group.idx).unwrap_or(0);
            }
        }
    }

    // -- Sequential --

    pub(crate) fn update_sequential(&mut self, group: AnimationId, current_time: u32) {
        let children = self.store.child_ids(group.idx);
        if children.is_empty() {
            return;
        }
        let g = group.idx as usize;
        let (target, offset) = self.index_for_current_time(group, &children, current_time);
        let current = self.current_index(group, &children);
        let current_loop = self.store.current_loop[g];
        let last_loop = self.store.last_loop[g];

        if last_loop < current_loop || (last_loop == current_loop && current < target) {
            self.advance_forwards(group, &children, current, target);
        } else if last_loop > current_loop || (last_loop == current_loop && current > target) {
            self.rewind_forwards(group, &children, current, target);
        }
        if !self.store.is_alive(group) {
            return;
        }

        let child = children[target];
        self.set_current_child(group, child, false);
        if self.store.is_alive(child) && self.store.parent[child.idx as usize] == group.idx {
            self.apply_current_time(child, current_time.saturating_sub(offset));
        }
        if self.store.is_alive(group) {
            self.store.last_loop[g] = self.store.current_loop[g];
        }
    }

    /// Finds the child whose window contains `t`, and that window's offset.
    fn index_for_current_time(
        &self,
        group: AnimationId,
        children: &[AnimationId],
        t: u32,
    ) -> (usize, u32) {
        let backward = self.store.direction[group.idx as usize] == Direction::Backward;
        let mut offset = 0_u32;
        let mut last = 0;
        for (i, &child) in children.iter().enumerate() {
            let Some(d) = self.child_total(child) else {
                return (i, offset);
            };
            let end = offset.saturating_add(d);
            if t < end || (t == end && backward) {
                return (i, offset);
            }
            offset = end;
            last = d;
        }
        // Past the end, or only zero-length children.
        (children.len() - 1, offset - last)
    }

    /// Position of the current child, or 0 when there is none.
    fn current_index(&self, group: AnimationId, children: &[AnimationId]) -> usize {
        let current = self.store.current_child[group.idx as usize];
        children
            .iter()
            .position(|c| c.idx == current)
            .unwrap_or(0)
    }

    /// Drives every child from `current` up to (not including) `target` to
    /// its end, wrapping through the whole group first if a loop was
    /// crossed.
    fn advance_forwards(
        &mut self,
        group: AnimationId,
        children: &[AnimationId],
        mut current: usize,
        target: usize,
    ) {
        let g = group.idx as usize;
        if self.store.last_loop[g] < self.store.current_loop[g] {
            for &child in &children[current..] {
                self.seek_child(group, child, true);
            }
            if children.len() == 1 {
                self.activate_current_child(group, false);
            } else {
                self.set_current_child(group, children[0], true);
            }
            current = 0;
        }
        for &child in &children[current..target] {
            self.seek_child(group, child, true);
        }
    }

    /// Rewinds every child from `current` down to (not including) `target`
    /// to its start, wrapping through the whole group first if a loop was
    /// crossed.
    fn rewind_forwards(
        &mut self,
        group: AnimationId,
        children: &[AnimationId],
        mut current: usize,
        target: usize,
    ) {
        let g = group.idx as usize;
        if self.store.last_loop[g] > self.store.current_loop[g] {
            for &child in children[..=current].iter().rev() {
                self.seek_child(group, child, false);
            }
            let last = children.len() - 1;
            if last == 0 {
                self.activate_current_child(group, false);
            } else {
                self.set_current_child(group, children[last], true);
            }
            current = last;
        }
        if target < current {
            for &child in children[target + 1..=current].iter().rev() {
                self.seek_child(group, child, false);
            }
        }
    }

    /// Makes `child` current (as an intermediate step) and moves it to its
    /// end or its start.
    fn seek_child(&mut self, group: AnimationId, child: AnimationId, to_end: bool) {
        if !self.store.is_alive(group) || !self.store.is_alive(child) {
            return;
        }
        self.set_current_child(group, child, true);
        let t = if to_end {
            self.child_total(child).unwrap_or(0)
        } else {
            0
        };
        if self.store.is_alive(child) {
            self.apply_current_time(child, t);
        }
    }

    fn set_current_child(&mut self, group: AnimationId, child: AnimationId, intermediate: bool) {
        let g = group.idx as usize;
        let previous = self.store.current_child[g];
        if previous == child.idx {
            return;
        }
        if previous != INVALID {
            let previous = self.store.handle(previous);
            self.halt_node(previous);
        }
        if !self.store.is_alive(group) || !self.store.is_alive(child) {
            return;
        }
        self.store.current_child[g] = child.idx;
        self.activate_current_child(group, intermediate);
    }

    fn activate_current_child(&mut self, group: AnimationId, intermediate: bool) {
        let g = group.idx as usize;
        let current = self.store.current_child[g];
        if current == INVALID || self.store.state[g] == State::Stopped {
            return;
        }
        let child = self.store.handle(current);
        self.halt_node(child);
        let direction = self.store.direction[g];
        self.set_direction_internal(child, direction);
        self.run_node(child);
        if !intermediate && self.store.is_alive(group) && self.store.state[g] == State::Paused {
            self.suspend_node(child);
        }
    }

    /// Makes the first child (or the last, backwards) current and starts it.
    fn restart_sequential(&mut self, group: AnimationId, children: &[AnimationId]) {
        let g = group.idx as usize;
        let target = match self.store.direction[g] {
            Direction::Forward => {
                self.store.last_loop[g] = 0;
                children[0]
            }
            Direction::Backward => {
                self.store.last_loop[g] = self.store.loop_count[g].last_loop();
                children[children.len() - 1]
            }
        };
        if self.store.current_child[g] == target.idx {
            self.activate_current_child(group, false);
        } else {
            self.set_current_child(group, target, false);
        }
    }

    pub(crate) fn sequential_state_changed(&mut self, group: AnimationId, new: State, old: State) {
        let children = self.store.child_ids(group.idx);
        if children.is_empty() {
            return;
        }
        let current = self.store.current_child[group.idx as usize];
        let current = (current != INVALID).then(|| self.store.handle(current));
        let current_state = current.map(|c| self.store.state[c.idx as usize]);
        match new {
            State::Stopped => {
                if let Some(c) = current {
                    self.halt_node(c);
                }
            }
            State::Paused => {
                if let Some(c) = current
                    && current_state == Some(old)
                    && old == State::Running
                {
                    self.suspend_node(c);
                } else {
                    self.restart_sequential(group, &children);
                }
            }
            State::Running => {
                if let Some(c) = current
                    && current_state == Some(old)
                    && old == State::Paused
                {
                    self.run_node(c);
                } else {
                    self.restart_sequential(group, &children);
                }
            }
        }
    }

    pub(crate) fn sequential_direction_changed(&mut self, group: AnimationId, direction: Direction) {
        let g = group.idx as usize;
        let current = self.store.current_child[g];
        if self.store.state[g] != State::Stopped && current != INVALID {
            let child = self.store.handle(current);
            self.set_direction_internal(child, direction);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;
    use alloc::vec;
    use alloc::vec::Vec;
    use core::cell::RefCell;

    use super::*;
    use crate::animation::GroupKind;
    use crate::animator::tests::{Recording, animator};

    fn order(a: &Animator, group: AnimationId) -> Vec<AnimationId> {
        a.children(group).collect()
    }

    fn recorded_times(a: &Animator, id: AnimationId) -> Vec<u32> {
        a.animation::<Recording>(id).unwrap().times.clone()
    }

    #[test]
    fn topology_errors() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Parallel);
        let h = a.create_group(GroupKind::Sequential);
        let leaf = a.create(Recording::new(10));
        let other = a.create(Recording::new(10));

        assert_eq!(a.add_child(leaf, other), Err(AnimationError::NotAGroup(leaf)));
        a.add_child(g, h).unwrap();
        a.add_child(h, leaf).unwrap();
        assert_eq!(a.add_child(g, leaf), Err(AnimationError::AlreadyInGroup(leaf)));
        assert_eq!(
            a.add_child(h, g),
            Err(AnimationError::WouldCycle { group: h, child: g })
        );
        assert_eq!(
            a.add_child(g, g),
            Err(AnimationError::WouldCycle { group: g, child: g })
        );
        assert_eq!(
            a.remove_child(g, leaf),
            Err(AnimationError::NotInGroup { group: g, child: leaf })
        );
        assert_eq!(
            a.insert_child(g, other, leaf),
            Err(AnimationError::NotInGroup { group: g, child: leaf })
        );
        assert_eq!(a.destroy(h), Err(AnimationError::HasChildren(h)));
        assert_eq!(a.group_of(leaf), Some(h));
        assert_eq!(a.group_of(g), None);
    }

    #[test]
    fn insert_and_remove_children() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Sequential);
        let x = a.create(Recording::new(10));
        let y = a.create(Recording::new(20));
        let z = a.create(Recording::new(30));
        a.add_child(g, x).unwrap();
        a.add_child(g, z).unwrap();
        a.insert_child(g, y, z).unwrap();
        assert_eq!(order(&a, g), vec![x, y, z]);
        assert_eq!(a.duration(g), Ok(Some(60)));

        a.remove_child(g, y).unwrap();
        assert_eq!(order(&a, g), vec![x, z]);
        assert_eq!(a.duration(g), Ok(Some(40)));
        assert_eq!(a.group_of(y), None);

        a.destroy(z).unwrap();
        assert_eq!(order(&a, g), vec![x]);
        assert_eq!(a.duration(g), Ok(Some(10)));
        assert_eq!(a.children(x).count(), 0);
    }

    #[test]
    fn adding_running_node_stops_it() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Parallel);
        let x = a.create(Recording::new(100));
        a.start(x).unwrap();
        a.add_child(g, x).unwrap();
        assert_eq!(a.state(x), Some(State::Stopped));
        assert!(!a.has_registered_timer(x));
    }

    #[test]
    fn parallel_children_finish_at_their_own_end() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Parallel);
        let short = a.create(Recording::new(100));
        let long = a.create(Recording::new(300));
        a.add_child(g, short).unwrap();
        a.add_child(g, long).unwrap();
        assert_eq!(a.duration(g), Ok(Some(300)));

        let finished: Rc<RefCell<Vec<AnimationId>>> = Rc::default();
        for id in [short, long, g] {
            let f = Rc::clone(&finished);
            a.on_finished(id, move |_, id| f.borrow_mut().push(id)).unwrap();
        }

        a.start(g).unwrap();
        assert_eq!(a.state(short), Some(State::Running));
        assert_eq!(a.state(long), Some(State::Running));

        a.advance_by(150);
        assert_eq!(a.state(short), Some(State::Stopped));
        assert_eq!(a.current_time(short), Some(100));
        assert_eq!(a.current_time(long), Some(150));
        assert_eq!(*finished.borrow(), vec![short]);

        a.advance_by(200);
        assert_eq!(a.state(g), Some(State::Stopped));
        assert_eq!(a.current_time(long), Some(300));
        assert_eq!(*finished.borrow(), vec![short, long, g]);
    }

    #[test]
    fn parallel_loop_restarts_children() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Parallel);
        let short = a.create(Recording::new(50));
        let long = a.create(Recording::new(100));
        a.add_child(g, short).unwrap();
        a.add_child(g, long).unwrap();
        a.set_loop_count(g, 2).unwrap();
        assert_eq!(a.total_duration(g), Ok(Some(200)));

        a.start(g).unwrap();
        a.advance_by(80);
        assert_eq!(a.state(short), Some(State::Stopped));
        a.advance_by(50);
        assert_eq!(a.current_loop(g), Some(1));
        assert_eq!(a.state(short), Some(State::Running), "restarted for loop 1");
        assert_eq!(a.current_time(short), Some(30));
        assert_eq!(a.current_time(long), Some(30));
        // The long child was driven to its end before wrapping.
        assert!(recorded_times(&a, long).contains(&100));
    }

    #[test]
    fn pausing_parallel_group_pauses_running_children() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Parallel);
        let x = a.create(Recording::new(100));
        a.add_child(g, x).unwrap();
        a.start(g).unwrap();
        a.advance_by(10);
        a.pause(g).unwrap();
        assert_eq!(a.state(x), Some(State::Paused));
        a.resume(g).unwrap();
        assert_eq!(a.state(x), Some(State::Running));
        a.advance_by(10);
        assert_eq!(a.current_time(x), Some(20));
        a.stop(g).unwrap();
        assert_eq!(a.state(x), Some(State::Stopped));
    }

    #[test]
    fn sequential_walks_children_in_order() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Sequential);
        let x = a.create(Recording::new(100));
        let y = a.create(Recording::new(100));
        a.add_child(g, x).unwrap();
        a.add_child(g, y).unwrap();
        assert_eq!(a.duration(g), Ok(Some(200)));

        a.start(g).unwrap();
        assert_eq!(a.current_child(g), Some(x));
        assert_eq!(a.state(x), Some(State::Running));
        assert_eq!(a.state(y), Some(State::Stopped));

        a.advance_by(150);
        assert_eq!(a.current_child(g), Some(y));
        assert_eq!(a.state(x), Some(State::Stopped));
        assert_eq!(a.current_time(x), Some(100), "driven to its end");
        assert_eq!(a.current_time(y), Some(50));

        a.advance_by(50);
        assert_eq!(a.state(g), Some(State::Stopped));
        assert_eq!(a.current_time(y), Some(100));
    }

    #[test]
    fn sequential_with_pause_between_leaves() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Sequential);
        let x = a.create(Recording::new(50));
        let p = a.create_pause(100);
        let y = a.create(Recording::new(50));
        for c in [x, p, y] {
            a.add_child(g, c).unwrap();
        }
        a.start(g).unwrap();
        a.advance_by(60);
        assert_eq!(a.current_child(g), Some(p));
        assert_eq!(a.timer().running_leaf_animations(), 0);
        assert_eq!(a.timer().running_pause_animations(), &[p]);
        a.advance_by(100);
        assert_eq!(a.current_child(g), Some(y));
        assert_eq!(a.current_time(y), Some(10));
        assert_eq!(a.timer().running_leaf_animations(), 1);
    }

    #[test]
    fn sequential_seek_backwards_rewinds_later_children() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Sequential);
        let x = a.create(Recording::new(100));
        let y = a.create(Recording::new(100));
        a.add_child(g, x).unwrap();
        a.add_child(g, y).unwrap();
        a.start(g).unwrap();
        a.set_current_time(g, 150).unwrap();
        assert_eq!(a.current_child(g), Some(y));

        a.set_current_time(g, 40).unwrap();
        assert_eq!(a.current_child(g), Some(x));
        assert_eq!(a.current_time(x), Some(40));
        assert_eq!(recorded_times(&a, y).last(), Some(&0), "rewound to its start");
        assert_eq!(a.state(y), Some(State::Stopped));
    }

    #[test]
    fn sequential_backward_plays_last_child_first() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Sequential);
        let x = a.create(Recording::new(100));
        let y = a.create(Recording::new(100));
        a.add_child(g, x).unwrap();
        a.add_child(g, y).unwrap();
        a.set_direction(g, Direction::Backward).unwrap();
        a.start(g).unwrap();
        assert_eq!(a.current_child(g), Some(y));
        assert_eq!(a.direction(y), Some(Direction::Backward));

        a.advance_by(150);
        assert_eq!(a.current_child(g), Some(x));
        assert_eq!(a.current_time(x), Some(50));
        assert_eq!(a.state(y), Some(State::Stopped));

        a.advance_by(50);
        assert_eq!(a.state(g), Some(State::Stopped));
    }

    #[test]
    fn nested_groups() {
        let (mut a, _) = animator();
        let seq = a.create_group(GroupKind::Sequential);
        let par = a.create_group(GroupKind::Parallel);
        let x = a.create(Recording::new(40));
        let y = a.create(Recording::new(60));
        let z = a.create(Recording::new(100));
        a.add_child(par, x).unwrap();
        a.add_child(par, y).unwrap();
        a.add_child(seq, par).unwrap();
        a.add_child(seq, z).unwrap();
        assert_eq!(a.duration(seq), Ok(Some(160)));

        a.start(seq).unwrap();
        a.advance_by(50);
        assert_eq!(a.state(x), Some(State::Stopped));
        assert_eq!(a.current_time(y), Some(50));
        a.advance_by(30);
        assert_eq!(a.current_child(seq), Some(z));
        assert_eq!(a.state(par), Some(State::Stopped));
        assert_eq!(a.current_time(z), Some(20));
        assert_eq!(a.running_animation_count(), 1);
    }

    #[test]
    fn child_duration_change_updates_ancestors() {
        let (mut a, _) = animator();
        let seq = a.create_group(GroupKind::Sequential);
        let par = a.create_group(GroupKind::Parallel);
        let x = a.create(Recording::new(40));
        a.add_child(par, x).unwrap();
        a.add_child(seq, par).unwrap();
        a.set_loop_count(par, 3).unwrap();
        assert_eq!(a.duration(seq), Ok(Some(120)));
        a.with_animation_mut::<Recording, _>(x, |p| p.duration = None);
        assert_eq!(a.duration(par), Ok(None));
        assert_eq!(a.duration(seq), Ok(None));
    }

    #[test]
    fn empty_group_never_starts() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Sequential);
        assert_eq!(a.duration(g), Ok(Some(0)));
        assert_eq!(a.start(g), Ok(false));
    }

    #[test]
    fn zero_length_child_finishes_inside_group() {
        let (mut a, _) = animator();
        let g = a.create_group(GroupKind::Parallel);
        let zero = a.create(Recording::new(0));
        let x = a.create(Recording::new(100));
        a.add_child(g, zero).unwrap();
        a.add_child(g, x).unwrap();
        let finished = Rc::new(RefCell::new(false));
        let f = Rc::clone(&finished);
        a.on_finished(zero, move |_, _| *f.borrow_mut() = true)
            .unwrap();
        a.start(g).unwrap();
        a.advance_by(10);
        assert_eq!(a.state(zero), Some(State::Stopped));
        assert!(*finished.borrow());
    }
}
