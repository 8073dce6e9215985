// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The binary space partitioning allocator.
//!
//! Every node of the tree covers a rectangle of the atlas. Leaves are either
//! free or occupied; internal nodes split their rectangle in two along one
//! axis at a stored coordinate. Rectangles are never stored: they are
//! reconstructed from the root area and the split coordinates while
//! descending.
//!
//! Nodes live in a flat arena addressed by `u32` indices with a free list,
//! so splitting and merging do not allocate once the arena has grown.

use alloc::vec;
use alloc::vec::Vec;

use crate::geometry::{AtlasRect, AtlasSize};

const NONE: u32 = u32::MAX;

/// Default slack, in atlas units, under which a free leaf is claimed whole
/// instead of being split.
pub const DEFAULT_MARGIN: u32 = 2;

/// Which axis an internal node divides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    /// Split at an x coordinate; the first child is on the left.
    Vertical,
    /// Split at a y coordinate; the first child is on top.
    Horizontal,
}

/// Merge direction relative to the freed leaf.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Side {
    /// Left of or above the leaf.
    Before,
    /// Right of or below the leaf.
    After,
}

#[derive(Clone, Copy, Debug)]
struct Node {
    parent: u32,
    first: u32,
    second: u32,
    split: u32,
    axis: Axis,
    occupied: bool,
}

impl Node {
    const fn leaf(parent: u32) -> Self {
        Self {
            parent,
            first: NONE,
            second: NONE,
            split: 0,
            axis: Axis::Vertical,
            occupied: false,
        }
    }

    const fn is_leaf(&self) -> bool {
        self.first == NONE
    }

    /// The child toward `side`.
    const fn toward(&self, side: Side) -> u32 {
        match side {
            Side::Before => self.first,
            Side::After => self.second,
        }
    }

    /// The child away from `side`.
    const fn away(&self, side: Side) -> u32 {
        match side {
            Side::Before => self.second,
            Side::After => self.first,
        }
    }

    /// Rectangles of the two children, given this node's rectangle.
    fn child_rects(&self, rect: AtlasRect) -> (AtlasRect, AtlasRect) {
        match self.axis {
            Axis::Horizontal => {
                let top = self.split.saturating_sub(rect.y);
                (
                    AtlasRect::new(rect.x, rect.y, rect.width, top),
                    AtlasRect::new(rect.x, self.split, rect.width, rect.height - top),
                )
            }
            Axis::Vertical => {
                let left = self.split.saturating_sub(rect.x);
                (
                    AtlasRect::new(rect.x, rect.y, left, rect.height),
                    AtlasRect::new(self.split, rect.y, rect.width - left, rect.height),
                )
            }
        }
    }
}

/// One leaf of the partition, as reported by
/// [`AreaAllocator::leaf_rects`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AtlasLeaf {
    /// The area the leaf covers.
    pub rect: AtlasRect,
    /// Whether the leaf has been handed out.
    pub occupied: bool,
}

/// Packs rectangles into a fixed area.
///
/// Allocation walks the tree top-left first. A free leaf that fits the
/// request within the margin is claimed whole; a larger one is split along
/// whichever axis wastes less area, and the request is placed in the first
/// half. Deallocation frees the leaf at the rectangle's origin and then
/// greedily merges it with free neighbors that share its split axis.
#[derive(Clone, Debug)]
pub struct AreaAllocator {
    size: AtlasSize,
    margin: u32,
    nodes: Vec<Node>,
    free_list: Vec<u32>,
    root: u32,
    len: u32,
}

impl AreaAllocator {
    /// Creates an allocator covering `size` with the default margin.
    #[must_use]
    pub fn new(size: AtlasSize) -> Self {
        Self::with_margin(size, DEFAULT_MARGIN)
    }

    /// Creates an allocator covering `size` that claims a free leaf whole
    /// when it exceeds a request by at most `margin` in both dimensions.
    #[must_use]
    pub fn with_margin(size: AtlasSize, margin: u32) -> Self {
        Self {
            size,
            margin,
            nodes: vec![Node::leaf(NONE)],
            free_list: Vec::new(),
            root: 0,
            len: 1,
        }
    }

    /// The area being packed.
    #[must_use]
    pub const fn size(&self) -> AtlasSize {
        self.size
    }

    /// The snug-fit margin.
    #[must_use]
    pub const fn margin(&self) -> u32 {
        self.margin
    }

    /// Whether nothing is allocated and all free space has merged back into
    /// a single leaf.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        let root = &self.nodes[self.root as usize];
        root.is_leaf() && !root.occupied
    }

    /// Number of tree nodes currently in use.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len() - self.free_list.len()
    }

    /// Reserves a `size` region and returns it, or `None` if no free leaf is
    /// large enough. Zero-sized requests are rejected.
    pub fn allocate(&mut self, size: AtlasSize) -> Option<AtlasRect> {
        if size.is_empty() {
            return None;
        }
        let area = AtlasRect::from_size(self.size);
        let (x, y) = self.allocate_in(self.root, area, size)?;
        Some(AtlasRect::new(x, y, size.width, size.height))
    }

    /// Releases the region whose top-left corner is `rect`'s origin.
    ///
    /// Returns `false`, leaving the tree untouched, if no occupied leaf
    /// starts there.
    pub fn deallocate(&mut self, rect: AtlasRect) -> bool {
        let mut node = self.root;
        let mut current = AtlasRect::from_size(self.size);
        loop {
            let n = &self.nodes[node as usize];
            if n.is_leaf() {
                break;
            }
            let (first, second) = n.child_rects(current);
            let coord = match n.axis {
                Axis::Horizontal => rect.y,
                Axis::Vertical => rect.x,
            };
            (node, current) = if coord < n.split {
                (n.first, first)
            } else {
                (n.second, second)
            };
        }

        let leaf = &mut self.nodes[node as usize];
        if !leaf.occupied || current.x != rect.x || current.y != rect.y {
            return false;
        }
        leaf.occupied = false;
        self.merge_with_neighbors(node);
        true
    }

    /// Every leaf with its reconstructed rectangle, top-left first.
    #[must_use]
    pub fn leaf_rects(&self) -> Vec<AtlasLeaf> {
        let mut out = Vec::new();
        let mut stack = vec![(self.root, AtlasRect::from_size(self.size))];
        while let Some((idx, rect)) = stack.pop() {
            let n = &self.nodes[idx as usize];
            if n.is_leaf() {
                out.push(AtlasLeaf {
                    rect,
                    occupied: n.occupied,
                });
            } else {
                let (first, second) = n.child_rects(rect);
                stack.push((n.second, second));
                stack.push((n.first, first));
            }
        }
        out
    }

    fn allocate_in(&mut self, idx: u32, rect: AtlasRect, size: AtlasSize) -> Option<(u32, u32)> {
        if size.width > rect.width || size.height > rect.height {
            return None;
        }
        let node = self.nodes[idx as usize];
        if !node.is_leaf() {
            let (first, second) = node.child_rects(rect);
            if let Some(pos) = self.allocate_in(node.first, first, size) {
                return Some(pos);
            }
            return self.allocate_in(node.second, second, size);
        }

        if node.occupied {
            return None;
        }
        if size.width.saturating_add(self.margin) >= rect.width
            && size.height.saturating_add(self.margin) >= rect.height
        {
            self.nodes[idx as usize].occupied = true;
            return Some((rect.x, rect.y));
        }

        let first = self.alloc_node(idx);
        let second = self.alloc_node(idx);
        let width_waste = u64::from(rect.width - size.width) * u64::from(rect.height);
        let height_waste = u64::from(rect.height - size.height) * u64::from(rect.width);
        let mut first_rect = rect;
        let n = &mut self.nodes[idx as usize];
        n.first = first;
        n.second = second;
        if width_waste < height_waste {
            n.axis = Axis::Horizontal;
            n.split = rect.y + size.height;
            first_rect.height = size.height;
        } else {
            n.axis = Axis::Vertical;
            n.split = rect.x + size.width;
            first_rect.width = size.width;
        }
        self.allocate_in(first, first_rect, size)
    }

    fn merge_with_neighbors(&mut self, idx: u32) {
        loop {
            let parent = self.nodes[idx as usize].parent;
            if parent == NONE {
                return;
            }
            let axis = self.nodes[parent as usize].axis;
            let before = self.merge_toward(idx, axis, Side::Before);
            let after = self.merge_toward(idx, axis, Side::After);
            if !before && !after {
                return;
            }
        }
    }

    /// Absorbs the free leaf adjacent to `idx` on `side`, if it hangs off
    /// the same split axis. Returns whether a merge happened.
    fn merge_toward(&mut self, idx: u32, axis: Axis, side: Side) -> bool {
        let mut current = idx;
        let mut ancestor = self.nodes[idx as usize].parent;
        while ancestor != NONE {
            let a = &self.nodes[ancestor as usize];
            if a.toward(side) != current || a.axis != axis {
                break;
            }
            current = ancestor;
            ancestor = a.parent;
        }
        if ancestor == NONE || self.nodes[ancestor as usize].axis != axis {
            return false;
        }

        let mut neighbor = self.nodes[ancestor as usize].toward(side);
        loop {
            let n = &self.nodes[neighbor as usize];
            if n.is_leaf() || n.axis != axis {
                break;
            }
            neighbor = n.away(side);
        }
        let n = self.nodes[neighbor as usize];
        if !n.is_leaf() || n.occupied || self.nodes[n.parent as usize].axis != axis {
            return false;
        }

        let merged = n.parent;
        self.nodes[ancestor as usize].split = self.nodes[merged as usize].split;
        let m = self.nodes[merged as usize];
        let sibling = if m.first == neighbor { m.second } else { m.first };
        if m.parent == NONE {
            self.root = sibling;
        } else {
            let grand = &mut self.nodes[m.parent as usize];
            if grand.first == merged {
                grand.first = sibling;
            } else {
                grand.second = sibling;
            }
        }
        self.nodes[sibling as usize].parent = m.parent;
        self.release(merged);
        self.release(neighbor);
        true
    }

    fn alloc_node(&mut self, parent: u32) -> u32 {
        if let Some(idx) = self.free_list.pop() {
            self.nodes[idx as usize] = Node::leaf(parent);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.nodes.push(Node::leaf(parent));
            idx
        }
    }

    fn release(&mut self, idx: u32) {
        self.nodes[idx as usize] = Node::leaf(NONE);
        self.free_list.push(idx);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sq(n: u32) -> AtlasSize {
        AtlasSize::new(n, n)
    }

    /// Small deterministic generator for churn tests.
    struct XorShift(u32);

    impl XorShift {
        fn next(&mut self) -> u32 {
            let mut x = self.0;
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            self.0 = x;
            x
        }
    }

    fn assert_disjoint(area: AtlasSize, rects: &[AtlasRect]) {
        let bounds = AtlasRect::from_size(area);
        for (i, a) in rects.iter().enumerate() {
            assert!(bounds.contains_rect(*a), "{a:?} out of bounds");
            for b in &rects[i + 1..] {
                assert!(!a.intersects(*b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn fresh_allocator_is_one_free_leaf() {
        let a = AreaAllocator::new(sq(256));
        assert!(a.is_empty());
        assert_eq!(a.node_count(), 1);
        assert_eq!(a.margin(), DEFAULT_MARGIN);
        assert_eq!(
            a.leaf_rects(),
            vec![AtlasLeaf {
                rect: AtlasRect::new(0, 0, 256, 256),
                occupied: false,
            }]
        );
    }

    #[test]
    fn squares_pack_down_the_first_column() {
        let mut a = AreaAllocator::new(sq(256));
        let got: Vec<_> = (0..5).map(|_| a.allocate(sq(64)).unwrap()).collect();
        assert_eq!(
            got,
            vec![
                AtlasRect::new(0, 0, 64, 64),
                AtlasRect::new(0, 64, 64, 64),
                AtlasRect::new(0, 128, 64, 64),
                AtlasRect::new(0, 192, 64, 64),
                AtlasRect::new(64, 0, 64, 64),
            ]
        );
        assert_disjoint(a.size(), &got);
        assert!(!a.is_empty());
    }

    #[test]
    fn snug_leaf_is_claimed_whole() {
        let mut a = AreaAllocator::new(sq(64));
        assert_eq!(a.allocate(sq(63)), Some(AtlasRect::new(0, 0, 63, 63)));
        assert_eq!(a.node_count(), 1, "no split");
        assert_eq!(a.allocate(sq(1)), None);

        let mut tight = AreaAllocator::with_margin(sq(64), 0);
        assert_eq!(tight.allocate(sq(63)), Some(AtlasRect::new(0, 0, 63, 63)));
        assert!(tight.allocate(AtlasSize::new(1, 63)).is_some());
    }

    #[test]
    fn oversized_and_empty_requests_fail() {
        let mut a = AreaAllocator::new(AtlasSize::new(128, 64));
        assert_eq!(a.allocate(AtlasSize::new(129, 1)), None);
        assert_eq!(a.allocate(AtlasSize::new(1, 65)), None);
        assert_eq!(a.allocate(AtlasSize::new(0, 10)), None);
        assert!(a.is_empty(), "failed requests leave no trace");

        a.allocate(sq(16)).unwrap();
        assert_eq!(a.allocate(AtlasSize::new(129, 1)), None);
        assert_eq!(a.allocate(AtlasSize::new(128, 64)), None);
    }

    #[test]
    fn exhaustion_then_reuse() {
        let mut a = AreaAllocator::new(sq(128));
        let all: Vec<_> = (0..4).map(|_| a.allocate(sq(64)).unwrap()).collect();
        assert_disjoint(a.size(), &all);
        assert_eq!(a.allocate(sq(64)), None);
        assert_eq!(a.allocate(sq(1)), None);

        assert!(a.deallocate(all[2]));
        assert_eq!(a.allocate(sq(64)), Some(all[2]));
    }

    #[test]
    fn double_free_is_rejected() {
        let mut a = AreaAllocator::new(sq(256));
        let first = a.allocate(sq(64)).unwrap();
        let second = a.allocate(sq(64)).unwrap();
        let _third = a.allocate(sq(64)).unwrap();

        assert!(a.deallocate(second));
        assert!(!a.deallocate(second));
        assert!(!a.deallocate(AtlasRect::new(200, 200, 1, 1)), "never allocated");
        assert!(!a.deallocate(AtlasRect::new(1, 1, 1, 1)), "not an origin");
        assert_eq!(a.allocate(sq(64)), Some(second));
        assert!(a.deallocate(first));
    }

    #[test]
    fn freeing_everything_in_order_restores_the_root() {
        let mut a = AreaAllocator::new(sq(256));
        let got: Vec<_> = (0..5).map(|_| a.allocate(sq(64)).unwrap()).collect();
        for r in &got {
            assert!(a.deallocate(*r));
        }
        assert!(a.is_empty());
        assert_eq!(a.node_count(), 1);
        assert_eq!(a.allocate(sq(256)), Some(AtlasRect::new(0, 0, 256, 256)));
    }

    #[test]
    fn freeing_everything_in_reverse_restores_the_root() {
        let mut a = AreaAllocator::new(sq(256));
        let got: Vec<_> = (0..5).map(|_| a.allocate(sq(64)).unwrap()).collect();
        for r in got.iter().rev() {
            assert!(a.deallocate(*r));
        }
        assert!(a.is_empty());
        assert_eq!(a.allocate(sq(256)), Some(AtlasRect::new(0, 0, 256, 256)));
    }

    #[test]
    fn partial_free_merges_adjacent_leaves() {
        let mut a = AreaAllocator::new(sq(256));
        let got: Vec<_> = (0..4).map(|_| a.allocate(sq(64)).unwrap()).collect();
        assert!(a.deallocate(got[0]));
        assert!(a.deallocate(got[1]));
        // The top two cells of the first column are one leaf again.
        assert_eq!(a.allocate(AtlasSize::new(64, 128)), Some(AtlasRect::new(0, 0, 64, 128)));
    }

    #[test]
    fn leaves_tile_the_area() {
        let mut a = AreaAllocator::new(AtlasSize::new(300, 200));
        let mut rng = XorShift(0x2545_f491);
        for _ in 0..40 {
            let size = AtlasSize::new(rng.next() % 50 + 1, rng.next() % 50 + 1);
            let _ = a.allocate(size);
        }
        let leaves = a.leaf_rects();
        let rects: Vec<_> = leaves.iter().map(|l| l.rect).collect();
        assert_disjoint(a.size(), &rects);
        let covered: u64 = rects
            .iter()
            .map(|r| u64::from(r.width) * u64::from(r.height))
            .sum();
        assert_eq!(covered, 300 * 200);
    }

    #[test]
    fn churn_never_overlaps() {
        let area = sq(512);
        let mut a = AreaAllocator::new(area);
        let mut rng = XorShift(0x9e37_79b9);
        let mut live = Vec::new();

        for round in 0..6 {
            for _ in 0..120 {
                let size = AtlasSize::new(rng.next() % 64 + 1, rng.next() % 64 + 1);
                if let Some(r) = a.allocate(size) {
                    assert_eq!(r.size(), size);
                    live.push(r);
                }
            }
            assert_disjoint(area, &live);

            let mut kept = Vec::new();
            for (i, r) in live.drain(..).enumerate() {
                if (i + round) % 2 == 0 {
                    assert!(a.deallocate(r), "{r:?} should be live");
                    assert!(!a.deallocate(r), "{r:?} freed twice");
                } else {
                    kept.push(r);
                }
            }
            live = kept;
        }

        for r in live.drain(..) {
            assert!(a.deallocate(r));
        }
        assert!(a.leaf_rects().iter().all(|l| !l.occupied));
    }

    #[test]
    fn shuffled_full_free_restores_the_root() {
        let area = sq(256);
        for seed in 1..=32_u32 {
            let mut rng = XorShift(seed.wrapping_mul(0x9e37_79b9));
            let mut a = AreaAllocator::new(area);
            let mut live = Vec::new();
            for _ in 0..48 {
                let size = AtlasSize::new(rng.next() % 48 + 1, rng.next() % 48 + 1);
                if let Some(r) = a.allocate(size) {
                    live.push(r);
                }
            }
            assert!(!live.is_empty(), "seed {seed} allocated nothing");

            for i in (1..live.len()).rev() {
                let j = usize::try_from(rng.next()).unwrap() % (i + 1);
                live.swap(i, j);
            }
            for r in live {
                assert!(a.deallocate(r), "seed {seed}: {r:?} should be live");
            }

            assert!(a.is_empty(), "seed {seed} left fragments");
            assert_eq!(a.node_count(), 1, "seed {seed}");
            assert_eq!(a.allocate(area), Some(AtlasRect::from_size(area)));
        }
    }
}
