// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Change reports drained by the host.
//!
//! Every time application, state transition, and topology edit marks the
//! arena's dirty tracker. [`Animator::take_changes`] drains those marks so
//! a host (for example a renderer mirroring animated values) can update only
//! what moved since it last looked.

use alloc::vec::Vec;
use core::mem;

use crate::Animator;
use crate::dirty;

/// The set of changes produced since the previous
/// [`Animator::take_changes`] call.
///
/// Each field contains raw slot indices; use the `*_at` accessors on
/// [`Animator`] to read their values.
#[derive(Clone, Debug, Default)]
pub struct TickChanges {
    /// Nodes whose current time was applied.
    pub times: Vec<u32>,
    /// Nodes whose state changed.
    pub states: Vec<u32>,
    /// Nodes created since the last drain.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last drain.
    pub removed: Vec<u32>,
    /// Whether group membership changed.
    pub topology_changed: bool,
}

impl TickChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.times.clear();
        self.states.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
            && self.states.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }
}

impl Animator {
    /// Drains and returns everything that changed since the last call.
    pub fn take_changes(&mut self) -> TickChanges {
        let mut changes = TickChanges::default();
        self.take_changes_into(&mut changes);
        changes
    }

    /// Like [`take_changes`](Self::take_changes), but reuses a
    /// caller-provided buffer.
    pub fn take_changes_into(&mut self, changes: &mut TickChanges) {
        changes.clear();
        let store = &mut self.store;
        let alive = &store.alive;

        changes.times = store
            .dirty
            .drain(dirty::TIME)
            .deterministic()
            .run()
            .filter(|&idx| alive[idx as usize])
            .collect();

        changes.states = store
            .dirty
            .drain(dirty::STATE)
            .deterministic()
            .run()
            .filter(|&idx| alive[idx as usize])
            .collect();

        let topology: Vec<u32> = store
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        changes.topology_changed = !topology.is_empty();

        mem::swap(&mut store.pending_added, &mut changes.added);
        mem::swap(&mut store.pending_removed, &mut changes.removed);
    }
}
