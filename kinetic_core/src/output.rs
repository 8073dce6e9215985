// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display output identification.

use core::fmt;

/// Identifies the display a [`FrameTick`](crate::timing::FrameTick) belongs to.
///
/// Vsync sources assign output IDs; a [`VsyncDriver`](crate::driver::VsyncDriver)
/// can be bound to one output so that ticks from other displays are ignored.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct OutputId(pub u32);

impl fmt::Debug for OutputId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OutputId({})", self.0)
    }
}
