// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Playback state, direction, loop count, and group kinds.

use core::num::NonZeroU32;

use crate::error::AnimationError;

/// Playback state of an animation node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum State {
    /// Not playing. Initial state, and the state reached on completion.
    #[default]
    Stopped,
    /// Suspended; timing is kept and resumes where it left off.
    Paused,
    /// Advancing with the scheduler (or with its group).
    Running,
}

impl State {
    /// Stable numeric code, used by binary trace encodings.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Paused => 1,
            Self::Running => 2,
        }
    }

    /// Inverse of [`code`](Self::code).
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Stopped),
            1 => Some(Self::Paused),
            2 => Some(Self::Running),
            _ => None,
        }
    }
}

/// Which way time flows for a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Total current time increases from zero to the total duration.
    #[default]
    Forward,
    /// Total current time decreases from the total duration to zero.
    Backward,
}

/// How many times a node's per-loop timeline repeats.
///
/// Zero loops are unrepresentable; [`LoopCount::from_raw`] rejects them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LoopCount {
    /// Repeats until stopped.
    Infinite,
    /// Repeats the given number of times.
    Finite(NonZeroU32),
}

impl Default for LoopCount {
    fn default() -> Self {
        Self::ONCE
    }
}

impl LoopCount {
    /// Plays once.
    pub const ONCE: Self = Self::Finite(NonZeroU32::MIN);

    /// Converts the conventional signed encoding: negative means infinite,
    /// zero is rejected, positive is a finite count.
    pub fn from_raw(raw: i32) -> Result<Self, AnimationError> {
        match raw {
            0 => Err(AnimationError::InvalidLoopCount),
            n if n < 0 => Ok(Self::Infinite),
            n => NonZeroU32::new(n.unsigned_abs())
                .map(Self::Finite)
                .ok_or(AnimationError::InvalidLoopCount),
        }
    }

    /// Returns the finite count, or `None` when infinite.
    #[must_use]
    pub const fn get(self) -> Option<u32> {
        match self {
            Self::Infinite => None,
            Self::Finite(n) => Some(n.get()),
        }
    }

    /// Index of the final loop (`count - 1`), or 0 when infinite.
    #[must_use]
    pub const fn last_loop(self) -> u32 {
        match self {
            Self::Infinite => 0,
            Self::Finite(n) => n.get() - 1,
        }
    }
}

/// How a group drives its children.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// All children run simultaneously from the group's start.
    Parallel,
    /// Children run one after another in order.
    Sequential,
}
