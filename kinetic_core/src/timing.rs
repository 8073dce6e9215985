// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display-synchronized tick types.
//!
//! A vsync source (a compositor frame callback, a display link, a test
//! harness) delivers one [`FrameTick`] per frame opportunity. The
//! [`VsyncDriver`](crate::driver::VsyncDriver) turns each tick into exactly
//! one animation step, so animations advance once per displayed frame rather
//! than on a fixed wall-clock cadence.
//!
//! Platforms differ in how well they can predict when pixels reach the
//! screen; [`TimingConfidence`] grades that, and
//! [`FrameTick::target_time`] picks the time animations should be sampled
//! at accordingly.

use crate::output::OutputId;
use crate::time::HostTime;

/// How reliable the predicted present time of a tick is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimingConfidence {
    /// Strong predicted present time available.
    Predictive,
    /// Vsync-ish timing but less strict.
    Estimated,
    /// No reliable present time; frame pacing only.
    PacingOnly,
}

/// A frame opportunity delivered by a vsync source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameTick {
    /// Current host time when the tick was generated.
    pub now: HostTime,
    /// Predicted time when pixels will be presented, if known.
    pub predicted_present: Option<HostTime>,
    /// Display refresh interval in host-time ticks, if known.
    pub refresh_interval: Option<u64>,
    /// Confidence level for timing information in this tick.
    pub confidence: TimingConfidence,
    /// Monotonically increasing frame counter.
    pub frame_index: u64,
    /// Which output this tick is for.
    pub output: OutputId,
}

impl FrameTick {
    /// Creates a pacing-only tick with no presentation prediction.
    #[must_use]
    pub const fn pacing(now: HostTime, frame_index: u64, output: OutputId) -> Self {
        Self {
            now,
            predicted_present: None,
            refresh_interval: None,
            confidence: TimingConfidence::PacingOnly,
            frame_index,
            output,
        }
    }

    /// The host time animations should be sampled at for this frame.
    ///
    /// Predictive and estimated ticks with a predicted present time sample at
    /// that time, so the frame shows the state it will be displayed at.
    /// Otherwise the tick's `now` is used.
    #[must_use]
    pub fn target_time(&self) -> HostTime {
        match (self.confidence, self.predicted_present) {
            (TimingConfidence::PacingOnly, _) | (_, None) => self.now,
            (_, Some(present)) => present.max(self.now),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(confidence: TimingConfidence, predicted: Option<u64>) -> FrameTick {
        FrameTick {
            now: HostTime(1_000),
            predicted_present: predicted.map(HostTime),
            refresh_interval: Some(16_666_667),
            confidence,
            frame_index: 3,
            output: OutputId(0),
        }
    }

    #[test]
    fn predictive_targets_present_time() {
        let t = tick(TimingConfidence::Predictive, Some(17_000));
        assert_eq!(t.target_time(), HostTime(17_000));
        let t = tick(TimingConfidence::Estimated, Some(9_000));
        assert_eq!(t.target_time(), HostTime(9_000));
    }

    #[test]
    fn pacing_only_ignores_prediction() {
        let t = tick(TimingConfidence::PacingOnly, Some(17_000));
        assert_eq!(t.target_time(), HostTime(1_000));
    }

    #[test]
    fn missing_prediction_falls_back_to_now() {
        let t = tick(TimingConfidence::Predictive, None);
        assert_eq!(t.target_time(), HostTime(1_000));
    }

    #[test]
    fn stale_prediction_never_goes_backwards() {
        let t = tick(TimingConfidence::Estimated, Some(500));
        assert_eq!(t.target_time(), HostTime(1_000));
    }

    #[test]
    fn pacing_constructor() {
        let t = FrameTick::pacing(HostTime(42), 7, OutputId(2));
        assert_eq!(t.confidence, TimingConfidence::PacingOnly);
        assert_eq!(t.predicted_present, None);
        assert_eq!(t.frame_index, 7);
        assert_eq!(t.output, OutputId(2));
    }
}
