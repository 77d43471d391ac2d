//! Keyframe admission: frame-stride sampling plus a pose-novelty gate.

use std::time::{Duration, Instant};

use crate::capture::Extrinsics;

use super::config::{CollectorConfig, RotationMetric};

/// Decides which observations are worth keeping.
///
/// Thresholds are measured against the last *accepted* pose, so slow drift
/// accumulates until it crosses a threshold. Ties are rejected.
#[derive(Debug, Clone)]
pub struct KeyframePolicy {
    /// Accept when translation exceeds this (metres).
    translation_threshold: f32,
    /// Accept when rotation exceeds this (degrees).
    rotation_threshold_deg: f32,
    rotation_metric: RotationMetric,
    /// Minimum time between acceptances.
    min_interval: Option<Duration>,
    /// Sample every Nth poll.
    frame_stride: u32,
    /// Baseline pose (last acceptance).
    last_accepted: Option<Extrinsics>,
    last_accepted_at: Option<Instant>,
}

impl KeyframePolicy {
    pub fn new(config: &CollectorConfig) -> Self {
        Self {
            translation_threshold: config.translation_threshold,
            rotation_threshold_deg: config.rotation_threshold_deg,
            rotation_metric: config.rotation_metric,
            min_interval: config.min_interval(),
            frame_stride: config.frame_stride.max(1),
            last_accepted: None,
            last_accepted_at: None,
        }
    }

    /// True when `frame_index` falls on the sampling stride.
    pub fn should_sample(&self, frame_index: u64) -> bool {
        frame_index % u64::from(self.frame_stride) == 0
    }

    /// Keyframe gate evaluated at the current wall-clock time.
    pub fn should_collect(&mut self, candidate: &Extrinsics) -> bool {
        self.should_collect_at(candidate, Instant::now())
    }

    /// Keyframe gate evaluated at `now`.
    ///
    /// The first candidate after construction or [`KeyframePolicy::reset`]
    /// is always accepted and becomes the baseline.
    pub fn should_collect_at(&mut self, candidate: &Extrinsics, now: Instant) -> bool {
        let Some(baseline) = self.last_accepted else {
            self.accept(candidate, now);
            return true;
        };

        if let (Some(min_interval), Some(at)) = (self.min_interval, self.last_accepted_at) {
            if now.saturating_duration_since(at) < min_interval {
                return false;
            }
        }

        let translation = baseline.translation_to(candidate);
        let rotation = self.rotation_delta_deg(&baseline, candidate);

        if translation > self.translation_threshold || rotation > self.rotation_threshold_deg {
            self.accept(candidate, now);
            return true;
        }

        false
    }

    /// Rotation between two poses under the configured metric (degrees).
    pub fn rotation_delta_deg(&self, a: &Extrinsics, b: &Extrinsics) -> f32 {
        match self.rotation_metric {
            RotationMetric::Quaternion => a.rotation_angle_deg(b),
            RotationMetric::ForwardVector => a.forward_angle_deg(b),
        }
    }

    pub fn last_accepted(&self) -> Option<&Extrinsics> {
        self.last_accepted.as_ref()
    }

    /// Forget the baseline so the next candidate is accepted.
    pub fn reset(&mut self) {
        self.last_accepted = None;
        self.last_accepted_at = None;
    }

    fn accept(&mut self, candidate: &Extrinsics, now: Instant) {
        self.last_accepted = Some(*candidate);
        self.last_accepted_at = Some(now);
    }
}
