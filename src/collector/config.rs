use std::time::Duration;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

/// How the rotation between two poses is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationMetric {
    /// Angle of the relative rotation quaternion.
    Quaternion,
    /// Angle between the two viewing directions (ignores roll).
    ForwardVector,
}

/// Named collector presets, one per reconstruction back-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectorKind {
    NeuralRecon,
    Slam3r,
}

impl CollectorKind {
    pub fn config(self) -> CollectorConfig {
        match self {
            Self::NeuralRecon => CollectorConfig::neural_recon(),
            Self::Slam3r => CollectorConfig::slam3r(),
        }
    }
}

/// Configuration for a [`super::FragmentCollector`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Model name written into every fragment.
    pub model_name: String,

    /// Observations per fragment.
    pub window_size: usize,

    /// Accept when the camera moved more than this (metres).
    pub translation_threshold: f32,

    /// Accept when the camera turned more than this (degrees).
    pub rotation_threshold_deg: f32,

    pub rotation_metric: RotationMetric,

    /// Reject anything closer than this to the last acceptance (seconds).
    pub min_interval_s: Option<f32>,

    /// Evaluate every Nth poll only.
    pub frame_stride: u32,

    /// Attach the session scene id to produced fragments.
    pub attach_scene: bool,
}

impl CollectorConfig {
    /// Nine-frame windows, quaternion angle, no time gate.
    pub fn neural_recon() -> Self {
        Self {
            model_name: "neural_recon".to_string(),
            window_size: 9,
            translation_threshold: 0.1,
            rotation_threshold_deg: 15.0,
            rotation_metric: RotationMetric::Quaternion,
            min_interval_s: None,
            frame_stride: 1,
            attach_scene: false,
        }
    }

    /// Five-frame windows, viewing-direction angle, optional time gate.
    pub fn slam3r() -> Self {
        Self {
            model_name: "slam3r".to_string(),
            window_size: 5,
            translation_threshold: 0.1,
            rotation_threshold_deg: 15.0,
            rotation_metric: RotationMetric::ForwardVector,
            min_interval_s: Some(0.0),
            frame_stride: 1,
            attach_scene: true,
        }
    }

    /// Time gate, if any. Zero, negative and unrepresentable values mean none.
    pub fn min_interval(&self) -> Option<Duration> {
        self.min_interval_s
            .filter(|s| *s > 0.0)
            .and_then(|s| Duration::try_from_secs_f32(s).ok())
    }

    /// Reject values a collector cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 {
            bail!("collector window_size must be at least 1");
        }
        if !(self.translation_threshold.is_finite() && self.translation_threshold >= 0.0) {
            bail!(
                "collector translation_threshold must be a non-negative number, got {}",
                self.translation_threshold
            );
        }
        if !(self.rotation_threshold_deg.is_finite() && self.rotation_threshold_deg >= 0.0) {
            bail!(
                "collector rotation_threshold_deg must be a non-negative number, got {}",
                self.rotation_threshold_deg
            );
        }
        if let Some(s) = self.min_interval_s {
            if s < 0.0 || Duration::try_from_secs_f32(s).is_err() {
                bail!("collector min_interval_s out of range: {}", s);
            }
        }
        Ok(())
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self::neural_recon()
    }
}
