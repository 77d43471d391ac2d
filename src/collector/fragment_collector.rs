//! Fixed-capacity window of accepted keyframes.

use std::time::Instant;

use tracing::debug;

use crate::capture::{Extrinsics, Frame, Intrinsics};
use crate::fragment::ModelFragment;

use super::config::CollectorConfig;
use super::keyframe_policy::KeyframePolicy;
use super::ModelCollector;

/// Three parallel arrays filled by the capture loop.
///
/// Collecting while `len < window_size`, full once `len == window_size`.
/// [`FragmentCollector::consume`] moves the window out into a fragment and
/// leaves an empty buffer behind, so capture resumes immediately.
pub struct FragmentCollector {
    config: CollectorConfig,
    policy: KeyframePolicy,
    intrinsics: Vec<Intrinsics>,
    extrinsics: Vec<Extrinsics>,
    frames: Vec<Frame>,
    /// Fragments produced so far.
    produced: u64,
}

impl FragmentCollector {
    pub fn new(config: CollectorConfig) -> Self {
        assert!(config.window_size > 0, "collector window size must be positive");
        let n = config.window_size;
        Self {
            policy: KeyframePolicy::new(&config),
            intrinsics: Vec::with_capacity(n),
            extrinsics: Vec::with_capacity(n),
            frames: Vec::with_capacity(n),
            produced: 0,
            config,
        }
    }

    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }

    pub fn policy(&self) -> &KeyframePolicy {
        &self.policy
    }

    pub fn window_size(&self) -> usize {
        self.config.window_size
    }

    /// Observations currently in the window.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn fragments_produced(&self) -> u64 {
        self.produced
    }

    /// Keyframe gate with an explicit clock, for callers that own time.
    pub fn should_collect_at(&mut self, extrinsics: &Extrinsics, now: Instant) -> bool {
        self.policy.should_collect_at(extrinsics, now)
    }
}

impl ModelCollector for FragmentCollector {
    fn is_nth_frame(&self, frame_index: u64) -> bool {
        self.policy.should_sample(frame_index)
    }

    fn should_collect(&mut self, _intrinsics: &Intrinsics, extrinsics: &Extrinsics) -> bool {
        self.policy.should_collect(extrinsics)
    }

    fn is_full(&self) -> bool {
        self.frames.len() >= self.config.window_size
    }

    fn collect(&mut self, intrinsics: Intrinsics, extrinsics: Extrinsics, frame: Frame) {
        assert!(!self.is_full(), "cannot collect: window is full");

        self.intrinsics.push(intrinsics);
        self.extrinsics.push(extrinsics);
        self.frames.push(frame);
    }

    fn consume(&mut self, scene_id: &str) -> ModelFragment {
        assert!(self.is_full(), "cannot consume: window is not full");

        let n = self.config.window_size;
        let frames = std::mem::replace(&mut self.frames, Vec::with_capacity(n));
        let intrinsics = std::mem::replace(&mut self.intrinsics, Vec::with_capacity(n));
        let extrinsics = std::mem::replace(&mut self.extrinsics, Vec::with_capacity(n));
        self.produced += 1;

        let scene = self.config.attach_scene.then(|| scene_id.to_string());
        debug!(
            "{} window #{} complete ({} frames)",
            self.config.model_name,
            self.produced,
            frames.len()
        );

        match ModelFragment::new(self.config.model_name.clone(), scene, frames, intrinsics, extrinsics) {
            Ok(fragment) => fragment,
            // collect() pushes to all three arrays together.
            Err(e) => unreachable!("window arrays out of step: {e}"),
        }
    }

    fn clear(&mut self) {
        self.intrinsics.clear();
        self.extrinsics.clear();
        self.frames.clear();
        self.policy.reset();
    }

    fn model_name(&self) -> &str {
        &self.config.model_name
    }
}
