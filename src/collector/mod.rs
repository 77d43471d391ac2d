//! Keyframe selection and window assembly.
//!
//! The capture loop asks the collector three questions per poll:
//! - is this poll index sampled at all (frame stride)?
//! - is this pose novel enough to keep (keyframe gate)?
//! - is the window full (time to hand off a fragment)?
//!
//! Collector variants for different reconstruction back-ends share one
//! implementation and differ only in their [`CollectorConfig`].

pub mod config;
pub mod fragment_collector;
pub mod keyframe_policy;

pub use config::{CollectorConfig, CollectorKind, RotationMetric};
pub use fragment_collector::FragmentCollector;
pub use keyframe_policy::KeyframePolicy;

use crate::capture::{Extrinsics, Frame, Intrinsics};
use crate::fragment::ModelFragment;

/// Capability set the capture loop drives.
pub trait ModelCollector: Send {
    /// Frame-stride sampling: should poll `frame_index` be evaluated?
    fn is_nth_frame(&self, frame_index: u64) -> bool;

    /// Keyframe gate. Accepting updates the baseline pose.
    fn should_collect(&mut self, intrinsics: &Intrinsics, extrinsics: &Extrinsics) -> bool;

    fn is_full(&self) -> bool;

    /// Store one observation. Panics if the window is full.
    fn collect(&mut self, intrinsics: Intrinsics, extrinsics: Extrinsics, frame: Frame);

    /// Hand off the full window. Panics if the window is not full.
    fn consume(&mut self, scene_id: &str) -> ModelFragment;

    /// Drop the window and the baseline pose.
    fn clear(&mut self);

    /// Reconstruction model the fragments are addressed to.
    fn model_name(&self) -> &str;
}
