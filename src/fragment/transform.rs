use nalgebra::{UnitQuaternion, Vector3};

use crate::geometry::Transform;

/// Placement correction for a scene, produced by user action rather than
/// by the capture loop. A newer transform supersedes any still queued.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformFragment {
    pub scene_id: String,
    pub transform: Transform,
}

impl TransformFragment {
    pub fn new(scene_id: impl Into<String>, transform: Transform) -> Self {
        Self {
            scene_id: scene_id.into(),
            transform,
        }
    }

    pub fn from_parts(
        scene_id: impl Into<String>,
        position: Vector3<f32>,
        rotation: UnitQuaternion<f32>,
        scale: Vector3<f32>,
    ) -> Self {
        Self::new(scene_id, Transform::new(position, rotation, scale))
    }
}
