//! Camera pose and placement transform types.
//!
//! Poses are stored in single precision because that is what travels on the
//! wire. Rotations are unit quaternions; the forward axis is +Z, matching the
//! convention of the capture devices that feed the pipeline.

use nalgebra::{Quaternion, UnitQuaternion, Vector3};

/// Camera forward axis in the local frame.
pub const FORWARD: Vector3<f32> = Vector3::new(0.0, 0.0, 1.0);

/// Camera pose: position + orientation in a stable reference frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
}

impl Pose {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
        }
    }

    /// Build a pose from raw quaternion components (x, y, z, w).
    ///
    /// The components are taken as-is so that a decoded pose reproduces the
    /// encoded bits exactly; callers feeding untrusted rotations should
    /// normalize themselves.
    pub fn from_components(position: [f32; 3], rotation_xyzw: [f32; 4]) -> Self {
        let [x, y, z, w] = rotation_xyzw;
        Self {
            position: Vector3::new(position[0], position[1], position[2]),
            rotation: UnitQuaternion::new_unchecked(Quaternion::new(w, x, y, z)),
        }
    }

    /// Quaternion components in wire order (x, y, z, w).
    pub fn rotation_xyzw(&self) -> [f32; 4] {
        quaternion_xyzw(&self.rotation)
    }

    /// Euclidean distance between the two camera positions.
    pub fn translation_to(&self, other: &Pose) -> f32 {
        (other.position - self.position).norm()
    }

    /// Angle (degrees) of the relative rotation between the two poses.
    pub fn rotation_angle_deg(&self, other: &Pose) -> f32 {
        self.rotation.angle_to(&other.rotation).to_degrees()
    }

    /// Angle (degrees) between the two cameras' viewing directions.
    ///
    /// Unlike [`Pose::rotation_angle_deg`] this ignores roll about the
    /// optical axis.
    pub fn forward_angle_deg(&self, other: &Pose) -> f32 {
        self.forward().angle(&other.forward()).to_degrees()
    }

    /// Viewing direction in the reference frame.
    pub fn forward(&self) -> Vector3<f32> {
        self.rotation * FORWARD
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Placement of a reconstructed model: position, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vector3<f32>,
    pub rotation: UnitQuaternion<f32>,
    pub scale: Vector3<f32>,
}

impl Transform {
    pub fn new(position: Vector3<f32>, rotation: UnitQuaternion<f32>, scale: Vector3<f32>) -> Self {
        Self {
            position,
            rotation,
            scale,
        }
    }

    pub fn identity() -> Self {
        Self {
            position: Vector3::zeros(),
            rotation: UnitQuaternion::identity(),
            scale: Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn rotation_xyzw(&self) -> [f32; 4] {
        quaternion_xyzw(&self.rotation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

fn quaternion_xyzw(q: &UnitQuaternion<f32>) -> [f32; 4] {
    [q.i, q.j, q.k, q.w]
}
