use nalgebra::{UnitQuaternion, Vector3};

use crate::codec::{self, CodecError};
use crate::geometry::Transform;

/// Reconstructed model returned by the service.
///
/// The mesh blob is a GLB asset; interpreting it is the renderer's job.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelResult {
    pub(crate) scene: String,
    pub(crate) is_point_cloud: bool,
    pub(crate) transform: Transform,
    pub(crate) glb: Vec<u8>,
}

impl ModelResult {
    pub fn new(scene: impl Into<String>, is_point_cloud: bool, transform: Transform, glb: Vec<u8>) -> Self {
        Self {
            scene: scene.into(),
            is_point_cloud,
            transform,
            glb,
        }
    }

    /// Parse a server response.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        codec::decode_model_result(bytes)
    }

    /// Serialize in the server's response layout.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        codec::encode_model_result(self)
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn is_point_cloud(&self) -> bool {
        self.is_point_cloud
    }

    pub fn glb(&self) -> &[u8] {
        &self.glb
    }

    pub fn into_glb(self) -> Vec<u8> {
        self.glb
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position
    }

    pub fn rotation(&self) -> UnitQuaternion<f32> {
        self.transform.rotation
    }

    pub fn scale(&self) -> Vector3<f32> {
        self.transform.scale
    }
}
