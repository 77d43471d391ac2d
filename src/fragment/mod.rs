//! Units of data exchanged with the reconstruction service.
//!
//! - [`ModelFragment`]: a full window of keyframes (images + poses) bound for
//!   a named reconstruction model.
//! - [`TransformFragment`]: a placement correction for a scene.
//! - [`Fragment`]: either of the above, as held by the send queue.
//! - [`ModelResult`]: a reconstructed mesh sent back by the service.

pub mod model;
pub mod result;
pub mod transform;

pub use model::ModelFragment;
pub use result::ModelResult;
pub use transform::TransformFragment;

use crate::codec::{self, CodecError};

/// Outbound queue entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Model(ModelFragment),
    Transform(TransformFragment),
}

impl Fragment {
    /// Short label used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Model(_) => "model",
            Self::Transform(_) => "transform",
        }
    }

    pub fn is_transform(&self) -> bool {
        matches!(self, Self::Transform(_))
    }

    /// Serialize to the binary wire format.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        match self {
            Self::Model(fragment) => codec::encode_model_fragment(fragment),
            Self::Transform(fragment) => codec::encode_transform_fragment(fragment),
        }
    }

    /// Parse either fragment kind, dispatching on the header version.
    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        match codec::peek_version(bytes)? {
            codec::MODEL_FRAGMENT_VERSION => codec::decode_model_fragment(bytes).map(Self::Model),
            codec::TRANSFORM_FRAGMENT_VERSION => {
                codec::decode_transform_fragment(bytes).map(Self::Transform)
            }
            found => Err(CodecError::UnsupportedVersion {
                expected: codec::MODEL_FRAGMENT_VERSION,
                found,
            }),
        }
    }
}

impl From<ModelFragment> for Fragment {
    fn from(fragment: ModelFragment) -> Self {
        Self::Model(fragment)
    }
}

impl From<TransformFragment> for Fragment {
    fn from(fragment: TransformFragment) -> Self {
        Self::Transform(fragment)
    }
}
