use crate::capture::{Extrinsics, Frame, Intrinsics};
use crate::codec::CodecError;

/// A window of keyframes handed from the collector to the transport.
///
/// `frames[i]`, `intrinsics[i]` and `extrinsics[i]` describe the same capture
/// instant. The fragment is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelFragment {
    model_name: String,
    scene_id: Option<String>,
    frames: Vec<Frame>,
    intrinsics: Vec<Intrinsics>,
    extrinsics: Vec<Extrinsics>,
}

impl ModelFragment {
    /// Build a fragment from three parallel sequences of equal length.
    pub fn new(
        model_name: impl Into<String>,
        scene_id: Option<String>,
        frames: Vec<Frame>,
        intrinsics: Vec<Intrinsics>,
        extrinsics: Vec<Extrinsics>,
    ) -> Result<Self, CodecError> {
        if frames.len() != intrinsics.len() || frames.len() != extrinsics.len() {
            return Err(CodecError::LengthMismatch {
                frames: frames.len(),
                intrinsics: intrinsics.len(),
                extrinsics: extrinsics.len(),
            });
        }
        Ok(Self {
            model_name: model_name.into(),
            scene_id,
            frames,
            intrinsics,
            extrinsics,
        })
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    pub fn scene_id(&self) -> Option<&str> {
        self.scene_id.as_deref()
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn intrinsics(&self) -> &[Intrinsics] {
        &self.intrinsics
    }

    pub fn extrinsics(&self) -> &[Extrinsics] {
        &self.extrinsics
    }

    /// Number of observations (the collector's window size).
    pub fn window_size(&self) -> usize {
        self.frames.len()
    }

    /// Total encoded image payload in bytes.
    pub fn image_bytes(&self) -> usize {
        self.frames.iter().map(|f| f.image.len()).sum()
    }
}
