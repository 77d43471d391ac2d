//! Model fragment layout (version 1):
//!
//! ```text
//! magic(4) | version(i32) | window(i32) | name_len(i32) | name
//! window x { image_len(i32) | image | width(f32) | height(f32) }
//! window x { fx | fy | cx | cy }                 (f32 each)
//! window x { px | py | pz | qx | qy | qz | qw }   (f32 each)
//! ```
//!
//! The scene id is not part of the payload; it travels in the handshake.

use crate::capture::{Extrinsics, Frame, Intrinsics};
use crate::fragment::ModelFragment;

use super::wire::{WireReader, WireWriter};
use super::{CodecError, MODEL_FRAGMENT_VERSION};

/// Fixed per-frame overhead: image length prefix + two dimensions.
const FRAME_OVERHEAD: usize = 4 + 8;
const INTRINSICS_SIZE: usize = 4 * 4;
const EXTRINSICS_SIZE: usize = 7 * 4;

pub fn encode_model_fragment(fragment: &ModelFragment) -> Result<Vec<u8>, CodecError> {
    let n = fragment.window_size();
    let capacity = 16
        + fragment.model_name().len()
        + fragment.image_bytes()
        + n * (FRAME_OVERHEAD + INTRINSICS_SIZE + EXTRINSICS_SIZE);
    let mut w = WireWriter::with_capacity(capacity);

    w.write_header(MODEL_FRAGMENT_VERSION);
    w.write_len("window", n)?;
    w.write_str("model name", fragment.model_name())?;

    for frame in fragment.frames() {
        w.write_bytes("image", &frame.image)?;
        w.write_f32(frame.width as f32);
        w.write_f32(frame.height as f32);
    }
    for k in fragment.intrinsics() {
        w.write_f32s(&[
            k.focal_length.x,
            k.focal_length.y,
            k.principal_point.x,
            k.principal_point.y,
        ]);
    }
    for pose in fragment.extrinsics() {
        w.write_f32s(pose.position.as_slice());
        w.write_f32s(&pose.rotation_xyzw());
    }

    Ok(w.finish())
}

pub fn decode_model_fragment(bytes: &[u8]) -> Result<ModelFragment, CodecError> {
    let mut r = WireReader::new(bytes);
    r.expect_header(MODEL_FRAGMENT_VERSION)?;

    let n = r.read_len("window")?;
    let model_name = r.read_string("model name")?;

    // A corrupt window count must not drive the allocation.
    let mut frames = Vec::with_capacity(n.min(r.remaining() / FRAME_OVERHEAD));
    for _ in 0..n {
        let image = r.read_bytes("image")?.to_vec();
        let [width, height] = r.read_f32s::<2>()?;
        frames.push(Frame::new(image, width as u32, height as u32));
    }

    let mut intrinsics = Vec::with_capacity(n.min(r.remaining() / INTRINSICS_SIZE));
    for _ in 0..n {
        let [fx, fy, cx, cy] = r.read_f32s::<4>()?;
        intrinsics.push(Intrinsics::new(fx, fy, cx, cy));
    }

    let mut extrinsics = Vec::with_capacity(n.min(r.remaining() / EXTRINSICS_SIZE));
    for _ in 0..n {
        let [px, py, pz, qx, qy, qz, qw] = r.read_f32s::<7>()?;
        extrinsics.push(Extrinsics::from_components([px, py, pz], [qx, qy, qz, qw]));
    }

    r.finish()?;
    ModelFragment::new(model_name, None, frames, intrinsics, extrinsics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::MAGIC;

    fn two_frame_fragment() -> ModelFragment {
        ModelFragment::new(
            "neural_recon",
            Some("room1".to_string()),
            vec![Frame::new(vec![0; 10], 4, 4), Frame::new(Vec::new(), 0, 0)],
            vec![
                Intrinsics::new(1.0, 1.0, 0.0, 0.0),
                Intrinsics::new(2.0, 2.0, 1.0, 1.0),
            ],
            vec![
                Extrinsics::identity(),
                Extrinsics::from_components([1.0, 2.0, 3.0], [0.0, 0.0, 0.0, 1.0]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_layout_of_header_and_first_frame() {
        let bytes = encode_model_fragment(&two_frame_fragment()).unwrap();
        assert_eq!(&bytes[0..4], &MAGIC);
        assert_eq!(&bytes[4..8], &1i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &2i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &12i32.to_le_bytes());
        assert_eq!(&bytes[16..28], b"neural_recon");
        assert_eq!(&bytes[28..32], &10i32.to_le_bytes());
        assert_eq!(&bytes[32..42], &[0u8; 10]);
        assert_eq!(&bytes[42..46], &4f32.to_le_bytes());

        // header + name + 2 frames (12 + 10 bytes, 12 bytes) + 2 x 16 + 2 x 28
        assert_eq!(bytes.len(), 16 + 12 + 22 + 12 + 32 + 56);
    }

    #[test]
    fn test_decode_reproduces_every_field() {
        let fragment = two_frame_fragment();
        let decoded = decode_model_fragment(&encode_model_fragment(&fragment).unwrap()).unwrap();

        assert_eq!(decoded.model_name(), "neural_recon");
        assert_eq!(decoded.scene_id(), None);
        assert_eq!(decoded.frames(), fragment.frames());
        assert_eq!(decoded.intrinsics(), fragment.intrinsics());
        for (a, b) in decoded.extrinsics().iter().zip(fragment.extrinsics()) {
            assert_eq!(a.position, b.position);
            assert_eq!(a.rotation_xyzw(), b.rotation_xyzw());
        }
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        let bytes = encode_model_fragment(&two_frame_fragment()).unwrap();
        let err = decode_model_fragment(&bytes[..bytes.len() - 1]).unwrap_err();
        assert!(matches!(err, CodecError::Truncated { .. }));
    }

    #[test]
    fn test_trailing_bytes_are_rejected() {
        let mut bytes = encode_model_fragment(&two_frame_fragment()).unwrap();
        bytes.push(0);
        assert_eq!(
            decode_model_fragment(&bytes).unwrap_err(),
            CodecError::TrailingBytes { count: 1 }
        );
    }

    #[test]
    fn test_transform_version_is_not_a_model_fragment() {
        let mut bytes = encode_model_fragment(&two_frame_fragment()).unwrap();
        bytes[4..8].copy_from_slice(&2i32.to_le_bytes());
        assert_eq!(
            decode_model_fragment(&bytes).unwrap_err(),
            CodecError::UnsupportedVersion {
                expected: 1,
                found: 2
            }
        );
    }

    #[test]
    fn test_huge_window_count_fails_without_allocating() {
        let mut bytes = encode_model_fragment(&two_frame_fragment()).unwrap();
        bytes[8..12].copy_from_slice(&i32::MAX.to_le_bytes());
        assert!(matches!(
            decode_model_fragment(&bytes).unwrap_err(),
            CodecError::Truncated { .. }
        ));
    }
}
