//! Transform fragment layout (version 2):
//!
//! ```text
//! magic(4) | version(i32) | scene_len(i32) | scene
//! px | py | pz | qx | qy | qz | qw | sx | sy | sz   (f32 each)
//! ```

use crate::fragment::TransformFragment;
use crate::geometry::{Pose, Transform};

use super::wire::{WireReader, WireWriter};
use super::{CodecError, TRANSFORM_FRAGMENT_VERSION};

pub fn encode_transform_fragment(fragment: &TransformFragment) -> Result<Vec<u8>, CodecError> {
    let mut w = WireWriter::with_capacity(12 + fragment.scene_id.len() + 40);
    w.write_header(TRANSFORM_FRAGMENT_VERSION);
    w.write_str("scene", &fragment.scene_id)?;
    write_transform(&mut w, &fragment.transform);
    Ok(w.finish())
}

pub fn decode_transform_fragment(bytes: &[u8]) -> Result<TransformFragment, CodecError> {
    let mut r = WireReader::new(bytes);
    r.expect_header(TRANSFORM_FRAGMENT_VERSION)?;
    let scene_id = r.read_string("scene")?;
    let transform = read_transform(&mut r)?;
    r.finish()?;
    Ok(TransformFragment::new(scene_id, transform))
}

pub(super) fn write_transform(w: &mut WireWriter, t: &Transform) {
    w.write_f32s(t.position.as_slice());
    w.write_f32s(&t.rotation_xyzw());
    w.write_f32s(t.scale.as_slice());
}

pub(super) fn read_transform(r: &mut WireReader<'_>) -> Result<Transform, CodecError> {
    let [px, py, pz, qx, qy, qz, qw] = r.read_f32s::<7>()?;
    let [sx, sy, sz] = r.read_f32s::<3>()?;
    let pose = Pose::from_components([px, py, pz], [qx, qy, qz, qw]);
    Ok(Transform::new(
        pose.position,
        pose.rotation,
        nalgebra::Vector3::new(sx, sy, sz),
    ))
}
