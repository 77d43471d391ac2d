//! Model result layout (server -> client):
//!
//! ```text
//! magic(4) | version(i32) | scene_len(i32) | scene | is_point_cloud(u8)
//! px | py | pz | qx | qy | qz | qw | sx | sy | sz   (f32 each)
//! glb (all remaining bytes)
//! ```
//!
//! The version is read but not interpreted.

use crate::fragment::ModelResult;

use super::transform_fragment::{read_transform, write_transform};
use super::wire::{WireReader, WireWriter};
use super::{CodecError, MODEL_RESULT_VERSION};

pub fn decode_model_result(bytes: &[u8]) -> Result<ModelResult, CodecError> {
    let mut r = WireReader::new(bytes);
    let _version = r.read_header()?;
    let scene = r.read_string("scene")?;
    let is_point_cloud = r.read_u8()? != 0;
    let transform = read_transform(&mut r)?;
    let glb = r.read_rest().to_vec();
    Ok(ModelResult::new(scene, is_point_cloud, transform, glb))
}

pub fn encode_model_result(result: &ModelResult) -> Result<Vec<u8>, CodecError> {
    let mut w = WireWriter::with_capacity(53 + result.scene().len() + result.glb().len());
    w.write_header(MODEL_RESULT_VERSION);
    w.write_str("scene", result.scene())?;
    w.write_u8(u8::from(result.is_point_cloud()));
    write_transform(&mut w, result.transform());
    w.write_raw(result.glb());
    Ok(w.finish())
}
