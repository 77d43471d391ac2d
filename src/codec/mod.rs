//! Binary wire format.
//!
//! Every message starts with the ASCII magic `LEON` and a little-endian
//! `i32` version that also identifies the payload kind:
//!
//! | version | payload                 | direction        |
//! |---------|-------------------------|------------------|
//! | 1       | model fragment          | client -> server |
//! | 2       | transform fragment      | client -> server |
//! | any     | model result            | server -> client |
//!
//! Integers are two's-complement `i32`, floats IEEE-754 `f32`, all
//! little-endian. Strings are `i32` length-prefixed UTF-8. There is no
//! compression and no checksum.

mod error;
mod model_fragment;
mod model_result;
mod transform_fragment;
mod wire;

pub use error::CodecError;
pub use model_fragment::{decode_model_fragment, encode_model_fragment};
pub use model_result::{decode_model_result, encode_model_result};
pub use transform_fragment::{decode_transform_fragment, encode_transform_fragment};

/// Leading bytes of every message.
pub const MAGIC: [u8; 4] = *b"LEON";

/// Header version of a model fragment.
pub const MODEL_FRAGMENT_VERSION: i32 = 1;

/// Header version of a transform fragment.
pub const TRANSFORM_FRAGMENT_VERSION: i32 = 2;

/// Header version written for model results.
pub const MODEL_RESULT_VERSION: i32 = 1;

/// Validate the magic and return the header version without consuming the
/// payload.
pub fn peek_version(bytes: &[u8]) -> Result<i32, CodecError> {
    let mut reader = wire::WireReader::new(bytes);
    reader.read_header()
}
