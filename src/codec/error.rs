/// Rejected message. Decoding never applies partial state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("invalid magic header {found:?}")]
    InvalidHeader { found: Vec<u8> },
    #[error("unsupported version {found} (expected {expected})")]
    UnsupportedVersion { expected: i32, found: i32 },
    #[error("truncated message: needed {needed} bytes at offset {offset}, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
    #[error("negative {field} length {value}")]
    NegativeLength { field: &'static str, value: i32 },
    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },
    #[error("{count} unexpected trailing bytes")]
    TrailingBytes { count: usize },
    #[error("{field} length {len} does not fit the wire format")]
    TooLarge { field: &'static str, len: usize },
    #[error(
        "parallel sequences differ in length: {frames} frames, {intrinsics} intrinsics, {extrinsics} extrinsics"
    )]
    LengthMismatch {
        frames: usize,
        intrinsics: usize,
        extrinsics: usize,
    },
}
