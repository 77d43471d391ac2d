//! Capture device interface.

use super::types::{Extrinsics, Frame, Intrinsics};

/// Source of camera observations, polled once per capture tick.
///
/// Implementations return the most recent observation and must tolerate
/// being polled at any rate. A frame with zero dimensions means "nothing
/// new this poll" and is skipped by the caller.
pub trait CaptureDevice {
    fn intrinsics(&mut self) -> Intrinsics;

    fn extrinsics(&mut self) -> Extrinsics;

    fn frame(&mut self) -> Frame;
}
