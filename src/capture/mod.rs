//! Capture data model and the capture-device seam.
//!
//! The pipeline never talks to a camera SDK directly. A [`CaptureDevice`]
//! hands out the most recent intrinsics, extrinsics and encoded image on
//! every poll; everything downstream works on the plain types defined here.

pub mod device;
pub mod types;

pub use device::CaptureDevice;
pub use types::{Extrinsics, Frame, Intrinsics};
