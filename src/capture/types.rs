//! Per-observation capture records.

use nalgebra::Vector2;

use crate::geometry::Pose;

/// Camera pose at capture time.
pub type Extrinsics = Pose;

/// Pinhole projection parameters of one captured frame (pixels).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    pub focal_length: Vector2<f32>,
    pub principal_point: Vector2<f32>,
}

impl Intrinsics {
    pub fn new(fx: f32, fy: f32, cx: f32, cy: f32) -> Self {
        Self {
            focal_length: Vector2::new(fx, fy),
            principal_point: Vector2::new(cx, cy),
        }
    }

    /// All-zero intrinsics, reported by devices that have no calibration yet.
    pub fn unavailable() -> Self {
        Self::new(0.0, 0.0, 0.0, 0.0)
    }

    /// True when every component is strictly positive.
    pub fn is_valid(&self) -> bool {
        self.focal_length.iter().all(|v| *v > 0.0) && self.principal_point.iter().all(|v| *v > 0.0)
    }

    /// Rescale intrinsics reported at one image resolution to another.
    ///
    /// Headset cameras report calibration at the sensor's native resolution
    /// while frames are requested smaller; focal length and principal point
    /// scale linearly with the image axes.
    pub fn rescaled(&self, from: (u32, u32), to: (u32, u32)) -> Self {
        if from.0 == 0 || from.1 == 0 {
            return *self;
        }
        let scale = Vector2::new(to.0 as f32 / from.0 as f32, to.1 as f32 / from.1 as f32);
        Self {
            focal_length: self.focal_length.component_mul(&scale),
            principal_point: self.principal_point.component_mul(&scale),
        }
    }
}

impl Default for Intrinsics {
    fn default() -> Self {
        Self::unavailable()
    }
}

/// One encoded still image with its declared dimensions.
///
/// The bytes are opaque (JPEG/PNG); nothing in this crate decodes pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    pub image: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(image: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            image,
            width,
            height,
        }
    }

    /// Placeholder returned when a device has no image this poll.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A frame with a zero dimension carries no observation.
    pub fn is_available(&self) -> bool {
        self.width > 0 && self.height > 0
    }
}
