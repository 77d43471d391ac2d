//! Geometry utilities: camera poses, placement transforms, pose deltas.

pub mod pose;

pub use pose::{Pose, Transform, FORWARD};
