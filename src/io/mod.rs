//! Offline data sources.

pub mod recording;

pub use recording::{RecordedCaptureDevice, Recording, RecordingEntry, RecordingWriter};
