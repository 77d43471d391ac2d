//! Capture aggregation and streaming for remote 3D reconstruction.
//!
//! Camera observations are gated into keyframes, grouped into fixed-size
//! windows, serialized with the `LEON` wire format and streamed to a
//! reconstruction service, which answers with meshes placed in a scene.

pub mod capture;
pub mod codec;
pub mod collector;
pub mod fragment;
pub mod geometry;
pub mod io;
pub mod system;
pub mod transport;

pub use collector::{CollectorConfig, CollectorKind, FragmentCollector, ModelCollector};
pub use fragment::{Fragment, ModelFragment, ModelResult, TransformFragment};
pub use system::{CaptureSession, PollOutcome, SessionConfig};
pub use transport::{ClientConfig, ClientEvent, ReconstructionClient, Role};
