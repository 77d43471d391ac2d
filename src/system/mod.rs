//! Session orchestration.
//!
//! A [`CaptureSession`] ties a capture device, a collector and a
//! [`crate::transport::ReconstructionClient`] together. The host
//! application calls [`CaptureSession::poll`] once per capture tick; full
//! windows are handed to the client's queue and sent by its worker thread.

pub mod config;
pub mod session;

pub use config::SessionConfig;
pub use session::{CaptureSession, PollOutcome};
