//! Capture loop step: device -> keyframe gate -> window -> send queue.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use crate::capture::CaptureDevice;
use crate::collector::{FragmentCollector, ModelCollector};
use crate::fragment::TransformFragment;
use crate::geometry::Transform;
use crate::io::RecordingWriter;
use crate::transport::{Connector, ReconstructionClient, Role};

use super::config::SessionConfig;

/// What one [`CaptureSession::poll`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Capture is off.
    Idle,
    /// Skipped by the frame stride.
    NotSampled,
    /// No usable observation this poll (missing intrinsics or frame).
    Skipped,
    /// Pose too close to the last keyframe.
    Rejected,
    /// Keyframe added; window not yet full.
    Collected,
    /// Keyframe added and the completed window was queued for sending.
    FragmentQueued,
}

/// One capture session against one scene.
///
/// Owned by the thread that drives capture. Nothing here blocks on the
/// network; the client's worker does all I/O.
pub struct CaptureSession<D: CaptureDevice> {
    role: Role,
    scene: String,
    device: D,
    collector: Box<dyn ModelCollector>,
    client: ReconstructionClient,
    /// Optional on-disk copy of every accepted keyframe.
    recorder: Option<RecordingWriter>,
    capturing: bool,
    frame_index: u64,
}

impl<D: CaptureDevice> CaptureSession<D> {
    /// Session over a websocket client.
    pub fn new(config: SessionConfig, device: D) -> Self {
        let client = ReconstructionClient::websocket(config.client);
        let collector = FragmentCollector::new(config.collector);
        Self::with_client(config.role, config.scene, collector, device, client)
    }

    /// Session over a custom connector.
    pub fn with_connector(config: SessionConfig, device: D, connector: Arc<dyn Connector>) -> Self {
        let client = ReconstructionClient::new(config.client, connector);
        let collector = FragmentCollector::new(config.collector);
        Self::with_client(config.role, config.scene, collector, device, client)
    }

    fn with_client(
        role: Role,
        scene: String,
        collector: FragmentCollector,
        device: D,
        client: ReconstructionClient,
    ) -> Self {
        Self {
            role,
            scene,
            device,
            collector: Box::new(collector),
            client,
            recorder: None,
            capturing: false,
            frame_index: 0,
        }
    }

    /// Connect to the service. Hosts start capturing right away.
    pub fn start(&mut self) {
        info!("Starting {} session for scene '{}'", self.role.as_str(), self.scene);
        self.client.connect(self.role, self.scene.clone());
        if self.role == Role::Host {
            self.set_capturing(true);
        }
    }

    /// Run one capture tick.
    pub fn poll(&mut self) -> PollOutcome {
        if !self.capturing {
            return PollOutcome::Idle;
        }

        let index = self.frame_index;
        self.frame_index += 1;
        if !self.collector.is_nth_frame(index) {
            return PollOutcome::NotSampled;
        }

        let intrinsics = self.device.intrinsics();
        if !intrinsics.is_valid() {
            return PollOutcome::Skipped;
        }
        let extrinsics = self.device.extrinsics();
        if !self.collector.should_collect(&intrinsics, &extrinsics) {
            return PollOutcome::Rejected;
        }

        let frame = self.device.frame();
        if !frame.is_available() {
            return PollOutcome::Skipped;
        }

        if let Some(recorder) = &mut self.recorder {
            if let Err(e) = recorder.append(unix_time_ns(), &intrinsics, &extrinsics, &frame) {
                warn!("Keyframe not recorded: {:#}", e);
            }
        }

        self.collector.collect(intrinsics, extrinsics, frame);
        if !self.collector.is_full() {
            return PollOutcome::Collected;
        }

        let fragment = self.collector.consume(&self.scene);
        debug!(
            "Queueing {} fragment ({} frames, {} image bytes)",
            fragment.model_name(),
            fragment.window_size(),
            fragment.image_bytes()
        );
        self.client.enqueue(fragment);
        PollOutcome::FragmentQueued
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    /// Turn capture on or off. Any change discards the partial window.
    pub fn set_capturing(&mut self, capturing: bool) {
        if self.capturing == capturing {
            return;
        }
        self.collector.clear();
        self.capturing = capturing;
        info!("Capture {}", if capturing { "started" } else { "stopped" });
    }

    /// Swap the collector, for example when the user picks another model.
    pub fn set_collector(&mut self, collector: Box<dyn ModelCollector>) {
        info!(
            "Switching collector {} -> {}",
            self.collector.model_name(),
            collector.model_name()
        );
        self.collector.clear();
        self.collector = collector;
    }

    /// Also write accepted keyframes to disk. Returns the previous recorder.
    pub fn set_recorder(&mut self, recorder: Option<RecordingWriter>) -> Option<RecordingWriter> {
        if let Some(r) = &recorder {
            info!("Recording keyframes to {}", r.root().display());
        }
        std::mem::replace(&mut self.recorder, recorder)
    }

    pub fn recorder(&self) -> Option<&RecordingWriter> {
        self.recorder.as_ref()
    }

    pub fn collector(&self) -> &dyn ModelCollector {
        self.collector.as_ref()
    }

    /// Queue a placement correction for this session's scene.
    pub fn send_transform(&self, transform: Transform) {
        self.client
            .enqueue(TransformFragment::new(self.scene.clone(), transform));
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn client(&self) -> &ReconstructionClient {
        &self.client
    }

    /// Stop capturing and close the connection. Queued fragments that were
    /// not sent yet are discarded with the session.
    pub fn shutdown(&mut self) {
        self.set_capturing(false);
        self.client.disconnect();
    }
}

fn unix_time_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

impl<D: CaptureDevice> Drop for CaptureSession<D> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
