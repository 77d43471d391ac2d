use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the [`super::ReconstructionClient`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Websocket endpoint. Only `ws://` is supported; TLS must be terminated
    /// in front of the service.
    pub server_url: String,

    /// Budget for TCP connect plus the websocket upgrade.
    pub connect_timeout_ms: u64,

    /// A send that has not completed after this long counts as failed.
    pub send_timeout_ms: u64,

    /// Pause after a failed send before the queue is retried.
    pub send_backoff_ms: u64,

    /// How long the worker waits for inbound data per loop iteration.
    pub recv_poll_interval_ms: u64,

    /// Cap on queued model fragments; the oldest is dropped beyond it.
    /// `None` leaves the queue unbounded.
    pub max_queued_models: Option<usize>,
}

impl ClientConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    pub fn send_backoff(&self) -> Duration {
        Duration::from_millis(self.send_backoff_ms)
    }

    pub fn recv_poll_interval(&self) -> Duration {
        Duration::from_millis(self.recv_poll_interval_ms.max(1))
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://localhost:8765".to_string(),
            connect_timeout_ms: 5_000,
            send_timeout_ms: 10_000,
            send_backoff_ms: 100,
            recv_poll_interval_ms: 20,
            max_queued_models: Some(64),
        }
    }
}
