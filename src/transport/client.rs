//! Reconstruction client: connection lifecycle, send loop and inbound dispatch.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::fragment::{Fragment, ModelResult};

use super::config::ClientConfig;
use super::connection::{Connection, Connector, Message};
use super::error::TransportError;
use super::messages::{parse_model_list, ClientEvent, Handshake, Role};
use super::queue::SendQueue;
use super::shared_state::{ConnectionState, LinkState};
use super::websocket::WebSocketConnector;

type Subscribers = Arc<Mutex<Vec<Sender<ClientEvent>>>>;

/// Explicitly owned client for one reconstruction endpoint.
///
/// Enqueueing only touches the [`SendQueue`]; the socket is owned by a
/// worker thread started by [`connect`](Self::connect) and stopped by
/// [`disconnect`](Self::disconnect). Queued fragments survive a disconnect
/// and are sent on the next connection.
pub struct ReconstructionClient {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    queue: Arc<SendQueue>,
    link: Arc<LinkState>,
    subscribers: Subscribers,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl ReconstructionClient {
    pub fn new(config: ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let queue = Arc::new(SendQueue::new(config.max_queued_models));
        Self {
            config,
            connector,
            queue,
            link: LinkState::new(),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            worker: Mutex::new(None),
        }
    }

    /// Client over a plain websocket connection.
    pub fn websocket(config: ClientConfig) -> Self {
        Self::new(config, Arc::new(WebSocketConnector))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Open the connection and send the handshake.
    ///
    /// No-op while connecting or connected. Failures are published as
    /// [`ClientEvent::ConnectionFailed`] and leave the client disconnected.
    pub fn connect(&self, role: Role, scene: impl Into<String>) {
        // Held until the new worker is stored, so a concurrent disconnect
        // either runs before the state change or stops the new worker.
        let mut worker = self.worker.lock();
        if !self.link.begin_connect() {
            debug!("connect ignored, client is {:?}", self.link.state());
            return;
        }

        // A previous worker may have exited on its own after a dropped link.
        if let Some(handle) = worker.take() {
            let _ = handle.join();
        }
        self.link.clear_shutdown();

        let task = Worker {
            config: self.config.clone(),
            connector: Arc::clone(&self.connector),
            queue: Arc::clone(&self.queue),
            link: Arc::clone(&self.link),
            subscribers: Arc::clone(&self.subscribers),
            handshake: Handshake::new(role, scene),
        };
        *worker = Some(thread::spawn(move || task.run()));
    }

    /// Queue a fragment for sending. Never blocks on network I/O.
    pub fn enqueue(&self, fragment: impl Into<Fragment>) {
        let fragment = fragment.into();
        debug!("Enqueued {} fragment", fragment.kind());
        self.queue.push(fragment);
    }

    /// Receive every event published from now on.
    pub fn subscribe(&self) -> Receiver<ClientEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    pub fn state(&self) -> ConnectionState {
        self.link.state()
    }

    pub fn is_handshake_acknowledged(&self) -> bool {
        self.link.is_handshake_acknowledged()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    pub fn queue(&self) -> &Arc<SendQueue> {
        &self.queue
    }

    /// Close the connection and stop the worker. Queued entries are kept.
    /// Safe to call when already disconnected.
    pub fn disconnect(&self) {
        // The worker never takes this lock, so joining under it is safe.
        let mut worker = self.worker.lock();
        if let Some(handle) = worker.take() {
            self.link.request_shutdown();
            if handle.join().is_err() {
                error!("Transport worker panicked");
                self.link.set_state(ConnectionState::Disconnected);
            }
            self.link.clear_shutdown();
        }
    }
}

impl Drop for ReconstructionClient {
    fn drop(&mut self) {
        self.disconnect();
    }
}

/// Everything the worker thread needs, moved in at spawn time.
struct Worker {
    config: ClientConfig,
    connector: Arc<dyn Connector>,
    queue: Arc<SendQueue>,
    link: Arc<LinkState>,
    subscribers: Subscribers,
    handshake: Handshake,
}

/// Outcome of one pass over the send queue.
enum Drain {
    /// Queue empty or shutdown requested.
    Idle,
    /// A send failed; retry after the backoff.
    Backoff,
    /// The connection is gone.
    Lost(TransportError),
}

impl Worker {
    fn run(self) {
        let url = self.config.server_url.clone();
        info!("Connecting to {} as {}", url, self.handshake.role.as_str());

        let mut conn = match self.connector.connect(&self.config) {
            Ok(conn) => conn,
            Err(err) => {
                warn!("Connection failed: {}", err);
                self.link.set_state(ConnectionState::Disconnected);
                self.publish(ClientEvent::ConnectionFailed(err.to_string()));
                return;
            }
        };

        self.link.set_state(ConnectionState::Connected);
        self.publish(ClientEvent::Connected);

        let payload = self.handshake.to_json();
        if let Err(err) = conn.send(Message::Text(payload)) {
            let err = TransportError::Handshake(err.to_string());
            warn!("{}", err);
            conn.close();
            self.link.set_state(ConnectionState::Disconnected);
            self.publish(ClientEvent::ConnectionFailed(err.to_string()));
            return;
        }
        self.link.set_handshake_acknowledged(true);
        info!("Handshake sent for scene '{}'", self.handshake.scene);

        self.serve(conn.as_mut());

        conn.close();
        self.link.set_state(ConnectionState::Disconnected);
        self.publish(ClientEvent::Disconnected);
        info!("Disconnected from {}", url);
    }

    /// Main loop: drain when allowed, then wait one poll interval for
    /// inbound data.
    fn serve(&self, conn: &mut dyn Connection) {
        let mut retry_at: Option<Instant> = None;
        let mut first_inbound = true;

        loop {
            if self.link.is_shutdown_requested() {
                break;
            }

            let backing_off = retry_at.is_some_and(|at| Instant::now() < at);
            if !backing_off && !self.queue.is_empty() {
                retry_at = None;
                match self.drain(conn) {
                    Drain::Idle => {}
                    Drain::Backoff => retry_at = Some(Instant::now() + self.config.send_backoff()),
                    Drain::Lost(err) => {
                        warn!("Connection lost while sending: {}", err);
                        break;
                    }
                }
            }

            match conn.recv() {
                Ok(Some(message)) => {
                    self.dispatch(message, first_inbound);
                    first_inbound = false;
                }
                Ok(None) => {}
                Err(err) => {
                    if err.is_fatal() {
                        info!("Connection closed by peer: {}", err);
                        break;
                    }
                    warn!("Receive failed: {}", err);
                }
            }
        }
    }

    /// Pop, encode and send until the queue is empty or a send fails.
    fn drain(&self, conn: &mut dyn Connection) -> Drain {
        while self.link.is_ready() && !self.link.is_shutdown_requested() {
            let Some(fragment) = self.queue.pop() else {
                return Drain::Idle;
            };

            let kind = fragment.kind();
            let bytes = match fragment.encode() {
                Ok(bytes) => bytes,
                Err(source) => {
                    let err = TransportError::Encode {
                        kind,
                        source: source.clone(),
                    };
                    error!("{}, dropping it: {}", err, source);
                    continue;
                }
            };
            let len = bytes.len();

            match conn.send(Message::Binary(bytes)) {
                Ok(()) => {
                    info!("Sent {} fragment ({} bytes)", kind, len);
                    thread::yield_now();
                }
                Err(err) => {
                    warn!("Sending {} fragment failed, requeued: {}", kind, err);
                    self.queue.requeue(fragment);
                    if err.is_fatal() {
                        return Drain::Lost(err);
                    }
                    return Drain::Backoff;
                }
            }
        }
        Drain::Idle
    }

    fn dispatch(&self, message: Message, first_inbound: bool) {
        if first_inbound {
            let payload = match &message {
                Message::Text(text) => text.as_bytes(),
                Message::Binary(bytes) => bytes.as_slice(),
            };
            if let Some(models) = parse_model_list(payload) {
                info!("Server offers models: {:?}", models);
                self.publish(ClientEvent::ModelsAvailable(models));
                return;
            }
        }

        match message {
            Message::Binary(bytes) => match ModelResult::decode(&bytes) {
                Ok(result) => {
                    debug!(
                        "Received model result for '{}' ({} bytes of GLB)",
                        result.scene(),
                        result.glb().len()
                    );
                    self.publish(ClientEvent::ModelResult(Arc::new(result)));
                }
                Err(err) => {
                    warn!("Rejected inbound message ({} bytes): {}", bytes.len(), err);
                    self.publish(ClientEvent::DecodeFailed(err));
                }
            },
            Message::Text(text) => debug!("Ignoring text message: {}", text),
        }
    }

    fn publish(&self, event: ClientEvent) {
        self.subscribers
            .lock()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use nalgebra::{UnitQuaternion, Vector3};

    use super::*;
    use crate::capture::{Extrinsics, Frame, Intrinsics};
    use crate::codec;
    use crate::fragment::{ModelFragment, TransformFragment};
    use crate::geometry::Transform;
    use crate::transport::mock::{test_config, wait_until, MockConnector};

    fn model(name: &str) -> ModelFragment {
        ModelFragment::new(
            name,
            None,
            vec![Frame::new(vec![7; 4], 2, 2)],
            vec![Intrinsics::new(1.0, 1.0, 0.5, 0.5)],
            vec![Extrinsics::identity()],
        )
        .unwrap()
    }

    fn transform(scene: &str, x: f32) -> TransformFragment {
        TransformFragment::new(
            scene,
            Transform::new(Vector3::new(x, 0.0, 0.0), UnitQuaternion::identity(), Vector3::repeat(1.0)),
        )
    }

    fn client_with_mock() -> (ReconstructionClient, MockConnector) {
        let mock = MockConnector::new();
        let client = ReconstructionClient::new(test_config(), Arc::new(mock.clone()));
        (client, mock)
    }

    #[test]
    fn test_handshake_is_first_message() {
        let (client, mock) = client_with_mock();
        client.enqueue(model("neural_recon"));
        client.connect(Role::Host, "room1");

        assert!(wait_until(|| mock.server.sent().len() == 2));
        let sent = mock.server.sent();
        assert_eq!(sent[0], Message::Text(r#"{"role":"host","scene":"room1"}"#.to_string()));
        assert!(matches!(sent[1], Message::Binary(_)));
        assert_eq!(client.state(), ConnectionState::Connected);
        assert!(client.is_handshake_acknowledged());
    }

    #[test]
    fn test_queue_priority_on_the_wire() {
        let (client, mock) = client_with_mock();
        client.enqueue(model("a"));
        client.enqueue(transform("room1", 1.0));
        client.enqueue(transform("room1", 2.0));
        client.enqueue(model("b"));
        client.connect(Role::Host, "room1");

        assert!(wait_until(|| mock.server.sent_binary().len() == 3));
        let sent: Vec<Fragment> = mock
            .server
            .sent_binary()
            .iter()
            .map(|bytes| Fragment::decode(bytes).unwrap())
            .collect();

        match &sent[0] {
            Fragment::Transform(t) => assert_eq!(t.transform.position.x, 2.0),
            other => panic!("expected transform first, got {}", other.kind()),
        }
        match (&sent[1], &sent[2]) {
            (Fragment::Model(a), Fragment::Model(b)) => {
                assert_eq!(a.model_name(), "a");
                assert_eq!(b.model_name(), "b");
            }
            _ => panic!("expected two model fragments"),
        }
        assert_eq!(client.queued_len(), 0);
    }

    #[test]
    fn test_failed_send_is_requeued_and_delivered_once() {
        let (client, mock) = client_with_mock();
        mock.server.fail_binary.store(true, Ordering::SeqCst);
        client.enqueue(model("a"));
        client.connect(Role::Host, "room1");

        assert!(wait_until(|| {
            mock.server.failed_sends.load(Ordering::SeqCst) >= 1 && client.queued_len() == 1
        }));
        assert_eq!(client.state(), ConnectionState::Connected);

        mock.server.fail_binary.store(false, Ordering::SeqCst);
        assert!(wait_until(|| mock.server.sent_binary().len() == 1));
        thread::sleep(Duration::from_millis(100));
        assert_eq!(mock.server.sent_binary().len(), 1);
        assert_eq!(client.queued_len(), 0);
    }

    #[test]
    fn test_inbound_dispatch() {
        let (client, mock) = client_with_mock();
        let events = client.subscribe();

        mock.server
            .push_inbound(Message::Text(r#"["neural_recon","slam3r"]"#.to_string()));
        let result = ModelResult::new("room1", true, Transform::identity(), vec![1, 2, 3, 4, 5]);
        mock.server
            .push_inbound(Message::Binary(codec::encode_model_result(&result).unwrap()));
        mock.server.push_inbound(Message::Binary(b"XXXX\x01\x00\x00\x00".to_vec()));
        client.connect(Role::Visitor, "room1");

        let mut seen = Vec::new();
        while seen.len() < 4 {
            match events.recv_timeout(Duration::from_secs(2)) {
                Ok(event) => seen.push(event),
                Err(_) => break,
            }
        }

        assert!(matches!(seen[0], ClientEvent::Connected));
        match &seen[1] {
            ClientEvent::ModelsAvailable(models) => assert_eq!(models, &["neural_recon", "slam3r"]),
            other => panic!("unexpected event {:?}", other),
        }
        match &seen[2] {
            ClientEvent::ModelResult(result) => {
                assert_eq!(result.scene(), "room1");
                assert!(result.is_point_cloud());
                assert_eq!(result.glb(), &[1, 2, 3, 4, 5]);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(
            seen[3],
            ClientEvent::DecodeFailed(codec::CodecError::InvalidHeader { .. })
        ));
        assert_eq!(client.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_connect_failure_returns_to_disconnected() {
        let (client, mock) = client_with_mock();
        mock.server.fail_connect.store(true, Ordering::SeqCst);
        let events = client.subscribe();
        client.enqueue(model("a"));
        client.connect(Role::Host, "room1");

        let event = events.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(event, ClientEvent::ConnectionFailed(_)));
        assert!(wait_until(|| client.state() == ConnectionState::Disconnected));
        assert_eq!(client.queued_len(), 1);

        mock.server.fail_connect.store(false, Ordering::SeqCst);
        client.connect(Role::Host, "room1");
        assert!(wait_until(|| mock.server.sent_binary().len() == 1));
    }

    #[test]
    fn test_connect_is_idempotent() {
        let (client, mock) = client_with_mock();
        client.connect(Role::Host, "room1");
        assert!(wait_until(|| client.is_handshake_acknowledged()));
        client.connect(Role::Host, "room1");
        client.connect(Role::Host, "room1");
        thread::sleep(Duration::from_millis(20));
        assert_eq!(mock.server.connects.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disconnect_is_safe_twice() {
        let (client, mock) = client_with_mock();
        client.disconnect();

        client.connect(Role::Host, "room1");
        assert!(wait_until(|| client.is_handshake_acknowledged()));
        client.disconnect();
        client.disconnect();

        assert_eq!(client.state(), ConnectionState::Disconnected);
        assert!(!client.is_handshake_acknowledged());
        assert_eq!(mock.server.closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_connect_and_disconnect_settle() {
        let (client, _mock) = client_with_mock();
        let client = Arc::new(client);

        for _ in 0..50 {
            let barrier = Arc::new(std::sync::Barrier::new(2));
            let connecting = {
                let (client, barrier) = (Arc::clone(&client), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    client.connect(Role::Host, "room1");
                })
            };
            let disconnecting = {
                let (client, barrier) = (Arc::clone(&client), Arc::clone(&barrier));
                thread::spawn(move || {
                    barrier.wait();
                    client.disconnect();
                })
            };
            connecting.join().unwrap();
            disconnecting.join().unwrap();

            // Either the disconnect won and nothing runs, or the worker it
            // missed keeps its connection open.
            if client.worker.lock().is_some() {
                assert!(wait_until(|| client.is_handshake_acknowledged()));
                assert!(!client.link.is_shutdown_requested());
            } else {
                assert_eq!(client.state(), ConnectionState::Disconnected);
            }

            client.disconnect();
            assert_eq!(client.state(), ConnectionState::Disconnected);
            assert!(client.worker.lock().is_none());
        }
    }

    #[test]
    fn test_fragments_survive_disconnect() {
        let (client, mock) = client_with_mock();
        client.connect(Role::Host, "room1");
        assert!(wait_until(|| client.is_handshake_acknowledged()));
        client.disconnect();

        client.enqueue(model("late"));
        thread::sleep(Duration::from_millis(20));
        assert!(mock.server.sent_binary().is_empty());
        assert_eq!(client.queued_len(), 1);

        client.connect(Role::Host, "room1");
        assert!(wait_until(|| mock.server.sent_binary().len() == 1));
    }
}
