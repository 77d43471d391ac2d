//! In-memory connection used by the client and session tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use super::config::ClientConfig;
use super::connection::{Connection, Connector, Message};
use super::error::TransportError;

/// Server side of the mock; cloned into every connection it opens.
pub(crate) struct MockServer {
    pub sent: Mutex<Vec<Message>>,
    pub connects: AtomicUsize,
    pub closes: AtomicUsize,
    pub failed_sends: AtomicUsize,
    pub fail_connect: AtomicBool,
    pub fail_binary: AtomicBool,
    inbound_tx: Sender<Message>,
    inbound_rx: Receiver<Message>,
}

impl MockServer {
    /// Queue a message for the client to receive.
    pub fn push_inbound(&self, message: Message) {
        let _ = self.inbound_tx.send(message);
    }

    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn sent_binary(&self) -> Vec<Vec<u8>> {
        self.sent
            .lock()
            .iter()
            .filter_map(|m| match m {
                Message::Binary(bytes) => Some(bytes.clone()),
                Message::Text(_) => None,
            })
            .collect()
    }
}

#[derive(Clone)]
pub(crate) struct MockConnector {
    pub server: Arc<MockServer>,
}

impl MockConnector {
    pub fn new() -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        Self {
            server: Arc::new(MockServer {
                sent: Mutex::new(Vec::new()),
                connects: AtomicUsize::new(0),
                closes: AtomicUsize::new(0),
                failed_sends: AtomicUsize::new(0),
                fail_connect: AtomicBool::new(false),
                fail_binary: AtomicBool::new(false),
                inbound_tx,
                inbound_rx,
            }),
        }
    }
}

impl Connector for MockConnector {
    fn connect(&self, config: &ClientConfig) -> Result<Box<dyn Connection>, TransportError> {
        self.server.connects.fetch_add(1, Ordering::SeqCst);
        if self.server.fail_connect.load(Ordering::SeqCst) {
            return Err(TransportError::Connect {
                url: config.server_url.clone(),
                reason: "refused".to_string(),
            });
        }
        Ok(Box::new(MockConnection {
            server: Arc::clone(&self.server),
            poll: config.recv_poll_interval(),
            closed: false,
        }))
    }
}

struct MockConnection {
    server: Arc<MockServer>,
    poll: Duration,
    closed: bool,
}

impl Connection for MockConnection {
    fn send(&mut self, message: Message) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        if matches!(message, Message::Binary(_)) && self.server.fail_binary.load(Ordering::SeqCst) {
            self.server.failed_sends.fetch_add(1, Ordering::SeqCst);
            return Err(TransportError::Send("injected failure".to_string()));
        }
        self.server.sent.lock().push(message);
        Ok(())
    }

    fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        match self.server.inbound_rx.recv_timeout(self.poll) {
            Ok(message) => Ok(Some(message)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Closed),
        }
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.server.closes.fetch_add(1, Ordering::SeqCst);
        }
    }
}

/// Poll `condition` until it holds or two seconds pass.
pub(crate) fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}

/// Config with short timings for tests.
pub(crate) fn test_config() -> ClientConfig {
    ClientConfig {
        server_url: "ws://mock".to_string(),
        send_backoff_ms: 50,
        recv_poll_interval_ms: 2,
        ..ClientConfig::default()
    }
}
