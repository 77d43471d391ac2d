//! Connection flags shared between the client handle and its worker.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

/// Connection lifecycle.
///
/// `Connected` is further gated by the handshake flag in [`LinkState`]:
/// outbound fragments only flow once the handshake went out.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connecting,
            2 => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

/// State readable by the client handle while the worker owns the socket.
pub struct LinkState {
    state: AtomicU8,

    /// Set once the handshake was sent; cleared on disconnect.
    handshake_acknowledged: AtomicBool,

    /// Request the worker to close the connection and exit.
    shutdown_requested: AtomicBool,
}

impl LinkState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::SeqCst);
        if state != ConnectionState::Connected {
            self.handshake_acknowledged.store(false, Ordering::SeqCst);
        }
    }

    /// Move Disconnected -> Connecting. Returns false if a connection is
    /// already open or being opened.
    pub fn begin_connect(&self) -> bool {
        self.state
            .compare_exchange(
                ConnectionState::Disconnected as u8,
                ConnectionState::Connecting as u8,
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    pub fn is_handshake_acknowledged(&self) -> bool {
        self.handshake_acknowledged.load(Ordering::SeqCst)
    }

    pub fn set_handshake_acknowledged(&self, value: bool) {
        self.handshake_acknowledged.store(value, Ordering::SeqCst);
    }

    /// Connected and handshake done: outbound fragments may flow.
    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Connected && self.is_handshake_acknowledged()
    }

    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
    }

    pub fn clear_shutdown(&self) {
        self.shutdown_requested.store(false, Ordering::SeqCst);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }
}

impl Default for LinkState {
    fn default() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            handshake_acknowledged: AtomicBool::new(false),
            shutdown_requested: AtomicBool::new(false),
        }
    }
}
