//! Transport seam between the client worker and the wire.

use super::config::ClientConfig;
use super::error::TransportError;

/// One websocket-style message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Binary(Vec<u8>),
}

impl Message {
    pub fn len(&self) -> usize {
        match self {
            Self::Text(s) => s.len(),
            Self::Binary(b) => b.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An open duplex connection, owned by exactly one worker thread.
pub trait Connection: Send {
    fn send(&mut self, message: Message) -> Result<(), TransportError>;

    /// Wait up to the receive poll interval for one inbound message.
    /// `Ok(None)` means nothing arrived in time.
    fn recv(&mut self) -> Result<Option<Message>, TransportError>;

    /// Close the connection. Safe to call more than once.
    fn close(&mut self);
}

/// Opens connections to the configured endpoint.
pub trait Connector: Send + Sync {
    fn connect(&self, config: &ClientConfig) -> Result<Box<dyn Connection>, TransportError>;
}
