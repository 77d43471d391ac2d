//! Connection to the reconstruction service.
//!
//! The [`ReconstructionClient`] owns one duplex connection and a worker
//! thread that:
//! 1. Opens the connection and sends the role/scene handshake
//! 2. Drains the [`SendQueue`] (transforms first, then model fragments FIFO)
//! 3. Requeues entries whose send failed and retries after a backoff
//! 4. Decodes inbound messages and publishes them as [`ClientEvent`]s
//!
//! The capture thread only ever touches the queue, so it never waits on
//! network I/O. Fragment encoding also happens on the worker.

pub mod client;
pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod queue;
pub mod shared_state;
pub mod websocket;

#[cfg(test)]
pub(crate) mod mock;

pub use client::ReconstructionClient;
pub use config::ClientConfig;
pub use connection::{Connection, Connector, Message};
pub use error::TransportError;
pub use messages::{ClientEvent, Handshake, Role};
pub use queue::SendQueue;
pub use shared_state::{ConnectionState, LinkState};
pub use websocket::WebSocketConnector;
