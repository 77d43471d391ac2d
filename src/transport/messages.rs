//! Handshake payload and the events published to client subscribers.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::fragment::ModelResult;

/// Role a client plays in a shared scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Captures and streams fragments.
    Host,
    /// Only receives reconstructed models.
    Visitor,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Visitor => "visitor",
        }
    }
}

/// First message on every connection, sent as text before any binary data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Handshake {
    pub role: Role,
    pub scene: String,
}

impl Handshake {
    pub fn new(role: Role, scene: impl Into<String>) -> Self {
        Self {
            role,
            scene: scene.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"role":"{}","scene":{:?}}}"#, self.role.as_str(), self.scene)
        })
    }
}

/// Published to every subscriber of a [`super::ReconstructionClient`].
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Transport open; the handshake follows immediately.
    Connected,
    /// Connecting or handshaking failed; the client is disconnected again.
    ConnectionFailed(String),
    /// The connection ended (requested or not).
    Disconnected,
    /// Model names offered by the server, sent once right after connecting.
    ModelsAvailable(Vec<String>),
    ModelResult(Arc<ModelResult>),
    /// An inbound message was rejected; the connection stays open.
    DecodeFailed(CodecError),
}

/// Interpret an inbound payload as the server's model list, if it is one.
pub(crate) fn parse_model_list(payload: &[u8]) -> Option<Vec<String>> {
    serde_json::from_slice::<Vec<String>>(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_json_shape() {
        assert_eq!(
            Handshake::new(Role::Host, "room1").to_json(),
            r#"{"role":"host","scene":"room1"}"#
        );
        assert_eq!(
            Handshake::new(Role::Visitor, "lab").to_json(),
            r#"{"role":"visitor","scene":"lab"}"#
        );
    }

    #[test]
    fn test_model_list_detection() {
        assert_eq!(
            parse_model_list(br#"["neural_recon","slam3r"]"#),
            Some(vec!["neural_recon".to_string(), "slam3r".to_string()])
        );
        assert_eq!(parse_model_list(b"LEON\x01\x00\x00\x00"), None);
        assert_eq!(parse_model_list(br#"{"Status":"Success"}"#), None);
    }
}
