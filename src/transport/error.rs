use crate::codec::CodecError;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("send failed: {0}")]
    Send(String),
    #[error("send timed out")]
    Timeout,
    #[error("connection closed")]
    Closed,
    #[error("failed to encode {kind} fragment")]
    Encode {
        kind: &'static str,
        #[source]
        source: CodecError,
    },
}

impl TransportError {
    /// Fatal errors end the connection; the rest are retried on it.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. } | Self::Handshake(_) | Self::Timeout | Self::Closed
        )
    }
}
