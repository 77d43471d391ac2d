//! Websocket connection over a plain TCP stream.
//!
//! TLS is expected to be terminated in front of the reconstruction service;
//! `wss://` endpoints are refused at connect time.

use std::io;
use std::net::{TcpStream, ToSocketAddrs};

use tracing::{debug, warn};
use tungstenite::client::IntoClientRequest;
use tungstenite::protocol::WebSocket;

use super::config::ClientConfig;
use super::connection::{Connection, Connector, Message};
use super::error::TransportError;

const DEFAULT_WS_PORT: u16 = 80;

/// Connector for `ws://` endpoints.
#[derive(Debug, Default, Clone, Copy)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn connect(&self, config: &ClientConfig) -> Result<Box<dyn Connection>, TransportError> {
        let url = config.server_url.as_str();
        let connect_err = |reason: String| TransportError::Connect {
            url: url.to_string(),
            reason,
        };

        let request = url
            .into_client_request()
            .map_err(|e| connect_err(e.to_string()))?;
        let uri = request.uri();
        match uri.scheme_str() {
            Some("ws") => {}
            Some("wss") => {
                return Err(connect_err(
                    "TLS endpoints are not supported, terminate TLS in front of the service"
                        .to_string(),
                ));
            }
            other => return Err(connect_err(format!("unsupported scheme {:?}", other))),
        }
        let host = uri
            .host()
            .ok_or_else(|| connect_err("missing host".to_string()))?;
        let port = uri.port_u16().unwrap_or(DEFAULT_WS_PORT);

        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|e| connect_err(e.to_string()))?
            .next()
            .ok_or_else(|| connect_err(format!("{} did not resolve", host)))?;

        let stream = TcpStream::connect_timeout(&addr, config.connect_timeout())
            .map_err(|e| connect_err(e.to_string()))?;
        stream
            .set_nodelay(true)
            .and_then(|_| stream.set_read_timeout(Some(config.connect_timeout())))
            .and_then(|_| stream.set_write_timeout(Some(config.send_timeout())))
            .map_err(|e| connect_err(e.to_string()))?;

        let (socket, response) =
            tungstenite::client(request, stream).map_err(|e| connect_err(e.to_string()))?;
        debug!("Websocket upgrade to {} answered {}", url, response.status());

        // From here on reads are short polls so the worker can interleave sends.
        socket
            .get_ref()
            .set_read_timeout(Some(config.recv_poll_interval()))
            .map_err(|e| connect_err(e.to_string()))?;

        Ok(Box::new(WebSocketConnection { socket }))
    }
}

pub struct WebSocketConnection {
    socket: WebSocket<TcpStream>,
}

impl Connection for WebSocketConnection {
    fn send(&mut self, message: Message) -> Result<(), TransportError> {
        let message = match message {
            Message::Text(text) => tungstenite::Message::Text(text),
            Message::Binary(bytes) => tungstenite::Message::Binary(bytes),
        };
        self.socket.send(message).map_err(|e| match e {
            // A timed-out write may leave a partial frame buffered; the
            // stream is no longer usable.
            tungstenite::Error::Io(io) if is_timeout(&io) => TransportError::Timeout,
            tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed => {
                TransportError::Closed
            }
            tungstenite::Error::Io(io) => {
                warn!("Websocket write error: {}", io);
                TransportError::Closed
            }
            other => TransportError::Send(other.to_string()),
        })
    }

    fn recv(&mut self) -> Result<Option<Message>, TransportError> {
        match self.socket.read() {
            Ok(tungstenite::Message::Text(text)) => Ok(Some(Message::Text(text))),
            Ok(tungstenite::Message::Binary(bytes)) => Ok(Some(Message::Binary(bytes))),
            Ok(tungstenite::Message::Close(frame)) => {
                debug!("Server closed the websocket: {:?}", frame);
                Err(TransportError::Closed)
            }
            // Ping replies are queued by tungstenite and flushed on the next I/O.
            Ok(_) => Ok(None),
            Err(tungstenite::Error::Io(io)) if is_timeout(&io) => Ok(None),
            Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => {
                Err(TransportError::Closed)
            }
            Err(e) => {
                warn!("Websocket read error: {}", e);
                Err(TransportError::Closed)
            }
        }
    }

    fn close(&mut self) {
        if let Err(e) = self.socket.close(None) {
            debug!("Websocket close: {}", e);
        }
        // Give the close frame a chance to go out; errors mean it is gone already.
        let _ = self.socket.flush();
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::codec;
    use crate::fragment::{ModelResult, TransformFragment};
    use crate::geometry::Transform;

    /// Accept one websocket client, collect two messages, answer with a
    /// model result and wait for the close.
    fn serve_once(listener: TcpListener) -> thread::JoinHandle<Vec<tungstenite::Message>> {
        thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
            let mut ws = tungstenite::accept(stream).unwrap();

            let mut received = Vec::new();
            while received.len() < 2 {
                match ws.read().unwrap() {
                    m @ (tungstenite::Message::Text(_) | tungstenite::Message::Binary(_)) => {
                        received.push(m)
                    }
                    _ => {}
                }
            }

            let result = ModelResult::new("room1", false, Transform::identity(), vec![9, 8, 7]);
            ws.send(tungstenite::Message::Binary(codec::encode_model_result(&result).unwrap()))
                .unwrap();

            // Drain until the client closes.
            while let Ok(message) = ws.read() {
                if message.is_close() {
                    break;
                }
            }
            received
        })
    }

    #[test]
    fn test_loopback_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = serve_once(listener);

        let config = ClientConfig {
            recv_poll_interval_ms: 10,
            ..ClientConfig::new(format!("ws://{}", addr))
        };
        let mut conn = WebSocketConnector.connect(&config).unwrap();

        // Nothing sent yet: the read poll times out quietly.
        assert_eq!(conn.recv().unwrap(), None);

        let handshake = r#"{"role":"host","scene":"room1"}"#.to_string();
        let fragment = TransformFragment::new("room1", Transform::identity());
        let payload = codec::encode_transform_fragment(&fragment).unwrap();
        conn.send(Message::Text(handshake.clone())).unwrap();
        conn.send(Message::Binary(payload.clone())).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let reply = loop {
            if let Some(message) = conn.recv().unwrap() {
                break message;
            }
            assert!(Instant::now() < deadline, "no reply from server");
        };
        match reply {
            Message::Binary(bytes) => {
                let result = ModelResult::decode(&bytes).unwrap();
                assert_eq!(result.scene(), "room1");
                assert_eq!(result.glb(), &[9, 8, 7]);
            }
            other => panic!("unexpected reply {:?}", other),
        }

        conn.close();
        let received = server.join().unwrap();
        assert_eq!(received[0], tungstenite::Message::Text(handshake));
        assert_eq!(received[1], tungstenite::Message::Binary(payload));
    }

    #[test]
    fn test_tls_endpoint_is_refused() {
        let config = ClientConfig::new("wss://example.invalid/socket");
        let err = WebSocketConnector.connect(&config).err().unwrap();
        assert!(matches!(err, TransportError::Connect { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_unknown_scheme_is_refused() {
        let config = ClientConfig::new("http://localhost:8765");
        assert!(WebSocketConnector.connect(&config).is_err());
    }
}
