//! WebSocket gateway: accepts reload clients and upgrades them.
//!
//! Each accepted transport runs [`handle_connection`] in its own task. The
//! connection walks `Handshaking -> Open -> Closed`; only `Open` connections
//! are in the registry and receive broadcasts.

use crate::dev::registry::{
    ClientConnection, ConnectionId, ConnectionRegistry, ConnectionState, EncodedFrame,
    SharedRegistry,
};
use crate::error::{CliError, Result};
use crate::ws::handshake::{build_handshake_response, is_request_complete, parse_handshake};
use crate::ws::Handshake;
use std::net::SocketAddr;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Read buffer size per socket.
const READ_CHUNK: usize = 4096;

/// Upgrade requests larger than this are discarded unparsed.
pub const MAX_REQUEST_BYTES: usize = 16 * 1024;

/// Per-connection handshake state machine.
///
/// Holds no I/O; [`handle_connection`] feeds it socket events.
#[derive(Debug)]
pub struct Session {
    id: ConnectionId,
    state: ConnectionState,
    request: Vec<u8>,
}

impl Session {
    pub fn new(id: ConnectionId) -> Self {
        Self {
            id,
            state: ConnectionState::Handshaking,
            request: Vec::new(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Feed inbound bytes.
    ///
    /// While handshaking, bytes accumulate until a full request head is
    /// present; a valid upgrade is returned, an invalid one is dropped and the
    /// session keeps waiting. Data on an open connection is only logged.
    pub fn receive(&mut self, chunk: &[u8]) -> Option<Handshake> {
        match self.state {
            ConnectionState::Handshaking => {}
            ConnectionState::Open => {
                tracing::debug!(id = self.id, bytes = chunk.len(), "ignoring client data");
                return None;
            }
            ConnectionState::Closed => return None,
        }

        self.request.extend_from_slice(chunk);

        if !is_request_complete(&self.request) {
            if self.request.len() > MAX_REQUEST_BYTES {
                tracing::warn!(id = self.id, "oversized upgrade request discarded");
                self.request.clear();
            }
            return None;
        }

        let request = std::mem::take(&mut self.request);
        match parse_handshake(&request) {
            Ok(handshake) => Some(handshake),
            Err(err) => {
                tracing::debug!(id = self.id, %err, "rejected upgrade request");
                None
            }
        }
    }

    /// Promote to `Open` and register with the registry.
    pub fn open(&mut self, registry: &ConnectionRegistry) -> mpsc::Receiver<EncodedFrame> {
        let (conn, rx) = ClientConnection::channel(self.id);
        registry.add(conn);
        self.state = ConnectionState::Open;
        rx
    }

    /// Move to `Closed` and deregister. Safe to call repeatedly.
    pub fn close(&mut self, registry: &ConnectionRegistry) {
        if self.state == ConnectionState::Closed {
            return;
        }
        registry.remove(self.id);
        self.state = ConnectionState::Closed;
    }
}

/// Drive one client transport until it closes.
///
/// Generic over the stream so tests can use in-memory pipes.
pub async fn handle_connection<S>(stream: S, registry: SharedRegistry, peer: String)
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut session = Session::new(registry.allocate_id());
    let mut buf = vec![0u8; READ_CHUNK];

    let mut outbound = loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => {
                tracing::debug!(id = session.id(), %peer, "closed before upgrade");
                session.close(&registry);
                return;
            }
            Ok(n) => n,
            Err(err) => {
                tracing::debug!(id = session.id(), %peer, %err, "read error before upgrade");
                session.close(&registry);
                return;
            }
        };

        let Some(handshake) = session.receive(&buf[..n]) else {
            continue;
        };

        let response = build_handshake_response(&handshake.accept_key());
        if let Err(err) = writer.write_all(&response).await {
            tracing::debug!(id = session.id(), %peer, %err, "failed to send upgrade response");
            session.close(&registry);
            return;
        }

        break session.open(&registry);
    };

    tracing::info!(id = session.id(), %peer, clients = registry.len(), "reload client connected");

    loop {
        tokio::select! {
            read = reader.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    session.receive(&buf[..n]);
                }
                Err(err) => {
                    tracing::debug!(id = session.id(), %err, "read error");
                    break;
                }
            },
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(err) = writer.write_all(&frame).await {
                        tracing::debug!(id = session.id(), %err, "write failed, dropping client");
                        break;
                    }
                }
                None => break,
            },
        }
    }

    session.close(&registry);
    tracing::info!(id = session.id(), %peer, clients = registry.len(), "reload client disconnected");
}

/// Accept loop for reload clients.
pub struct WebSocketGateway {
    registry: SharedRegistry,
}

impl WebSocketGateway {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    /// Bind the gateway's listening socket.
    pub async fn bind(addr: SocketAddr) -> Result<TcpListener> {
        TcpListener::bind(addr).await.map_err(|e| {
            CliError::Server(format!(
                "Failed to bind WebSocket gateway to {}: {}",
                addr, e
            ))
        })
    }

    /// Accept connections forever, one task per client.
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let _ = stream.set_nodelay(true);
                    tokio::spawn(handle_connection(
                        stream,
                        self.registry.clone(),
                        peer.to_string(),
                    ));
                }
                Err(err) => {
                    tracing::warn!(%err, "failed to accept reload client");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::encode_frame;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::duplex;
    use tokio::time::timeout;

    const REQUEST: &str = "GET / HTTP/1.1\r\nHost: localhost:8001\r\nUpgrade: websocket\r\nConnection: Upgrade\r\nSec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\nSec-WebSocket-Version: 13\r\n\r\n";

    #[test]
    fn test_session_upgrade_transitions() {
        let registry = ConnectionRegistry::new();
        let mut session = Session::new(registry.allocate_id());
        assert_eq!(session.state(), ConnectionState::Handshaking);

        let handshake = session.receive(REQUEST.as_bytes()).expect("valid upgrade");
        assert_eq!(handshake.accept_key(), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
        assert_eq!(session.state(), ConnectionState::Handshaking);
        assert!(registry.is_empty());

        let _rx = session.open(&registry);
        assert_eq!(session.state(), ConnectionState::Open);
        assert!(registry.contains(session.id()));

        session.close(&registry);
        session.close(&registry);
        assert_eq!(session.state(), ConnectionState::Closed);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_session_accumulates_split_request() {
        let mut session = Session::new(0);
        let (head, tail) = REQUEST.as_bytes().split_at(40);

        assert!(session.receive(head).is_none());
        assert!(session.receive(tail).is_some());
    }

    #[test]
    fn test_session_stays_handshaking_on_bad_request() {
        let mut session = Session::new(0);

        assert!(session
            .receive(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n")
            .is_none());
        assert_eq!(session.state(), ConnectionState::Handshaking);

        // A later valid request on the same transport still upgrades
        assert!(session.receive(REQUEST.as_bytes()).is_some());
    }

    #[test]
    fn test_session_discards_oversized_request() {
        let mut session = Session::new(0);
        let junk = vec![b'a'; MAX_REQUEST_BYTES + 1];

        assert!(session.receive(&junk).is_none());
        assert!(session.receive(REQUEST.as_bytes()).is_some());
    }

    #[test]
    fn test_open_session_ignores_data() {
        let registry = ConnectionRegistry::new();
        let mut session = Session::new(registry.allocate_id());
        let _rx = session.open(&registry);

        assert!(session.receive(REQUEST.as_bytes()).is_none());
        assert_eq!(session.state(), ConnectionState::Open);
    }

    #[tokio::test]
    async fn test_handle_connection_upgrade_broadcast_close() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (mut client, server) = duplex(64 * 1024);
        let task = tokio::spawn(handle_connection(
            server,
            registry.clone(),
            "test".to_string(),
        ));

        client.write_all(REQUEST.as_bytes()).await.unwrap();

        let mut response = vec![0u8; 1024];
        let n = timeout(Duration::from_secs(2), client.read(&mut response))
            .await
            .unwrap()
            .unwrap();
        let response = String::from_utf8_lossy(&response[..n]).to_string();
        assert!(response.starts_with("HTTP/1.1 101 Switching Protocols\r\n"));
        assert!(response.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));

        // Registration happens right after the response is written
        timeout(Duration::from_secs(2), async {
            while registry.is_empty() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(registry.broadcast_text("reload").delivered, 1);

        let expected = encode_frame(b"reload", false);
        let mut frame = vec![0u8; expected.len()];
        timeout(Duration::from_secs(2), client.read_exact(&mut frame))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame, expected);

        drop(client);
        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_plain_http_is_not_registered() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (mut client, server) = duplex(4096);
        let task = tokio::spawn(handle_connection(
            server,
            registry.clone(),
            "test".to_string(),
        ));

        client
            .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();
        tokio::task::yield_now().await;
        assert!(registry.is_empty());

        drop(client);
        timeout(Duration::from_secs(2), task).await.unwrap().unwrap();
        assert!(registry.is_empty());
    }
}
