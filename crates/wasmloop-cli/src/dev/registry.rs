//! Live client connections and broadcast.
//!
//! Each open WebSocket connection owns a writer task fed by a bounded
//! channel; the registry keeps the sending halves in registration order.
//! A broadcast encodes the frame once and queues it on every sender without
//! waiting, so one stalled or dead client never holds up the rest.

use crate::ws::encode_frame;
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// Capacity of each connection's outbound frame queue.
pub const OUTBOUND_QUEUE: usize = 100;

/// Unique per-process connection identifier.
pub type ConnectionId = u64;

/// An encoded frame shared by every recipient of a broadcast.
pub type EncodedFrame = Arc<[u8]>;

/// Lifecycle of one client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for a valid upgrade request
    Handshaking,
    /// Upgraded and registered for broadcasts
    Open,
    /// Terminal; deregistered
    Closed,
}

/// Registered client: its id and the queue feeding its socket writer.
#[derive(Debug, Clone)]
pub struct ClientConnection {
    id: ConnectionId,
    tx: mpsc::Sender<EncodedFrame>,
}

impl ClientConnection {
    /// Create a connection handle and the receiver its writer drains.
    pub fn channel(id: ConnectionId) -> (Self, mpsc::Receiver<EncodedFrame>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        (Self { id, tx }, rx)
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Per-broadcast delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Frames queued for delivery
    pub delivered: usize,
    /// Connections skipped because their queue was full
    pub skipped: usize,
    /// Connections found dead and removed
    pub removed: usize,
}

/// Set of live client connections.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: Mutex<IndexMap<ConnectionId, ClientConnection>>,
    next_id: AtomicU64,
}

/// Shared registry handle injected into the gateway and the pipeline.
pub type SharedRegistry = Arc<ConnectionRegistry>;

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id for a freshly accepted transport.
    pub fn allocate_id(&self) -> ConnectionId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Register a connection. Returns `false` if the id was already present.
    pub fn add(&self, conn: ClientConnection) -> bool {
        let mut clients = self.clients.lock();
        if clients.contains_key(&conn.id) {
            return false;
        }
        clients.insert(conn.id, conn);
        true
    }

    /// Deregister a connection. Removing an absent id is a no-op.
    pub fn remove(&self, id: ConnectionId) -> bool {
        self.clients.lock().shift_remove(&id).is_some()
    }

    pub fn contains(&self, id: ConnectionId) -> bool {
        self.clients.lock().contains_key(&id)
    }

    /// Number of registered connections.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }

    /// Send one frame to every registered connection, in registration order.
    ///
    /// Never fails: connections whose writer is gone are removed, connections
    /// with a full queue miss this message.
    pub fn broadcast(&self, payload: &[u8], is_binary: bool) -> BroadcastReport {
        let frame: EncodedFrame = encode_frame(payload, is_binary).into();

        // Snapshot so the lock isn't held while queuing
        let clients: Vec<ClientConnection> = self.clients.lock().values().cloned().collect();

        let mut report = BroadcastReport::default();
        let mut dead = Vec::new();

        for client in &clients {
            match client.tx.try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(id = client.id, "client queue full, dropping message");
                    report.skipped += 1;
                }
                Err(TrySendError::Closed(_)) => dead.push(client.id),
            }
        }

        for id in dead {
            if self.remove(id) {
                tracing::debug!(id, "removed disconnected client during broadcast");
                report.removed += 1;
            }
        }

        report
    }

    /// Broadcast a text message.
    pub fn broadcast_text(&self, text: &str) -> BroadcastReport {
        self.broadcast(text.as_bytes(), false)
    }
}
