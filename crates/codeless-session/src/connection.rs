//! Connections and the table that owns them.
//!
//! A [`Connection`] owns its session store for its lifetime. Units of work
//! never hold a connection directly; they hold a [`ConnectionHandle`] (an
//! id into the [`ConnectionTable`]) and resolve it when they run. Once a
//! connection is torn down the handle resolves to nothing and the work
//! becomes a no-op.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use codeless_core::{OutboundMessage, SessionStore};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::types::{ConnectionId, Outbound, OutboundTx};

/// Counter for assigning unique `ConnectionId`s.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> ConnectionId {
    ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}

#[derive(Debug)]
pub struct Connection {
    id: ConnectionId,
    session: SessionStore,
    outbound: OutboundTx,
    open: AtomicBool,
    released: AtomicBool,
}

impl Connection {
    fn new(id: ConnectionId, outbound: OutboundTx) -> Self {
        Connection {
            id,
            session: SessionStore::new(),
            outbound,
            open: AtomicBool::new(true),
            released: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Session-scoped state shared by every handler on this connection.
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    /// Queue `msg` for the socket writer. Fire and forget: returns `false`
    /// when the connection is already closed and the message was dropped.
    pub fn send(&self, msg: OutboundMessage) -> bool {
        if !self.is_open() {
            debug!(connection = %self.id, ?msg, "connection closed, dropping message");
            return false;
        }
        debug!(connection = %self.id, ?msg, "sending message");
        self.outbound.send(Outbound::Message(msg)).is_ok()
    }

    /// Mark that the editor ended the session itself. The driver does not
    /// reconnect after a released connection.
    pub fn release(&self) {
        self.released.store(true, Ordering::Release);
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Stop accepting messages and ask the writer to close the socket.
    pub fn close(&self) {
        if self.open.swap(false, Ordering::AcqRel) {
            let _ = self.outbound.send(Outbound::Close);
        }
    }
}

/// Registry of live connections.
#[derive(Debug, Clone, Default)]
pub struct ConnectionTable {
    connections: Arc<RwLock<HashMap<ConnectionId, Arc<Connection>>>>,
}

impl ConnectionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a connection writing to `outbound` and return its handle.
    pub async fn register(&self, outbound: OutboundTx) -> ConnectionHandle {
        let id = next_connection_id();
        let connection = Arc::new(Connection::new(id, outbound));
        {
            let mut guard = self.connections.write().await;
            guard.insert(id, connection);
        }
        info!(connection = %id, "connection registered");
        ConnectionHandle {
            id,
            table: self.clone(),
        }
    }

    pub async fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        let guard = self.connections.read().await;
        guard.get(&id).cloned()
    }

    /// Remove the connection, close it, and drop its session state.
    /// Idempotent.
    pub async fn teardown(&self, id: ConnectionId) -> bool {
        let removed = {
            let mut guard = self.connections.write().await;
            guard.remove(&id)
        };
        match removed {
            Some(connection) => {
                connection.close();
                connection.session().clear();
                info!(connection = %id, "connection torn down");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.connections.read().await.is_empty()
    }
}

/// Non-owning reference to a connection in a [`ConnectionTable`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    table: ConnectionTable,
}

impl ConnectionHandle {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The connection, if it is still registered.
    pub async fn resolve(&self) -> Option<Arc<Connection>> {
        self.table.get(self.id).await
    }

    pub async fn teardown(&self) -> bool {
        self.table.teardown(self.id).await
    }
}
