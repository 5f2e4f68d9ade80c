//! Shared application state: the room registry and connection table.

/// Per-room stroke log.
pub mod drawing;
/// Room-code to session mapping.
pub mod registry;
/// Per-room state machine.
pub mod session;
/// Per-room vote round.
pub mod vote;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::warn;
use uuid::Uuid;

use crate::{config::AppConfig, dao::room_store::RoomStore, dto::ws::ServerMessage};

pub use self::registry::{RoomRegistry, SharedSession};

/// Cheaply clonable handle on the application state.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected client.
pub struct ClientConnection {
    /// Transport-assigned connection identifier.
    pub id: Uuid,
    /// Writer-task channel of the connection.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state storing live sessions, connections, and the
/// durable store handle.
pub struct AppState {
    config: AppConfig,
    store: Arc<dyn RoomStore>,
    registry: RoomRegistry,
    connections: DashMap<Uuid, ClientConnection>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig, store: Arc<dyn RoomStore>) -> SharedState {
        Arc::new(Self {
            config,
            store,
            registry: RoomRegistry::new(),
            connections: DashMap::new(),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the durable store.
    pub fn store(&self) -> Arc<dyn RoomStore> {
        self.store.clone()
    }

    /// Registry of active rooms.
    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Registry of active client sockets keyed by their identifier.
    pub fn connections(&self) -> &DashMap<Uuid, ClientConnection> {
        &self.connections
    }

    /// Send one message to one connection. Transport failures are logged and
    /// swallowed; a gone connection will be reaped by its socket task.
    pub fn send_to(&self, conn_id: Uuid, message: &ServerMessage) {
        let Some(connection) = self.connections.get(&conn_id) else {
            return;
        };
        let tx = connection.tx.clone();
        drop(connection);

        send_json(&tx, conn_id, message);
    }

    /// Broadcast one message to every listed connection, optionally skipping
    /// the originator (drawing relays never echo back to the drawer).
    pub fn broadcast(&self, conn_ids: &[Uuid], message: &ServerMessage, exclude: Option<Uuid>) {
        let payload = match serde_json::to_string(message) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(error = %err, "failed to serialize broadcast `{message:?}`");
                return;
            }
        };

        for conn_id in conn_ids {
            if Some(*conn_id) == exclude {
                continue;
            }
            let Some(connection) = self.connections.get(conn_id) else {
                continue;
            };
            if connection
                .tx
                .send(Message::Text(payload.clone().into()))
                .is_err()
            {
                warn!(conn_id = %conn_id, "dropping broadcast to closed connection");
            }
        }
    }
}

/// Serialize a payload and push it onto the provided connection channel.
fn send_json(tx: &mpsc::UnboundedSender<Message>, conn_id: Uuid, message: &ServerMessage) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{message:?}`");
            return;
        }
    };

    if tx.send(Message::Text(payload.into())).is_err() {
        warn!(conn_id = %conn_id, "failed to send to closed connection");
    }
}
