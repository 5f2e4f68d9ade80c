use mongodb::error::Error as MongoError;
use thiserror::Error;
use uuid::Uuid;

use crate::dao::storage::StorageError;

pub type MongoResult<T> = std::result::Result<T, MongoDaoError>;

/// Errors raised by the MongoDB backend, one variant per operation.
#[derive(Debug, Error)]
pub enum MongoDaoError {
    #[error("failed to parse MongoDB connection URI `{uri}`")]
    InvalidUri {
        uri: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to build MongoDB client from options")]
    ClientConstruction {
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping failed during initial connection after {attempts} attempt(s)")]
    InitialPing {
        attempts: u32,
        #[source]
        source: MongoError,
    },
    #[error("MongoDB ping health check failed")]
    HealthPing {
        #[source]
        source: MongoError,
    },
    #[error("failed to ensure index `{index}` on collection `{collection}`")]
    EnsureIndex {
        collection: &'static str,
        index: &'static str,
        #[source]
        source: MongoError,
    },
    #[error("failed to create room `{code}`")]
    CreateRoom {
        code: String,
        #[source]
        source: MongoError,
    },
    #[error("failed to load room")]
    LoadRoom {
        #[source]
        source: MongoError,
    },
    #[error("failed to list active rooms")]
    ListRooms {
        #[source]
        source: MongoError,
    },
    #[error("failed to update room `{id}`")]
    UpdateRoom {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete room `{id}`")]
    DeleteRoom {
        id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save player `{conn_id}`")]
    SavePlayer {
        conn_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to load player `{conn_id}`")]
    LoadPlayer {
        conn_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to delete player `{conn_id}`")]
    DeletePlayer {
        conn_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to record vote in room `{room_id}`")]
    SaveVote {
        room_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to clear votes in room `{room_id}`")]
    ClearVotes {
        room_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to save drawing snapshot for room `{room_id}`")]
    SaveSnapshot {
        room_id: Uuid,
        #[source]
        source: MongoError,
    },
    #[error("failed to record game result for room `{room_id}`")]
    RecordGame {
        room_id: Uuid,
        #[source]
        source: MongoError,
    },
}

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        let message = err.to_string();
        StorageError::unavailable(message, err)
    }
}
