//! Domain error taxonomy shared by the service layer.

use thiserror::Error;

use crate::dao::storage::StorageError;

/// Errors that can occur in service layer operations.
///
/// Validation failures are reported only to the requesting connection and
/// never mutate room state.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No active room exists for the given code.
    #[error("room not found")]
    RoomNotFound,
    /// The room already holds its maximum number of online players.
    #[error("room is full")]
    RoomFull,
    /// The operation is reserved for the current host.
    #[error("only the host can do that")]
    NotHost,
    /// A vote was requested while no non-host players were present.
    #[error("no players to vote for; host unchanged")]
    NoCandidates,
    /// A generated room code collided with an active room.
    #[error("room code is already in use")]
    DuplicateCode,
    /// The durable store rejected or failed an operation.
    #[error("storage unavailable")]
    Unavailable(#[from] StorageError),
    /// A connection's outbound channel is gone.
    #[error("transport error: {0}")]
    Transport(String),
}

impl ServiceError {
    /// Whether this error only reflects a rejected request, leaving state untouched.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ServiceError::RoomNotFound
                | ServiceError::RoomFull
                | ServiceError::NotHost
                | ServiceError::NoCandidates
        )
    }
}
