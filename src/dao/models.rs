use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    /// Between rounds; players can gather, the host can start a round or a vote.
    Waiting,
    /// A round is running; guesses are accepted.
    Playing,
    /// A vote round is running; exactly one countdown timer is armed.
    Voting,
}

impl RoomStatus {
    /// Wire/storage representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoomStatus::Waiting => "waiting",
            RoomStatus::Playing => "playing",
            RoomStatus::Voting => "voting",
        }
    }
}

/// Room row persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RoomEntity {
    /// Primary key of the room.
    pub id: Uuid,
    /// Six-digit code, unique among active rooms.
    pub code: String,
    /// Connection identifier of the current host.
    pub host_conn_id: Uuid,
    /// Display name of the current host.
    pub host_name: String,
    /// Secret word for the current round; `None` while waiting.
    pub target_word: Option<String>,
    /// Lifecycle status, mutated only by the room session.
    pub status: RoomStatus,
    /// Maximum number of online players.
    pub max_players: usize,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
}

/// Player row keyed by the transport-assigned connection identifier.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerEntity {
    /// Transport-assigned connection identifier.
    pub conn_id: Uuid,
    /// Room the player belongs to.
    pub room_id: Uuid,
    /// Display name chosen by the player.
    pub name: String,
    /// Exactly one player per room carries this flag while any player is online.
    pub is_host: bool,
    /// Cleared on disconnect; offline players do not count against capacity.
    pub is_online: bool,
}

/// A voter's current choice in a room's vote round. Latest write wins.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEntity {
    /// Room the vote belongs to.
    pub room_id: Uuid,
    /// Connection identifier of the voter.
    pub voter_id: Uuid,
    /// Connection identifier of the chosen candidate.
    pub candidate_id: Uuid,
}

/// Historical record of a completed round, persisted only.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameRecordEntity {
    /// Room the round was played in.
    pub room_id: Uuid,
    /// The word that was drawn.
    pub target_word: String,
    /// Display name of the player who guessed it.
    pub winner_name: String,
    /// When the round ended.
    pub finished_at: SystemTime,
    /// How long the round lasted.
    pub duration: Duration,
}

/// Atomic drawing primitive: one line piece within a stroke.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentEntity {
    /// Start point in canvas coordinates.
    pub from: [f32; 2],
    /// End point in canvas coordinates.
    pub to: [f32; 2],
    /// CSS-style color of the line piece.
    pub color: String,
    /// Line width in canvas units.
    pub width: f32,
}
