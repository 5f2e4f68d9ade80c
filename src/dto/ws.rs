//! WebSocket wire protocol: inbound client events and outbound broadcasts.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::dao::models::{RoomStatus, SegmentEntity};

/// Drawing primitive carried by `draw` events and `draw-sync` broadcasts.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum DrawCommand {
    /// Append one line piece to the drawer's open stroke.
    Segment(SegmentEntity),
    /// Commit the open stroke, making it a unit of undo.
    StrokeEnd,
    /// Wipe the whole drawing.
    Clear,
    /// Remove the most recently committed stroke.
    Undo,
}

/// Payload of a `create-room` request.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Secret word the creator will draw.
    #[validate(length(min = 1, max = 64))]
    pub target_word: String,
    /// Display name of the creator, who joins as host.
    #[validate(length(min = 1, max = 32))]
    pub host_name: String,
    /// Optional capacity override; server default applies when absent.
    #[validate(range(min = 2, max = 32))]
    pub max_players: Option<u32>,
}

/// Payload of a `join-room` request.
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    /// Six-digit code of the room to join.
    #[validate(custom(function = "crate::dto::validation::validate_room_code"))]
    pub room_code: String,
    /// Display name of the joining player.
    #[validate(length(min = 1, max = 32))]
    pub player_name: String,
}

/// Messages accepted from game WebSocket clients.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Request the list of active rooms.
    ListRooms,
    /// Create a room and join as its host.
    CreateRoom(CreateRoomRequest),
    /// Join an existing room by code.
    JoinRoom(JoinRoomRequest),
    /// Host-only: start the round.
    StartGame { room_code: String },
    /// Forward one drawing operation to the room.
    Draw {
        room_code: String,
        draw_data: DrawCommand,
    },
    /// Submit a guess for the target word.
    SubmitAnswer { room_code: String, answer: String },
    /// Host-only: force the round back to waiting.
    EndGame { room_code: String },
    /// Host-only: open a vote for the next host.
    StartVote { room_code: String },
    /// Cast (or overwrite) a vote for a candidate.
    Vote {
        room_code: String,
        candidate_id: Uuid,
    },
    /// Leave the room explicitly.
    LeaveRoom { room_code: String },
}

impl ClientMessage {
    /// Parse and validate an inbound message from its JSON text frame.
    pub fn from_json_str(raw: &str) -> Result<Self, MessageParseError> {
        let message: Self = serde_json::from_str(raw)?;
        message.validate_payload()?;
        Ok(message)
    }

    fn validate_payload(&self) -> Result<(), ValidationErrors> {
        match self {
            ClientMessage::CreateRoom(request) => request.validate(),
            ClientMessage::JoinRoom(request) => request.validate(),
            _ => Ok(()),
        }
    }
}

/// Error raised while decoding an inbound WebSocket frame.
#[derive(Debug, Error)]
pub enum MessageParseError {
    /// The frame was not valid JSON for any known message.
    #[error("invalid message: {0}")]
    Json(#[from] serde_json::Error),
    /// The message parsed but carried an out-of-contract payload.
    #[error("invalid payload: {0}")]
    Validation(#[from] ValidationErrors),
}

/// One room entry in the `room-list` broadcast.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Six-digit room code.
    pub room_code: String,
    /// Display name of the current host.
    pub host_name: String,
    /// Maximum number of online players.
    pub max_players: usize,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Number of online players.
    pub player_count: usize,
}

/// Room details shared with clients on creation and join.
///
/// `target_word` is populated only in the response to the room's creator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    /// Six-digit room code.
    pub room_code: String,
    /// Display name of the current host.
    pub host_name: String,
    /// Current lifecycle status.
    pub status: RoomStatus,
    /// Maximum number of online players.
    pub max_players: usize,
    /// Secret word, revealed to the creator/host only.
    pub target_word: Option<String>,
}

/// One roster entry shared with clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
    /// Transport-assigned connection identifier.
    pub conn_id: Uuid,
    /// Display name.
    pub player_name: String,
    /// Whether this player currently hosts the room.
    pub is_host: bool,
}

/// Messages broadcast to game WebSocket clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    /// Active rooms, answered from the live registry.
    RoomList { rooms: Vec<RoomSummary> },
    /// Sent to the creator after a successful `create-room`.
    RoomCreated { room_code: String, room: RoomView },
    /// Sent to the joiner with the roster and the drawing replay.
    RoomJoined {
        room: RoomView,
        players: Vec<PlayerView>,
        is_host: bool,
        draw_history: Vec<SegmentEntity>,
    },
    /// Sent to the whole room when a player joins.
    PlayerJoined { player: PlayerView, count: usize },
    /// Sent to the whole room when a player leaves or disconnects.
    PlayerLeft { player_name: String, count: usize },
    /// Round started; `target_word` is set only in the host's copy.
    GameStarted { target_word: Option<String> },
    /// One drawing operation, relayed to everyone except the drawer.
    DrawSync { draw_data: DrawCommand },
    /// Attempt notice, sent to the submitter only.
    AnswerSubmitted { player_name: String },
    /// A guess matched; the round is over.
    CorrectAnswer {
        player_name: String,
        target_word: String,
    },
    /// Host ended the round.
    GameEnded,
    /// A vote round opened with these candidates.
    VoteStarted {
        candidates: Vec<PlayerView>,
        duration: u64,
    },
    /// The running tally after an accepted vote.
    VoteUpdated {
        votes: IndexMap<Uuid, Uuid>,
        voter_id: Uuid,
    },
    /// The vote resolved; `new_host` is absent when nobody won.
    VoteEnded {
        new_host: Option<PlayerView>,
        results: IndexMap<Uuid, usize>,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// The host left and the room was destroyed.
    RoomClosed { message: String },
    /// A request was rejected; sent to the requester only.
    RoomError { message: String },
}
