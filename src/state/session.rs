//! The live, in-memory state machine for one room.

use std::time::{Duration, Instant};

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dao::models::{RoomEntity, RoomStatus},
    dto::ws::{PlayerView, RoomSummary, RoomView},
    error::ServiceError,
    state::{drawing::DrawingLog, vote::VoteController},
};

/// One roster entry, keyed by connection identifier in the session map.
#[derive(Debug, Clone)]
pub struct Player {
    /// Transport-assigned connection identifier.
    pub conn_id: Uuid,
    /// Display name.
    pub name: String,
    /// Exactly one online player per room carries this flag.
    pub is_host: bool,
    /// Cleared on disconnect; offline players stay in the map for idempotent
    /// departure handling but drop out of rosters and capacity counts.
    pub is_online: bool,
}

impl Player {
    /// Wire representation of this roster entry.
    pub fn to_view(&self) -> PlayerView {
        PlayerView {
            conn_id: self.conn_id,
            player_name: self.name.clone(),
            is_host: self.is_host,
        }
    }
}

/// The single point of mutation for one room: roster, status, target word,
/// host identity, drawing log, and vote round.
///
/// A session is only ever touched through its registry entry's lock, so every
/// event and timer callback against the room is serialized, persistence
/// suspension points included.
#[derive(Debug)]
pub struct RoomSession {
    room_id: Uuid,
    code: String,
    host_conn_id: Uuid,
    host_name: String,
    target_word: Option<String>,
    status: RoomStatus,
    max_players: usize,
    players: IndexMap<Uuid, Player>,
    drawing: DrawingLog,
    vote: VoteController,
    round_started: Option<Instant>,
}

impl RoomSession {
    /// Hydrate a session from a freshly persisted room, seeding the roster
    /// with the host and an empty drawing log.
    pub fn new(entity: RoomEntity) -> Self {
        let mut players = IndexMap::new();
        players.insert(
            entity.host_conn_id,
            Player {
                conn_id: entity.host_conn_id,
                name: entity.host_name.clone(),
                is_host: true,
                is_online: true,
            },
        );

        Self {
            room_id: entity.id,
            code: entity.code,
            host_conn_id: entity.host_conn_id,
            host_name: entity.host_name,
            target_word: entity.target_word,
            status: entity.status,
            max_players: entity.max_players,
            players,
            drawing: DrawingLog::new(),
            vote: VoteController::new(),
            round_started: None,
        }
    }

    /// Primary key of the persisted room row.
    pub fn room_id(&self) -> Uuid {
        self.room_id
    }

    /// Six-digit room code.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Current lifecycle status.
    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// Connection identifier of the current host.
    pub fn host_conn_id(&self) -> Uuid {
        self.host_conn_id
    }

    /// Whether `conn_id` is the current host.
    pub fn is_host(&self, conn_id: Uuid) -> bool {
        self.host_conn_id == conn_id
    }

    /// Secret word of the current round, if any.
    pub fn target_word(&self) -> Option<&str> {
        self.target_word.as_deref()
    }

    /// Look up a roster entry.
    pub fn player(&self, conn_id: Uuid) -> Option<&Player> {
        self.players.get(&conn_id)
    }

    /// Number of online players.
    pub fn online_count(&self) -> usize {
        self.players.values().filter(|p| p.is_online).count()
    }

    /// Online roster in join order.
    pub fn roster(&self) -> Vec<PlayerView> {
        self.players
            .values()
            .filter(|p| p.is_online)
            .map(Player::to_view)
            .collect()
    }

    /// Connection identifiers of all online players.
    pub fn online_conn_ids(&self) -> Vec<Uuid> {
        self.players
            .values()
            .filter(|p| p.is_online)
            .map(|p| p.conn_id)
            .collect()
    }

    /// Online non-host players, the candidate set for a vote round.
    pub fn vote_candidates(&self) -> Vec<PlayerView> {
        self.players
            .values()
            .filter(|p| p.is_online && !p.is_host)
            .map(Player::to_view)
            .collect()
    }

    /// Add a joining player to the roster.
    ///
    /// Fails with [`ServiceError::RoomFull`] when the online count has
    /// reached the room's capacity; the roster is not mutated in that case.
    pub fn add_player(&mut self, conn_id: Uuid, name: String) -> Result<&Player, ServiceError> {
        if self.online_count() >= self.max_players {
            return Err(ServiceError::RoomFull);
        }
        let player = self
            .players
            .entry(conn_id)
            .and_modify(|existing| {
                // A rejoin over the same connection id comes back online.
                existing.is_online = true;
                existing.name = name.clone();
            })
            .or_insert_with(|| Player {
                conn_id,
                name,
                is_host: false,
                is_online: true,
            });
        Ok(player)
    }

    /// Flag a player offline, returning a snapshot of the entry.
    ///
    /// Returns `None` when the player is unknown or already offline, which
    /// makes double departure handling a no-op.
    pub fn mark_offline(&mut self, conn_id: Uuid) -> Option<Player> {
        let player = self.players.get_mut(&conn_id)?;
        if !player.is_online {
            return None;
        }
        player.is_online = false;
        Some(player.clone())
    }

    /// Remove a player from the roster entirely (explicit leave).
    pub fn remove_player(&mut self, conn_id: Uuid) -> Option<Player> {
        self.players.shift_remove(&conn_id)
    }

    /// Whether the online count has reached the room's capacity.
    pub fn is_full(&self) -> bool {
        self.online_count() >= self.max_players
    }

    /// Transition to `playing` and start the round clock.
    ///
    /// Callers guard this with the host check and a `waiting` status check,
    /// and persist the status before mutating the session.
    pub fn start_round(&mut self) {
        self.status = RoomStatus::Playing;
        self.round_started = Some(Instant::now());
    }

    /// Whether `answer` matches the target word, ignoring surrounding
    /// whitespace and letter case.
    pub fn answer_matches(&self, answer: &str) -> bool {
        match self.target_word.as_deref() {
            Some(word) => answer.trim().to_lowercase() == word.trim().to_lowercase(),
            None => false,
        }
    }

    /// Close the current round and return its duration.
    pub fn finish_round(&mut self) -> Option<Duration> {
        self.status = RoomStatus::Waiting;
        self.round_started.take().map(|started| started.elapsed())
    }

    /// Set the lifecycle status directly (vote transitions).
    pub fn set_status(&mut self, status: RoomStatus) {
        self.status = status;
    }

    /// Move the host role to `new_host`, clearing the old host's flag.
    ///
    /// Returns the promoted player's view, or `None` when `new_host` is not
    /// in the roster (the host is then left unchanged).
    pub fn promote_host(&mut self, new_host: Uuid) -> Option<PlayerView> {
        if !self.players.contains_key(&new_host) {
            return None;
        }
        for player in self.players.values_mut() {
            player.is_host = player.conn_id == new_host;
        }
        let promoted = self.players.get(&new_host)?;
        self.host_conn_id = promoted.conn_id;
        self.host_name = promoted.name.clone();
        Some(promoted.to_view())
    }

    /// Drawing log of this room.
    pub fn drawing(&self) -> &DrawingLog {
        &self.drawing
    }

    /// Mutable drawing log of this room.
    pub fn drawing_mut(&mut self) -> &mut DrawingLog {
        &mut self.drawing
    }

    /// Vote round of this room.
    pub fn vote(&self) -> &VoteController {
        &self.vote
    }

    /// Mutable vote round of this room.
    pub fn vote_mut(&mut self) -> &mut VoteController {
        &mut self.vote
    }

    /// Wire representation of the room, optionally revealing the word.
    pub fn room_view(&self, include_word: bool) -> RoomView {
        RoomView {
            room_code: self.code.clone(),
            host_name: self.host_name.clone(),
            status: self.status,
            max_players: self.max_players,
            target_word: if include_word {
                self.target_word.clone()
            } else {
                None
            },
        }
    }

    /// One `room-list` entry for this room.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_code: self.code.clone(),
            host_name: self.host_name.clone(),
            max_players: self.max_players,
            status: self.status,
            player_count: self.online_count(),
        }
    }
}
