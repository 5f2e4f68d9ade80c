use std::time::Duration;

use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{
    GameRecordEntity, PlayerEntity, RoomEntity, RoomStatus, SegmentEntity, VoteEntity,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoomDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    pub code: String,
    host_conn_id: Uuid,
    host_name: String,
    target_word: Option<String>,
    status: RoomStatus,
    max_players: u32,
    created_at: DateTime,
    /// Best-effort flattened drawing snapshot; absent until the first commit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    draw_snapshot: Option<Vec<SegmentEntity>>,
}

impl From<RoomEntity> for MongoRoomDocument {
    fn from(value: RoomEntity) -> Self {
        Self {
            id: value.id,
            code: value.code,
            host_conn_id: value.host_conn_id,
            host_name: value.host_name,
            target_word: value.target_word,
            status: value.status,
            max_players: value.max_players as u32,
            created_at: DateTime::from_system_time(value.created_at),
            draw_snapshot: None,
        }
    }
}

impl From<MongoRoomDocument> for RoomEntity {
    fn from(value: MongoRoomDocument) -> Self {
        Self {
            id: value.id,
            code: value.code,
            host_conn_id: value.host_conn_id,
            host_name: value.host_name,
            target_word: value.target_word,
            status: value.status,
            max_players: value.max_players as usize,
            created_at: value.created_at.to_system_time(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoPlayerDocument {
    #[serde(rename = "_id")]
    conn_id: Uuid,
    pub room_id: Uuid,
    name: String,
    is_host: bool,
    is_online: bool,
}

impl From<PlayerEntity> for MongoPlayerDocument {
    fn from(value: PlayerEntity) -> Self {
        Self {
            conn_id: value.conn_id,
            room_id: value.room_id,
            name: value.name,
            is_host: value.is_host,
            is_online: value.is_online,
        }
    }
}

impl From<MongoPlayerDocument> for PlayerEntity {
    fn from(value: MongoPlayerDocument) -> Self {
        Self {
            conn_id: value.conn_id,
            room_id: value.room_id,
            name: value.name,
            is_host: value.is_host,
            is_online: value.is_online,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoVoteDocument {
    pub room_id: Uuid,
    pub voter_id: Uuid,
    candidate_id: Uuid,
}

impl From<VoteEntity> for MongoVoteDocument {
    fn from(value: VoteEntity) -> Self {
        Self {
            room_id: value.room_id,
            voter_id: value.voter_id,
            candidate_id: value.candidate_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoGameRecordDocument {
    room_id: Uuid,
    target_word: String,
    winner_name: String,
    finished_at: DateTime,
    duration_ms: u64,
}

impl From<GameRecordEntity> for MongoGameRecordDocument {
    fn from(value: GameRecordEntity) -> Self {
        Self {
            room_id: value.room_id,
            target_word: value.target_word,
            winner_name: value.winner_name,
            finished_at: DateTime::from_system_time(value.finished_at),
            duration_ms: value.duration.as_millis() as u64,
        }
    }
}

impl From<MongoGameRecordDocument> for GameRecordEntity {
    fn from(value: MongoGameRecordDocument) -> Self {
        Self {
            room_id: value.room_id,
            target_word: value.target_word,
            winner_name: value.winner_name,
            finished_at: value.finished_at.to_system_time(),
            duration: Duration::from_millis(value.duration_ms),
        }
    }
}

pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
