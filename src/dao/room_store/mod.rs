/// MongoDB-backed implementation of [`RoomStore`].
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{GameRecordEntity, PlayerEntity, RoomEntity, RoomStatus, SegmentEntity, VoteEntity},
    storage::StorageResult,
};

/// Abstraction over the persistence layer for rooms, players, votes, and game records.
///
/// Each method is a single atomic operation against durable storage. The
/// in-memory session layer is a cache over this store: state transitions are
/// persisted here before they are broadcast to clients.
pub trait RoomStore: Send + Sync {
    /// Persist a freshly created room together with its host player.
    fn create_room(
        &self,
        room: RoomEntity,
        host: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Look up a room by its six-digit code.
    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// Look up a room by its primary key.
    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>>;
    /// List all rooms currently in `waiting` or `playing` state.
    fn list_active_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomEntity>>>;
    /// Insert or update a player row.
    fn add_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look up a player by connection identifier.
    fn find_player(
        &self,
        conn_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>>;
    /// Flag a player offline without deleting the row.
    fn mark_player_offline(&self, conn_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Hard-delete a player row.
    fn delete_player(&self, conn_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Update a room's lifecycle status.
    fn update_status(
        &self,
        room_id: Uuid,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Update a room's target word.
    fn update_target_word(
        &self,
        room_id: Uuid,
        target_word: Option<String>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Move the host flag to `new_host` and update the room's host pointer.
    fn reassign_host(
        &self,
        room_id: Uuid,
        new_host: Uuid,
        new_host_name: String,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Upsert a voter's choice; a later vote overwrites the earlier one.
    fn record_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete all votes recorded for a room.
    fn clear_votes(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Best-effort snapshot of the flattened drawing replay.
    fn save_draw_snapshot(
        &self,
        room_id: Uuid,
        segments: Vec<SegmentEntity>,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Append a record of a completed round.
    fn record_game(&self, record: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Delete a room together with its players and votes.
    fn delete_room(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<()>>;
    /// Ping the backend.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
