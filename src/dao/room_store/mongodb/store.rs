use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{Collection, Database, bson::doc, options::IndexOptions};
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoGameRecordDocument, MongoPlayerDocument, MongoRoomDocument, MongoVoteDocument,
        doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    models::{GameRecordEntity, PlayerEntity, RoomEntity, RoomStatus, SegmentEntity, VoteEntity},
    room_store::RoomStore,
    storage::StorageResult,
};

const ROOM_COLLECTION_NAME: &str = "rooms";
const PLAYER_COLLECTION_NAME: &str = "players";
const VOTE_COLLECTION_NAME: &str = "votes";
const GAME_RECORD_COLLECTION_NAME: &str = "game_records";

/// MongoDB-backed room store. Cheap to clone; all clones share one client.
#[derive(Clone)]
pub struct MongoRoomStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    database: Database,
}

impl MongoRoomStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    ///
    /// Failure here is fatal to the process: the durable store is the system
    /// of record and the server refuses to start without it.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (_client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let store = Self {
            inner: Arc::new(MongoInner { database }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let rooms = self.room_collection();
        let code_index = mongodb::IndexModel::builder()
            .keys(doc! {"code": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("room_code_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        rooms
            .create_index(code_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: ROOM_COLLECTION_NAME,
                index: "code",
                source,
            })?;

        let players = self.player_collection();
        let room_index = mongodb::IndexModel::builder()
            .keys(doc! {"room_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("player_room_idx".to_owned()))
                    .build(),
            )
            .build();
        players
            .create_index(room_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PLAYER_COLLECTION_NAME,
                index: "room_id",
                source,
            })?;

        let votes = self.vote_collection();
        let voter_index = mongodb::IndexModel::builder()
            .keys(doc! {"room_id": 1, "voter_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("vote_voter_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        votes
            .create_index(voter_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: VOTE_COLLECTION_NAME,
                index: "room_id,voter_id",
                source,
            })?;

        Ok(())
    }

    fn room_collection(&self) -> Collection<MongoRoomDocument> {
        self.inner
            .database
            .collection::<MongoRoomDocument>(ROOM_COLLECTION_NAME)
    }

    fn player_collection(&self) -> Collection<MongoPlayerDocument> {
        self.inner
            .database
            .collection::<MongoPlayerDocument>(PLAYER_COLLECTION_NAME)
    }

    fn vote_collection(&self) -> Collection<MongoVoteDocument> {
        self.inner
            .database
            .collection::<MongoVoteDocument>(VOTE_COLLECTION_NAME)
    }

    fn game_record_collection(&self) -> Collection<MongoGameRecordDocument> {
        self.inner
            .database
            .collection::<MongoGameRecordDocument>(GAME_RECORD_COLLECTION_NAME)
    }

    async fn ping(&self) -> MongoResult<()> {
        self.inner
            .database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn create_room(&self, room: RoomEntity, host: PlayerEntity) -> MongoResult<()> {
        let code = room.code.clone();
        let room_doc: MongoRoomDocument = room.into();
        self.room_collection()
            .insert_one(&room_doc)
            .await
            .map_err(|source| MongoDaoError::CreateRoom {
                code: code.clone(),
                source,
            })?;

        let host_conn_id = host.conn_id;
        let player_doc: MongoPlayerDocument = host.into();
        self.player_collection()
            .replace_one(doc_id(host_conn_id), &player_doc)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::CreateRoom { code, source })?;

        Ok(())
    }

    async fn find_room_by_code(&self, code: String) -> MongoResult<Option<RoomEntity>> {
        let document = self
            .room_collection()
            .find_one(doc! {"code": code})
            .await
            .map_err(|source| MongoDaoError::LoadRoom { source })?;
        Ok(document.map(Into::into))
    }

    async fn find_room(&self, id: Uuid) -> MongoResult<Option<RoomEntity>> {
        let document = self
            .room_collection()
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadRoom { source })?;
        Ok(document.map(Into::into))
    }

    async fn list_active_rooms(&self) -> MongoResult<Vec<RoomEntity>> {
        let documents: Vec<MongoRoomDocument> = self
            .room_collection()
            .find(doc! {"status": {"$in": ["waiting", "playing"]}})
            .await
            .map_err(|source| MongoDaoError::ListRooms { source })?
            .try_collect()
            .await
            .map_err(|source| MongoDaoError::ListRooms { source })?;

        Ok(documents.into_iter().map(Into::into).collect())
    }

    async fn add_player(&self, player: PlayerEntity) -> MongoResult<()> {
        let conn_id = player.conn_id;
        let document: MongoPlayerDocument = player.into();
        self.player_collection()
            .replace_one(doc_id(conn_id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SavePlayer { conn_id, source })?;
        Ok(())
    }

    async fn find_player(&self, conn_id: Uuid) -> MongoResult<Option<PlayerEntity>> {
        let document = self
            .player_collection()
            .find_one(doc_id(conn_id))
            .await
            .map_err(|source| MongoDaoError::LoadPlayer { conn_id, source })?;
        Ok(document.map(Into::into))
    }

    async fn mark_player_offline(&self, conn_id: Uuid) -> MongoResult<()> {
        self.player_collection()
            .update_one(doc_id(conn_id), doc! {"$set": {"is_online": false}})
            .await
            .map_err(|source| MongoDaoError::SavePlayer { conn_id, source })?;
        Ok(())
    }

    async fn delete_player(&self, conn_id: Uuid) -> MongoResult<()> {
        self.player_collection()
            .delete_one(doc_id(conn_id))
            .await
            .map_err(|source| MongoDaoError::DeletePlayer { conn_id, source })?;
        Ok(())
    }

    async fn update_status(&self, room_id: Uuid, status: RoomStatus) -> MongoResult<()> {
        self.room_collection()
            .update_one(doc_id(room_id), doc! {"$set": {"status": status.as_str()}})
            .await
            .map_err(|source| MongoDaoError::UpdateRoom {
                id: room_id,
                source,
            })?;
        Ok(())
    }

    async fn update_target_word(
        &self,
        room_id: Uuid,
        target_word: Option<String>,
    ) -> MongoResult<()> {
        self.room_collection()
            .update_one(doc_id(room_id), doc! {"$set": {"target_word": target_word}})
            .await
            .map_err(|source| MongoDaoError::UpdateRoom {
                id: room_id,
                source,
            })?;
        Ok(())
    }

    async fn reassign_host(
        &self,
        room_id: Uuid,
        new_host: Uuid,
        new_host_name: String,
    ) -> MongoResult<()> {
        let map_err = |source| MongoDaoError::UpdateRoom {
            id: room_id,
            source,
        };

        self.player_collection()
            .update_many(
                doc! {"room_id": uuid_as_binary(room_id)},
                doc! {"$set": {"is_host": false}},
            )
            .await
            .map_err(map_err)?;
        self.player_collection()
            .update_one(doc_id(new_host), doc! {"$set": {"is_host": true}})
            .await
            .map_err(map_err)?;
        self.room_collection()
            .update_one(
                doc_id(room_id),
                doc! {"$set": {
                    "host_conn_id": uuid_as_binary(new_host),
                    "host_name": new_host_name,
                }},
            )
            .await
            .map_err(map_err)?;
        Ok(())
    }

    async fn record_vote(&self, vote: VoteEntity) -> MongoResult<()> {
        let room_id = vote.room_id;
        let document: MongoVoteDocument = vote.into();
        self.vote_collection()
            .replace_one(
                doc! {
                    "room_id": uuid_as_binary(document.room_id),
                    "voter_id": uuid_as_binary(document.voter_id),
                },
                &document,
            )
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveVote { room_id, source })?;
        Ok(())
    }

    async fn clear_votes(&self, room_id: Uuid) -> MongoResult<()> {
        self.vote_collection()
            .delete_many(doc! {"room_id": uuid_as_binary(room_id)})
            .await
            .map_err(|source| MongoDaoError::ClearVotes { room_id, source })?;
        Ok(())
    }

    async fn save_draw_snapshot(
        &self,
        room_id: Uuid,
        segments: Vec<SegmentEntity>,
    ) -> MongoResult<()> {
        let snapshot = mongodb::bson::serialize_to_bson(&segments).map_err(|source| {
            MongoDaoError::SaveSnapshot {
                room_id,
                source: source.into(),
            }
        })?;
        self.room_collection()
            .update_one(doc_id(room_id), doc! {"$set": {"draw_snapshot": snapshot}})
            .await
            .map_err(|source| MongoDaoError::SaveSnapshot { room_id, source })?;
        Ok(())
    }

    async fn record_game(&self, record: GameRecordEntity) -> MongoResult<()> {
        let room_id = record.room_id;
        let document: MongoGameRecordDocument = record.into();
        self.game_record_collection()
            .insert_one(&document)
            .await
            .map_err(|source| MongoDaoError::RecordGame { room_id, source })?;
        Ok(())
    }

    async fn delete_room(&self, room_id: Uuid) -> MongoResult<()> {
        let map_err = |source| MongoDaoError::DeleteRoom {
            id: room_id,
            source,
        };

        self.room_collection()
            .delete_one(doc_id(room_id))
            .await
            .map_err(map_err)?;
        self.player_collection()
            .delete_many(doc! {"room_id": uuid_as_binary(room_id)})
            .await
            .map_err(map_err)?;
        self.vote_collection()
            .delete_many(doc! {"room_id": uuid_as_binary(room_id)})
            .await
            .map_err(map_err)?;
        Ok(())
    }
}

impl RoomStore for MongoRoomStore {
    fn create_room(
        &self,
        room: RoomEntity,
        host: PlayerEntity,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.create_room(room, host).await.map_err(Into::into) })
    }

    fn find_room_by_code(
        &self,
        code: String,
    ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room_by_code(code).await.map_err(Into::into) })
    }

    fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_room(id).await.map_err(Into::into) })
    }

    fn list_active_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.list_active_rooms().await.map_err(Into::into) })
    }

    fn add_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.add_player(player).await.map_err(Into::into) })
    }

    fn find_player(
        &self,
        conn_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find_player(conn_id).await.map_err(Into::into) })
    }

    fn mark_player_offline(&self, conn_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.mark_player_offline(conn_id).await.map_err(Into::into) })
    }

    fn delete_player(&self, conn_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_player(conn_id).await.map_err(Into::into) })
    }

    fn update_status(
        &self,
        room_id: Uuid,
        status: RoomStatus,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update_status(room_id, status).await.map_err(Into::into) })
    }

    fn update_target_word(
        &self,
        room_id: Uuid,
        target_word: Option<String>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update_target_word(room_id, target_word)
                .await
                .map_err(Into::into)
        })
    }

    fn reassign_host(
        &self,
        room_id: Uuid,
        new_host: Uuid,
        new_host_name: String,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .reassign_host(room_id, new_host, new_host_name)
                .await
                .map_err(Into::into)
        })
    }

    fn record_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.record_vote(vote).await.map_err(Into::into) })
    }

    fn clear_votes(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.clear_votes(room_id).await.map_err(Into::into) })
    }

    fn save_draw_snapshot(
        &self,
        room_id: Uuid,
        segments: Vec<SegmentEntity>,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .save_draw_snapshot(room_id, segments)
                .await
                .map_err(Into::into)
        })
    }

    fn record_game(&self, record: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.record_game(record).await.map_err(Into::into) })
    }

    fn delete_room(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.delete_room(room_id).await.map_err(Into::into) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.ping().await.map_err(Into::into) })
    }
}
