//! Room lifecycle operations: create/join/leave, rounds, drawing relay, and
//! host votes.
//!
//! Every operation locks the target room's session for its whole duration,
//! persistence awaits included, so events against one room apply in a single
//! total order. Durable writes happen before the matching broadcast; when a
//! write fails the broadcast is skipped and the requester gets the error.

use std::{sync::Arc, time::SystemTime};

use tokio::sync::Mutex;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    dao::models::{GameRecordEntity, PlayerEntity, RoomEntity, RoomStatus, VoteEntity},
    dto::ws::{CreateRoomRequest, DrawCommand, JoinRoomRequest, ServerMessage},
    error::ServiceError,
    state::{SharedState, session::RoomSession},
};

/// How a player left the room; an explicit leave deletes the player row while
/// a transport disconnect only flags it offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Departure {
    /// The client sent `leave-room`.
    Leave,
    /// The socket closed without a leave.
    Disconnect,
}

/// Answer a `list-rooms` request from the live registry.
pub async fn list_rooms(state: &SharedState, conn_id: Uuid) {
    let mut rooms = Vec::new();
    for session in state.registry().sessions() {
        let session = session.lock().await;
        if matches!(session.status(), RoomStatus::Waiting | RoomStatus::Playing) {
            rooms.push(session.summary());
        }
    }
    state.send_to(conn_id, &ServerMessage::RoomList { rooms });
}

/// Create a room and seat the requester as its host.
pub async fn create_room(
    state: &SharedState,
    conn_id: Uuid,
    request: CreateRoomRequest,
) -> Result<(), ServiceError> {
    let code = state.registry().allocate_code()?;
    let max_players = request
        .max_players
        .map(|n| n as usize)
        .unwrap_or(state.config().default_max_players);

    let room = RoomEntity {
        id: Uuid::new_v4(),
        code: code.clone(),
        host_conn_id: conn_id,
        host_name: request.host_name.clone(),
        target_word: Some(request.target_word.clone()),
        status: RoomStatus::Waiting,
        max_players,
        created_at: SystemTime::now(),
    };
    let host = PlayerEntity {
        conn_id,
        room_id: room.id,
        name: request.host_name,
        is_host: true,
        is_online: true,
    };

    let room_id = room.id;
    state.store().create_room(room.clone(), host).await?;

    let session = RoomSession::new(room);
    let view = session.room_view(true);
    if let Err(err) = state
        .registry()
        .insert(code.clone(), Arc::new(Mutex::new(session)))
    {
        // Lost a code race after the durable write; drop the orphaned row.
        if let Err(cleanup) = state.store().delete_room(room_id).await {
            warn!(code, error = %cleanup, "failed to clean up room after code collision");
        }
        return Err(err);
    }

    info!(code, host = %conn_id, "room created");
    state.send_to(
        conn_id,
        &ServerMessage::RoomCreated {
            room_code: code,
            room: view,
        },
    );
    Ok(())
}

/// Join an active room by code.
pub async fn join_room(
    state: &SharedState,
    conn_id: Uuid,
    request: JoinRoomRequest,
) -> Result<(), ServiceError> {
    let shared = state
        .registry()
        .lookup(&request.room_code)
        .ok_or(ServiceError::RoomNotFound)?;
    let mut session = shared.lock().await;

    if session.is_full() {
        return Err(ServiceError::RoomFull);
    }

    state
        .store()
        .add_player(PlayerEntity {
            conn_id,
            room_id: session.room_id(),
            name: request.player_name.clone(),
            is_host: false,
            is_online: true,
        })
        .await?;
    let player = session.add_player(conn_id, request.player_name)?.to_view();

    info!(code = session.code(), player = %conn_id, "player joined");
    state.send_to(
        conn_id,
        &ServerMessage::RoomJoined {
            room: session.room_view(false),
            players: session.roster(),
            is_host: false,
            draw_history: session.drawing().replay().to_vec(),
        },
    );
    state.broadcast(
        &session.online_conn_ids(),
        &ServerMessage::PlayerJoined {
            player,
            count: session.online_count(),
        },
        None,
    );
    Ok(())
}

/// Host-only transition `waiting -> playing`.
pub async fn start_game(
    state: &SharedState,
    conn_id: Uuid,
    room_code: &str,
) -> Result<(), ServiceError> {
    let shared = state
        .registry()
        .lookup(room_code)
        .ok_or(ServiceError::RoomNotFound)?;
    let mut session = shared.lock().await;

    if !session.is_host(conn_id) {
        return Err(ServiceError::NotHost);
    }
    if session.status() != RoomStatus::Waiting {
        // Starting mid-round is ignored without an error reply.
        return Ok(());
    }

    state
        .store()
        .update_status(session.room_id(), RoomStatus::Playing)
        .await?;
    session.start_round();

    info!(code = session.code(), "round started");
    let word = session.target_word().map(str::to_string);
    for id in session.online_conn_ids() {
        let target_word = if session.is_host(id) { word.clone() } else { None };
        state.send_to(id, &ServerMessage::GameStarted { target_word });
    }
    Ok(())
}

/// Relay one drawing operation to the room and fold it into the stroke log.
///
/// Unknown rooms are ignored; drawing is best-effort and never replies with
/// an error.
pub async fn handle_draw(state: &SharedState, conn_id: Uuid, room_code: &str, data: DrawCommand) {
    let Some(shared) = state.registry().lookup(room_code) else {
        return;
    };
    let mut session = shared.lock().await;
    if session.player(conn_id).is_none() {
        return;
    }

    let committed = match &data {
        DrawCommand::Segment(segment) => {
            session.drawing_mut().append_segment(segment.clone());
            false
        }
        DrawCommand::StrokeEnd => session.drawing_mut().commit_stroke(),
        DrawCommand::Clear => {
            session.drawing_mut().clear();
            true
        }
        DrawCommand::Undo => session.drawing_mut().undo(),
    };

    state.broadcast(
        &session.online_conn_ids(),
        &ServerMessage::DrawSync { draw_data: data },
        Some(conn_id),
    );

    // Snapshot on stroke boundaries only; losing a snapshot loses nothing
    // but the replay for reconnecting clients.
    if committed {
        let snapshot = session.drawing().replay().to_vec();
        if let Err(err) = state
            .store()
            .save_draw_snapshot(session.room_id(), snapshot)
            .await
        {
            warn!(code = session.code(), error = %err, "failed to snapshot drawing");
        }
    }
}

/// Check a guess against the target word, closing the round on a match.
pub async fn submit_answer(
    state: &SharedState,
    conn_id: Uuid,
    room_code: &str,
    answer: &str,
) -> Result<(), ServiceError> {
    let Some(shared) = state.registry().lookup(room_code) else {
        return Ok(());
    };
    let mut session = shared.lock().await;
    if session.status() != RoomStatus::Playing {
        return Ok(());
    }
    let Some(player_name) = session.player(conn_id).map(|p| p.name.clone()) else {
        return Ok(());
    };

    state.send_to(
        conn_id,
        &ServerMessage::AnswerSubmitted {
            player_name: player_name.clone(),
        },
    );

    if !session.answer_matches(answer) {
        return Ok(());
    }

    let target_word = session.target_word().unwrap_or_default().to_string();
    state
        .store()
        .update_status(session.room_id(), RoomStatus::Waiting)
        .await?;
    let duration = session.finish_round().unwrap_or_default();

    if let Err(err) = state
        .store()
        .record_game(GameRecordEntity {
            room_id: session.room_id(),
            target_word: target_word.clone(),
            winner_name: player_name.clone(),
            finished_at: SystemTime::now(),
            duration,
        })
        .await
    {
        warn!(code = session.code(), error = %err, "failed to record finished round");
    }

    info!(code = session.code(), winner = %player_name, "round won");
    state.broadcast(
        &session.online_conn_ids(),
        &ServerMessage::CorrectAnswer {
            player_name,
            target_word,
        },
        None,
    );
    Ok(())
}

/// Host-only: force the room back to `waiting`, cancelling a running vote.
pub async fn end_game(
    state: &SharedState,
    conn_id: Uuid,
    room_code: &str,
) -> Result<(), ServiceError> {
    let shared = state
        .registry()
        .lookup(room_code)
        .ok_or(ServiceError::RoomNotFound)?;
    let mut session = shared.lock().await;

    if !session.is_host(conn_id) {
        return Err(ServiceError::NotHost);
    }

    state
        .store()
        .update_status(session.room_id(), RoomStatus::Waiting)
        .await?;
    if session.vote().is_running() {
        session.vote_mut().conclude();
        if let Err(err) = state.store().clear_votes(session.room_id()).await {
            warn!(code = session.code(), error = %err, "failed to clear votes");
        }
    }
    session.finish_round();

    info!(code = session.code(), "round ended by host");
    state.broadcast(&session.online_conn_ids(), &ServerMessage::GameEnded, None);
    Ok(())
}

/// Host-only: open a vote for the next host and arm the countdown.
pub async fn start_vote(
    state: &SharedState,
    conn_id: Uuid,
    room_code: &str,
) -> Result<(), ServiceError> {
    let shared = state
        .registry()
        .lookup(room_code)
        .ok_or(ServiceError::RoomNotFound)?;
    let mut session = shared.lock().await;

    if !session.is_host(conn_id) {
        return Err(ServiceError::NotHost);
    }
    let candidates = session.vote_candidates();
    if candidates.is_empty() {
        return Err(ServiceError::NoCandidates);
    }

    state.store().clear_votes(session.room_id()).await?;
    state
        .store()
        .update_status(session.room_id(), RoomStatus::Voting)
        .await?;

    let candidate_ids = candidates.iter().map(|c| c.conn_id).collect();
    let epoch = session.vote_mut().start(candidate_ids);
    session.set_status(RoomStatus::Voting);

    let duration = state.config().vote_duration;
    info!(code = session.code(), epoch, "vote started");
    state.broadcast(
        &session.online_conn_ids(),
        &ServerMessage::VoteStarted {
            candidates,
            duration: duration.as_secs(),
        },
        None,
    );

    let timer_state = state.clone();
    let code = session.code().to_string();
    let handle = tokio::spawn(async move {
        tokio::time::sleep(duration).await;
        resolve_vote(&timer_state, &code, epoch).await;
    });
    session.vote_mut().arm(handle.abort_handle());
    Ok(())
}

/// Record (or overwrite) a vote and broadcast the running tally.
pub async fn cast_vote(
    state: &SharedState,
    conn_id: Uuid,
    room_code: &str,
    candidate_id: Uuid,
) -> Result<(), ServiceError> {
    let Some(shared) = state.registry().lookup(room_code) else {
        return Ok(());
    };
    let mut session = shared.lock().await;
    // Votes outside a vote round are silently dropped.
    if session.status() != RoomStatus::Voting || !session.vote().is_running() {
        return Ok(());
    }

    state
        .store()
        .record_vote(VoteEntity {
            room_id: session.room_id(),
            voter_id: conn_id,
            candidate_id,
        })
        .await?;
    session.vote_mut().cast(conn_id, candidate_id);

    state.broadcast(
        &session.online_conn_ids(),
        &ServerMessage::VoteUpdated {
            votes: session.vote().votes().clone(),
            voter_id: conn_id,
        },
        None,
    );
    Ok(())
}

/// Resolve the vote round opened under `epoch`.
///
/// Called by the countdown task; a vote concluded or restarted in the
/// meantime leaves a stale epoch behind and the callback does nothing.
pub async fn resolve_vote(state: &SharedState, room_code: &str, epoch: u64) {
    let Some(shared) = state.registry().lookup(room_code) else {
        return;
    };
    let mut session = shared.lock().await;
    if session.status() != RoomStatus::Voting
        || !session.vote().is_running()
        || session.vote().epoch() != epoch
    {
        return;
    }

    let results = session.vote().tally();
    let winner = {
        let mut rng = rand::rng();
        session.vote().decide_winner(&mut rng)
    };

    // The winner must still be online; a candidate who dropped out mid-vote
    // cannot take over the room.
    let winner = winner.filter(|id| session.player(*id).is_some_and(|p| p.is_online));

    let (new_host, message) = match winner {
        Some(candidate) => {
            let name = session
                .player(candidate)
                .map(|p| p.name.clone())
                .unwrap_or_default();
            match state
                .store()
                .reassign_host(session.room_id(), candidate, name)
                .await
            {
                Ok(()) => (session.promote_host(candidate), None),
                Err(err) => {
                    // Keep the announced state consistent with storage: the
                    // host stays unchanged when the handover cannot be saved.
                    error!(code = session.code(), error = %err, "failed to persist host handover");
                    (None, Some("vote result could not be saved; host unchanged".to_string()))
                }
            }
        }
        None => (None, Some("no valid votes; host unchanged".to_string())),
    };

    if let Err(err) = state
        .store()
        .update_status(session.room_id(), RoomStatus::Waiting)
        .await
    {
        warn!(code = session.code(), error = %err, "failed to persist status after vote");
    }
    if let Err(err) = state.store().clear_votes(session.room_id()).await {
        warn!(code = session.code(), error = %err, "failed to clear votes after vote");
    }

    session.vote_mut().conclude();
    session.set_status(RoomStatus::Waiting);

    info!(
        code = session.code(),
        epoch,
        new_host = ?new_host.as_ref().map(|p| p.conn_id),
        "vote resolved"
    );
    state.broadcast(
        &session.online_conn_ids(),
        &ServerMessage::VoteEnded {
            new_host,
            results,
            message,
        },
        None,
    );
}

/// Handle a leave or disconnect for a room the player belongs to.
///
/// A departing host destroys the room; other players are either deleted
/// (explicit leave) or flagged offline (disconnect). Repeated departures are
/// no-ops.
pub async fn depart(
    state: &SharedState,
    conn_id: Uuid,
    room_code: &str,
    kind: Departure,
) -> Result<(), ServiceError> {
    let Some(shared) = state.registry().lookup(room_code) else {
        return Ok(());
    };
    let mut session = shared.lock().await;
    let Some(player) = session.player(conn_id).cloned() else {
        return Ok(());
    };
    if !player.is_online {
        return Ok(());
    }

    if player.is_host {
        session.vote_mut().conclude();
        state.store().delete_room(session.room_id()).await?;

        let recipients = session.online_conn_ids();
        state.registry().remove(session.code());
        info!(code = session.code(), "room closed by host departure");
        state.broadcast(
            &recipients,
            &ServerMessage::RoomClosed {
                message: "the host left; the room was closed".into(),
            },
            Some(conn_id),
        );
        return Ok(());
    }

    match kind {
        Departure::Leave => {
            state.store().delete_player(conn_id).await?;
            session.remove_player(conn_id);
        }
        Departure::Disconnect => {
            state.store().mark_player_offline(conn_id).await?;
            session.mark_offline(conn_id);
        }
    }

    info!(code = session.code(), player = %conn_id, ?kind, "player left");
    state.broadcast(
        &session.online_conn_ids(),
        &ServerMessage::PlayerLeft {
            player_name: player.name,
            count: session.online_count(),
        },
        None,
    );
    Ok(())
}

/// Clean up after a closed socket.
///
/// The player's room is resolved through the durable store since the
/// transport does not remember room membership.
pub async fn handle_disconnect(state: &SharedState, conn_id: Uuid) {
    let player = match state.store().find_player(conn_id).await {
        Ok(Some(player)) => player,
        Ok(None) => return,
        Err(err) => {
            warn!(conn_id = %conn_id, error = %err, "failed to look up disconnecting player");
            return;
        }
    };
    let room = match state.store().find_room(player.room_id).await {
        Ok(Some(room)) => room,
        Ok(None) => return,
        Err(err) => {
            warn!(conn_id = %conn_id, error = %err, "failed to look up room on disconnect");
            return;
        }
    };

    if let Err(err) = depart(state, conn_id, &room.code, Departure::Disconnect).await {
        warn!(conn_id = %conn_id, code = room.code, error = %err, "disconnect cleanup failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::{
        collections::HashMap,
        sync::Mutex as StdMutex,
    };

    use axum::extract::ws::Message;
    use futures::future::BoxFuture;
    use serde_json::Value;
    use tokio::sync::mpsc;

    use crate::{
        config::AppConfig,
        dao::{
            models::SegmentEntity,
            room_store::RoomStore,
            storage::StorageResult,
        },
        state::{AppState, ClientConnection},
    };

    /// In-memory [`RoomStore`] mirroring the durable backend's contract.
    #[derive(Default)]
    struct MemoryStore {
        rooms: StdMutex<HashMap<Uuid, RoomEntity>>,
        players: StdMutex<HashMap<Uuid, PlayerEntity>>,
        votes: StdMutex<HashMap<(Uuid, Uuid), Uuid>>,
        records: StdMutex<Vec<GameRecordEntity>>,
        snapshots: StdMutex<HashMap<Uuid, Vec<SegmentEntity>>>,
    }

    fn ready<T: Send + 'static>(value: StorageResult<T>) -> BoxFuture<'static, StorageResult<T>> {
        Box::pin(async move { value })
    }

    impl RoomStore for MemoryStore {
        fn create_room(
            &self,
            room: RoomEntity,
            host: PlayerEntity,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.rooms.lock().unwrap().insert(room.id, room);
            self.players.lock().unwrap().insert(host.conn_id, host);
            ready(Ok(()))
        }

        fn find_room_by_code(
            &self,
            code: String,
        ) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
            let room = self
                .rooms
                .lock()
                .unwrap()
                .values()
                .find(|room| room.code == code)
                .cloned();
            ready(Ok(room))
        }

        fn find_room(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<RoomEntity>>> {
            ready(Ok(self.rooms.lock().unwrap().get(&id).cloned()))
        }

        fn list_active_rooms(&self) -> BoxFuture<'static, StorageResult<Vec<RoomEntity>>> {
            let rooms = self
                .rooms
                .lock()
                .unwrap()
                .values()
                .filter(|room| {
                    matches!(room.status, RoomStatus::Waiting | RoomStatus::Playing)
                })
                .cloned()
                .collect();
            ready(Ok(rooms))
        }

        fn add_player(&self, player: PlayerEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.players.lock().unwrap().insert(player.conn_id, player);
            ready(Ok(()))
        }

        fn find_player(
            &self,
            conn_id: Uuid,
        ) -> BoxFuture<'static, StorageResult<Option<PlayerEntity>>> {
            ready(Ok(self.players.lock().unwrap().get(&conn_id).cloned()))
        }

        fn mark_player_offline(&self, conn_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
            if let Some(player) = self.players.lock().unwrap().get_mut(&conn_id) {
                player.is_online = false;
            }
            ready(Ok(()))
        }

        fn delete_player(&self, conn_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
            self.players.lock().unwrap().remove(&conn_id);
            ready(Ok(()))
        }

        fn update_status(
            &self,
            room_id: Uuid,
            status: RoomStatus,
        ) -> BoxFuture<'static, StorageResult<()>> {
            if let Some(room) = self.rooms.lock().unwrap().get_mut(&room_id) {
                room.status = status;
            }
            ready(Ok(()))
        }

        fn update_target_word(
            &self,
            room_id: Uuid,
            target_word: Option<String>,
        ) -> BoxFuture<'static, StorageResult<()>> {
            if let Some(room) = self.rooms.lock().unwrap().get_mut(&room_id) {
                room.target_word = target_word;
            }
            ready(Ok(()))
        }

        fn reassign_host(
            &self,
            room_id: Uuid,
            new_host: Uuid,
            new_host_name: String,
        ) -> BoxFuture<'static, StorageResult<()>> {
            if let Some(room) = self.rooms.lock().unwrap().get_mut(&room_id) {
                room.host_conn_id = new_host;
                room.host_name = new_host_name;
            }
            for player in self.players.lock().unwrap().values_mut() {
                if player.room_id == room_id {
                    player.is_host = player.conn_id == new_host;
                }
            }
            ready(Ok(()))
        }

        fn record_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.votes
                .lock()
                .unwrap()
                .insert((vote.room_id, vote.voter_id), vote.candidate_id);
            ready(Ok(()))
        }

        fn clear_votes(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
            self.votes
                .lock()
                .unwrap()
                .retain(|(room, _), _| *room != room_id);
            ready(Ok(()))
        }

        fn save_draw_snapshot(
            &self,
            room_id: Uuid,
            segments: Vec<SegmentEntity>,
        ) -> BoxFuture<'static, StorageResult<()>> {
            self.snapshots.lock().unwrap().insert(room_id, segments);
            ready(Ok(()))
        }

        fn record_game(&self, record: GameRecordEntity) -> BoxFuture<'static, StorageResult<()>> {
            self.records.lock().unwrap().push(record);
            ready(Ok(()))
        }

        fn delete_room(&self, room_id: Uuid) -> BoxFuture<'static, StorageResult<()>> {
            self.rooms.lock().unwrap().remove(&room_id);
            self.players
                .lock()
                .unwrap()
                .retain(|_, player| player.room_id != room_id);
            self.votes
                .lock()
                .unwrap()
                .retain(|(room, _), _| *room != room_id);
            ready(Ok(()))
        }

        fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
            ready(Ok(()))
        }
    }

    struct Client {
        id: Uuid,
        rx: mpsc::UnboundedReceiver<Message>,
    }

    impl Client {
        /// Drain and decode everything this client has received so far.
        fn drain(&mut self) -> Vec<Value> {
            let mut messages = Vec::new();
            while let Ok(message) = self.rx.try_recv() {
                if let Message::Text(text) = message {
                    messages.push(serde_json::from_str(&text).expect("valid json"));
                }
            }
            messages
        }

        fn received(&mut self, message_type: &str) -> Vec<Value> {
            self.drain()
                .into_iter()
                .filter(|value| value["type"] == message_type)
                .collect()
        }
    }

    fn state() -> SharedState {
        AppState::new(AppConfig::default(), Arc::new(MemoryStore::default()))
    }

    fn connect(state: &SharedState) -> Client {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.connections().insert(id, ClientConnection { id, tx });
        Client { id, rx }
    }

    async fn create(state: &SharedState, host: &mut Client, word: &str, max: u32) -> String {
        create_room(
            state,
            host.id,
            CreateRoomRequest {
                target_word: word.into(),
                host_name: "host".into(),
                max_players: Some(max),
            },
        )
        .await
        .expect("create");
        let created = host.received("room-created");
        created[0]["roomCode"].as_str().expect("code").to_string()
    }

    async fn join(state: &SharedState, player: &mut Client, code: &str, name: &str) {
        join_room(
            state,
            player.id,
            JoinRoomRequest {
                room_code: code.into(),
                player_name: name.into(),
            },
        )
        .await
        .expect("join");
    }

    #[tokio::test]
    async fn wrong_then_right_guess_closes_the_round() {
        let state = state();
        let mut host = connect(&state);
        let mut guesser = connect(&state);

        let code = create(&state, &mut host, "cat", 2).await;
        join(&state, &mut guesser, &code, "bob").await;
        start_game(&state, host.id, &code).await.expect("start");
        host.drain();
        guesser.drain();

        submit_answer(&state, guesser.id, &code, "dog")
            .await
            .expect("guess");
        assert_eq!(guesser.received("answer-submitted").len(), 1);
        assert!(host.received("correct-answer").is_empty());

        submit_answer(&state, guesser.id, &code, " CAT ")
            .await
            .expect("guess");
        let wins = host.received("correct-answer");
        assert_eq!(wins.len(), 1);
        assert_eq!(wins[0]["playerName"], "bob");
        assert_eq!(wins[0]["targetWord"], "cat");
        assert_eq!(guesser.received("correct-answer").len(), 1);

        let session = state.registry().lookup(&code).expect("room");
        assert_eq!(session.lock().await.status(), RoomStatus::Waiting);
    }

    #[tokio::test]
    async fn guesses_outside_a_round_are_ignored() {
        let state = state();
        let mut host = connect(&state);
        let mut guesser = connect(&state);

        let code = create(&state, &mut host, "cat", 2).await;
        join(&state, &mut guesser, &code, "bob").await;
        guesser.drain();

        submit_answer(&state, guesser.id, &code, "cat")
            .await
            .expect("guess");
        assert!(guesser.received("answer-submitted").is_empty());
        assert!(host.received("correct-answer").is_empty());
    }

    #[tokio::test]
    async fn join_into_full_room_fails_without_roster_change() {
        let state = state();
        let mut host = connect(&state);
        let mut first = connect(&state);
        let mut late = connect(&state);

        let code = create(&state, &mut host, "cat", 2).await;
        join(&state, &mut first, &code, "bob").await;

        let result = join_room(
            &state,
            late.id,
            JoinRoomRequest {
                room_code: code.clone(),
                player_name: "carol".into(),
            },
        )
        .await;
        assert!(matches!(result, Err(ServiceError::RoomFull)));
        assert!(late.received("room-joined").is_empty());

        let session = state.registry().lookup(&code).expect("room");
        let session = session.lock().await;
        assert_eq!(session.online_count(), 2);
        assert!(session.player(late.id).is_none());
    }

    #[tokio::test]
    async fn only_the_host_starts_a_round() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;

        let result = start_game(&state, guest.id, &code).await;
        assert!(matches!(result, Err(ServiceError::NotHost)));
        let session = state.registry().lookup(&code).expect("room");
        assert_eq!(session.lock().await.status(), RoomStatus::Waiting);
    }

    #[tokio::test]
    async fn only_the_host_sees_the_word_on_start() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;
        host.drain();
        guest.drain();

        start_game(&state, host.id, &code).await.expect("start");
        let to_host = host.received("game-started");
        assert_eq!(to_host[0]["targetWord"], "cat");
        let to_guest = guest.received("game-started");
        assert_eq!(to_guest[0]["targetWord"], Value::Null);
    }

    #[tokio::test]
    async fn host_departure_destroys_the_room() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;
        guest.drain();

        depart(&state, host.id, &code, Departure::Disconnect)
            .await
            .expect("depart");

        assert!(state.registry().lookup(&code).is_none());
        assert_eq!(guest.received("room-closed").len(), 1);

        // The durable room row is gone with the session.
        let room = state.store().find_room_by_code(code).await.expect("store");
        assert!(room.is_none());
    }

    #[tokio::test]
    async fn disconnect_resolves_room_through_the_store() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;
        host.drain();

        handle_disconnect(&state, guest.id).await;

        let left = host.received("player-left");
        assert_eq!(left.len(), 1);
        assert_eq!(left[0]["playerName"], "bob");
        assert_eq!(left[0]["count"], 1);

        let session = state.registry().lookup(&code).expect("room");
        let session = session.lock().await;
        // The roster entry survives offline for idempotent cleanup.
        assert!(session.player(guest.id).is_some_and(|p| !p.is_online));
        assert_eq!(session.online_count(), 1);
    }

    #[tokio::test]
    async fn double_departure_broadcasts_once() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;
        host.drain();

        depart(&state, guest.id, &code, Departure::Disconnect)
            .await
            .expect("first");
        depart(&state, guest.id, &code, Departure::Disconnect)
            .await
            .expect("second");
        depart(&state, guest.id, &code, Departure::Leave)
            .await
            .expect("third");

        assert_eq!(host.received("player-left").len(), 1);
    }

    #[tokio::test]
    async fn explicit_leave_removes_the_player_row() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;

        depart(&state, guest.id, &code, Departure::Leave)
            .await
            .expect("leave");

        let row = state.store().find_player(guest.id).await.expect("store");
        assert!(row.is_none());
        let session = state.registry().lookup(&code).expect("room");
        assert!(session.lock().await.player(guest.id).is_none());
    }

    #[tokio::test]
    async fn vote_without_candidates_is_rejected() {
        let state = state();
        let mut host = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        let result = start_vote(&state, host.id, &code).await;
        assert!(matches!(result, Err(ServiceError::NoCandidates)));
    }

    #[tokio::test]
    async fn voted_candidate_takes_over_hosting() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;
        start_vote(&state, host.id, &code).await.expect("vote");
        let epoch = {
            let session = state.registry().lookup(&code).expect("room");
            let session = session.lock().await;
            assert_eq!(session.status(), RoomStatus::Voting);
            session.vote().epoch()
        };

        cast_vote(&state, host.id, &code, guest.id)
            .await
            .expect("cast");
        host.drain();
        guest.drain();

        resolve_vote(&state, &code, epoch).await;

        let ended = guest.received("vote-ended");
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0]["newHost"]["connId"], guest.id.to_string());
        assert!(ended[0].get("message").is_none());

        let session = state.registry().lookup(&code).expect("room");
        let session = session.lock().await;
        assert_eq!(session.host_conn_id(), guest.id);
        assert_eq!(session.status(), RoomStatus::Waiting);
        assert!(!session.vote().is_running());

        let room = state
            .store()
            .find_room(session.room_id())
            .await
            .expect("store")
            .expect("room row");
        assert_eq!(room.host_conn_id, guest.id);
    }

    #[tokio::test]
    async fn zero_votes_leave_the_host_unchanged() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;
        start_vote(&state, host.id, &code).await.expect("vote");
        let session = state.registry().lookup(&code).expect("room");
        let epoch = session.lock().await.vote().epoch();
        host.drain();
        guest.drain();

        resolve_vote(&state, &code, epoch).await;

        let ended = host.received("vote-ended");
        assert_eq!(ended.len(), 1);
        assert_eq!(ended[0]["newHost"], Value::Null);
        assert!(ended[0]["message"].is_string());

        let session = state.registry().lookup(&code).expect("room");
        let session = session.lock().await;
        assert_eq!(session.host_conn_id(), host.id);
        assert_eq!(session.status(), RoomStatus::Waiting);
    }

    #[tokio::test]
    async fn stale_timer_epoch_does_not_resolve_a_later_state() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;
        start_vote(&state, host.id, &code).await.expect("vote");
        let session = state.registry().lookup(&code).expect("room");
        let stale_epoch = session.lock().await.vote().epoch();

        end_game(&state, host.id, &code).await.expect("end");
        host.drain();
        guest.drain();

        resolve_vote(&state, &code, stale_epoch).await;

        assert!(host.received("vote-ended").is_empty());
        assert!(guest.received("vote-ended").is_empty());
        let session = state.registry().lookup(&code).expect("room");
        assert_eq!(session.lock().await.host_conn_id(), host.id);
    }

    #[tokio::test]
    async fn draw_relay_skips_the_drawer_and_hydrates_late_joiners() {
        let state = state();
        let mut host = connect(&state);
        let mut guest = connect(&state);
        let mut late = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        join(&state, &mut guest, &code, "bob").await;
        host.drain();
        guest.drain();

        let segment = SegmentEntity {
            from: [0.0, 0.0],
            to: [1.0, 1.0],
            color: "#000000".into(),
            width: 2.0,
        };
        handle_draw(
            &state,
            host.id,
            &code,
            DrawCommand::Segment(segment.clone()),
        )
        .await;
        handle_draw(&state, host.id, &code, DrawCommand::StrokeEnd).await;

        assert_eq!(guest.received("draw-sync").len(), 2);
        assert!(host.received("draw-sync").is_empty());

        join(&state, &mut late, &code, "carol").await;
        let joined = late.received("room-joined");
        let history = joined[0]["drawHistory"].as_array().expect("history");
        assert_eq!(history.len(), 1);
        assert_eq!(history[0]["color"], "#000000");
    }

    #[tokio::test]
    async fn room_list_reflects_live_rooms_only() {
        let state = state();
        let mut host = connect(&state);
        let mut other = connect(&state);

        let code = create(&state, &mut host, "cat", 4).await;
        list_rooms(&state, other.id).await;
        let listed = other.received("room-list");
        assert_eq!(listed[0]["rooms"].as_array().expect("rooms").len(), 1);
        assert_eq!(listed[0]["rooms"][0]["roomCode"], code.as_str());

        // Destroyed rooms drop out of the listing immediately.
        depart(&state, host.id, &code, Departure::Leave)
            .await
            .expect("leave");
        list_rooms(&state, other.id).await;
        let listed = other.received("room-list");
        assert!(listed[0]["rooms"].as_array().expect("rooms").is_empty());
    }
}
