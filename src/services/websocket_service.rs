//! WebSocket connection lifecycle and message dispatch.

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    dto::ws::{ClientMessage, ServerMessage},
    services::room_service::{self, Departure},
    state::{ClientConnection, SharedState},
};

/// Drive one client socket until it closes.
///
/// The socket is split so a dedicated writer task owns the sink; every send
/// to this client goes through its unbounded channel, which keeps broadcasts
/// from blocking on a slow peer.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sink.send(message).await.is_err() {
                break;
            }
        }
    });

    let conn_id = Uuid::new_v4();
    state.connections().insert(
        conn_id,
        ClientConnection {
            id: conn_id,
            tx: outbound_tx.clone(),
        },
    );
    info!(conn_id = %conn_id, "client connected");

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => match ClientMessage::from_json_str(&text) {
                Ok(parsed) => dispatch(&state, conn_id, parsed).await,
                Err(err) => {
                    debug!(conn_id = %conn_id, error = %err, "rejected inbound frame");
                    state.send_to(
                        conn_id,
                        &ServerMessage::RoomError {
                            message: err.to_string(),
                        },
                    );
                }
            },
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                debug!(conn_id = %conn_id, error = %err, "socket error");
                break;
            }
        }
    }

    state.connections().remove(&conn_id);
    room_service::handle_disconnect(&state, conn_id).await;
    drop(outbound_tx);
    writer_task.abort();
    info!(conn_id = %conn_id, "client disconnected");
}

/// Route one parsed message to its room operation.
///
/// Rejections are reported back to the requester only; storage failures are
/// additionally logged since they mean the backend is in trouble.
async fn dispatch(state: &SharedState, conn_id: Uuid, message: ClientMessage) {
    let result = match message {
        ClientMessage::ListRooms => {
            room_service::list_rooms(state, conn_id).await;
            Ok(())
        }
        ClientMessage::CreateRoom(request) => {
            room_service::create_room(state, conn_id, request).await
        }
        ClientMessage::JoinRoom(request) => room_service::join_room(state, conn_id, request).await,
        ClientMessage::StartGame { room_code } => {
            room_service::start_game(state, conn_id, &room_code).await
        }
        ClientMessage::Draw {
            room_code,
            draw_data,
        } => {
            room_service::handle_draw(state, conn_id, &room_code, draw_data).await;
            Ok(())
        }
        ClientMessage::SubmitAnswer { room_code, answer } => {
            room_service::submit_answer(state, conn_id, &room_code, &answer).await
        }
        ClientMessage::EndGame { room_code } => {
            room_service::end_game(state, conn_id, &room_code).await
        }
        ClientMessage::StartVote { room_code } => {
            room_service::start_vote(state, conn_id, &room_code).await
        }
        ClientMessage::Vote {
            room_code,
            candidate_id,
        } => room_service::cast_vote(state, conn_id, &room_code, candidate_id).await,
        ClientMessage::LeaveRoom { room_code } => {
            room_service::depart(state, conn_id, &room_code, Departure::Leave).await
        }
    };

    if let Err(err) = result {
        if !err.is_validation() {
            warn!(conn_id = %conn_id, error = %err, "request failed");
        }
        state.send_to(
            conn_id,
            &ServerMessage::RoomError {
                message: err.to_string(),
            },
        );
    }
}
