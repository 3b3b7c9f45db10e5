use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use uuid::Uuid;

use inkboard_shared::{ClientMessage, ServerMessage};

use crate::logic::{apply_client_message, broadcast_all, broadcast_except};
use crate::state::AppState;

pub async fn ws_handler(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let connection_id = Uuid::new_v4();

    let init = {
        let mut board = state.board.write().await;
        board.peers.insert(connection_id, tx);
        let identity = board.assign_identity(connection_id);
        log::info!(
            "connected conn={connection_id} color={} peers={}",
            identity.color,
            board.peers.len()
        );
        ServerMessage::Init {
            color: identity.color,
            history: board.snapshot(),
        }
    };

    match bincode::encode_to_vec(&init, bincode::config::standard()) {
        Ok(payload) => {
            if let Err(error) = socket_sender.send(Message::Binary(payload)).await {
                log::warn!("init send failed conn={connection_id} error={error:?}");
            }
        }
        Err(error) => {
            log::warn!("init serialize failed conn={connection_id} error={error}");
        }
    }

    let send_task = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            if let Ok(payload) = bincode::encode_to_vec(&message, bincode::config::standard()) {
                if socket_sender.send(Message::Binary(payload)).await.is_err() {
                    break;
                }
            }
        }
    });

    let mut close_frame = None;

    while let Some(Ok(message)) = socket_receiver.next().await {
        let client_message = match message {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(parsed) => parsed,
                Err(error) => {
                    log::debug!("bad text frame conn={connection_id} error={error}");
                    continue;
                }
            },
            Message::Binary(data) => {
                match bincode::decode_from_slice::<ClientMessage, _>(
                    &data,
                    bincode::config::standard(),
                ) {
                    Ok((parsed, _)) => parsed,
                    Err(error) => {
                        log::debug!("bad binary frame conn={connection_id} error={error}");
                        continue;
                    }
                }
            }
            Message::Close(frame) => {
                close_frame = frame;
                break;
            }
            _ => continue,
        };

        let result = {
            let mut board = state.board.write().await;
            apply_client_message(&mut board, connection_id, client_message)
        };
        if let Some((server_messages, include_sender)) = result {
            for server_message in server_messages {
                if include_sender {
                    broadcast_all(&state.board, server_message).await;
                } else {
                    broadcast_except(&state.board, connection_id, server_message).await;
                }
            }
        }
    }

    // Abrupt termination lands here too; it gets the same cleanup as a
    // clean close.
    {
        let mut board = state.board.write().await;
        board.peers.remove(&connection_id);
        board.drop_identity(connection_id);
        log::info!(
            "disconnected conn={connection_id} peers={}",
            board.peers.len()
        );
        if let Some(frame) = &close_frame {
            log::debug!(
                "close frame conn={connection_id} code={:?} reason={:?}",
                frame.code,
                frame.reason
            );
        }
    }
    send_task.abort();

    broadcast_all(
        &state.board,
        ServerMessage::UserDisconnected {
            id: connection_id.to_string(),
        },
    )
    .await;
}
