//! WebSocket connection gateway.
//!
//! 1 接続 = 1 タスク。最初のフレームで join ハンドシェイクを行い、
//! 成功後は受信フレームを Room アクターへ、Room からのイベントをソケットへ中継します。
//! ソケットがどのように閉じても、Room への leave はちょうど 1 回だけ送ります。

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{
        State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, SplitStream, StreamExt},
};
use tokio::sync::{mpsc, oneshot};
use tracing::Instrument;

use crate::{
    domain::{ConnectionId, ConnectionIdFactory, JoinError, RoomEvent},
    infrastructure::dto::websocket::{ClientMessage, ServerMessage},
    ui::state::AppState,
    usecase::SpaceSession,
};

const HANDSHAKE_REQUIRED: &str = "handshake-required";

/// How long the pusher gets to flush a close frame requested by the receive side.
const CLOSE_GRACE: Duration = Duration::from_secs(1);

type SocketSink = SplitSink<WebSocket, Message>;
type SocketStream = SplitStream<WebSocket>;

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let connection_id = ConnectionIdFactory::generate();
    ws.on_upgrade(move |socket| {
        handle_socket(socket, state, connection_id)
            .instrument(tracing::info_span!("connection", %connection_id))
    })
}

/// Outcome of waiting for the first frame.
enum Handshake {
    Join { space_id: String, token: String },
    Invalid(String),
    Disconnected,
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, connection_id: ConnectionId) {
    let (mut sender, mut receiver) = socket.split();
    tracing::debug!("Connection opened");

    // 1. ハンドシェイク（最初のフレームは join でなければならない）
    let handshake =
        tokio::time::timeout(state.config.handshake_timeout, read_handshake(&mut receiver)).await;
    let (space_id, token) = match handshake {
        Ok(Handshake::Join { space_id, token }) => (space_id, token),
        Ok(Handshake::Invalid(detail)) => {
            tracing::warn!("Invalid handshake frame: {}", detail);
            let error = ServerMessage::error(HANDSHAKE_REQUIRED, "first message must be join");
            reject(&mut sender, Some(error), close_code::POLICY, "handshake required").await;
            return;
        }
        Ok(Handshake::Disconnected) => {
            tracing::debug!("Connection closed before handshake");
            return;
        }
        Err(_) => {
            tracing::info!(
                "No join within {:?}, dropping connection",
                state.config.handshake_timeout
            );
            let error = ServerMessage::error(HANDSHAKE_REQUIRED, "handshake timed out");
            reject(&mut sender, Some(error), close_code::POLICY, "handshake timeout").await;
            return;
        }
    };

    // 2. 認証と Room への参加。送信キューの Sender は Room 側だけが持つ
    let (tx, rx) = mpsc::channel(state.config.outbound_queue_capacity);
    let session = match state
        .join_space_usecase
        .execute(space_id, &token, connection_id, tx)
        .await
    {
        Ok(session) => session,
        Err(JoinError::AuthenticationFailure) => {
            reject(&mut sender, None, close_code::POLICY, "authentication failed").await;
            return;
        }
        Err(e) => {
            tracing::info!("Join rejected: {}", e);
            let error = ServerMessage::from(&e);
            reject(&mut sender, Some(error), close_code::NORMAL, e.reason()).await;
            return;
        }
    };
    tracing::info!(
        "User '{}' joined space '{}' at {}",
        session.user_id(),
        session.space_id(),
        session.spawn()
    );

    // 3. 送受信ループ
    let (close_tx, close_rx) = oneshot::channel();
    let mut send_task = pusher_loop(rx, sender, close_rx);
    let mut recv_task = tokio::spawn(
        receive_loop(receiver, session.clone(), state.config.max_malformed_frames)
            .in_current_span(),
    );

    // If any one of the tasks completes, abort the other
    tokio::select! {
        close = &mut recv_task => {
            if let Ok(Some(frame)) = close {
                // ソケットの送信側は pusher が所有する
                let _ = close_tx.send(frame);
                if tokio::time::timeout(CLOSE_GRACE, &mut send_task).await.is_err() {
                    send_task.abort();
                }
            } else {
                send_task.abort();
            }
        }
        _ = &mut send_task => recv_task.abort(),
    };

    // 4. 退出通知（ちょうど 1 回）
    if let Err(e) = session.leave().await {
        tracing::warn!("Leave not delivered: {}", e);
    }
    tracing::info!("User '{}' left space '{}'", session.user_id(), session.space_id());
}

/// Waits for the first data frame. Ping/pong frames are skipped.
async fn read_handshake(receiver: &mut SocketStream) -> Handshake {
    while let Some(frame) = receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                return match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Join { space_id, token }) => {
                        Handshake::Join { space_id, token }
                    }
                    Ok(other) => Handshake::Invalid(format!("expected join, got {other:?}")),
                    Err(e) => Handshake::Invalid(e.to_string()),
                };
            }
            Ok(Message::Binary(_)) => {
                return Handshake::Invalid("binary frames are not supported".to_string());
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => continue,
            Ok(Message::Close(_)) => return Handshake::Disconnected,
            Err(e) => {
                tracing::debug!("WebSocket error during handshake: {}", e);
                return Handshake::Disconnected;
            }
        }
    }
    Handshake::Disconnected
}

/// Sends an optional error frame followed by a close frame.
async fn reject(sender: &mut SocketSink, error: Option<ServerMessage>, code: u16, reason: &str) {
    if let Some(error) = error {
        match serde_json::to_string(&error) {
            Ok(json) => {
                if sender.send(Message::Text(json.into())).await.is_err() {
                    return;
                }
            }
            Err(e) => tracing::error!("Failed to serialize error frame: {}", e),
        }
    }
    let frame = CloseFrame {
        code,
        reason: Utf8Bytes::from(reason),
    };
    let _ = sender.send(Message::Close(Some(frame))).await;
}

/// Drains the outbound queue into the socket.
///
/// The queue ends when the Room drops its sender, either because this
/// participant left or because the queue overflowed. A frame arriving on
/// `close` is sent as-is and ends the loop.
fn pusher_loop(
    mut rx: mpsc::Receiver<RoomEvent>,
    mut sender: SocketSink,
    mut close: oneshot::Receiver<CloseFrame>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(
        async move {
            let frame = loop {
                tokio::select! {
                    event = rx.recv() => {
                        let Some(event) = event else {
                            tracing::info!("Outbound queue detached, closing connection");
                            break CloseFrame {
                                code: close_code::AGAIN,
                                reason: Utf8Bytes::from_static("outbound queue overflow"),
                            };
                        };
                        let json = match serde_json::to_string(&ServerMessage::from(event)) {
                            Ok(json) => json,
                            Err(e) => {
                                tracing::error!("Failed to serialize event: {}", e);
                                continue;
                            }
                        };
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            return;
                        }
                    }
                    Ok(frame) = &mut close => break frame,
                }
            };
            let _ = sender.send(Message::Close(Some(frame))).await;
        }
        .in_current_span(),
    )
}

/// Forwards inbound frames to the Room until the socket closes.
///
/// Returns the close frame to send when the connection is dropped for
/// misbehaving.
async fn receive_loop(
    mut receiver: SocketStream,
    session: SpaceSession,
    max_malformed_frames: usize,
) -> Option<CloseFrame> {
    let mut malformed = 0usize;

    while let Some(frame) = receiver.next().await {
        let frame = match frame {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("WebSocket error: {}", e);
                break;
            }
        };

        let problem = match frame {
            Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Move { x, y }) => {
                    if let Err(e) = session.move_to(x, y).await {
                        tracing::warn!("Move not delivered: {}", e);
                        break;
                    }
                    None
                }
                Ok(ClientMessage::Join { .. }) => Some("join after handshake".to_string()),
                Err(e) => Some(e.to_string()),
            },
            Message::Binary(_) => Some("binary frame".to_string()),
            Message::Ping(_) | Message::Pong(_) => None,
            Message::Close(_) => {
                tracing::debug!("Client requested close");
                break;
            }
        };

        if let Some(problem) = problem {
            malformed += 1;
            tracing::warn!("Dropped malformed frame ({}): {}", malformed, problem);
            if malformed > max_malformed_frames {
                tracing::warn!("Too many malformed frames, closing connection");
                return Some(CloseFrame {
                    code: close_code::POLICY,
                    reason: Utf8Bytes::from_static("too many malformed frames"),
                });
            }
        }
    }
    None
}
