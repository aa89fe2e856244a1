//! WebSocket client session management.

use std::sync::Arc;

use futures_util::{Sink, SinkExt, StreamExt};
use hiroba_server::infrastructure::dto::websocket::{ClientMessage, PositionDto, ServerMessage};
use hiroba_shared::time::now_millis;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::{Mutex, mpsc};
use tokio_tungstenite::{
    connect_async,
    tungstenite::protocol::{Message, frame::coding::CloseCode},
};

use crate::{
    command::{Command, parse_command},
    error::ClientError,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

/// Join `space_id` and walk around until the user quits or the connection drops.
pub async fn run_client_session(
    url: &str,
    space_id: &str,
    token: &str,
    label: &str,
) -> Result<(), ClientError> {
    let (ws_stream, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    tracing::info!("Connected to {}", url);

    let (mut write, mut read) = ws_stream.split();

    // 1. join ハンドシェイク
    send(
        &mut write,
        &ClientMessage::Join {
            space_id: space_id.to_string(),
            token: token.to_string(),
        },
    )
    .await?;

    let spawn = loop {
        let frame = read
            .next()
            .await
            .ok_or_else(|| ClientError::ConnectionError("closed during handshake".to_string()))?
            .map_err(|e| ClientError::ConnectionError(e.to_string()))?;
        match frame {
            Message::Text(text) => match serde_json::from_str::<ServerMessage>(text.as_str()) {
                Ok(ServerMessage::SpaceJoined { spawn, users }) => {
                    print!("{}", MessageFormatter::format_space_joined(&spawn, &users));
                    break spawn;
                }
                Ok(ServerMessage::Error { reason, message }) => {
                    return Err(ClientError::JoinRejected { reason, message });
                }
                _ => return Err(ClientError::UnexpectedReply(text.as_str().to_string())),
            },
            Message::Close(Some(frame)) if frame.code == CloseCode::Policy => {
                return Err(ClientError::AuthenticationFailed);
            }
            Message::Close(frame) => {
                return Err(ClientError::ConnectionError(format!(
                    "closed during handshake: {frame:?}"
                )));
            }
            _ => continue,
        }
    };

    println!(
        "\nYou are '{}' in '{}'. Walk with w/a/s/d or `move X Y`, `quit` to leave.\n",
        label, space_id
    );
    redisplay_prompt(label);

    // Last position the server confirmed or that we optimistically stepped to.
    let position = Arc::new(Mutex::new(spawn));

    // 2. 受信タスク
    let position_for_read = position.clone();
    let label_for_read = label.to_string();
    let mut read_task = tokio::spawn(async move {
        while let Some(message) = read.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let formatted = match serde_json::from_str::<ServerMessage>(text.as_str()) {
                        Ok(message) => {
                            if let ServerMessage::MovementRejected { x, y } = &message {
                                *position_for_read.lock().await = PositionDto { x: *x, y: *y };
                            }
                            MessageFormatter::format(&message, now_millis())
                        }
                        Err(_) => MessageFormatter::format_raw_message(&text),
                    };
                    print!("{}", formatted);
                    redisplay_prompt(&label_for_read);
                }
                Ok(Message::Close(frame)) => {
                    tracing::info!("Server closed the connection: {:?}", frame);
                    return true;
                }
                Err(e) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return true;
                }
                _ => {}
            }
        }
        true
    });

    // 3. 入力スレッド（rustyline は同期 API）
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let prompt = format!("{}> ", label);
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(&prompt) {
                Ok(line) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        rl.add_history_entry(line).ok();
                        if input_tx.send(line.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // 4. 送信タスク
    let label_for_write = label.to_string();
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            let target = match parse_command(&line) {
                Ok(Command::Quit) => break,
                Ok(Command::Step { dx, dy }) => {
                    let current = *position.lock().await;
                    PositionDto {
                        x: current.x + dx,
                        y: current.y + dy,
                    }
                }
                Ok(Command::MoveTo { x, y }) => PositionDto { x, y },
                Err(e) => {
                    println!("{}", e);
                    redisplay_prompt(&label_for_write);
                    continue;
                }
            };

            let message = ClientMessage::Move {
                x: target.x,
                y: target.y,
            };
            if let Err(e) = send(&mut write, &message).await {
                tracing::warn!("Failed to send move: {}", e);
                return true;
            }
            *position.lock().await = target;
        }

        let _ = write.send(Message::Close(None)).await;
        false
    });

    // If any one of the tasks completes, abort the other
    let connection_lost = tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            read_result.unwrap_or(true)
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.unwrap_or(true)
        }
    };

    if connection_lost {
        return Err(ClientError::ConnectionError("Connection lost".to_string()));
    }
    Ok(())
}

async fn send<S>(write: &mut S, message: &ClientMessage) -> Result<(), ClientError>
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    let json =
        serde_json::to_string(message).map_err(|e| ClientError::ConnectionError(e.to_string()))?;
    write
        .send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))
}
