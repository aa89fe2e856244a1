//! Integration tests for the space session server.
//!
//! The full router runs in-process on an ephemeral port and is driven by
//! real WebSocket clients.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures_util::{SinkExt, StreamExt};
use hiroba_server::{
    config::ServerConfig,
    domain::UserId,
    infrastructure::{
        auth::{JwtTokenAuthenticator, issue_token},
        repository::InMemorySpaceRepository,
        room::RoomRegistry,
    },
    ui::Server,
    usecase::{GetSpaceDetailUseCase, GetSpacesUseCase, JoinSpaceUseCase},
};
use serde_json::{Value, json};
use tokio::{
    net::{TcpListener, TcpStream},
    sync::oneshot,
};
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async,
    tungstenite::{Message, protocol::frame::coding::CloseCode},
};

const SECRET: &[u8] = b"integration-secret";
const RECV_TIMEOUT: Duration = Duration::from_secs(3);

const CATALOG: &str = r#"{
  "spaces": [
    { "id": "s1", "dimensions": "10x10",
      "elements": [ { "x": 9, "y": 9, "width": 1, "height": 1, "static": true } ] },
    { "id": "tiny", "dimensions": "1x1" }
  ]
}"#;

type Ws = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Helper struct to manage the in-process server lifecycle
struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    async fn start_with(config: ServerConfig) -> Self {
        let repository = InMemorySpaceRepository::from_catalog_json(CATALOG).unwrap();
        let registry = Arc::new(RoomRegistry::new(
            Arc::new(repository),
            config.room_queue_capacity,
        ));
        let server = Server::new(
            Arc::new(JoinSpaceUseCase::new(
                Arc::new(JwtTokenAuthenticator::new(SECRET)),
                registry.clone(),
            )),
            Arc::new(GetSpacesUseCase::new(registry.clone())),
            Arc::new(GetSpaceDetailUseCase::new(registry)),
            config,
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, signal) = oneshot::channel::<()>();
        tokio::spawn(server.serve(listener, async {
            let _ = signal.await;
        }));

        TestServer {
            addr,
            shutdown: Some(shutdown),
        }
    }

    fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    async fn connect(&self) -> Ws {
        let (ws, _) = connect_async(self.ws_url()).await.unwrap();
        ws
    }

    /// Connect and complete the join handshake, returning the space-joined payload.
    async fn join(&self, space_id: &str, user: &str) -> (Ws, Value) {
        let mut ws = self.connect().await;
        send(&mut ws, join_frame(space_id, &token(user))).await;
        let joined = recv(&mut ws).await;
        assert_eq!(joined["type"], "space-joined", "unexpected frame: {joined}");
        (ws, joined["payload"].clone())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

fn token(user: &str) -> String {
    issue_token(SECRET, &UserId::new(user.to_string()).unwrap(), None, None).unwrap()
}

fn join_frame(space_id: &str, token: &str) -> Value {
    json!({"type": "join", "payload": {"spaceId": space_id, "token": token}})
}

fn move_frame(x: i64, y: i64) -> Value {
    json!({"type": "move", "payload": {"x": x, "y": y}})
}

async fn send(ws: &mut Ws, frame: Value) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

/// Next JSON frame. Panics on close or timeout.
async fn recv(ws: &mut Ws) -> Value {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("connection ended")
            .expect("websocket error");
        match frame {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Ping(_) | Message::Pong(_) => continue,
            other => panic!("expected a text frame, got {other:?}"),
        }
    }
}

/// Reads until the server closes, returning the close code if one was sent.
async fn expect_close(ws: &mut Ws) -> Option<CloseCode> {
    loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, ws.next())
            .await
            .expect("timed out waiting for close");
        match frame {
            Some(Ok(Message::Close(frame))) => return frame.map(|f| f.code),
            Some(Ok(Message::Text(text))) => panic!("unexpected frame before close: {text}"),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return None,
        }
    }
}

/// Asserts nothing arrives within a short window.
async fn assert_silent(ws: &mut Ws) {
    if let Ok(Some(Ok(Message::Text(text)))) =
        tokio::time::timeout(Duration::from_millis(200), ws.next()).await
    {
        panic!("unexpected frame: {text}");
    }
}

#[tokio::test]
async fn test_two_participants_walk_and_leave() {
    // テスト項目: 参加 → 不正な移動 → 正しい移動 → 切断 の一連のシナリオ
    // given (前提条件):
    let server = TestServer::start().await;

    // when (操作): A と B が同じ空間に参加
    let (mut alice, alice_joined) = server.join("s1", "alice").await;
    let (mut bob, bob_joined) = server.join("s1", "bob").await;

    // then (期待する結果): spawn は重ならず、A は B の参加を知る
    let a = alice_joined["spawn"].clone();
    assert_eq!(a, json!({"x": 0, "y": 0}));
    assert_eq!(alice_joined["users"], json!([]));
    assert_ne!(bob_joined["spawn"], a);
    assert_eq!(
        bob_joined["users"],
        json!([{"userId": "alice", "position": {"x": 0, "y": 0}}])
    );
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "user-joined", "payload": {"userId": "bob", "position": bob_joined["spawn"]}})
    );

    // when (操作): 範囲外への移動
    send(&mut alice, move_frame(1_000_000, 1_000_000)).await;
    // then (期待する結果): 現在位置で拒否
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "movement-rejected", "payload": {"x": 0, "y": 0}})
    );

    // when (操作): 2 マスのジャンプ
    send(&mut alice, move_frame(2, 0)).await;
    // then (期待する結果): 拒否
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "movement-rejected", "payload": {"x": 0, "y": 0}})
    );

    // when (操作): 1 マスの移動
    send(&mut alice, move_frame(1, 0)).await;
    // then (期待する結果): B だけが movement を受け取る（拒否は B に届いていない）
    assert_eq!(
        recv(&mut bob).await,
        json!({"type": "movement", "payload": {"x": 1, "y": 0, "userId": "alice"}})
    );
    assert_silent(&mut alice).await;

    // when (操作): A が切断
    alice.close(None).await.unwrap();

    // then (期待する結果): B に user-left がちょうど 1 回届く
    assert_eq!(
        recv(&mut bob).await,
        json!({"type": "user-left", "payload": {"userId": "alice"}})
    );
    assert_silent(&mut bob).await;
}

#[tokio::test]
async fn test_blocked_cell_is_rejected() {
    // テスト項目: 通行不可セルへの移動は拒否される
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut alice, _) = server.join("s1", "alice").await;
    for (x, y) in (1..=9).map(|x| (x, 0)).chain((1..=8).map(|y| (9, y))) {
        send(&mut alice, move_frame(x, y)).await;
    }
    assert_silent(&mut alice).await;

    // when (操作):
    send(&mut alice, move_frame(9, 9)).await;

    // then (期待する結果):
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "movement-rejected", "payload": {"x": 9, "y": 8}})
    );
}

#[tokio::test]
async fn test_bad_token_closes_with_policy_violation() {
    // テスト項目: 認証失敗は error frame なしで 1008 クローズ
    // given (前提条件):
    let server = TestServer::start().await;
    let mut ws = server.connect().await;

    // when (操作):
    send(&mut ws, join_frame("s1", "not-a-token")).await;

    // then (期待する結果):
    assert_eq!(expect_close(&mut ws).await, Some(CloseCode::Policy));
}

#[tokio::test]
async fn test_unknown_space_sends_error_frame() {
    // テスト項目: 存在しない空間への参加は space-not-found の error frame の後にクローズ
    // given (前提条件):
    let server = TestServer::start().await;
    let mut ws = server.connect().await;

    // when (操作):
    send(&mut ws, join_frame("nowhere", &token("alice"))).await;

    // then (期待する結果):
    let frame = recv(&mut ws).await;
    assert_eq!(frame["type"], "error");
    assert_eq!(frame["payload"]["reason"], "space-not-found");
    assert_eq!(expect_close(&mut ws).await, Some(CloseCode::Normal));
}

#[tokio::test]
async fn test_full_space_and_duplicate_user_are_rejected() {
    // テスト項目: 満員の空間・同一ユーザーの二重参加は拒否され、既存の接続は影響を受けない
    // given (前提条件):
    let server = TestServer::start().await;
    let (mut alice, _) = server.join("tiny", "alice").await;

    // when (操作):
    let mut bob = server.connect().await;
    send(&mut bob, join_frame("tiny", &token("bob"))).await;
    let mut alice_again = server.connect().await;
    send(&mut alice_again, join_frame("tiny", &token("alice"))).await;

    // then (期待する結果):
    assert_eq!(recv(&mut bob).await["payload"]["reason"], "space-full");
    assert_eq!(
        recv(&mut alice_again).await["payload"]["reason"],
        "duplicate-user"
    );
    send(&mut alice, move_frame(0, 1)).await;
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "movement-rejected", "payload": {"x": 0, "y": 0}})
    );
}

#[tokio::test]
async fn test_handshake_must_start_with_join() {
    // テスト項目: 最初のフレームが join でなければ handshake-required でクローズ
    // given (前提条件):
    let server = TestServer::start().await;
    let mut ws = server.connect().await;

    // when (操作):
    send(&mut ws, move_frame(1, 0)).await;

    // then (期待する結果):
    let frame = recv(&mut ws).await;
    assert_eq!(frame["payload"]["reason"], "handshake-required");
    assert_eq!(expect_close(&mut ws).await, Some(CloseCode::Policy));
}

#[tokio::test]
async fn test_handshake_timeout_drops_connection() {
    // テスト項目: join を送らない接続はタイムアウトで切断される
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        handshake_timeout: Duration::from_millis(200),
        ..ServerConfig::default()
    })
    .await;
    let mut ws = server.connect().await;

    // when (操作): 何も送らない

    // then (期待する結果):
    let frame = recv(&mut ws).await;
    assert_eq!(frame["payload"]["reason"], "handshake-required");
    assert_eq!(expect_close(&mut ws).await, Some(CloseCode::Policy));
}

#[tokio::test]
async fn test_malformed_frames_are_ignored_then_limited() {
    // テスト項目: 不正なフレームは無視され、上限を超えると切断される
    // given (前提条件):
    let server = TestServer::start_with(ServerConfig {
        max_malformed_frames: 2,
        ..ServerConfig::default()
    })
    .await;
    let (mut alice, _) = server.join("s1", "alice").await;
    let (mut bob, _) = server.join("s1", "bob").await;
    recv(&mut alice).await; // user-joined

    // when (操作): 不正なフレームの後の正しい移動
    alice
        .send(Message::Text("garbage".into()))
        .await
        .unwrap();
    send(&mut alice, join_frame("s1", &token("alice"))).await;
    send(&mut alice, move_frame(0, 1)).await;

    // then (期待する結果): 移動は処理される
    assert_eq!(
        recv(&mut bob).await,
        json!({"type": "movement", "payload": {"x": 0, "y": 1, "userId": "alice"}})
    );

    // when (操作): 上限超過
    send(&mut alice, json!({"type": "teleport"})).await;

    // then (期待する結果): A は 1008 で切断され、B に user-left が届く
    assert_eq!(expect_close(&mut alice).await, Some(CloseCode::Policy));
    assert_eq!(
        recv(&mut bob).await,
        json!({"type": "user-left", "payload": {"userId": "alice"}})
    );
}

#[tokio::test]
async fn test_non_integer_coordinates_are_rejected_with_current_position() {
    // テスト項目: i64 に収まらない数値・小数の座標は不正フレームではなく movement-rejected になる
    // given (前提条件): 不正フレームを 1 つも許さない設定
    let server = TestServer::start_with(ServerConfig {
        max_malformed_frames: 0,
        ..ServerConfig::default()
    })
    .await;
    let (mut alice, _) = server.join("s1", "alice").await;

    for payload in [
        r#"{"x":1e21,"y":0}"#,
        r#"{"x":10000000000000000000,"y":0}"#,
        r#"{"x":0.5,"y":0}"#,
    ] {
        // when (操作):
        let frame = format!(r#"{{"type":"move","payload":{payload}}}"#);
        alice.send(Message::Text(frame.into())).await.unwrap();

        // then (期待する結果): 現在位置で拒否され、接続は維持される
        assert_eq!(
            recv(&mut alice).await,
            json!({"type": "movement-rejected", "payload": {"x": 0, "y": 0}}),
            "payload {payload}"
        );
    }

    // 整数値の浮動小数点表現は通常の座標として扱われる
    alice
        .send(Message::Text(
            r#"{"type":"move","payload":{"x":1.0,"y":0}}"#.into(),
        ))
        .await
        .unwrap();
    send(&mut alice, move_frame(3, 0)).await;
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "movement-rejected", "payload": {"x": 1, "y": 0}})
    );
}

#[tokio::test]
async fn test_stalled_participant_is_disconnected_on_queue_overflow() {
    // テスト項目: 送信キューが溢れた参加者は 1013 で切断され、他の参加者に user-left がちょうど 1 回届く
    // given (前提条件): 送信キュー 1 件、B は何も読まない
    let server = TestServer::start_with(ServerConfig {
        outbound_queue_capacity: 1,
        ..ServerConfig::default()
    })
    .await;
    let (mut alice, _) = server.join("s1", "alice").await;
    let (mut bob, _) = server.join("s1", "bob").await;
    recv(&mut alice).await; // user-joined

    // when (操作): A が移動をまとめて送り続ける
    for _ in 0..20 {
        for y in [1, 0].repeat(100) {
            alice
                .feed(Message::Text(move_frame(0, y).to_string().into()))
                .await
                .unwrap();
        }
        alice.flush().await.unwrap();
    }

    // then (期待する結果): B には溜まっていた movement の後に 1013 の close が届く
    let code = loop {
        let frame = tokio::time::timeout(RECV_TIMEOUT, bob.next())
            .await
            .expect("timed out waiting for close");
        match frame {
            Some(Ok(Message::Text(text))) => {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                assert_eq!(value["type"], "movement", "unexpected frame: {value}");
            }
            Some(Ok(Message::Close(frame))) => break frame.map(|f| f.code),
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => break None,
        }
    };
    assert_eq!(code, Some(CloseCode::Again));

    // then (期待する結果): A に user-left がちょうど 1 回届く
    assert_eq!(
        recv(&mut alice).await,
        json!({"type": "user-left", "payload": {"userId": "bob"}})
    );
    assert_silent(&mut alice).await;
}

#[tokio::test]
async fn test_http_listing_and_detail() {
    // テスト項目: HTTP API で生きている Room を確認できる
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let (mut alice, _) = server.join("s1", "alice").await;
    let (_bob, _) = server.join("s1", "bob").await;
    recv(&mut alice).await; // user-joined

    // when (操作):
    let health: Value = client
        .get(server.http_url("/api/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let spaces: Value = client
        .get(server.http_url("/api/spaces"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let detail: Value = client
        .get(server.http_url("/api/spaces/s1"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let missing = client
        .get(server.http_url("/api/spaces/tiny"))
        .send()
        .await
        .unwrap();

    // then (期待する結果):
    assert_eq!(health, json!({"status": "ok"}));
    assert_eq!(spaces, json!([{"spaceId": "s1", "participantCount": 2}]));
    assert_eq!(detail["spaceId"], "s1");
    assert_eq!(detail["width"], 10);
    assert_eq!(detail["height"], 10);
    let users: Vec<&str> = detail["participants"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["userId"].as_str().unwrap())
        .collect();
    assert_eq!(users, vec!["alice", "bob"]);
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_room_is_evicted_when_everyone_leaves() {
    // テスト項目: 全員が退出すると Room は一覧から消える
    // given (前提条件):
    let server = TestServer::start().await;
    let client = reqwest::Client::new();
    let (mut alice, _) = server.join("s1", "alice").await;

    // when (操作):
    alice.close(None).await.unwrap();

    // then (期待する結果):
    let mut spaces = Value::Null;
    for _ in 0..50 {
        spaces = client
            .get(server.http_url("/api/spaces"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        if spaces == json!([]) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(spaces, json!([]));

    // 同じ空間に再参加できる
    let (_alice, joined) = server.join("s1", "alice").await;
    assert_eq!(joined["spawn"], json!({"x": 0, "y": 0}));
}
