//! End-to-end tests against a server bound to an ephemeral port.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use chrono::NaiveDate;
use tcpchat_server::{
    ChatServer, ServerConfig,
    domain::EventKind,
    infrastructure::{HistoryLog, MemoryEventLog},
};
use tcpchat_shared::time::FixedClock;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

const STEP: Duration = Duration::from_secs(5);

struct TestServer {
    addr: SocketAddr,
    history: Arc<HistoryLog>,
    events: Arc<MemoryEventLog>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl TestServer {
    async fn start(capacity: usize) -> Self {
        let events = Arc::new(MemoryEventLog::new());
        let clock = Arc::new(FixedClock::new(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .and_then(|d| d.and_hms_opt(9, 30, 0))
                .unwrap(),
        ));
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            capacity,
            ..ServerConfig::default()
        };
        let server = ChatServer::bind(config, events.clone(), clock).await.unwrap();
        let addr = server.local_addr().unwrap();
        let history = server.history();
        let shutdown = server.shutdown_token();
        let trigger = shutdown.clone();
        let task = tokio::spawn(async move {
            server
                .run(async move { trigger.cancelled().await })
                .await
                .unwrap();
        });
        Self {
            addr,
            history,
            events,
            shutdown,
            task,
        }
    }

    async fn stop(self) {
        self.shutdown.cancel();
        tokio::time::timeout(STEP, self.task).await.unwrap().unwrap();
    }
}

/// A netcat-like client that accumulates everything it receives
struct TestClient {
    stream: TcpStream,
    received: String,
}

impl TestClient {
    async fn connect(server: &TestServer) -> Self {
        let stream = TcpStream::connect(server.addr).await.unwrap();
        let mut client = Self {
            stream,
            received: String::new(),
        };
        client.expect("[ENTER YOUR NAME]: ").await;
        client
    }

    async fn join(server: &TestServer, name: &str) -> Self {
        let mut client = Self::connect(server).await;
        client.send(name).await;
        client.expect(&format!("{name} has joined the chat...")).await;
        client
    }

    async fn send(&mut self, line: &str) {
        self.stream
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    /// Wait until `needle` has been received, then consume everything up to it
    async fn expect(&mut self, needle: &str) -> String {
        let mut buf = [0u8; 4096];
        let found = tokio::time::timeout(STEP, async {
            loop {
                if let Some(pos) = self.received.find(needle) {
                    let end = pos + needle.len();
                    let consumed: String = self.received.drain(..end).collect();
                    return consumed;
                }
                let n = self.stream.read(&mut buf).await.unwrap();
                assert!(n > 0, "connection closed before {needle:?}; got {:?}", self.received);
                self.received.push_str(&String::from_utf8_lossy(&buf[..n]));
            }
        })
        .await;
        found.unwrap_or_else(|_| panic!("timed out waiting for {needle:?}; got {:?}", self.received))
    }

    /// Read until the server closes the connection
    async fn read_to_close(&mut self) -> String {
        let mut rest = String::new();
        tokio::time::timeout(STEP, self.stream.read_to_string(&mut rest))
            .await
            .unwrap()
            .unwrap();
        format!("{}{}", std::mem::take(&mut self.received), rest)
    }
}

#[tokio::test]
async fn test_welcome_banner_and_prompt() {
    // テスト項目: 接続直後にウェルカムメッセージと名前入力プロンプトが届く
    // given (前提条件):
    let server = TestServer::start(10).await;

    // when (操作):
    let mut client = TestClient {
        stream: TcpStream::connect(server.addr).await.unwrap(),
        received: String::new(),
    };
    let banner = client.expect("[ENTER YOUR NAME]: ").await;

    // then (期待する結果):
    assert!(banner.starts_with("Welcome to TCP-Chat!\r\n"));
    assert!(banner.ends_with("\r\n[ENTER YOUR NAME]: "));
    server.stop().await;
}

#[tokio::test]
async fn test_alice_bob_carol_scenario() {
    // テスト項目: 参加・発言・改名・退出が全参加者に同じ順序で届き、履歴に残る
    // given (前提条件):
    let server = TestServer::start(10).await;
    let mut alice = TestClient::join(&server, "alice").await;
    let mut bob = TestClient::join(&server, "bob").await;
    alice.expect("bob has joined the chat...").await;

    // when (操作):
    alice.send("hi").await;
    bob.expect("[2024-05-01 09:30:00][alice]: hi").await;
    bob.send("name=carol").await;
    alice.expect("bob has changed their name to carol").await;
    bob.send("hello").await;
    alice.expect("[2024-05-01 09:30:00][carol]: hello").await;
    bob.send("quit").await;

    // then (期待する結果):
    let farewell = bob.read_to_close().await;
    assert!(farewell.contains("Exiting chat room.\r\n"));
    alice.expect("carol has left the chat...").await;
    assert_eq!(
        server.history.snapshot().await,
        vec![
            "alice has joined the chat...",
            "bob has joined the chat...",
            "[2024-05-01 09:30:00][alice]: hi",
            "bob has changed their name to carol",
            "[2024-05-01 09:30:00][carol]: hello",
            "carol has left the chat...",
        ]
    );
    server.stop().await;
}

#[tokio::test]
async fn test_new_client_receives_history_before_live_messages() {
    // テスト項目: 後から参加したクライアントは履歴を受け取った後にライブのメッセージを受け取る
    // given (前提条件):
    let server = TestServer::start(10).await;
    let mut alice = TestClient::join(&server, "alice").await;
    alice.send("first").await;
    alice.expect("[alice]: first").await;

    // when (操作):
    let mut dave = TestClient::connect(&server).await;
    dave.send("dave").await;

    // then (期待する結果):
    let replay = dave.expect("dave has joined the chat...").await;
    assert_eq!(
        replay,
        "alice has joined the chat...\r\n\
         [2024-05-01 09:30:00][alice]: first\r\n\
         dave has joined the chat..."
    );
    alice.send("second").await;
    dave.expect("[alice]: second").await;
    server.stop().await;
}

#[tokio::test]
async fn test_taken_name_is_reprompted() {
    // テスト項目: 使用中の名前を選ぶと再入力を求められ、別名で参加できる
    // given (前提条件):
    let server = TestServer::start(10).await;
    let _alice = TestClient::join(&server, "alice").await;
    let mut other = TestClient::connect(&server).await;

    // when (操作):
    other.send("alice").await;

    // then (期待する結果):
    other
        .expect("Name already taken.\r\n[ENTER YOUR NAME]: ")
        .await;
    other.send("alice2").await;
    other.expect("alice2 has joined the chat...").await;
    assert_eq!(server.events.count(EventKind::NameTaken), 1);
    server.stop().await;
}

#[tokio::test]
async fn test_rename_to_taken_name_is_refused() {
    // テスト項目: 他の参加者の名前への改名は拒否され、何もブロードキャストされない
    // given (前提条件):
    let server = TestServer::start(10).await;
    let mut alice = TestClient::join(&server, "alice").await;
    let _bob = TestClient::join(&server, "bob").await;
    alice.expect("bob has joined the chat...").await;
    let before = server.history.len().await;

    // when (操作):
    alice.send("name=bob").await;

    // then (期待する結果):
    alice.expect("Name already taken. Name not changed.\r\n").await;
    alice.send("name=").await;
    alice.expect("Invalid new name. Name not changed.\r\n").await;
    alice.send("still alice").await;
    alice.expect("[alice]: still alice").await;
    assert_eq!(server.history.len().await, before + 1);
    server.stop().await;
}

#[tokio::test]
async fn test_quit_frees_the_name() {
    // テスト項目: 退出した参加者の名前は再利用できる
    // given (前提条件):
    let server = TestServer::start(10).await;
    let mut alice = TestClient::join(&server, "alice").await;

    // when (操作):
    alice.send("EXIT").await;
    alice.read_to_close().await;

    // then (期待する結果):
    let _again = TestClient::join(&server, "alice").await;
    let left = server
        .history
        .snapshot()
        .await
        .iter()
        .filter(|line| line.as_str() == "alice has left the chat...")
        .count();
    assert_eq!(left, 1);
    server.stop().await;
}

#[tokio::test]
async fn test_room_full_rejects_extra_client() {
    // テスト項目: 定員を超えたクライアントは通知を受けて切断される
    // given (前提条件):
    let server = TestServer::start(2).await;
    let _alice = TestClient::join(&server, "alice").await;
    let _bob = TestClient::join(&server, "bob").await;
    let mut carol = TestClient::connect(&server).await;

    // when (操作):
    carol.send("carol").await;

    // then (期待する結果):
    let rest = carol.read_to_close().await;
    assert_eq!(rest, "Chat room is full. Connection closed.\r\n");
    assert_eq!(server.events.count(EventKind::RoomFull), 1);
    server.stop().await;
}

#[tokio::test]
async fn test_disconnect_announces_departure() {
    // テスト項目: 接続が切れた参加者の退出が他の参加者に通知される
    // given (前提条件):
    let server = TestServer::start(10).await;
    let mut alice = TestClient::join(&server, "alice").await;
    let bob = TestClient::join(&server, "bob").await;
    alice.expect("bob has joined the chat...").await;

    // when (操作):
    drop(bob);

    // then (期待する結果):
    alice.expect("bob has left the chat...").await;
    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_notifies_clients_and_drains() {
    // テスト項目: シャットダウン時に全クライアントへ通知され、全セッションの終了を待つ
    // given (前提条件):
    let server = TestServer::start(10).await;
    let mut alice = TestClient::join(&server, "alice").await;
    let mut pending = TestClient::connect(&server).await;
    let events = server.events.clone();

    // when (操作):
    server.stop().await;

    // then (期待する結果):
    assert!(alice.read_to_close().await.contains("Server shutting down\r\n"));
    assert!(pending.read_to_close().await.contains("Server shutting down\r\n"));
    assert_eq!(events.count(EventKind::Shutdown), 1);
}
