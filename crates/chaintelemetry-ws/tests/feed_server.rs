//! Integration tests driving `TelemetryClient` against an in-process feed
//! server on 127.0.0.1.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use chaintelemetry_core::chains::{KUSAMA, POLKADOT};
use chaintelemetry_core::{Location, LocationProvider, LookupError, NodeId, NodeRecord};
use chaintelemetry_ws::{
    BackoffConfig, ClientConfig, ClientError, ConnectionState, NoopLogger, TelemetryClient,
};

type ServerConn = WebSocketStream<TcpStream>;

const WAIT: Duration = Duration::from_secs(5);

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Accepts WebSocket connections and hands each one to the test.
async fn feed_server() -> (String, mpsc::UnboundedReceiver<ServerConn>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            if let Ok(ws) = tokio_tungstenite::accept_async(tcp).await {
                if tx.send(ws).is_err() {
                    break;
                }
            }
        }
    });
    (url, rx)
}

/// Accepts exactly one connection, then stops listening.
async fn one_shot_server() -> (String, tokio::task::JoinHandle<ServerConn>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let handle = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        tokio_tungstenite::accept_async(tcp).await.unwrap()
    });
    (url, handle)
}

/// Like `feed_server`, but holds every WebSocket handshake for `delay`.
async fn slow_handshake_server(delay: Duration) -> (String, mpsc::UnboundedReceiver<ServerConn>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                if let Ok(ws) = tokio_tungstenite::accept_async(tcp).await {
                    let _ = tx.send(ws);
                }
            });
        }
    });
    (url, rx)
}

fn fast_config(url: &str) -> ClientConfig {
    ClientConfig {
        url: url.to_string(),
        auto_reconnect: true,
        max_reconnect_attempts: 3,
        backoff: BackoffConfig {
            base_delay_ms: 5,
            max_delay_ms: 20,
        },
    }
}

fn client(config: ClientConfig) -> TelemetryClient {
    TelemetryClient::new(config).with_logger(NoopLogger)
}

async fn accept(conns: &mut mpsc::UnboundedReceiver<ServerConn>) -> ServerConn {
    timeout(WAIT, conns.recv())
        .await
        .expect("no connection within timeout")
        .expect("server stopped")
}

async fn next_text(ws: &mut ServerConn) -> String {
    loop {
        let msg = timeout(WAIT, ws.next())
            .await
            .expect("no frame within timeout")
            .expect("connection closed")
            .expect("receive error");
        if let Message::Text(text) = msg {
            return text.to_string();
        }
    }
}

async fn send(ws: &mut ServerConn, frame: &str) {
    ws.send(Message::Text(frame.to_string().into())).await.unwrap();
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    timeout(WAIT, async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not met within timeout");
}

fn added_node(id: NodeId, name: &str, ip: Option<&str>) -> String {
    let ip = ip.map_or("null".to_string(), |ip| format!("\"{ip}\""));
    format!(
        r#"[3, [{id}, ["{name}","Substrate","1.0.0",null,null,"linux","x86_64","gnu",{ip},{{"cpu":"x","memory":100,"core_count":4,"is_virtual_machine":false}},null], [10,0], null, null, null, null, 1000]]"#
    )
}

fn ids(nodes: &[NodeRecord]) -> Vec<NodeId> {
    let mut ids: Vec<NodeId> = nodes.iter().map(|n| n.id).collect();
    ids.sort_unstable();
    ids
}

// ─── Subscription ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn subscription_is_sent_on_open_and_after_reconnect() {
    let (url, mut conns) = feed_server().await;
    let client = client(fast_config(&url));
    client.subscribe(KUSAMA);
    client.connect().await.unwrap();
    assert_eq!(client.state(), ConnectionState::Connected);

    let mut first = accept(&mut conns).await;
    assert_eq!(next_text(&mut first).await, format!("subscribe:{KUSAMA}"));

    first.close(None).await.unwrap();
    let mut second = accept(&mut conns).await;
    assert_eq!(next_text(&mut second).await, format!("subscribe:{KUSAMA}"));
    wait_until(|| client.state() == ConnectionState::Connected).await;

    client.disconnect().await;
}

#[tokio::test]
async fn subscribe_while_connected_sends_immediately() {
    let (url, mut conns) = feed_server().await;
    let client = client(fast_config(&url));
    client.connect().await.unwrap();
    let mut conn = accept(&mut conns).await;

    client.subscribe(POLKADOT);
    assert_eq!(next_text(&mut conn).await, format!("subscribe:{POLKADOT}"));
    client.subscribe(KUSAMA);
    assert_eq!(next_text(&mut conn).await, format!("subscribe:{KUSAMA}"));
    assert_eq!(client.subscribed_chain().as_deref(), Some(KUSAMA));

    client.disconnect().await;
}

// ─── Frames and observers ─────────────────────────────────────────────────────

#[tokio::test]
async fn frames_update_registry_and_notify_observers() {
    let (url, mut conns) = feed_server().await;
    let client = client(fast_config(&url));

    let (tx, mut updates) = mpsc::unbounded_channel();
    client.on_update(|_: &[NodeRecord]| panic!("observer failure"));
    client.on_update(move |nodes: &[NodeRecord]| {
        let _ = tx.send(ids(nodes));
    });

    client.connect().await.unwrap();
    let mut conn = accept(&mut conns).await;

    send(&mut conn, "[0, 32]").await;
    send(&mut conn, &added_node(5, "nodeA", None)).await;
    send(&mut conn, "not a frame").await;
    send(&mut conn, "[99, null]").await;
    send(&mut conn, &added_node(6, "nodeB", None)).await;
    send(&mut conn, "[4, 5]").await;

    let mut seen = Vec::new();
    for _ in 0..5 {
        seen.push(timeout(WAIT, updates.recv()).await.unwrap().unwrap());
    }
    // Malformed frame: skipped without notifying. Unknown action: notifies.
    assert_eq!(seen, [vec![], vec![5], vec![5], vec![5, 6], vec![6]]);

    let node = client.node(6).unwrap();
    assert_eq!(node.name, "nodeB");
    assert_eq!(node.network.peer_count, 10);
    assert!(client.node(5).is_none());
    assert_eq!(client.nodes_filtered(|n| n.name == "nodeB").len(), 1);

    client.disconnect().await;
}

#[tokio::test]
async fn chain_stats_are_replaced() {
    let (url, mut conns) = feed_server().await;
    let client = client(fast_config(&url));
    client.connect().await.unwrap();
    let mut conn = accept(&mut conns).await;

    send(&mut conn, r#"[22, {"cpu": {"list": [["Ryzen", 3]], "other": 0, "unknown": 1}}]"#).await;
    wait_until(|| client.chain_stats().is_some()).await;
    assert_eq!(client.chain_stats().unwrap().cpu.unwrap().total(), 4);

    send(&mut conn, r#"[22, {"version": {"list": [["1.0", 2]], "other": 0, "unknown": 0}}]"#).await;
    wait_until(|| client.chain_stats().is_some_and(|s| s.version.is_some())).await;
    assert!(client.chain_stats().unwrap().cpu.is_none());

    client.disconnect().await;
}

// ─── Failure handling ─────────────────────────────────────────────────────────

#[tokio::test]
async fn version_mismatch_disconnects_without_retry() {
    let (url, mut conns) = feed_server().await;
    let client = client(fast_config(&url));
    let mut errors = client.errors();
    client.connect().await.unwrap();
    let mut conn = accept(&mut conns).await;

    send(&mut conn, "[0, 31]").await;
    let err = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert_eq!(
        err,
        ClientError::VersionMismatch {
            expected: 32,
            got: 31
        }
    );
    assert!(err.is_fatal());
    wait_until(|| client.state() == ConnectionState::Disconnected).await;

    assert!(
        timeout(Duration::from_millis(200), conns.recv()).await.is_err(),
        "client must not reconnect after a version mismatch"
    );
}

#[tokio::test]
async fn initial_connect_failure_is_returned() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let client = client(fast_config(&url));
    let err = client.connect().await.unwrap_err();
    assert!(matches!(err, ClientError::Connection { .. }), "{err:?}");
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn reconnect_exhaustion_is_reported() {
    let (url, server) = one_shot_server().await;
    let mut config = fast_config(&url);
    config.max_reconnect_attempts = 2;
    let client = client(config);
    let mut errors = client.errors();
    client.connect().await.unwrap();

    let mut conn = server.await.unwrap();
    conn.close(None).await.unwrap();

    let err = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert_eq!(
        err,
        ClientError::ReconnectExhausted {
            url: url.clone(),
            attempts: 2
        }
    );
    wait_until(|| client.state() == ConnectionState::Disconnected).await;
}

#[tokio::test]
async fn disconnect_cancels_pending_reconnect() {
    let (url, mut conns) = feed_server().await;
    let mut config = fast_config(&url);
    config.backoff = BackoffConfig {
        base_delay_ms: 300,
        max_delay_ms: 300,
    };
    let client = client(config);
    client.connect().await.unwrap();

    let mut conn = accept(&mut conns).await;
    conn.close(None).await.unwrap();
    wait_until(|| client.state() == ConnectionState::Reconnecting { attempt: 1 }).await;

    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert!(
        timeout(Duration::from_millis(600), conns.recv()).await.is_err(),
        "no reconnect after disconnect()"
    );
}

#[tokio::test]
async fn disconnect_during_initial_dial_stays_disconnected() {
    let (url, mut conns) = slow_handshake_server(Duration::from_millis(300)).await;
    let client = Arc::new(client(fast_config(&url)));

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    wait_until(|| client.state() == ConnectionState::Connecting).await;

    client.disconnect().await;
    assert_eq!(client.state(), ConnectionState::Disconnected);

    let result = timeout(WAIT, connecting).await.unwrap().unwrap();
    assert!(matches!(result, Err(ClientError::Cancelled { .. })));
    assert_eq!(client.state(), ConnectionState::Disconnected);

    // Let the stalled handshake finish; nothing may come back online.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.state(), ConnectionState::Disconnected);
    while let Ok(mut conn) = conns.try_recv() {
        let next = timeout(Duration::from_millis(200), conn.next()).await;
        assert!(
            !matches!(next, Ok(Some(Ok(Message::Text(_))))),
            "cancelled connect must not talk to the server"
        );
    }
}

#[tokio::test]
async fn subscribe_during_initial_dial_is_sent_on_open() {
    let (url, mut conns) = slow_handshake_server(Duration::from_millis(100)).await;
    let client = Arc::new(client(fast_config(&url)));

    let connecting = tokio::spawn({
        let client = client.clone();
        async move { client.connect().await }
    });
    wait_until(|| client.state() == ConnectionState::Connecting).await;
    client.subscribe(POLKADOT);

    timeout(WAIT, connecting).await.unwrap().unwrap().unwrap();
    let mut conn = accept(&mut conns).await;
    assert_eq!(next_text(&mut conn).await, format!("subscribe:{POLKADOT}"));

    client.disconnect().await;
}

#[tokio::test]
async fn close_without_auto_reconnect_stops() {
    let (url, mut conns) = feed_server().await;
    let mut config = fast_config(&url);
    config.auto_reconnect = false;
    let client = client(config);
    let mut errors = client.errors();
    client.connect().await.unwrap();

    let mut conn = accept(&mut conns).await;
    conn.close(None).await.unwrap();

    let err = timeout(WAIT, errors.recv()).await.unwrap().unwrap();
    assert!(matches!(err, ClientError::ConnectionClosed { .. }));
    wait_until(|| client.state() == ConnectionState::Disconnected).await;
    assert!(timeout(Duration::from_millis(100), conns.recv()).await.is_err());
}

// ─── Location enrichment ──────────────────────────────────────────────────────

struct FixedLocation {
    lookups: Arc<parking_lot::Mutex<Vec<String>>>,
}

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn lookup(&self, ip: &str) -> Result<Location, LookupError> {
        self.lookups.lock().push(ip.to_string());
        if ip == "10.9.9.9" {
            return Err(LookupError::new(ip, "reserved range"));
        }
        Ok(Location {
            latitude: Some(48.85),
            longitude: Some(2.35),
            city: Some("Paris".into()),
            provider: Some("AS3215 Orange".into()),
        })
    }
}

#[tokio::test]
async fn nodes_with_ip_are_enriched() {
    let (url, mut conns) = feed_server().await;
    let lookups = Arc::new(parking_lot::Mutex::new(Vec::new()));
    let client = TelemetryClient::new(fast_config(&url))
        .with_logger(NoopLogger)
        .with_location_provider(FixedLocation {
            lookups: lookups.clone(),
        });
    client.connect().await.unwrap();
    let mut conn = accept(&mut conns).await;

    send(&mut conn, &added_node(1, "public", Some("1.2.3.4"))).await;
    send(&mut conn, &added_node(2, "private", Some("10.9.9.9"))).await;
    send(&mut conn, &added_node(3, "hidden", None)).await;

    wait_until(|| {
        client
            .node(1)
            .and_then(|n| n.location)
            .is_some_and(|l| l.provider.is_some())
    })
    .await;
    let location = client.node(1).unwrap().location.unwrap();
    assert_eq!(location.city.as_deref(), Some("Paris"));
    assert_eq!(location.provider.as_deref(), Some("AS3215 Orange"));

    wait_until(|| lookups.lock().len() == 2).await;
    assert!(client.node(2).unwrap().location.is_none());
    assert!(client.node(3).unwrap().location.is_none());

    client.disconnect().await;
}
