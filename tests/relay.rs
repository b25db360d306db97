//! End-to-end tests against a running server: HTTP ingest, WebSocket
//! ingest and fan-out over real sockets.

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use telemetry_hub::{build_router, ApiConfig, AppState, HubConfig, TelemetryHub};
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_server() -> (SocketAddr, Arc<TelemetryHub>) {
    let hub = Arc::new(TelemetryHub::new(HubConfig::default()));
    let state = AppState::new(Arc::clone(&hub), ApiConfig::new("127.0.0.1", 0));
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, hub)
}

/// Next JSON text frame, skipping control frames
async fn next_json(ws: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

/// Connect and wait for the `connected` frame, after which the hub has
/// registered the subscriber
async fn subscribe(addr: SocketAddr) -> (Client, String) {
    let (mut ws, _) = connect_async(format!("ws://{}/ws", addr)).await.unwrap();
    let hello = next_json(&mut ws).await;
    assert_eq!(hello["type"], "connected");
    let id = hello["connection_id"].as_str().unwrap().to_string();
    (ws, id)
}

async fn post_reading(addr: SocketAddr, body: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{}/api/v1/readings", addr))
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .unwrap()
}

async fn wait_for_connections(hub: &TelemetryHub, expected: usize) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while hub.connection_count() != expected {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("connection count never settled");
}

#[tokio::test]
async fn test_http_readings_fan_out_and_respect_disconnect() {
    let (addr, hub) = start_server().await;
    let (mut a, id_a) = subscribe(addr).await;
    let (mut b, id_b) = subscribe(addr).await;
    assert_ne!(id_a, id_b);
    assert_eq!(hub.connection_count(), 2);

    let response = post_reading(addr, r#"{"heartRate":72}"#).await;
    assert_eq!(response.status(), 200);
    let ack: Value = response.json().await.unwrap();
    assert_eq!(ack["ok"], true);
    assert_eq!(ack["recipients"], 2);

    for ws in [&mut a, &mut b] {
        let update = next_json(ws).await;
        assert_eq!(update, json!({"type": "sensor-update", "data": {"heartRate": 72}}));
    }

    a.close(None).await.unwrap();
    wait_for_connections(&hub, 1).await;

    post_reading(addr, r#"{"heartRate":75}"#).await;
    let update = next_json(&mut b).await;
    assert_eq!(update["data"], json!({"heartRate": 75}));

    // B got exactly one copy of each
    let ping = serde_json::to_string(&json!({"type": "ping"})).unwrap();
    b.send(Message::Text(ping)).await.unwrap();
    assert_eq!(next_json(&mut b).await["type"], "pong");
}

#[tokio::test]
async fn test_malformed_http_reading_is_not_broadcast() {
    let (addr, hub) = start_server().await;
    let (mut dashboard, _) = subscribe(addr).await;

    let response = post_reading(addr, "[1, 2, 3]").await;
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], "MALFORMED_INPUT");

    post_reading(addr, r#"{"heartRate": 70}"#).await;
    assert_eq!(next_json(&mut dashboard).await["data"]["heartRate"], 70);
    assert_eq!(hub.stats().readings_broadcast, 1);
}

#[tokio::test]
async fn test_channel_readings_echo_and_keep_order() {
    let (addr, _hub) = start_server().await;
    let (mut producer, _) = subscribe(addr).await;
    let (mut monitor, _) = subscribe(addr).await;

    for seq in 1..=3 {
        let frame = json!({"type": "sensor-data", "data": {"seq": seq}});
        producer.send(Message::Text(frame.to_string())).await.unwrap();
    }

    for ws in [&mut producer, &mut monitor] {
        for seq in 1..=3 {
            let update = next_json(ws).await;
            assert_eq!(update["type"], "sensor-update");
            assert_eq!(update["data"]["seq"], seq);
        }
    }
}

#[tokio::test]
async fn test_invalid_frame_gets_error_and_connection_survives() {
    let (addr, hub) = start_server().await;
    let (mut ws, _) = subscribe(addr).await;

    ws.send(Message::Text("not json".to_string())).await.unwrap();
    let reply = next_json(&mut ws).await;
    assert_eq!(reply["type"], "error");

    let frame = json!({"type": "sensor-data", "data": 42});
    ws.send(Message::Text(frame.to_string())).await.unwrap();
    assert_eq!(next_json(&mut ws).await["type"], "error");

    assert_eq!(hub.connection_count(), 1);
    assert_eq!(hub.stats().readings_broadcast, 0);
}

#[tokio::test]
async fn test_stalled_subscriber_does_not_hold_up_others() {
    let (addr, hub) = start_server().await;

    // Registered directly with the hub and never read from
    let _stalled = hub.connect();
    let (mut live, _) = subscribe(addr).await;

    for seq in 0..300 {
        let response = tokio::time::timeout(
            Duration::from_secs(5),
            post_reading(addr, &json!({"seq": seq}).to_string()),
        )
        .await
        .expect("ingest stalled");
        assert_eq!(response.status(), 200);
        assert_eq!(next_json(&mut live).await["data"]["seq"], seq);
    }

    assert!(hub.stats().deliveries_dropped > 0);
}
