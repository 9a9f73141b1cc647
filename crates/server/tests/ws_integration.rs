//! 整链路集成测试：HTTP 端点、令牌握手与 WebSocket 工具调用。

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use shipline_broker::{Broker, BrokerConfig};
use shipline_server::api::{self, AppState};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use uuid::Uuid;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn spawn_server() -> String {
    let config = BrokerConfig::from_str(
        r#"
bind_addr = "127.0.0.1:0"

[auth]
secret = "integration-secret"
token_ttl_secs = 60
"#,
    )
    .expect("config should parse");
    let broker = Broker::new(config).expect("broker should initialize");
    let router = api::create_router(Arc::new(AppState::new(Arc::new(broker))));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("listener should have an addr");
    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("server should run");
    });
    addr.to_string()
}

async fn fetch_token(addr: &str) -> String {
    let response: Value = reqwest::get(format!("http://{addr}/test-token"))
        .await
        .expect("test-token request should succeed")
        .json()
        .await
        .expect("test-token response should be JSON");
    response["test_token"]
        .as_str()
        .expect("test_token field should be present")
        .to_string()
}

async fn connect(addr: &str, token: &str, session_id: &str) -> WsStream {
    let (ws, _) = connect_async(format!("ws://{addr}/ws?token={token}&session_id={session_id}"))
        .await
        .expect("WebSocket handshake should succeed");
    ws
}

async fn send_json(ws: &mut WsStream, value: Value) {
    ws.send(Message::text(value.to_string()))
        .await
        .expect("send should succeed");
}

async fn recv_json(ws: &mut WsStream) -> Value {
    let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
        .await
        .expect("timed out waiting for server message")
        .expect("connection closed unexpectedly")
        .expect("receive should succeed");
    let text = msg.into_text().expect("server should send text frames");
    serde_json::from_str(&text).expect("server should send valid JSON")
}

async fn assert_silent(ws: &mut WsStream) {
    let outcome = tokio::time::timeout(Duration::from_millis(300), ws.next()).await;
    assert!(outcome.is_err(), "expected no message, got: {outcome:?}");
}

fn quotes_call(tool_call_id: &str, broadcast: bool) -> Value {
    json!({
        "type": "client_tool_call",
        "client_tool_call": {
            "tool_name": "get_shipping_quotes",
            "tool_call_id": tool_call_id,
            "parameters": {"from_zip": "90210", "to_zip": "10001", "weight": 5.0}
        },
        "broadcast": broadcast
    })
}

#[tokio::test]
async fn test_health_and_token_mint() {
    let addr = spawn_server().await;

    let health: Value = reqwest::get(format!("http://{addr}/healthz"))
        .await
        .expect("healthz request should succeed")
        .json()
        .await
        .expect("healthz response should be JSON");
    assert_eq!(health["status"], "ok");

    let token = fetch_token(&addr).await;
    assert!(token.starts_with("stk1."), "unexpected token: {token}");
}

#[tokio::test]
async fn test_quotes_round_trip() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let session_id = Uuid::new_v4().to_string();
    let mut ws = connect(&addr, &token, &session_id).await;

    send_json(&mut ws, quotes_call("quotes-1", false)).await;

    let result = recv_json(&mut ws).await;
    assert_eq!(result["type"], "client_tool_result");
    assert_eq!(result["tool_call_id"], "quotes-1");
    assert_eq!(result["is_error"], false);
    let options = result["result"].as_array().expect("result should be a list");
    assert!(!options.is_empty());
    assert!(options[0]["carrier"].is_string());
    assert!(options[0]["price"].is_number());

    // 结果之后按序到达两条 contextual update。
    let ui_update = recv_json(&mut ws).await;
    assert_eq!(ui_update["type"], "contextual_update");
    assert_eq!(ui_update["text"], "quote_ready");
    assert_eq!(ui_update["session_id"], session_id);
    assert!(ui_update["data"]["all_options"].is_array());

    let voice_update = recv_json(&mut ws).await;
    assert_eq!(voice_update["text"], "get_shipping_quotes_result");
    assert!(voice_update["data"]["summary"].is_string());
}

#[tokio::test]
async fn test_create_label_round_trip() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let mut ws = connect(&addr, &token, &Uuid::new_v4().to_string()).await;

    send_json(
        &mut ws,
        json!({
            "type": "client_tool_call",
            "client_tool_call": {
                "tool_name": "create_label",
                "tool_call_id": "label-1",
                "parameters": {
                    "carrier": "usps",
                    "shipper_name": "John Doe",
                    "shipper_street": "123 Main St",
                    "shipper_city": "Beverly Hills",
                    "shipper_state": "CA",
                    "shipper_zip": "90210",
                    "recipient_name": "Jane Smith",
                    "recipient_street": "456 Park Ave",
                    "recipient_city": "New York",
                    "recipient_state": "NY",
                    "recipient_zip": "10001",
                    "weight": 2.5
                }
            }
        }),
    )
    .await;

    let result = recv_json(&mut ws).await;
    assert_eq!(result["tool_call_id"], "label-1");
    assert_eq!(result["is_error"], false);
    let tracking = result["result"]["tracking_number"]
        .as_str()
        .expect("tracking number should be present");
    assert!(tracking.starts_with("9400"));

    let update = recv_json(&mut ws).await;
    assert_eq!(update["text"], "label_created");
    assert_eq!(update["data"]["tracking_number"], tracking);
}

#[tokio::test]
async fn test_unknown_tool_keeps_connection_alive() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let mut ws = connect(&addr, &token, &Uuid::new_v4().to_string()).await;

    send_json(
        &mut ws,
        json!({
            "type": "client_tool_call",
            "client_tool_call": {
                "tool_name": "invalid_tool",
                "tool_call_id": "bad-1",
                "parameters": {}
            }
        }),
    )
    .await;

    let result = recv_json(&mut ws).await;
    assert_eq!(result["tool_call_id"], "bad-1");
    assert_eq!(result["is_error"], true);
    assert!(result["result"]["error"].is_string());

    // 失败调用不产生 contextual update，连接保持可用。
    send_json(&mut ws, json!({"type": "ping", "requestId": "req-7"})).await;
    let pong = recv_json(&mut ws).await;
    assert_eq!(pong["type"], "pong");
    assert_eq!(pong["request_id"], "req-7");
}

#[tokio::test]
async fn test_broadcast_reaches_session_members() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let session_id = Uuid::new_v4().to_string();
    let mut caller = connect(&addr, &token, &session_id).await;
    let mut observer = connect(&addr, &token, &session_id).await;

    send_json(&mut caller, quotes_call("quotes-b", true)).await;

    let result = recv_json(&mut caller).await;
    assert_eq!(result["type"], "client_tool_result");
    assert_eq!(recv_json(&mut caller).await["text"], "quote_ready");
    assert_eq!(
        recv_json(&mut caller).await["text"],
        "get_shipping_quotes_result"
    );

    // 观察者只收到 update，结果仅回给调用方。
    let first = recv_json(&mut observer).await;
    assert_eq!(first["type"], "contextual_update");
    assert_eq!(first["text"], "quote_ready");
    assert_eq!(recv_json(&mut observer).await["text"], "get_shipping_quotes_result");
    assert_silent(&mut observer).await;
}

#[tokio::test]
async fn test_default_delivery_is_caller_only() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let session_id = Uuid::new_v4().to_string();
    let mut caller = connect(&addr, &token, &session_id).await;
    let mut observer = connect(&addr, &token, &session_id).await;

    send_json(&mut caller, quotes_call("quotes-c", false)).await;

    assert_eq!(recv_json(&mut caller).await["type"], "client_tool_result");
    assert_eq!(recv_json(&mut caller).await["text"], "quote_ready");
    assert_silent(&mut observer).await;
}

#[tokio::test]
async fn test_other_sessions_never_see_broadcasts() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let mut caller = connect(&addr, &token, &Uuid::new_v4().to_string()).await;
    let mut stranger = connect(&addr, &token, &Uuid::new_v4().to_string()).await;

    send_json(&mut caller, quotes_call("quotes-d", true)).await;

    assert_eq!(recv_json(&mut caller).await["type"], "client_tool_result");
    assert_silent(&mut stranger).await;
}

#[tokio::test]
async fn test_departed_member_does_not_break_broadcast() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let session_id = Uuid::new_v4().to_string();
    let mut caller = connect(&addr, &token, &session_id).await;
    let departed = connect(&addr, &token, &session_id).await;
    drop(departed);
    // 留出 leave 的处理时间。
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_json(&mut caller, quotes_call("quotes-e", true)).await;

    assert_eq!(recv_json(&mut caller).await["type"], "client_tool_result");
    assert_eq!(recv_json(&mut caller).await["text"], "quote_ready");
}

#[tokio::test]
async fn test_handshake_rejected_without_token() {
    let addr = spawn_server().await;

    let err = connect_async(format!("ws://{addr}/ws"))
        .await
        .expect_err("handshake without token should fail");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP rejection, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_handshake_rejected_with_invalid_token() {
    let addr = spawn_server().await;

    let err = connect_async(format!("ws://{addr}/ws?token=stk1.not.valid"))
        .await
        .expect_err("handshake with invalid token should fail");
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status(), 401);
        }
        other => panic!("expected HTTP rejection, got: {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_call_returns_error_result() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let mut ws = connect(&addr, &token, &Uuid::new_v4().to_string()).await;

    // tool_name 缺失导致信封解析失败，但 tool_call_id 可恢复。
    send_json(
        &mut ws,
        json!({
            "type": "client_tool_call",
            "client_tool_call": {"tool_call_id": "malformed-1"}
        }),
    )
    .await;

    let result = recv_json(&mut ws).await;
    assert_eq!(result["type"], "client_tool_result");
    assert_eq!(result["tool_call_id"], "malformed-1");
    assert_eq!(result["is_error"], true);
}

#[tokio::test]
async fn test_unrecoverable_garbage_is_dropped() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let mut ws = connect(&addr, &token, &Uuid::new_v4().to_string()).await;

    ws.send(Message::text("this is not json"))
        .await
        .expect("send should succeed");

    // 无法关联调用的垃圾帧被丢弃，连接保持可用。
    send_json(&mut ws, json!({"type": "ping"})).await;
    assert_eq!(recv_json(&mut ws).await["type"], "pong");
}

#[tokio::test]
async fn test_get_rates_dev_shortcut() {
    let addr = spawn_server().await;
    let token = fetch_token(&addr).await;
    let session_id = Uuid::new_v4().to_string();
    let mut ws = connect(&addr, &token, &session_id).await;

    send_json(
        &mut ws,
        json!({
            "type": "get_rates",
            "payload": {"origin_zip": "90210", "destination_zip": "10001", "weight_lbs": 3.0}
        }),
    )
    .await;

    let response = recv_json(&mut ws).await;
    assert_eq!(response["type"], "quote_ready");
    assert_eq!(response["session_id"], session_id);
    assert!(response["payload"]["all_options"].is_array());
}
