use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::broker::Broker;
use crate::dispatch::DispatchOutcome;
use crate::error::BrokerError;
use crate::protocol::{ClientMessage, ServerMessage, ToolCallRequest};
use crate::session::{ConnectionHandle, SessionId};

/// `/ws` 的查询参数。
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

/// Axum WebSocket 升级 handler。
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(broker): State<Arc<Broker>>,
) -> impl IntoResponse {
    upgrade(ws, query, broker)
}

/// 校验令牌后升级连接；供需要自有应用状态的服务端复用。
///
/// 令牌缺失或非法时在握手阶段以 401 拒绝，不进入消息交换。
pub fn upgrade(ws: WebSocketUpgrade, query: WsQuery, broker: Arc<Broker>) -> Response {
    let Some(token) = query.token else {
        info!("rejecting WebSocket upgrade without token");
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    };
    if let Err(err) = broker.verify_token(&token) {
        info!(error = %err, "rejecting WebSocket upgrade with invalid token");
        return (StatusCode::UNAUTHORIZED, "invalid token").into_response();
    }

    let session_id = query
        .session_id
        .filter(|id| !id.is_empty())
        .map(SessionId::from)
        .unwrap_or_default();

    info!(session_id = %session_id, "new WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, broker, session_id))
        .into_response()
}

async fn handle_socket(socket: WebSocket, broker: Arc<Broker>, session_id: SessionId) {
    let (mut sender, mut receiver) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(broker.outbound_buffer_size());

    let writer_task = tokio::spawn(async move {
        while let Some(server_msg) = out_rx.recv().await {
            match serde_json::to_string(&server_msg) {
                Ok(json) => {
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    error!(error = %err, "failed to serialize WebSocket message");
                    break;
                }
            }
        }
    });

    let handle = ConnectionHandle::new(session_id.clone(), out_tx.clone());
    let connection_id = handle.id;
    broker.registry().join(handle.clone()).await;
    info!(
        session_id = %session_id,
        connection_id = %connection_id,
        "WebSocket connection established"
    );

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    if !handle_client_message(&broker, &handle, &out_tx, client_msg).await {
                        break;
                    }
                }
                Err(err) => {
                    if !handle_malformed_message(&out_tx, &text, &err).await {
                        break;
                    }
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(err) => {
                warn!(error = %err, "WebSocket receive error");
                break;
            }
        }
    }

    broker.registry().leave(&session_id, &connection_id).await;
    drop(handle);
    drop(out_tx);
    if let Err(err) = writer_task.await {
        warn!(error = %err, "WebSocket writer task exited with join error");
    }

    info!(
        session_id = %session_id,
        connection_id = %connection_id,
        "WebSocket connection closed"
    );
}

/// 处理一条已解析的客户端消息；返回 false 表示出站队列已关闭。
async fn handle_client_message(
    broker: &Broker,
    handle: &ConnectionHandle,
    out_tx: &mpsc::Sender<ServerMessage>,
    msg: ClientMessage,
) -> bool {
    let session_id = handle.session_id.to_string();

    match msg {
        ClientMessage::ClientToolCall {
            client_tool_call,
            broadcast,
            ..
        } => {
            info!(
                tool_name = %client_tool_call.tool_name,
                tool_call_id = %client_tool_call.tool_call_id,
                broadcast,
                "dispatching client tool call"
            );

            let DispatchOutcome { result, updates } =
                broker.dispatcher().dispatch(client_tool_call).await;

            // 结果先于任何 contextual update 进入调用方队列。
            if out_tx.send(result.into_message()).await.is_err() {
                return false;
            }
            for update in updates {
                broker.notifier().notify(handle, update, broadcast).await;
            }
            true
        }
        ClientMessage::Ping {
            payload,
            request_id,
        } => out_tx
            .send(ServerMessage::Pong {
                payload,
                session_id,
                request_id,
            })
            .await
            .is_ok(),
        ClientMessage::Test { payload } => out_tx
            .send(ServerMessage::Test {
                payload,
                session_id,
            })
            .await
            .is_ok(),
        ClientMessage::GetRates { payload } => {
            let request = ToolCallRequest {
                tool_name: "get_shipping_quotes".to_string(),
                tool_call_id: format!("get-rates-{}", Uuid::new_v4()),
                parameters: normalize_rate_payload(payload),
            };
            let outcome = broker.dispatcher().dispatch(request).await;

            let response = if outcome.result.is_error {
                ServerMessage::Error {
                    message: outcome.result.result["error"]
                        .as_str()
                        .unwrap_or("rate lookup failed")
                        .to_string(),
                }
            } else {
                ServerMessage::QuoteReady {
                    payload: serde_json::json!({ "all_options": outcome.result.result }),
                    session_id,
                }
            };
            out_tx.send(response).await.is_ok()
        }
    }
}

/// 无法解析的消息：能恢复 `tool_call_id` 时回一条错误结果，
/// 否则丢弃并记录。返回 false 表示出站队列已关闭。
async fn handle_malformed_message(
    out_tx: &mpsc::Sender<ServerMessage>,
    text: &str,
    err: &serde_json::Error,
) -> bool {
    match recover_tool_call_id(text) {
        Some(tool_call_id) => {
            let outcome = DispatchOutcome::from_error(
                tool_call_id,
                &BrokerError::MalformedMessage(err.to_string()),
            );
            out_tx.send(outcome.result.into_message()).await.is_ok()
        }
        None => {
            warn!(error = %err, "dropping malformed message");
            true
        }
    }
}

/// 从原始 JSON 中尽力恢复 `tool_call_id`（嵌套或顶层）。
fn recover_tool_call_id(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    let nested = value
        .get("client_tool_call")
        .and_then(|call| call.get("tool_call_id"));
    nested
        .or_else(|| value.get("tool_call_id"))
        .and_then(Value::as_str)
        .map(str::to_owned)
}

/// 开发客户端的 `get_rates` 载荷使用旧字段名，这里归一化。
fn normalize_rate_payload(mut payload: Value) -> Value {
    if let Some(object) = payload.as_object_mut() {
        for (old, new) in [
            ("origin_zip", "from_zip"),
            ("destination_zip", "to_zip"),
            ("weight_lbs", "weight"),
        ] {
            if let Some(value) = object.remove(old) {
                object.entry(new.to_string()).or_insert(value);
            }
        }
    }
    payload
}
