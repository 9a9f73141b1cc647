//! WebSocket handler 包装。
//!
//! 将统一的应用状态适配到 shipline_broker 的 WebSocket handler。

use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Query, State};
use axum::response::Response;

use shipline_broker::ws::WsQuery;

use super::state::AppState;

/// Axum WebSocket 升级 handler，使用统一的 AppState。
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> Response {
    shipline_broker::ws::upgrade(ws, query, state.broker.clone())
}
