//! API 路由模块。

pub mod state;
pub mod token;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;

pub use state::AppState;

use shipline_api_types::HealthCheckResponse;

/// 组装完整的服务端路由。
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/test-token", get(token::issue_test_token))
        .route("/ws", get(ws::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health_check() -> axum::Json<HealthCheckResponse> {
    axum::Json(HealthCheckResponse::ok())
}
