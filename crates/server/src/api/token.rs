//! 开发用令牌端点。

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::error;

use shipline_api_types::{ErrorResponse, TestTokenResponse};

use super::state::AppState;

/// `GET /test-token`：为浏览器测试页签发一枚短期连接令牌。
pub async fn issue_test_token(State(state): State<Arc<AppState>>) -> Response {
    match state.broker.issue_token() {
        Ok(test_token) => Json(TestTokenResponse { test_token }).into_response(),
        Err(err) => {
            error!(error = %err, "failed to issue test token");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    code: "token_issue_failed".to_string(),
                    message: err.to_string(),
                }),
            )
                .into_response()
        }
    }
}
