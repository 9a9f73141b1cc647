//! WebSocket 消息信封定义。
//!
//! 所有消息为带 `type` 判别字段的 JSON 对象。`client_tool_call`、
//! `client_tool_result` 与 `contextual_update` 构成稳定契约；
//! `ping`/`test`/`get_rates` 仅供开发客户端使用。

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 客户端发送的 WebSocket 消息。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// 工具调用。原始线格式将调用体嵌套在同名 `client_tool_call` 字段内。
    ClientToolCall {
        client_tool_call: ToolCallRequest,
        /// 为 true 时 contextual update 广播给会话全体成员。
        #[serde(default)]
        broadcast: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        session_id: Option<String>,
    },
    /// 开发用连通性检查。
    Ping {
        #[serde(default)]
        payload: Value,
        #[serde(
            default,
            alias = "requestId",
            skip_serializing_if = "Option::is_none"
        )]
        request_id: Option<String>,
    },
    /// 开发用回显消息。
    Test {
        #[serde(default)]
        payload: Value,
    },
    /// 开发用报价快捷入口。
    GetRates { payload: Value },
}

/// 工具调用请求体。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub tool_name: String,
    /// 每次调用唯一；结果消息必须原样回显。
    pub tool_call_id: String,
    #[serde(default)]
    pub parameters: Value,
}

/// 服务端发送的 WebSocket 消息。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// 工具调用结果，按 `tool_call_id` 关联请求。
    ClientToolResult {
        tool_call_id: String,
        result: Value,
        is_error: bool,
    },
    /// 工具成功执行后的上下文通知。
    ContextualUpdate {
        text: String,
        data: Value,
        session_id: String,
    },
    /// `ping` 的应答。
    Pong {
        payload: Value,
        session_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        request_id: Option<String>,
    },
    /// `test` 的回显。
    Test { payload: Value, session_id: String },
    /// `get_rates` 的应答。
    QuoteReady { payload: Value, session_id: String },
    /// 协议层错误消息。
    Error { message: String },
}

/// 工具产生的上下文通知（未绑定会话）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextualUpdate {
    /// 短标签，如 `quote_ready`、`label_created`。
    pub text: String,
    pub data: Value,
}

impl ContextualUpdate {
    pub fn new(text: impl Into<String>, data: Value) -> Self {
        Self {
            text: text.into(),
            data,
        }
    }

    /// 绑定会话后转为出站消息。
    pub fn into_message(self, session_id: &str) -> ServerMessage {
        ServerMessage::ContextualUpdate {
            text: self.text,
            data: self.data,
            session_id: session_id.to_string(),
        }
    }
}
