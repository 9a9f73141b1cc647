//! 工具调用分发。

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{info, warn};

use crate::error::BrokerError;
use crate::protocol::{ContextualUpdate, ServerMessage, ToolCallRequest};
use crate::tools::Tool;

/// 单次调用的结果信封内容。
#[derive(Debug, Clone)]
pub struct ToolResult {
    pub tool_call_id: String,
    pub result: Value,
    pub is_error: bool,
}

impl ToolResult {
    pub fn into_message(self) -> ServerMessage {
        ServerMessage::ClientToolResult {
            tool_call_id: self.tool_call_id,
            result: self.result,
            is_error: self.is_error,
        }
    }
}

/// 分发结果：回给调用方的结果，以及成功时待发出的通知。
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub result: ToolResult,
    pub updates: Vec<ContextualUpdate>,
}

impl DispatchOutcome {
    /// 由错误构造结果信封；`tool_call_id` 在所有错误路径上原样回显，
    /// 且错误调用不产生任何通知。
    pub fn from_error(tool_call_id: String, error: &BrokerError) -> Self {
        Self {
            result: ToolResult {
                tool_call_id,
                result: json!({ "error": error.to_string() }),
                is_error: true,
            },
            updates: Vec::new(),
        }
    }
}

/// 工具调用分发器。
///
/// 维护注册名到工具实现的闭合映射；未注册名与工具内部失败都被
/// 捕获并转换为 `is_error=true` 的结果，不会中断连接。
pub struct Dispatcher {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Dispatcher {
    /// 创建空分发表。
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// 按工具自报名称注册；同名后注册者覆盖先注册者。
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        info!(tool_name = tool.name(), "registering tool");
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// 已注册工具名（按字典序）。
    pub fn tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 分发一次工具调用。
    pub async fn dispatch(&self, request: ToolCallRequest) -> DispatchOutcome {
        let Some(tool) = self.tools.get(&request.tool_name) else {
            warn!(
                tool_name = %request.tool_name,
                tool_call_id = %request.tool_call_id,
                "unknown tool requested"
            );
            return DispatchOutcome::from_error(
                request.tool_call_id,
                &BrokerError::UnknownTool(request.tool_name),
            );
        };

        match tool.invoke(request.parameters).await {
            Ok(output) => {
                info!(
                    tool_name = %request.tool_name,
                    tool_call_id = %request.tool_call_id,
                    update_count = output.updates.len(),
                    "tool call succeeded"
                );
                DispatchOutcome {
                    result: ToolResult {
                        tool_call_id: request.tool_call_id,
                        result: output.result,
                        is_error: false,
                    },
                    updates: output.updates,
                }
            }
            Err(err) => {
                warn!(
                    tool_name = %request.tool_name,
                    tool_call_id = %request.tool_call_id,
                    error = %err,
                    "tool call failed"
                );
                DispatchOutcome::from_error(request.tool_call_id, &err)
            }
        }
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
