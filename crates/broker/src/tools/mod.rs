//! 工具抽象层。
//!
//! 该模块定义了统一的 `Tool` 接口：分发器按注册名解析工具并调用，
//! 工具返回结果载荷与零个或多个 contextual update。

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::protocol::ContextualUpdate;

pub mod labels;
pub mod quotes;

pub use labels::CreateLabel;
pub use quotes::GetShippingQuotes;

/// 工具调用输出。
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// 返回给调用方的结果载荷。
    pub result: Value,
    /// 调用成功后向会话发出的上下文通知。
    pub updates: Vec<ContextualUpdate>,
}

impl ToolOutput {
    pub fn new(result: Value) -> Self {
        Self {
            result,
            updates: Vec::new(),
        }
    }

    pub fn with_update(mut self, update: ContextualUpdate) -> Self {
        self.updates.push(update);
        self
    }
}

/// 工具抽象接口。
///
/// 实现可以执行网络 I/O（如调用承运商报价 API），调用在所属连接
/// 任务上顺序执行，不会阻塞其他连接。
#[async_trait]
pub trait Tool: Send + Sync {
    /// 返回工具注册名。
    ///
    /// 该名称同时用于分发表键与日志标识。
    fn name(&self) -> &str;

    /// 执行一次工具调用。
    ///
    /// `parameters` 为调用方提供的不透明 JSON 载荷；实现负责反序列化
    /// 与校验，校验失败应返回 `InvalidParameters`。
    async fn invoke(&self, parameters: Value) -> Result<ToolOutput>;
}
