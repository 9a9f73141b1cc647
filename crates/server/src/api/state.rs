//! 统一的应用状态。

use std::sync::Arc;

use shipline_broker::Broker;

/// 统一的应用状态，包含所有 handler 共享的数据。
#[derive(Clone)]
pub struct AppState {
    /// 会话级工具调用代理。
    pub broker: Arc<Broker>,
}

impl AppState {
    /// 创建新的应用状态。
    pub fn new(broker: Arc<Broker>) -> Self {
        Self { broker }
    }
}
