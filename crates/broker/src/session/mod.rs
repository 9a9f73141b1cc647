//! 会话模型与会话注册表模块。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::protocol::ServerMessage;

/// 会话注册表实现。
pub mod registry;
/// 导出会话注册表类型。
pub use registry::SessionRegistry;

/// 会话标识。客户端可自带任意不透明字符串，缺省时由服务端生成 UUID。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// 生成新的随机会话 ID。
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 连接唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 活跃连接句柄。
///
/// 持有该连接的出站队列发送端；队列满或对端断开时投递失败，
/// 由调用方决定丢弃策略。
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    pub session_id: SessionId,
    /// 连接建立时间（UTC）。
    pub joined_at: DateTime<Utc>,
    outbound: mpsc::Sender<ServerMessage>,
}

impl ConnectionHandle {
    pub fn new(session_id: SessionId, outbound: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id: ConnectionId::new(),
            session_id,
            joined_at: Utc::now(),
            outbound,
        }
    }

    /// 非阻塞投递一条出站消息。
    ///
    /// 返回 false 表示队列已满或连接已关闭，消息被丢弃。
    pub fn try_notify(&self, message: ServerMessage) -> bool {
        self.outbound.try_send(message).is_ok()
    }
}
