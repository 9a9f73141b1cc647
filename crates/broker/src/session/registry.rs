use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::info;

use super::{ConnectionHandle, ConnectionId, SessionId};

/// 会话成员注册表。
///
/// 单一进程级实例，随服务启动创建、停止销毁。写锁保证同一会话上
/// join/leave 与广播读取互斥，不会丢失成员变更。
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, HashMap<ConnectionId, ConnectionHandle>>>,
}

impl SessionRegistry {
    /// 创建空注册表。
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// 将连接加入其会话；会话不存在时隐式创建。
    pub async fn join(&self, handle: ConnectionHandle) {
        info!(
            session_id = %handle.session_id,
            connection_id = %handle.id,
            "connection joined session"
        );

        let mut sessions = self.sessions.write().await;
        sessions
            .entry(handle.session_id.clone())
            .or_default()
            .insert(handle.id, handle);
    }

    /// 将连接移出会话；会话成员清零后整体丢弃。
    ///
    /// 对未知会话或未知连接的调用是无害的空操作。
    pub async fn leave(&self, session_id: &SessionId, connection_id: &ConnectionId) {
        let mut sessions = self.sessions.write().await;
        if let Some(members) = sessions.get_mut(session_id) {
            if members.remove(connection_id).is_some() {
                info!(
                    session_id = %session_id,
                    connection_id = %connection_id,
                    "connection left session"
                );
            }
            if members.is_empty() {
                sessions.remove(session_id);
                info!(session_id = %session_id, "session discarded");
            }
        }
    }

    /// 当前会话成员快照。
    pub async fn members(&self, session_id: &SessionId) -> Vec<ConnectionHandle> {
        let sessions = self.sessions.read().await;
        sessions
            .get(session_id)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// 活跃会话数。
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
