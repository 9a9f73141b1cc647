//! 会话内 contextual update 的投递。

use std::sync::Arc;

use tracing::{debug, warn};

use crate::protocol::ContextualUpdate;
use crate::session::{ConnectionHandle, SessionRegistry};

/// 广播通知器。
///
/// 投递使用每连接出站队列的非阻塞发送：慢速或已断开的成员只丢失
/// 自己的那份拷贝，不会拖延其他成员。单连接内的投递顺序与发出顺序
/// 一致（FIFO 队列）。
pub struct BroadcastNotifier {
    registry: Arc<SessionRegistry>,
}

impl BroadcastNotifier {
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// 投递一条 contextual update。
    ///
    /// `broadcast=false` 时仅投递给调用方连接；为 true 时投递给会话
    /// 当前全体成员（含调用方）。投递是尽力而为的。
    pub async fn notify(
        &self,
        caller: &ConnectionHandle,
        update: ContextualUpdate,
        broadcast: bool,
    ) {
        let message = update.into_message(caller.session_id.as_str());

        if !broadcast {
            deliver(caller, message.clone());
            return;
        }

        let members = self.registry.members(&caller.session_id).await;
        debug!(
            session_id = %caller.session_id,
            recipients = members.len(),
            "broadcasting contextual update"
        );
        for member in members {
            deliver(&member, message.clone());
        }
    }
}

fn deliver(handle: &ConnectionHandle, message: crate::protocol::ServerMessage) {
    if !handle.try_notify(message) {
        warn!(
            connection_id = %handle.id,
            session_id = %handle.session_id,
            "dropping contextual update for slow or closed connection"
        );
    }
}
