//! 会话登记表。
//!
//! 每个实例独占维护本地接入的会话，是"本实例欠了多少次自增"
//! 的唯一事实来源。登记表只描述本地事实，绝不与全局计数混用。

use std::collections::HashMap;

use domain::{Session, SessionId};
use tokio::sync::{mpsc, Mutex};

use crate::events::OutboundEvent;

/// 指向单个会话的出站通道
pub type OutboundSender = mpsc::UnboundedSender<OutboundEvent>;

struct RegisteredSession {
    session: Session,
    sender: OutboundSender,
}

/// 本地会话登记表
#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, RegisteredSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记一个新会话。纯内存操作，没有失败路径。
    pub async fn register(&self, session: Session, sender: OutboundSender) {
        let mut sessions = self.sessions.lock().await;
        let session_id = session.id;
        sessions.insert(session_id, RegisteredSession { session, sender });
        tracing::debug!(session_id = %session_id, local_count = sessions.len(), "会话已登记");
    }

    /// 注销会话，返回它之前是否在登记表中。
    /// 重复的断开信号是无操作而不是错误。
    pub async fn deregister(&self, session_id: SessionId) -> bool {
        let mut sessions = self.sessions.lock().await;
        let removed = sessions.remove(&session_id).is_some();
        if removed {
            tracing::debug!(session_id = %session_id, local_count = sessions.len(), "会话已注销");
        }
        removed
    }

    /// 当前本地会话数
    pub async fn count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// 把事件广播给本实例的每个会话。
    /// 单个不可达的会话只记日志并跳过，不阻塞其余会话的投递。
    pub async fn broadcast(&self, event: &OutboundEvent) {
        let sessions = self.sessions.lock().await;
        for registered in sessions.values() {
            if registered.sender.send(event.clone()).is_err() {
                tracing::warn!(
                    session_id = %registered.session.id,
                    "会话出站通道已关闭，跳过投递"
                );
            }
        }
    }
}
