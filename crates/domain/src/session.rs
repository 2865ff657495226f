use serde::{Deserialize, Serialize};

use crate::value_objects::{InstanceId, SessionId, Timestamp};

/// 一条活跃的客户端连接。
///
/// 会话归接受它的实例独占所有；断线重连会产生一个全新的会话标识。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub instance: InstanceId,
    pub connected_at: Timestamp,
}

impl Session {
    pub fn new(id: SessionId, instance: InstanceId, connected_at: Timestamp) -> Self {
        Self {
            id,
            instance,
            connected_at,
        }
    }

    /// 在指定实例上开启一个新会话。
    pub fn open(instance: InstanceId) -> Self {
        Self::new(SessionId::generate(), instance, chrono::Utc::now())
    }
}
