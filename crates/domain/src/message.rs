use serde::{Deserialize, Serialize};

use crate::value_objects::{InstanceId, MessageId, MessageText, Timestamp};

/// 一条向所有客户端广播的聊天消息。
///
/// 元数据（id、时间戳、来源实例）由接收到总线消息的实例在本地铸造，
/// 因此同一条逻辑消息在不同实例上会携带不同的 id 和时间戳。
/// 构造之后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub text: MessageText,
    pub created_at: Timestamp,
    pub origin_instance: InstanceId,
}

impl ChatMessage {
    pub fn new(
        id: MessageId,
        text: MessageText,
        created_at: Timestamp,
        origin_instance: InstanceId,
    ) -> Self {
        Self {
            id,
            text,
            created_at,
            origin_instance,
        }
    }
}
