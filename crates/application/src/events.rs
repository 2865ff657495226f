//! 推送给客户端会话的出站事件。

use domain::{ChatMessage, InstanceId, MessageId, MessageText, Timestamp};
use serde::{Deserialize, Serialize};

/// 出站事件
///
/// 控制器把总线送达的内容原样广播给本实例的每个会话；
/// 序列化后即为传输层的出站帧。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundEvent {
    /// 聊天消息
    #[serde(rename_all = "camelCase")]
    Message {
        id: MessageId,
        text: MessageText,
        created_at: Timestamp,
        origin_instance: InstanceId,
    },
    /// 在线人数更新，语义是"最新已知值"而不是增量
    Presence { count: i64 },
}

impl OutboundEvent {
    pub fn message(message: ChatMessage) -> Self {
        Self::Message {
            id: message.id,
            text: message.text,
            created_at: message.created_at,
            origin_instance: message.origin_instance,
        }
    }

    pub fn presence(count: i64) -> Self {
        Self::Presence { count }
    }
}
