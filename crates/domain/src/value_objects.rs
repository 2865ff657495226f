use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::DomainError;

/// 统一的时间戳类型。
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// 单条消息的最大字符数，与输入层的限制保持一致。
pub const MAX_MESSAGE_LEN: usize = 255;

/// 会话唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// 生成随机会话标识。
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for SessionId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<SessionId> for Uuid {
    fn from(value: SessionId) -> Self {
        value.0
    }
}

/// 消息唯一标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub Uuid);

impl MessageId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for MessageId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl From<MessageId> for Uuid {
    fn from(value: MessageId) -> Self {
        value.0
    }
}

/// 服务实例标识。
///
/// 每个运行中的服务进程有一个独立可达的标识（通常是监听端口），
/// 用于标记消息元数据的来源实例。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::EmptyInstanceId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 经过验证的消息文本。
///
/// 空白内容与超长内容在构造时被拒绝，保证中继内部流转的文本
/// 始终满足输入层契约。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageText(String);

impl MessageText {
    pub fn new(text: impl Into<String>) -> Result<Self, DomainError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(DomainError::EmptyMessage);
        }
        let actual = text.chars().count();
        if actual > MAX_MESSAGE_LEN {
            return Err(DomainError::MessageTooLong { actual });
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_text_accepts_normal_content() {
        let text = MessageText::new("hello").unwrap();
        assert_eq!(text.as_str(), "hello");
    }

    #[test]
    fn message_text_rejects_empty_and_whitespace() {
        assert_eq!(MessageText::new(""), Err(DomainError::EmptyMessage));
        assert_eq!(MessageText::new("   "), Err(DomainError::EmptyMessage));
    }

    #[test]
    fn message_text_rejects_over_limit() {
        let long = "a".repeat(MAX_MESSAGE_LEN + 1);
        assert_eq!(
            MessageText::new(long),
            Err(DomainError::MessageTooLong {
                actual: MAX_MESSAGE_LEN + 1
            })
        );
    }

    #[test]
    fn message_text_counts_chars_not_bytes() {
        // 255 个多字节字符仍然合法
        let cjk = "中".repeat(MAX_MESSAGE_LEN);
        assert!(MessageText::new(cjk).is_ok());
    }

    #[test]
    fn instance_id_rejects_blank() {
        assert!(InstanceId::new("").is_err());
        assert!(InstanceId::new("3001").is_ok());
    }

    #[test]
    fn message_text_serializes_as_plain_string() {
        let text = MessageText::new("hi").unwrap();
        assert_eq!(serde_json::to_string(&text).unwrap(), "\"hi\"");
    }
}
