//! 领域模型层。
//!
//! 定义聊天中继的核心实体和值对象：消息、会话以及各种标识符。
//! 该层不依赖任何外部基础设施。

pub mod errors;
pub mod message;
pub mod session;
pub mod value_objects;

pub use errors::DomainError;
pub use message::ChatMessage;
pub use session::Session;
pub use value_objects::{InstanceId, MessageId, MessageText, SessionId, Timestamp, MAX_MESSAGE_LEN};
