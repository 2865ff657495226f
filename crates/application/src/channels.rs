//! 存储键与总线频道的约定名称。
//!
//! 所有实例必须使用完全相同的键名和频道名，才能看到同一份
//! 全局计数并收到彼此发布的消息。

/// 共享计数存储中保存全局在线人数的键。
pub const CONNECTION_COUNT_KEY: &str = "chat:connection-count";

/// 在线人数变更的广播频道，负载为十进制整数字符串。
pub const CONNECTION_COUNT_UPDATED_CHANNEL: &str = "chat:connection-count-updated";

/// 聊天消息的广播频道，负载为原始消息文本。
pub const NEW_MESSAGE_CHANNEL: &str = "chat:new-message";
