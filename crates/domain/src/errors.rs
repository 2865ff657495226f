//! 领域模型错误定义

use thiserror::Error;

use crate::value_objects::MAX_MESSAGE_LEN;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 消息内容为空
    #[error("消息内容不能为空")]
    EmptyMessage,

    /// 消息超长
    #[error("消息超过 {MAX_MESSAGE_LEN} 字符上限: 实际 {actual} 字符")]
    MessageTooLong { actual: usize },

    /// 实例标识为空
    #[error("实例标识不能为空")]
    EmptyInstanceId,
}
