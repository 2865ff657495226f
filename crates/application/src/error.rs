use domain::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("domain error: {0}")]
    Domain(#[from] DomainError),
    #[error("counter store error: {0}")]
    CounterStore(String),
    #[error("bus error: {0}")]
    Bus(String),
    #[error("infrastructure error: {0}")]
    Infrastructure(String),
    #[error("instance is draining, new sessions are rejected")]
    Draining,
}

impl ApplicationError {
    /// 创建计数存储错误
    pub fn counter_store(message: impl Into<String>) -> Self {
        ApplicationError::CounterStore(message.into())
    }

    /// 创建总线错误
    pub fn bus(message: impl Into<String>) -> Self {
        ApplicationError::Bus(message.into())
    }

    /// 创建基础设施错误
    pub fn infrastructure(message: impl Into<String>) -> Self {
        ApplicationError::Infrastructure(message.into())
    }
}
