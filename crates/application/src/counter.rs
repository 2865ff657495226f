//! 共享计数存储端口。
//!
//! 抽象外部的键值存储：对单个整数键提供原子自增/自减和读写。
//! 全局在线人数的正确性完全依赖存储端的原子性，应用层除了
//! 关闭对账之外从不对它做本地读改写。

use async_trait::async_trait;

use crate::error::ApplicationError;

/// 共享计数存储
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// 读取键的当前值，键不存在时返回 `None`
    async fn get(&self, key: &str) -> Result<Option<i64>, ApplicationError>;

    /// 无条件写入键值
    async fn set(&self, key: &str, value: i64) -> Result<(), ApplicationError>;

    /// 原子自增并返回新值
    async fn incr(&self, key: &str) -> Result<i64, ApplicationError>;

    /// 原子自减并返回新值。存储端不做下限裁剪，可以减到负数
    async fn decr(&self, key: &str) -> Result<i64, ApplicationError>;
}

/// 内存实现的计数存储（用于测试和单实例部署）
pub mod memory {
    use std::collections::HashMap;

    use tokio::sync::RwLock;

    use super::*;

    #[derive(Default)]
    pub struct MemoryCounterStore {
        values: RwLock<HashMap<String, i64>>,
    }

    impl MemoryCounterStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl CounterStore for MemoryCounterStore {
        async fn get(&self, key: &str) -> Result<Option<i64>, ApplicationError> {
            let values = self.values.read().await;
            Ok(values.get(key).copied())
        }

        async fn set(&self, key: &str, value: i64) -> Result<(), ApplicationError> {
            let mut values = self.values.write().await;
            values.insert(key.to_string(), value);
            Ok(())
        }

        async fn incr(&self, key: &str) -> Result<i64, ApplicationError> {
            let mut values = self.values.write().await;
            let value = values.entry(key.to_string()).or_insert(0);
            *value += 1;
            Ok(*value)
        }

        async fn decr(&self, key: &str) -> Result<i64, ApplicationError> {
            let mut values = self.values.write().await;
            let value = values.entry(key.to_string()).or_insert(0);
            *value -= 1;
            Ok(*value)
        }
    }
}
