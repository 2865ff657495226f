//! Redis 原子计数存储
//!
//! INCR/DECR 的原子性由 Redis 保证，本层只做命令转发和错误转换。

use application::{ApplicationError, CounterStore};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use super::error::{RedisError, RedisResult};

/// 基于 Redis 的计数存储
///
/// `ConnectionManager` 内部自带重连，克隆成本低，每个操作
/// 克隆一份句柄使用。
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
}

impl RedisCounterStore {
    pub fn new(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    async fn get_value(&self, key: &str) -> RedisResult<Option<i64>> {
        let mut conn = self.manager.clone();
        let value: Option<i64> = conn.get(key).await?;
        Ok(value)
    }

    async fn set_value(&self, key: &str, value: i64) -> RedisResult<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.set(key, value).await?;
        Ok(())
    }

    async fn incr_value(&self, key: &str) -> RedisResult<i64> {
        let mut conn = self.manager.clone();
        let value: i64 = conn.incr(key, 1).await?;
        Ok(value)
    }

    async fn decr_value(&self, key: &str) -> RedisResult<i64> {
        let mut conn = self.manager.clone();
        let value: i64 = conn.decr(key, 1).await?;
        Ok(value)
    }
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn get(&self, key: &str) -> Result<Option<i64>, ApplicationError> {
        self.get_value(key)
            .await
            .map_err(|e| ApplicationError::counter_store(e.to_string()))
    }

    async fn set(&self, key: &str, value: i64) -> Result<(), ApplicationError> {
        self.set_value(key, value)
            .await
            .map_err(|e| ApplicationError::counter_store(e.to_string()))
    }

    async fn incr(&self, key: &str) -> Result<i64, ApplicationError> {
        self.incr_value(key)
            .await
            .map_err(|e| ApplicationError::counter_store(e.to_string()))
    }

    async fn decr(&self, key: &str) -> Result<i64, ApplicationError> {
        self.decr_value(key)
            .await
            .map_err(|e| ApplicationError::counter_store(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn connect() -> Option<RedisCounterStore> {
        if std::env::var("REDIS_INTEGRATION_TEST").is_err() {
            return None;
        }
        let client = redis::Client::open("redis://127.0.0.1:6379").ok()?;
        let manager = client.get_connection_manager().await.ok()?;
        Some(RedisCounterStore::new(manager))
    }

    #[tokio::test]
    async fn incr_decr_round_trip() {
        let Some(store) = connect().await else {
            return;
        };
        let key = format!("test:counter:{}", std::process::id());

        store.set(&key, 0).await.unwrap();
        assert_eq!(store.incr(&key).await.unwrap(), 1);
        assert_eq!(store.incr(&key).await.unwrap(), 2);
        assert_eq!(store.decr(&key).await.unwrap(), 1);
        assert_eq!(store.get(&key).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn missing_key_reads_as_none() {
        let Some(store) = connect().await else {
            return;
        };
        let key = format!("test:counter:missing:{}", std::process::id());
        assert_eq!(store.get(&key).await.unwrap(), None);
    }
}
