//! 基础设施层
//!
//! 共享原子计数存储与发布/订阅总线的 Redis 实现。

pub mod redis;

pub use redis::{RedisBus, RedisCounterStore, RedisError, RedisResult};
