//! Redis 基础设施模块

pub mod bus;
pub mod counter;
pub mod error;

pub use bus::RedisBus;
pub use counter::RedisCounterStore;
pub use error::{RedisError, RedisResult};
