//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - 服务监听地址
//! - Redis 连接与重连策略
//! - 关闭宽限期

use serde::{Deserialize, Serialize};
use std::env;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务配置
    pub server: ServerConfig,
    /// Redis配置
    pub redis: RedisConfig,
    /// 进程关闭配置
    pub shutdown: ShutdownConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Redis配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    /// 订阅断开后的初始重连间隔（指数退避的基数）
    pub reconnect_interval_ms: u64,
    /// 退避上限之前允许的连续重连次数
    pub max_reconnect_attempts: u32,
}

/// 进程关闭配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 收到关闭信号后，在线计数对账允许占用的最长时间
    pub grace_period_ms: u64,
}

impl AppConfig {
    /// 从环境变量加载配置
    /// 对于关键配置（REDIS_URL），如果环境变量不存在将会 panic，
    /// 确保生产环境不会使用不安全的默认值
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3001),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL")
                    .expect("REDIS_URL environment variable is required for production safety"),
                reconnect_interval_ms: env::var("REDIS_RECONNECT_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
                max_reconnect_attempts: env::var("REDIS_MAX_RECONNECT_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            shutdown: ShutdownConfig {
                grace_period_ms: env::var("SHUTDOWN_GRACE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
            },
        }
    }

    /// 从环境变量加载配置，开发环境版本
    /// 提供本地默认值，仅用于测试和开发
    pub fn from_env_with_defaults() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3001),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
                reconnect_interval_ms: env::var("REDIS_RECONNECT_INTERVAL_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
                max_reconnect_attempts: env::var("REDIS_MAX_RECONNECT_ATTEMPTS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            },
            shutdown: ShutdownConfig {
                grace_period_ms: env::var("SHUTDOWN_GRACE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3000),
            },
        }
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.redis.url.is_empty() {
            return Err(ConfigError::InvalidRedisConfig(
                "Redis URL cannot be empty".to_string(),
            ));
        }

        if !self.redis.url.starts_with("redis://") && !self.redis.url.starts_with("rediss://") {
            return Err(ConfigError::InvalidRedisConfig(format!(
                "Redis URL must start with redis:// or rediss://, got: {}",
                self.redis.url
            )));
        }

        if self.redis.reconnect_interval_ms == 0 {
            return Err(ConfigError::InvalidRedisConfig(
                "Reconnect interval must be greater than 0".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigError::InvalidServerConfig(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.shutdown.grace_period_ms == 0 {
            return Err(ConfigError::InvalidShutdownConfig(
                "Shutdown grace period must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid Redis configuration: {0}")]
    InvalidRedisConfig(String),
    #[error("Invalid server configuration: {0}")]
    InvalidServerConfig(String),
    #[error("Invalid shutdown configuration: {0}")]
    InvalidShutdownConfig(String),
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),
}

impl Default for AppConfig {
    /// 默认配置使用开发环境版本
    fn default() -> Self {
        Self::from_env_with_defaults()
    }
}
