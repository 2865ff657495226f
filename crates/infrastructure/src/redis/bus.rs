//! Redis 发布/订阅总线
//!
//! 发布走 `ConnectionManager`，订阅在后台任务里维护独立的
//! PubSub 连接，断线后按指数退避重连并重新订阅全部频道。

use std::time::Duration;

use application::{ApplicationError, BroadcastBus, BusMessage};
use async_trait::async_trait;
use futures_util::StreamExt;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use super::error::{RedisError, RedisResult};

/// 指数退避的最大指数，重试间隔封顶在基数的 64 倍
const MAX_BACKOFF_EXPONENT: u32 = 6;

/// 第 `retry_count` 次重连前的等待时长
fn backoff_delay(reconnect_interval: Duration, retry_count: u32) -> Duration {
    reconnect_interval * 2_u32.pow((retry_count - 1).min(MAX_BACKOFF_EXPONENT))
}

/// 基于 Redis 发布/订阅的广播总线
pub struct RedisBus {
    client: Client,
    manager: ConnectionManager,
    reconnect_interval: Duration,
    max_reconnect_attempts: u32,
}

impl RedisBus {
    pub fn new(
        client: Client,
        manager: ConnectionManager,
        reconnect_interval_ms: u64,
        max_reconnect_attempts: u32,
    ) -> Self {
        Self {
            client,
            manager,
            reconnect_interval: Duration::from_millis(reconnect_interval_ms),
            max_reconnect_attempts,
        }
    }

    async fn publish_payload(&self, channel: &str, payload: String) -> RedisResult<()> {
        let mut conn = self.manager.clone();
        // 返回值是订阅者数量，没有订阅者不算失败
        let receivers: i64 =
            conn.publish(channel, payload)
                .await
                .map_err(|e| RedisError::PublishError {
                    message: e.to_string(),
                })?;
        debug!(channel, receivers, "消息已发布");
        Ok(())
    }

    /// 订阅监听循环：连接、订阅、转发，断开后退避重连。
    ///
    /// 转发端关闭（订阅方退出）时循环终止；连续失败达到上限
    /// 时放弃，此后该实例收不到总线消息。
    async fn listen_loop(
        client: Client,
        channels: Vec<String>,
        tx: mpsc::UnboundedSender<BusMessage>,
        reconnect_interval: Duration,
        max_reconnect_attempts: u32,
    ) {
        let mut retry_count: u32 = 0;

        while !tx.is_closed() {
            match Self::connect_and_forward(&client, &channels, &tx).await {
                Ok(()) => {
                    // 正常退出只发生在订阅方关闭
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Redis 订阅连接中断");
                    retry_count += 1;

                    if retry_count >= max_reconnect_attempts {
                        error!("已达最大重连次数，停止订阅监听");
                        break;
                    }

                    let delay = backoff_delay(reconnect_interval, retry_count);
                    warn!(retry_count, delay_ms = delay.as_millis() as u64, "准备重连");
                    sleep(delay).await;
                }
            }
        }

        info!("Redis 订阅监听已停止");
    }

    async fn connect_and_forward(
        client: &Client,
        channels: &[String],
        tx: &mpsc::UnboundedSender<BusMessage>,
    ) -> RedisResult<()> {
        let mut pubsub = client
            .get_async_pubsub()
            .await
            .map_err(|e| RedisError::ConnectionError {
                message: format!("获取 PubSub 连接失败: {}", e),
            })?;

        for channel in channels {
            pubsub
                .subscribe(channel)
                .await
                .map_err(|e| RedisError::SubscribeError {
                    message: format!("订阅频道 {} 失败: {}", channel, e),
                })?;
        }

        info!(count = channels.len(), "已订阅 Redis 频道");

        loop {
            // 超时轮询，避免订阅方退出后无限阻塞在空闲连接上
            match tokio::time::timeout(Duration::from_millis(1000), pubsub.on_message().next())
                .await
            {
                Ok(Some(msg)) => {
                    let channel = msg.get_channel_name().to_string();
                    let payload: String =
                        msg.get_payload().map_err(|e| RedisError::SubscribeError {
                            message: format!("读取消息负载失败: {}", e),
                        })?;

                    if tx.send(BusMessage::new(channel, payload)).is_err() {
                        debug!("订阅方已退出，停止转发");
                        return Ok(());
                    }
                }
                Ok(None) => {
                    return Err(RedisError::ConnectionError {
                        message: "PubSub 消息流已结束".to_string(),
                    });
                }
                Err(_) => {
                    if tx.is_closed() {
                        return Ok(());
                    }
                }
            }
        }
    }
}

#[async_trait]
impl BroadcastBus for RedisBus {
    async fn publish(&self, channel: &str, payload: String) -> Result<(), ApplicationError> {
        self.publish_payload(channel, payload)
            .await
            .map_err(|e| ApplicationError::bus(e.to_string()))
    }

    async fn subscribe(
        &self,
        channels: &[String],
    ) -> Result<mpsc::UnboundedReceiver<BusMessage>, ApplicationError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = self.client.clone();
        let channels = channels.to_vec();
        let reconnect_interval = self.reconnect_interval;
        let max_reconnect_attempts = self.max_reconnect_attempts;

        tokio::spawn(async move {
            Self::listen_loop(
                client,
                channels,
                tx,
                reconnect_interval,
                max_reconnect_attempts,
            )
            .await;
        });

        Ok(rx)
    }
}
