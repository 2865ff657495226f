//! 广播总线端口。
//!
//! 抽象外部的发布/订阅设施：至少一次送达，单频道内保序，
//! 频道之间不保证顺序。订阅方拿到一条 mpsc 流，总线把所有
//! 已订阅频道的消息汇入其中。

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::ApplicationError;

/// 一条从总线送达的原始消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    pub channel: String,
    pub payload: String,
}

impl BusMessage {
    pub fn new(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            payload: payload.into(),
        }
    }
}

/// 广播总线
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BroadcastBus: Send + Sync {
    /// 向频道发布一条文本负载
    async fn publish(&self, channel: &str, payload: String) -> Result<(), ApplicationError>;

    /// 订阅一组频道，返回汇聚后的消息流。
    /// 发布方自己的订阅同样会收到它发布的消息（自回环）。
    async fn subscribe(
        &self,
        channels: &[String],
    ) -> Result<mpsc::UnboundedReceiver<BusMessage>, ApplicationError>;
}

/// 内存实现的广播总线（用于测试和单实例部署）
pub mod memory {
    use std::collections::HashSet;

    use tokio::sync::broadcast;

    use super::*;

    pub struct MemoryBus {
        sender: broadcast::Sender<BusMessage>,
    }

    impl MemoryBus {
        pub fn new(capacity: usize) -> Self {
            let (sender, _) = broadcast::channel(capacity);
            Self { sender }
        }
    }

    impl Default for MemoryBus {
        fn default() -> Self {
            Self::new(1024)
        }
    }

    #[async_trait]
    impl BroadcastBus for MemoryBus {
        async fn publish(&self, channel: &str, payload: String) -> Result<(), ApplicationError> {
            if self.sender.receiver_count() == 0 {
                return Ok(());
            }
            self.sender
                .send(BusMessage::new(channel, payload))
                .map_err(|err| ApplicationError::bus(err.to_string()))?;
            Ok(())
        }

        async fn subscribe(
            &self,
            channels: &[String],
        ) -> Result<mpsc::UnboundedReceiver<BusMessage>, ApplicationError> {
            let wanted: HashSet<String> = channels.iter().cloned().collect();
            let mut rx = self.sender.subscribe();
            let (tx, out) = mpsc::unbounded_channel();

            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(msg) => {
                            if !wanted.contains(&msg.channel) {
                                continue;
                            }
                            if tx.send(msg).is_err() {
                                // 订阅方已退出
                                break;
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "内存总线订阅滞后，丢弃积压消息");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            Ok(out)
        }
    }
}
