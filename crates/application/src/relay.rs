//! 消息中继。
//!
//! 发送路径只负责校验与发布；本地投递完全走订阅路径，发送方
//! 与其他客户端经历同样的延迟和顺序，没有本地回显的特殊分支。

use std::sync::Arc;

use chrono::Utc;
use domain::{ChatMessage, DomainError, InstanceId, MessageId, MessageText};
use tokio::sync::mpsc;

use crate::bus::{BroadcastBus, BusMessage};
use crate::channels::{CONNECTION_COUNT_UPDATED_CHANNEL, NEW_MESSAGE_CHANNEL};
use crate::error::ApplicationError;
use crate::events::OutboundEvent;

/// 消息中继
pub struct MessageRelay {
    bus: Arc<dyn BroadcastBus>,
    instance_id: InstanceId,
}

impl MessageRelay {
    pub fn new(bus: Arc<dyn BroadcastBus>, instance_id: InstanceId) -> Self {
        Self { bus, instance_id }
    }

    /// 把客户端撰写的文本发布到消息频道。
    ///
    /// 空文本静默丢弃，超长文本丢弃并告警；两种情况对发送方都
    /// 不暴露错误。合法文本原样上总线。
    pub async fn publish(&self, text: &str) -> Result<(), ApplicationError> {
        let text = match MessageText::new(text) {
            Ok(text) => text,
            Err(DomainError::EmptyMessage) => {
                tracing::debug!("丢弃空消息");
                return Ok(());
            }
            Err(err) => {
                tracing::warn!(error = %err, "丢弃非法消息文本");
                return Ok(());
            }
        };

        self.bus
            .publish(NEW_MESSAGE_CHANNEL, text.as_str().to_string())
            .await
    }

    /// 订阅消息频道和在线人数频道，返回汇聚后的总线消息流。
    pub async fn subscribe(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<BusMessage>, ApplicationError> {
        self.bus
            .subscribe(&[
                NEW_MESSAGE_CHANNEL.to_string(),
                CONNECTION_COUNT_UPDATED_CHANNEL.to_string(),
            ])
            .await
    }

    /// 解释一条总线消息，转换为出站事件。
    ///
    /// 消息频道：此刻铸造 id 与时间戳，并把本实例记为来源——
    /// 也就是说，同一条逻辑消息在每个实例上有各自的元数据。
    /// 在线人数频道：解析十进制负载，非法负载丢弃并告警。
    /// 未识别的频道直接忽略。
    pub fn interpret(&self, msg: BusMessage) -> Option<OutboundEvent> {
        match msg.channel.as_str() {
            NEW_MESSAGE_CHANNEL => {
                let text = match MessageText::new(msg.payload) {
                    Ok(text) => text,
                    Err(err) => {
                        tracing::warn!(error = %err, "总线送达的消息文本非法，丢弃");
                        return None;
                    }
                };
                let message = ChatMessage::new(
                    MessageId::generate(),
                    text,
                    Utc::now(),
                    self.instance_id.clone(),
                );
                Some(OutboundEvent::message(message))
            }
            CONNECTION_COUNT_UPDATED_CHANNEL => match msg.payload.trim().parse::<i64>() {
                Ok(count) => Some(OutboundEvent::presence(count)),
                Err(_) => {
                    tracing::warn!(payload = %msg.payload, "在线人数频道收到非整数负载，丢弃");
                    None
                }
            },
            other => {
                tracing::debug!(channel = other, "忽略未识别的频道");
                None
            }
        }
    }
}
