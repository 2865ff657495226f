//! 会话生命周期控制器。
//!
//! 把登记表、在线计数和消息中继编排成单一入口：传输层只跟
//! 控制器打交道。控制器还拥有泵任务，把总线消息解释成出站
//! 事件后广播给本地全部会话。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use domain::{InstanceId, Session, SessionId};

use crate::error::ApplicationError;
use crate::presence::PresenceService;
use crate::registry::{OutboundSender, SessionRegistry};
use crate::relay::MessageRelay;

/// 会话生命周期控制器
pub struct SessionController {
    instance_id: InstanceId,
    registry: Arc<SessionRegistry>,
    presence: Arc<PresenceService>,
    relay: Arc<MessageRelay>,
    draining: AtomicBool,
}

impl SessionController {
    pub fn new(
        instance_id: InstanceId,
        registry: Arc<SessionRegistry>,
        presence: Arc<PresenceService>,
        relay: Arc<MessageRelay>,
    ) -> Self {
        Self {
            instance_id,
            registry,
            presence,
            relay,
            draining: AtomicBool::new(false),
        }
    }

    pub fn instance_id(&self) -> &InstanceId {
        &self.instance_id
    }

    /// 启动控制器：初始化共享计数键，订阅总线并启动泵任务。
    ///
    /// 任何一步失败都是致命的，实例不应开始接受会话。
    pub async fn start(self: &Arc<Self>) -> Result<(), ApplicationError> {
        self.presence.initialize().await?;

        let mut rx = self.relay.subscribe().await?;
        let controller = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Some(event) = controller.relay.interpret(msg) {
                    controller.registry.broadcast(&event).await;
                }
            }
            tracing::info!("总线消息流已结束，泵任务退出");
        });

        tracing::info!(instance = %self.instance_id, "会话控制器已启动");
        Ok(())
    }

    /// 新会话接入：登记并自增全局计数。
    ///
    /// 排水中的实例拒绝新会话。计数自增失败不回滚登记：会话
    /// 照常服务，计数偏低好过拒绝用户。
    pub async fn connect(
        &self,
        session: Session,
        sender: OutboundSender,
    ) -> Result<(), ApplicationError> {
        if self.is_draining() {
            return Err(ApplicationError::Draining);
        }

        let session_id = session.id;
        self.registry.register(session, sender).await;

        if let Err(err) = self.presence.on_join().await {
            tracing::warn!(session_id = %session_id, error = %err, "接入自增失败，会话继续服务");
        }
        Ok(())
    }

    /// 客户端发来一条消息。中继层已经吞掉了校验失败；这里只剩
    /// 总线故障，记日志后对会话保持沉默。
    pub async fn handle_send(&self, text: &str) {
        if let Err(err) = self.relay.publish(text).await {
            tracing::warn!(error = %err, "消息发布失败，丢弃该消息");
        }
    }

    /// 会话断开：注销并自减全局计数。
    /// 只有真正移除了会话才自减，重复的断开信号不会二次扣减。
    pub async fn disconnect(&self, session_id: SessionId) {
        if !self.registry.deregister(session_id).await {
            return;
        }
        if let Err(err) = self.presence.on_leave().await {
            tracing::warn!(session_id = %session_id, error = %err, "离开自减失败，等待关闭对账修正");
        }
    }

    /// 优雅关闭：进入排水状态，在宽限期内完成关闭对账。
    ///
    /// 超时或存储不可达都只告警后返回，关闭流程不会被共享存储
    /// 拖死；代价是全局计数可能暂时偏高。
    pub async fn shutdown(&self, grace: Duration) {
        self.draining.store(true, Ordering::SeqCst);
        let local_count = self.registry.count().await;
        tracing::info!(local_count, "进入排水状态，开始关闭对账");

        match tokio::time::timeout(grace, self.presence.reconcile_on_shutdown(local_count)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                tracing::warn!(error = %err, "关闭对账失败，全局计数可能偏高");
            }
            Err(_) => {
                tracing::warn!(grace_ms = grace.as_millis() as u64, "关闭对账超时，放弃写回");
            }
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }
}
