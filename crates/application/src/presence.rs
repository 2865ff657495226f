//! 全局在线计数服务。
//!
//! 把共享存储上的单个计数键维护成"所有实例存活会话数之和"，
//! 并在每次变更后通过总线通知全部实例。自增/自减依赖存储端的
//! 原子性；唯一的本地读改写发生在关闭对账，属于有意容忍的
//! 一致性缺口。

use std::sync::Arc;

use crate::bus::BroadcastBus;
use crate::channels::{CONNECTION_COUNT_KEY, CONNECTION_COUNT_UPDATED_CHANNEL};
use crate::counter::CounterStore;
use crate::error::ApplicationError;

/// 在线计数服务
pub struct PresenceService {
    store: Arc<dyn CounterStore>,
    bus: Arc<dyn BroadcastBus>,
}

impl PresenceService {
    pub fn new(store: Arc<dyn CounterStore>, bus: Arc<dyn BroadcastBus>) -> Self {
        Self { store, bus }
    }

    /// 启动时初始化计数键：不存在则置 0。
    ///
    /// 幂等。多个实例并发初始化是安全的：无条件的 set 最多把 0
    /// 覆写成 0。此处的存储错误是致命的，实例不得开始接受会话。
    pub async fn initialize(&self) -> Result<(), ApplicationError> {
        if self.store.get(CONNECTION_COUNT_KEY).await?.is_none() {
            self.store.set(CONNECTION_COUNT_KEY, 0).await?;
            tracing::info!(key = CONNECTION_COUNT_KEY, "共享计数键已初始化为 0");
        }
        Ok(())
    }

    /// 会话接入：原子自增，随后广播新值。
    ///
    /// 自增与广播是两个独立操作；两者之间崩溃只会让订阅方短暂
    /// 看到旧值，下一次变更会重新发布当前真相。广播失败只记日志。
    pub async fn on_join(&self) -> Result<i64, ApplicationError> {
        let count = self.store.incr(CONNECTION_COUNT_KEY).await?;
        self.publish_count(count).await;
        Ok(count)
    }

    /// 会话离开：原子自减，随后广播新值。
    ///
    /// 正常自减总是与先前的自增配对，因此这里不做下限裁剪，
    /// 裁剪只属于关闭对账。
    pub async fn on_leave(&self) -> Result<i64, ApplicationError> {
        let count = self.store.decr(CONNECTION_COUNT_KEY).await?;
        self.publish_count(count).await;
        Ok(count)
    }

    /// 关闭对账：把本实例未能逐个注销的会话一次性从全局计数中扣除。
    ///
    /// 读-算-写不是原子的。关闭是罕见事件，这个小竞争窗口是被
    /// 接受的已知缺口；存储不可达时放弃尝试，允许计数偏高。
    pub async fn reconcile_on_shutdown(&self, local_count: usize) -> Result<(), ApplicationError> {
        if local_count == 0 {
            return Ok(());
        }

        let current = self.store.get(CONNECTION_COUNT_KEY).await?.unwrap_or(0);
        let next = (current - local_count as i64).max(0);
        self.store.set(CONNECTION_COUNT_KEY, next).await?;

        tracing::info!(current, local_count, next, "关闭对账已写回全局计数");
        Ok(())
    }

    async fn publish_count(&self, count: i64) {
        if let Err(err) = self
            .bus
            .publish(CONNECTION_COUNT_UPDATED_CHANNEL, count.to_string())
            .await
        {
            tracing::warn!(error = %err, count, "在线人数广播失败，等待下一次变更重新发布");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::memory::MemoryBus;
    use crate::counter::memory::MemoryCounterStore;
    use crate::counter::MockCounterStore;

    fn service(store: &Arc<MemoryCounterStore>, bus: &Arc<MemoryBus>) -> PresenceService {
        let store: Arc<dyn CounterStore> = store.clone();
        let bus: Arc<dyn BroadcastBus> = bus.clone();
        PresenceService::new(store, bus)
    }

    #[tokio::test]
    async fn initialize_sets_missing_key_to_zero() {
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        let presence = service(&store, &bus);

        presence.initialize().await.unwrap();
        assert_eq!(store.get(CONNECTION_COUNT_KEY).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn initialize_preserves_existing_value() {
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        store.set(CONNECTION_COUNT_KEY, 5).await.unwrap();

        service(&store, &bus).initialize().await.unwrap();
        assert_eq!(store.get(CONNECTION_COUNT_KEY).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn concurrent_initialize_is_idempotent() {
        // 两个实例同时启动初始化，计数既不翻倍也不变负
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        let p = service(&store, &bus);
        let q = service(&store, &bus);

        let (a, b) = tokio::join!(p.initialize(), q.initialize());
        a.unwrap();
        b.unwrap();

        assert_eq!(store.get(CONNECTION_COUNT_KEY).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn joins_accumulate_across_instances() {
        // N 次接入后计数为 N，与会话落在哪个实例无关
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        let p = service(&store, &bus);
        let q = service(&store, &bus);

        assert_eq!(p.on_join().await.unwrap(), 1);
        assert_eq!(q.on_join().await.unwrap(), 2);
        assert_eq!(p.on_join().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn joins_and_leaves_converge_at_quiescence() {
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        let p = service(&store, &bus);
        let q = service(&store, &bus);

        p.on_join().await.unwrap();
        q.on_join().await.unwrap();
        p.on_join().await.unwrap();
        q.on_leave().await.unwrap();
        p.on_leave().await.unwrap();

        // 存活会话数 1
        assert_eq!(store.get(CONNECTION_COUNT_KEY).await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn join_publishes_new_count_on_presence_channel() {
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        let mut rx = bus
            .subscribe(&[CONNECTION_COUNT_UPDATED_CHANNEL.to_string()])
            .await
            .unwrap();

        service(&store, &bus).on_join().await.unwrap();

        let msg = rx.recv().await.unwrap();
        assert_eq!(msg.channel, CONNECTION_COUNT_UPDATED_CHANNEL);
        assert_eq!(msg.payload, "1");
    }

    #[tokio::test]
    async fn reconcile_subtracts_local_count() {
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        store.set(CONNECTION_COUNT_KEY, 10).await.unwrap();

        service(&store, &bus).reconcile_on_shutdown(3).await.unwrap();
        assert_eq!(store.get(CONNECTION_COUNT_KEY).await.unwrap(), Some(7));
    }

    #[tokio::test]
    async fn reconcile_never_goes_below_zero() {
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        store.set(CONNECTION_COUNT_KEY, 2).await.unwrap();

        service(&store, &bus).reconcile_on_shutdown(5).await.unwrap();
        assert_eq!(store.get(CONNECTION_COUNT_KEY).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn reconcile_with_zero_local_sessions_touches_nothing() {
        let store = Arc::new(MemoryCounterStore::new());
        let bus = Arc::new(MemoryBus::default());
        store.set(CONNECTION_COUNT_KEY, 4).await.unwrap();

        service(&store, &bus).reconcile_on_shutdown(0).await.unwrap();
        assert_eq!(store.get(CONNECTION_COUNT_KEY).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn join_propagates_store_failure() {
        let mut store = MockCounterStore::new();
        store
            .expect_incr()
            .returning(|_| Err(ApplicationError::counter_store("connection refused")));
        let bus: Arc<dyn BroadcastBus> = Arc::new(MemoryBus::default());
        let presence = PresenceService::new(Arc::new(store), bus);

        assert!(matches!(
            presence.on_join().await,
            Err(ApplicationError::CounterStore(_))
        ));
    }

    #[tokio::test]
    async fn publish_failure_does_not_fail_join() {
        use crate::bus::MockBroadcastBus;

        let store: Arc<dyn CounterStore> = Arc::new(MemoryCounterStore::new());
        let mut bus = MockBroadcastBus::new();
        bus.expect_publish()
            .returning(|_, _| Err(ApplicationError::bus("bus down")));
        let presence = PresenceService::new(store, Arc::new(bus));

        // 自增成功即返回成功，广播失败只是日志
        assert_eq!(presence.on_join().await.unwrap(), 1);
    }
}
