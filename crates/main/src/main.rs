//! 主应用程序入口
//!
//! 连接 Redis，装配应用层服务并启动 Axum Web API 服务。

use std::sync::Arc;
use std::time::Duration;

use application::{
    BroadcastBus, CounterStore, MessageRelay, PresenceService, SessionController, SessionRegistry,
};
use config::AppConfig;
use domain::InstanceId;
use infrastructure::{RedisBus, RedisCounterStore};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // 读取环境变量配置
    let config = AppConfig::from_env_with_defaults();
    config.validate()?;

    tracing::info!(
        redis_url = %config.redis.url,
        port = config.server.port,
        "正在连接 Redis"
    );

    // Redis 不可达时直接失败，实例不应在没有共享存储的情况下上线
    let client = redis::Client::open(config.redis.url.as_str())?;
    let manager = client.get_connection_manager().await?;

    // 装配应用层
    let store: Arc<dyn CounterStore> = Arc::new(RedisCounterStore::new(manager.clone()));
    let bus: Arc<dyn BroadcastBus> = Arc::new(RedisBus::new(
        client,
        manager,
        config.redis.reconnect_interval_ms,
        config.redis.max_reconnect_attempts,
    ));

    // 实例身份取监听端口，同一台机器上的多个实例由端口区分
    let instance_id = InstanceId::new(config.server.port.to_string())
        .map_err(|e| anyhow::anyhow!("实例标识无效: {e}"))?;

    let controller = Arc::new(SessionController::new(
        instance_id.clone(),
        Arc::new(SessionRegistry::new()),
        Arc::new(PresenceService::new(store, Arc::clone(&bus))),
        Arc::new(MessageRelay::new(bus, instance_id)),
    ));
    controller.start().await?;

    // 启动 Web 服务器
    let app = router(AppState::new(Arc::clone(&controller), config.server.port));
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("聊天中继服务器启动在 http://{}", addr);

    let grace = Duration::from_millis(config.shutdown.grace_period_ms);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 监听端已停，进入排水并对账全局计数
    controller.shutdown(grace).await;
    tracing::info!("聊天中继服务器已退出");

    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "监听 Ctrl+C 失败");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "监听 SIGTERM 失败");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("收到关闭信号，开始优雅关闭");
}
