use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use application::bus::memory::MemoryBus;
use application::counter::memory::MemoryCounterStore;
use application::{
    BroadcastBus, CounterStore, MessageRelay, PresenceService, SessionController, SessionRegistry,
};
use domain::InstanceId;
use futures_util::StreamExt;
use tokio::{net::TcpListener, sync::oneshot, time::sleep, time::timeout};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use web_api::{router, AppState};

pub type WsClient = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// 一个跑在随机端口上的中继实例
pub struct TestInstance {
    pub addr: SocketAddr,
    pub controller: Arc<SessionController>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestInstance {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

impl Drop for TestInstance {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// 在共享的存储和总线上启动一个实例，模拟水平扩容的一台机器
pub async fn spawn_instance(
    store: &Arc<MemoryCounterStore>,
    bus: &Arc<MemoryBus>,
    instance_name: &str,
) -> TestInstance {
    let store: Arc<dyn CounterStore> = store.clone();
    let bus: Arc<dyn BroadcastBus> = bus.clone();
    let instance_id = InstanceId::new(instance_name).expect("instance id");

    let controller = Arc::new(SessionController::new(
        instance_id.clone(),
        Arc::new(SessionRegistry::new()),
        Arc::new(PresenceService::new(store, Arc::clone(&bus))),
        Arc::new(MessageRelay::new(bus, instance_id)),
    ));
    controller.start().await.expect("controller start");

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let app = router(AppState::new(Arc::clone(&controller), addr.port()));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // 等待服务器启动
    sleep(Duration::from_millis(100)).await;

    TestInstance {
        addr,
        controller,
        shutdown: Some(shutdown_tx),
    }
}

pub async fn connect_ws(instance: &TestInstance) -> WsClient {
    let (ws, _) = connect_async(instance.ws_url()).await.expect("ws connect");
    ws
}

/// 读取下一条文本帧并解析成 JSON，两秒内没有就算失败
pub async fn next_json(ws: &mut WsClient) -> serde_json::Value {
    loop {
        let msg = timeout(Duration::from_secs(2), ws.next())
            .await
            .expect("等待帧超时")
            .expect("连接已关闭")
            .expect("读取帧失败");
        if let Message::Text(text) = msg {
            return serde_json::from_str(&text).expect("帧不是合法 JSON");
        }
    }
}
