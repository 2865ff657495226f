use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::Session;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::state::AppState;

/// 客户端入站帧
///
/// 未识别的类型和畸形 JSON 都只记日志后忽略，连接继续存活。
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ClientFrame {
    Send { text: String },
}

/// WebSocket 连接管理器
///
/// 封装单个 WebSocket 连接的生命周期：登记会话、转发出站事件、
/// 解析入站帧，断开时注销会话。
pub struct WsConnection {
    socket: WebSocket,
    state: AppState,
}

impl WsConnection {
    pub fn new(socket: WebSocket, state: AppState) -> Self {
        Self { socket, state }
    }

    /// 运行连接主循环，返回即代表连接已终结、会话已注销。
    pub async fn run(self) {
        let Self { socket, state } = self;

        let session = Session::open(state.controller.instance_id().clone());
        let session_id = session.id;
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();

        // 升级完成和登记之间存在排水竞争，这里是第二道闸门
        if let Err(err) = state.controller.connect(session, event_tx).await {
            tracing::info!(session_id = %session_id, error = %err, "拒绝新会话，关闭连接");
            let mut socket = socket;
            let _ = socket.send(WsMessage::Close(None)).await;
            return;
        }

        tracing::info!(session_id = %session_id, "WebSocket 会话已建立");

        let (mut sender, mut incoming) = socket.split();

        // 发送任务：把控制器广播的出站事件序列化成文本帧
        let mut send_task = tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                let payload = match serde_json::to_string(&event) {
                    Ok(json) => json,
                    Err(err) => {
                        tracing::warn!(error = %err, "出站事件序列化失败，跳过");
                        continue;
                    }
                };
                if sender.send(WsMessage::Text(payload.into())).await.is_err() {
                    break;
                }
            }
        });

        // 接收任务：解析客户端帧并交给控制器
        let recv_state = state.clone();
        let mut recv_task = tokio::spawn(async move {
            while let Some(Ok(message)) = incoming.next().await {
                match message {
                    WsMessage::Text(text) => match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(ClientFrame::Send { text }) => {
                            recv_state.controller.handle_send(&text).await;
                        }
                        Err(err) => {
                            tracing::debug!(error = %err, "忽略无法解析的客户端帧");
                        }
                    },
                    WsMessage::Close(_) => break,
                    WsMessage::Ping(_) | WsMessage::Pong(_) | WsMessage::Binary(_) => {}
                }
            }
        });

        // 任意一侧结束即终结连接
        tokio::select! {
            _ = &mut send_task => recv_task.abort(),
            _ = &mut recv_task => send_task.abort(),
        }

        state.controller.disconnect(session_id).await;
        tracing::info!(session_id = %session_id, "WebSocket 会话已断开");
    }
}
