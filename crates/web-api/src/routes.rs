use axum::{
    extract::{ws::WebSocketUpgrade, State},
    response::Response,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use crate::{error::ApiError, state::AppState, ws_connection::WsConnection};

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    port: u16,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthcheck", get(healthcheck))
        .route("/ws", get(websocket_upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthcheck(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        port: state.port,
    })
}

/// WebSocket 升级入口。排水中的实例在握手阶段就拒绝，
/// 客户端可以立即改连其他实例。
async fn websocket_upgrade(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    if state.controller.is_draining() {
        return Err(ApiError::service_unavailable("实例正在关闭，不再接受新连接"));
    }
    Ok(ws.on_upgrade(move |socket| async move {
        WsConnection::new(socket, state).run().await;
    }))
}
