//! Web API 层。
//!
//! 提供 Axum 路由，把 HTTP 健康检查和 WebSocket 会话委托给
//! 应用层的会话控制器。

mod error;
mod routes;
mod state;
mod ws_connection;

pub use routes::router;
pub use state::AppState;
