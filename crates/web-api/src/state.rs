use std::sync::Arc;

use application::SessionController;

#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<SessionController>,
    /// 实例对外监听的端口，健康检查会回显它
    pub port: u16,
}

impl AppState {
    pub fn new(controller: Arc<SessionController>, port: u16) -> Self {
        Self { controller, port }
    }
}
