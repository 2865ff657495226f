//! 应用层实现。
//!
//! 这里提供分布式聊天中继的核心：本地会话登记、跨实例的在线
//! 计数协议、消息中继，以及把三者粘合起来的会话生命周期控制器。
//! 对外部协作方（共享计数存储、广播总线）只依赖抽象端口。

pub mod bus;
pub mod channels;
pub mod controller;
pub mod counter;
pub mod error;
pub mod events;
pub mod presence;
pub mod registry;
pub mod relay;

pub use bus::{BroadcastBus, BusMessage};
pub use channels::{CONNECTION_COUNT_KEY, CONNECTION_COUNT_UPDATED_CHANNEL, NEW_MESSAGE_CHANNEL};
pub use controller::SessionController;
pub use counter::CounterStore;
pub use error::ApplicationError;
pub use events::OutboundEvent;
pub use presence::PresenceService;
pub use registry::{OutboundSender, SessionRegistry};
pub use relay::MessageRelay;
