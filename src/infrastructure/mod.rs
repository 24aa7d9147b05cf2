pub mod heartbeat;
pub mod http;
pub mod task_manager;

pub use heartbeat::HeartbeatMonitor;
pub use http::{ChatApi, MessagePage, ProductSummary, RoomDirectory, RoomSummary, TokenGrant};
pub use task_manager::TaskManager;
