mod builder;
mod connection;
mod core;
mod state;

pub use builder::{ChatClientBuilder, ChatClientOptions};
pub use connection::{ConnectionManager, SessionState};
pub use core::ChatClient;
pub use state::{ClientState, HeartbeatRecord};
