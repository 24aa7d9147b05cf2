pub mod constants;
pub mod error;
pub mod identity;
pub mod message;

pub use constants::*;
pub use error::{ChatError, Result};
pub use identity::{UserIdentity, UserRole};
pub use message::{ChatMessage, ClientFrame, SenderType, ServerFrame, Timestamp};
