//! # ShopChat Realtime
//!
//! A resilient realtime client for the ShopChat support service: ordered
//! endpoint fallback, exponential-backoff reconnection, heartbeat liveness
//! and optimistic message reconciliation over a JSON WebSocket protocol.
//!
//! ## Example
//!
//! ```no_run
//! use shopchat_realtime_rs::{
//!     ChatClient, ChatClientOptions, EndpointContext, UserIdentity, UserRole,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let user = UserIdentity {
//!         id: 42,
//!         name: "Budi".to_string(),
//!         email: None,
//!         role: UserRole::Buyer,
//!     };
//!     let context = EndpointContext::new(true, "shop.example.com", &user.default_room(), "token");
//!
//!     let client = ChatClient::new(context, ChatClientOptions::new(user))?;
//!     let mut events = client.subscribe().await;
//!     client.connect().await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{event:?}");
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod endpoint;
pub mod infrastructure;
pub mod messaging;
pub mod reconnect;
pub mod types;
pub mod websocket;

pub use client::{ChatClient, ChatClientBuilder, ChatClientOptions, SessionState};
pub use endpoint::EndpointContext;
pub use infrastructure::{ChatApi, HeartbeatMonitor};
pub use messaging::SessionEvent;
pub use reconnect::ReconnectPolicy;
pub use types::{ChatError, ChatMessage, Result, UserIdentity, UserRole};
