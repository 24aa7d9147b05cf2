use std::sync::Arc;
use std::time::Instant;

use tokio::sync::RwLock;

use super::reconcile::{Reconciliation, TypingChange};
use super::SessionEvent;
use crate::client::ClientState;
use crate::types::ServerFrame;

/// Routes decoded inbound frames into session events, running the echo and
/// typing reconciliation on the way.
pub struct MessageRouter {
    state: Arc<RwLock<ClientState>>,
}

impl MessageRouter {
    pub fn new(state: Arc<RwLock<ClientState>>) -> Self {
        Self { state }
    }

    pub async fn route(&self, frame: ServerFrame) {
        match frame {
            ServerFrame::ConnectionEstablished { message } => {
                tracing::debug!("server acknowledged connection");
                self.state
                    .write()
                    .await
                    .emit(SessionEvent::Established { message });
            }
            ServerFrame::ChatMessage(msg) => {
                let mut state = self.state.write().await;
                let local_user_id = state.user.id;
                match state.reconciler.observe_inbound(&msg, local_user_id) {
                    Reconciliation::Confirmed { local_id } => {
                        tracing::debug!(local_id, "server confirmed local echo");
                        state.emit(SessionEvent::MessageConfirmed {
                            local_id,
                            message: msg,
                        });
                    }
                    Reconciliation::New => state.emit(SessionEvent::Message(msg)),
                }
            }
            ServerFrame::TypingIndicator {
                user_name,
                is_typing,
            } => {
                let mut state = self.state.write().await;
                let local_name = state.user.name.clone();
                if let Some(change) = state.typing.update(&user_name, is_typing, &local_name) {
                    let event = match change {
                        TypingChange::Shown { user_name } => SessionEvent::TypingChanged {
                            user_name,
                            is_typing: true,
                        },
                        TypingChange::Hidden { user_name } => SessionEvent::TypingChanged {
                            user_name,
                            is_typing: false,
                        },
                    };
                    state.emit(event);
                }
            }
            ServerFrame::HeartbeatAck => {
                let mut state = self.state.write().await;
                state.heartbeat_pending = false;
                state.heartbeat.last_ack = Some(Instant::now());
                tracing::debug!("heartbeat acknowledged");
            }
            ServerFrame::Error { message } => {
                tracing::warn!("server error frame: {message}");
                self.state
                    .write()
                    .await
                    .emit(SessionEvent::ServerError { message });
            }
        }
    }
}
