use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{watch, RwLock};

use super::{ChatClient, ClientState, ConnectionManager, SessionState};
use crate::endpoint::EndpointContext;
use crate::messaging::SessionEvent;
use crate::reconnect::{PolicyState, ReconnectPolicy};
use crate::types::constants::{
    MAX_RECONNECT_ATTEMPTS, RECONNECT_BASE_DELAY_MS, RECONNECT_MAX_DELAY_MS,
};
use crate::types::{ChatError, Result, UserIdentity};

/// Client configuration. Intervals are milliseconds, matching the service
/// defaults when `None`.
#[derive(Debug, Clone)]
pub struct ChatClientOptions {
    /// Locally authenticated user; drives echo/typing reconciliation and
    /// default room naming
    pub user: UserIdentity,
    pub heartbeat_interval: Option<u64>,
    pub reconnect_base_delay: Option<u64>,
    pub reconnect_max_delay: Option<u64>,
    pub max_reconnect_attempts: Option<u32>,
}

impl ChatClientOptions {
    pub fn new(user: UserIdentity) -> Self {
        Self {
            user,
            heartbeat_interval: None,
            reconnect_base_delay: None,
            reconnect_max_delay: None,
            max_reconnect_attempts: None,
        }
    }
}

/// Builder for [`ChatClient`]; validates inputs and spawns the reconnect
/// watcher.
pub struct ChatClientBuilder {
    context: EndpointContext,
    options: ChatClientOptions,
}

impl ChatClientBuilder {
    pub fn new(context: EndpointContext, options: ChatClientOptions) -> Result<Self> {
        if context.token.is_empty() {
            return Err(ChatError::Auth("chat token is required".to_string()));
        }
        Ok(Self { context, options })
    }

    /// Builds the client and spawns the reconnect watcher task.
    ///
    /// The watcher owns the [`ReconnectPolicy`]: it schedules a backoff
    /// retry after every abnormal close, resets the attempt counter on every
    /// successful open, and gives up (once) when the budget is spent. A
    /// retry that wakes up after a manual disconnect or after the epoch
    /// moved on is dropped, so a stale timer can never resurrect a session
    /// the caller has abandoned. The watcher holds only weak references and
    /// exits once the client is gone.
    pub fn build(self) -> ChatClient {
        let mut client_state = ClientState::new(self.context, self.options.user.clone());

        let (state_tx, state_rx) = watch::channel((SessionState::Idle, false, 0u64));
        client_state.state_change_tx = Some(state_tx);

        let client = ChatClient {
            options: self.options.clone(),
            connection: Arc::new(ConnectionManager::new()),
            state: Arc::new(RwLock::new(client_state)),
        };

        let mut policy = ReconnectPolicy::new(
            Duration::from_millis(
                self.options
                    .reconnect_base_delay
                    .unwrap_or(RECONNECT_BASE_DELAY_MS),
            ),
            Duration::from_millis(
                self.options
                    .reconnect_max_delay
                    .unwrap_or(RECONNECT_MAX_DELAY_MS),
            ),
            self.options
                .max_reconnect_attempts
                .unwrap_or(MAX_RECONNECT_ATTEMPTS),
        );

        let state_weak = Arc::downgrade(&client.state);
        let connection_weak = Arc::downgrade(&client.connection);
        let options = self.options;
        tokio::spawn(async move {
            let mut rx = state_rx;
            while rx.changed().await.is_ok() {
                let (state, manual, epoch) = *rx.borrow_and_update();
                match state {
                    SessionState::Open => policy.record_success(),
                    SessionState::Closed if !manual => {
                        if policy.state() == PolicyState::Exhausted {
                            continue;
                        }
                        {
                            let Some(watcher) = revive(&state_weak, &connection_weak, &options)
                            else {
                                break;
                            };
                            if watcher.last_close_was_normal().await {
                                tracing::debug!("normal close, no retry needed");
                                continue;
                            }
                        }
                        match policy.next_delay() {
                            Ok(delay) => {
                                tracing::info!(
                                    "scheduling reconnect in {delay:?} (attempt {})",
                                    policy.attempts()
                                );
                                tokio::time::sleep(delay).await;
                                let Some(watcher) = revive(&state_weak, &connection_weak, &options)
                                else {
                                    break;
                                };
                                if watcher.manual_disconnect_requested().await {
                                    tracing::debug!("client disconnected, dropping retry");
                                    continue;
                                }
                                if watcher.current_epoch().await != epoch {
                                    tracing::debug!("room switched, dropping stale reconnect");
                                    continue;
                                }
                                let current = watcher.session_state().await;
                                if current == SessionState::Open
                                    || current == SessionState::Connecting
                                {
                                    continue;
                                }
                                if let Err(e) = watcher.connect().await {
                                    tracing::error!("reconnect attempt failed: {e}");
                                }
                            }
                            Err(e) => {
                                tracing::error!("{e}");
                                let Some(watcher) = revive(&state_weak, &connection_weak, &options)
                                else {
                                    break;
                                };
                                watcher
                                    .emit_event(SessionEvent::ReconnectExhausted {
                                        attempts: policy.attempts(),
                                    })
                                    .await;
                            }
                        }
                    }
                    _ => {}
                }
            }
            tracing::debug!("reconnect watcher finished");
        });

        client
    }
}

/// Rebuilds a client handle from the watcher's weak references; `None` once
/// the client has been dropped.
fn revive(
    state: &Weak<RwLock<ClientState>>,
    connection: &Weak<ConnectionManager>,
    options: &ChatClientOptions,
) -> Option<ChatClient> {
    Some(ChatClient {
        options: options.clone(),
        connection: connection.upgrade()?,
        state: state.upgrade()?,
    })
}
