use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use tokio::time;

use crate::client::{ClientState, ConnectionManager, SessionState};
use crate::messaging::SessionEvent;
use crate::types::constants::{HEARTBEAT_INTERVAL_MS, WS_CLOSE_ABNORMAL};
use crate::types::ClientFrame;

/// Periodic liveness signal while the session is open.
///
/// Sends `{type: "heartbeat"}` every interval and records send/ack
/// timestamps. A heartbeat still pending when the next tick fires means the
/// transport died silently; the monitor force-closes it so the normal
/// close/reconnect path takes over.
pub struct HeartbeatMonitor {
    interval: Duration,
    connection: Weak<ConnectionManager>,
    state: Arc<RwLock<ClientState>>,
    epoch: u64,
}

impl HeartbeatMonitor {
    pub fn new(
        connection: Weak<ConnectionManager>,
        state: Arc<RwLock<ClientState>>,
        epoch: u64,
    ) -> Self {
        Self {
            interval: Duration::from_millis(HEARTBEAT_INTERVAL_MS),
            connection,
            state,
            epoch,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Registers the monitor loop on the session's task manager so it is
    /// cancelled together with the session.
    pub async fn spawn(self) {
        let state = Arc::clone(&self.state);
        let task = self.run();
        state.write().await.task_manager.spawn(task);
    }

    async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
        // the first tick of `interval` completes immediately; wait a full
        // period before the first heartbeat
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let Some(connection) = self.connection.upgrade() else {
                break; // client dropped
            };

            // stale timer from a replaced session must be a no-op
            if self.state.read().await.epoch != self.epoch {
                break;
            }

            if !connection.is_connected().await {
                continue;
            }

            let timed_out = self.state.read().await.heartbeat_pending;
            if timed_out {
                tracing::warn!("heartbeat unacknowledged, closing silently-dead session");
                if let Err(e) = connection.close().await {
                    tracing::debug!("close after heartbeat timeout failed: {e}");
                }
                let mut state = self.state.write().await;
                state.heartbeat_pending = false;
                state.heartbeat.clear();
                state.close_code = Some(WS_CLOSE_ABNORMAL);
                state.emit(SessionEvent::Closed {
                    code: WS_CLOSE_ABNORMAL,
                    reason: "heartbeat timeout".to_string(),
                });
                state.notify_state_change(SessionState::Closed);
                continue;
            }

            match connection.send_frame(&ClientFrame::Heartbeat).await {
                Ok(()) => {
                    let mut state = self.state.write().await;
                    state.heartbeat_pending = true;
                    state.heartbeat.last_sent = Some(Instant::now());
                    tracing::debug!("heartbeat sent");
                }
                Err(e) => {
                    tracing::error!("failed to send heartbeat: {e}");
                }
            }
        }
    }
}
