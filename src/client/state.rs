use std::time::Instant;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::connection::SessionState;
use crate::endpoint::EndpointContext;
use crate::infrastructure::TaskManager;
use crate::messaging::{MessageReconciler, SessionEvent, TypingTracker};
use crate::types::UserIdentity;

/// Timestamps of the last heartbeat sent and the last acknowledgment seen.
/// Diagnostics only; liveness enforcement lives in the heartbeat monitor.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeartbeatRecord {
    pub last_sent: Option<Instant>,
    pub last_ack: Option<Instant>,
}

impl HeartbeatRecord {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Consolidated mutable state for [`ChatClient`](super::ChatClient).
/// A single struct keeps lock ordering trivial.
pub struct ClientState {
    /// Page context the candidate list is rebuilt from each cycle
    pub context: EndpointContext,

    /// Locally authenticated user, used for echo and typing reconciliation
    pub user: UserIdentity,

    /// Connection-cycle epoch. Bumped on every room switch; any task or
    /// timer that wakes up under an older epoch must act as a no-op.
    pub epoch: u64,

    /// Background tasks owned by the current session
    pub task_manager: TaskManager,

    /// Pending delayed typing-stop send, replaced on every keystroke
    pub typing_stop: Option<JoinHandle<()>>,

    /// Whether a heartbeat is awaiting its acknowledgment
    pub heartbeat_pending: bool,

    /// Liveness diagnostics, cleared when the session closes
    pub heartbeat: HeartbeatRecord,

    /// Close code of the most recent close this cycle; `None` means no
    /// close has been recorded yet (and counts as abnormal for retry)
    pub close_code: Option<u16>,

    /// Whether the last disconnect was requested by the caller
    /// (prevents auto-reconnect)
    pub was_manual_disconnect: bool,

    /// Subscribers to the session event stream
    pub event_senders: Vec<mpsc::UnboundedSender<SessionEvent>>,

    /// Notifies the reconnect watcher of `(state, manual, epoch)` changes
    pub state_change_tx: Option<watch::Sender<(SessionState, bool, u64)>>,

    /// Optimistic-echo reconciliation for outgoing messages
    pub reconciler: MessageReconciler,

    /// Typing indicator, last-write-wins per sender
    pub typing: TypingTracker,
}

impl ClientState {
    pub fn new(context: EndpointContext, user: UserIdentity) -> Self {
        Self {
            context,
            user,
            epoch: 0,
            task_manager: TaskManager::new(),
            typing_stop: None,
            heartbeat_pending: false,
            heartbeat: HeartbeatRecord::default(),
            close_code: None,
            was_manual_disconnect: false,
            event_senders: Vec::new(),
            state_change_tx: None,
            reconciler: MessageReconciler::new(),
            typing: TypingTracker::default(),
        }
    }

    /// Registers a new subscriber to the event stream
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SessionEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.event_senders.push(tx);
        rx
    }

    /// Delivers one event to every live subscriber, dropping the dead ones
    pub fn emit(&mut self, event: SessionEvent) {
        self.event_senders
            .retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Notifies the reconnect watcher
    pub fn notify_state_change(&self, state: SessionState) {
        if let Some(tx) = &self.state_change_tx {
            if tx
                .send((state, self.was_manual_disconnect, self.epoch))
                .is_err()
            {
                tracing::debug!("state watcher gone, could not notify state: {state:?}");
            }
        }
    }
}
