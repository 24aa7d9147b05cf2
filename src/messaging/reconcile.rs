//! Merges optimistic local echoes with server-confirmed copies and keeps
//! typing indicators flicker-free.
//!
//! Outgoing messages get a client-generated local correlation id. The server
//! broadcast carries no such id, so an echo is matched back by sender +
//! content + timestamp window and reported as the authoritative replacement
//! for the optimistic entry.

use std::collections::VecDeque;

use chrono::{DateTime, Duration, Utc};

use crate::types::constants::ECHO_MATCH_WINDOW_MS;
use crate::types::ChatMessage;

/// One locally-sent message awaiting its server echo.
#[derive(Debug, Clone)]
struct PendingEcho {
    local_id: u64,
    text: String,
    product_id: Option<i64>,
    sent_at: DateTime<Utc>,
}

/// Outcome of reconciling one inbound chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reconciliation {
    /// A genuinely new message; append it
    New,
    /// The authoritative copy of a pending local echo; replace the
    /// optimistic entry with this id
    Confirmed { local_id: u64 },
}

pub struct MessageReconciler {
    next_local_id: u64,
    window: Duration,
    pending: VecDeque<PendingEcho>,
}

impl MessageReconciler {
    pub fn new() -> Self {
        Self {
            next_local_id: 0,
            window: Duration::milliseconds(ECHO_MATCH_WINDOW_MS as i64),
            pending: VecDeque::new(),
        }
    }

    /// Registers an outgoing message and returns the local correlation id
    /// the caller renders the optimistic entry under.
    pub fn note_outgoing(&mut self, text: &str, product_id: Option<i64>) -> u64 {
        self.note_outgoing_at(text, product_id, Utc::now())
    }

    fn note_outgoing_at(&mut self, text: &str, product_id: Option<i64>, at: DateTime<Utc>) -> u64 {
        self.next_local_id += 1;
        self.pending.push_back(PendingEcho {
            local_id: self.next_local_id,
            text: text.to_string(),
            product_id,
            sent_at: at,
        });
        self.next_local_id
    }

    /// Classifies one inbound broadcast against the pending echoes.
    pub fn observe_inbound(&mut self, msg: &ChatMessage, local_user_id: i64) -> Reconciliation {
        self.observe_inbound_at(msg, local_user_id, Utc::now())
    }

    fn observe_inbound_at(
        &mut self,
        msg: &ChatMessage,
        local_user_id: i64,
        now: DateTime<Utc>,
    ) -> Reconciliation {
        self.prune(now);

        if msg.user_id != local_user_id {
            return Reconciliation::New;
        }

        let msg_time = msg.created_at.map(|t| t.0).unwrap_or(now);
        let window = self.window;
        let position = self.pending.iter().position(|echo| {
            echo.text == msg.message
                && echo.product_id == msg.product_id
                && (msg_time - echo.sent_at).abs() <= window
        });

        match position.and_then(|index| self.pending.remove(index)) {
            Some(echo) => Reconciliation::Confirmed {
                local_id: echo.local_id,
            },
            // Own sender but no pending match: authoritative copy from
            // another tab/session of the same user
            None => Reconciliation::New,
        }
    }

    fn prune(&mut self, now: DateTime<Utc>) {
        let window = self.window;
        self.pending.retain(|echo| now - echo.sent_at <= window);
    }

    /// Drops one pending echo, e.g. when its send failed.
    pub fn forget(&mut self, local_id: u64) {
        self.pending.retain(|echo| echo.local_id != local_id);
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drops all pending echoes, e.g. when switching rooms.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

impl Default for MessageReconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// Transient typing state, last-write-wins per sender.
#[derive(Debug, Default)]
pub struct TypingTracker {
    active: Option<String>,
}

/// A change the view should apply to the typing indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypingChange {
    Shown { user_name: String },
    Hidden { user_name: String },
}

impl TypingTracker {
    /// Applies one inbound typing frame. Returns `None` when the displayed
    /// indicator does not change, which is what suppresses flicker from
    /// repeated `typing=true` frames.
    pub fn update(
        &mut self,
        user_name: &str,
        is_typing: bool,
        local_user_name: &str,
    ) -> Option<TypingChange> {
        if user_name == local_user_name {
            return None;
        }
        if is_typing {
            if self.active.as_deref() == Some(user_name) {
                return None;
            }
            self.active = Some(user_name.to_string());
            Some(TypingChange::Shown {
                user_name: user_name.to_string(),
            })
        } else if self.active.as_deref() == Some(user_name) {
            self.active = None;
            Some(TypingChange::Hidden {
                user_name: user_name.to_string(),
            })
        } else {
            None
        }
    }

    /// Clears the indicator, e.g. when the session closes or the room changes.
    pub fn reset(&mut self) -> Option<TypingChange> {
        self.active.take().map(|user_name| TypingChange::Hidden { user_name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn inbound(user_id: i64, text: &str, at: DateTime<Utc>) -> ChatMessage {
        ChatMessage {
            id: Some(1),
            message: text.to_string(),
            sender_type: None,
            user_id,
            user_name: "Budi".to_string(),
            user_email: None,
            product_id: None,
            created_at: Some(Timestamp(at)),
        }
    }

    #[test]
    fn test_echo_confirms_pending_entry() {
        let mut reconciler = MessageReconciler::new();
        let now = Utc::now();
        let local_id = reconciler.note_outgoing_at("halo", None, now);

        let result = reconciler.observe_inbound_at(&inbound(42, "halo", now), 42, now);
        assert_eq!(result, Reconciliation::Confirmed { local_id });
        assert_eq!(reconciler.pending_len(), 0);
    }

    #[test]
    fn test_second_identical_echo_is_new_not_double_confirmed() {
        let mut reconciler = MessageReconciler::new();
        let now = Utc::now();
        reconciler.note_outgoing_at("halo", None, now);

        let msg = inbound(42, "halo", now);
        assert!(matches!(
            reconciler.observe_inbound_at(&msg, 42, now),
            Reconciliation::Confirmed { .. }
        ));
        // same user sent the same text from another tab
        assert_eq!(reconciler.observe_inbound_at(&msg, 42, now), Reconciliation::New);
    }

    #[test]
    fn test_forgotten_echo_no_longer_matches() {
        let mut reconciler = MessageReconciler::new();
        let now = Utc::now();
        let local_id = reconciler.note_outgoing_at("halo", None, now);

        reconciler.forget(local_id);
        assert_eq!(reconciler.pending_len(), 0);
        assert_eq!(
            reconciler.observe_inbound_at(&inbound(42, "halo", now), 42, now),
            Reconciliation::New
        );
    }

    #[test]
    fn test_other_senders_never_match() {
        let mut reconciler = MessageReconciler::new();
        let now = Utc::now();
        reconciler.note_outgoing_at("halo", None, now);

        let result = reconciler.observe_inbound_at(&inbound(7, "halo", now), 42, now);
        assert_eq!(result, Reconciliation::New);
        assert_eq!(reconciler.pending_len(), 1);
    }

    #[test]
    fn test_stale_echo_outside_window_is_new() {
        let mut reconciler = MessageReconciler::new();
        let sent = Utc::now();
        reconciler.note_outgoing_at("halo", None, sent);

        let later = sent + Duration::seconds(120);
        let result = reconciler.observe_inbound_at(&inbound(42, "halo", later), 42, later);
        assert_eq!(result, Reconciliation::New);
        // pruned, not left behind
        assert_eq!(reconciler.pending_len(), 0);
    }

    #[test]
    fn test_product_reference_is_part_of_the_match() {
        let mut reconciler = MessageReconciler::new();
        let now = Utc::now();
        reconciler.note_outgoing_at("lihat ini", Some(7), now);

        let mut msg = inbound(42, "lihat ini", now);
        assert_eq!(reconciler.observe_inbound_at(&msg, 42, now), Reconciliation::New);

        msg.product_id = Some(7);
        assert!(matches!(
            reconciler.observe_inbound_at(&msg, 42, now),
            Reconciliation::Confirmed { .. }
        ));
    }

    #[test]
    fn test_typing_show_then_hide_without_flicker() {
        let mut typing = TypingTracker::default();
        assert_eq!(
            typing.update("A", true, "me"),
            Some(TypingChange::Shown {
                user_name: "A".to_string()
            })
        );
        // repeated true frames are deduplicated
        assert_eq!(typing.update("A", true, "me"), None);
        assert_eq!(
            typing.update("A", false, "me"),
            Some(TypingChange::Hidden {
                user_name: "A".to_string()
            })
        );
        assert_eq!(typing.update("A", false, "me"), None);
    }

    #[test]
    fn test_typing_last_write_wins_across_senders() {
        let mut typing = TypingTracker::default();
        typing.update("A", true, "me");
        assert_eq!(
            typing.update("B", true, "me"),
            Some(TypingChange::Shown {
                user_name: "B".to_string()
            })
        );
        // stale stop for the replaced sender is a no-op
        assert_eq!(typing.update("A", false, "me"), None);
    }

    #[test]
    fn test_own_typing_is_suppressed() {
        let mut typing = TypingTracker::default();
        assert_eq!(typing.update("me", true, "me"), None);
    }

    #[test]
    fn test_reset_clears_active_indicator() {
        let mut typing = TypingTracker::default();
        typing.update("A", true, "me");
        assert_eq!(
            typing.reset(),
            Some(TypingChange::Hidden {
                user_name: "A".to_string()
            })
        );
        assert_eq!(typing.reset(), None);
    }
}
