use crate::types::ChatMessage;

/// Everything a session reports to its subscribers, lifecycle and data alike.
/// The view layer renders from this stream; the core never touches the DOM
/// equivalent.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// A candidate connection attempt is starting (1-based attempt number
    /// within the current cycle)
    Connecting { endpoint: String, attempt: usize },

    /// The session is open. `attempts` is how many candidates were tried in
    /// this cycle, including the successful one.
    Open { endpoint: String, attempts: usize },

    /// Server-side welcome after the transport opened
    Established { message: Option<String> },

    /// A new inbound chat message to append
    Message(ChatMessage),

    /// The authoritative copy of a message this client sent optimistically;
    /// replaces the entry rendered under `local_id`
    MessageConfirmed { local_id: u64, message: ChatMessage },

    /// The typing indicator changed; deduplicated, last-write-wins
    TypingChanged { user_name: String, is_typing: bool },

    /// Application-level error frame from the server
    ServerError { message: String },

    /// Transport-level failure, already converted from the underlying error
    TransportError { detail: String },

    /// The session closed. After a manual `disconnect()` this is the last
    /// event the session ever emits.
    Closed { code: u16, reason: String },

    /// The reconnect policy gave up; a manual restart is required
    ReconnectExhausted { attempts: u32 },
}
