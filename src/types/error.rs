use thiserror::Error;

/// Errors that can occur when using the chat realtime client.
#[derive(Error, Debug)]
pub enum ChatError {
    /// WebSocket protocol error (handshake failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A single endpoint candidate could not be reached; the next one is tried
    #[error("endpoint unreachable: {endpoint}")]
    EndpointUnreachable { endpoint: String },

    /// Every endpoint candidate in the cycle failed. The session is over;
    /// only the reconnect policy may start a new cycle.
    #[error("all {attempts} endpoint candidates failed")]
    AllEndpointsFailed { attempts: usize },

    /// Attempted to send while the session is not open. The message is not
    /// queued.
    #[error("not connected")]
    NotConnected,

    /// The reconnect policy ran out of attempts. Terminal until the caller
    /// restarts the session manually.
    #[error("gave up reconnecting after {attempts} attempts")]
    MaxRetriesExceeded { attempts: u32 },

    /// Inbound frame was invalid JSON or missed required fields. The frame is
    /// dropped; the session stays up.
    #[error("malformed inbound payload: {0}")]
    MalformedPayload(String),

    /// JSON serialization/deserialization error on the outbound path
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error (REST collaborators)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// REST collaborator answered with a non-success status
    #[error("API error: {0}")]
    Api(String),

    /// URL parsing error (malformed endpoint candidate)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Authentication or authorization error
    #[error("authentication error: {0}")]
    Auth(String),
}

/// Convenience type alias for `Result<T, ChatError>`.
pub type Result<T> = std::result::Result<T, ChatError>;
