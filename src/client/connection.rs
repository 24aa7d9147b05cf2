use futures::stream::SplitSink;
use futures::SinkExt;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

use crate::types::{ChatError, ClientFrame, Result};

/// Lifecycle of one logical session, owned exclusively by the
/// [`ConnectionManager`]. Transitions are driven only by transport events and
/// the reconnect policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Owns the write half of the one live transport and the session state.
pub struct ConnectionManager {
    ws_write: Arc<RwLock<Option<SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>>>>,
    state: Arc<RwLock<SessionState>>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            ws_write: Arc::new(RwLock::new(None)),
            state: Arc::new(RwLock::new(SessionState::Idle)),
        }
    }

    /// Hands over the write sink after a successful handshake
    pub async fn set_writer(
        &self,
        writer: SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>,
    ) {
        let mut ws = self.ws_write.write().await;
        *ws = Some(writer);
    }

    pub async fn state(&self) -> SessionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, new_state: SessionState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == SessionState::Open
    }

    /// Sends one JSON frame, fire-and-forget at the transport level.
    /// Fails with [`ChatError::NotConnected`] when the session is not open;
    /// the frame is not queued.
    pub async fn send_frame(&self, frame: &ClientFrame) -> Result<()> {
        if !self.is_connected().await {
            return Err(ChatError::NotConnected);
        }
        let json = serde_json::to_string(frame)?;

        let mut ws_guard = self.ws_write.write().await;
        match ws_guard.as_mut() {
            Some(ws) => {
                ws.send(Message::Text(json.into())).await?;
                Ok(())
            }
            None => Err(ChatError::NotConnected),
        }
    }

    /// Releases the underlying transport. Safe on every exit path; a second
    /// call is a no-op.
    pub async fn close(&self) -> Result<()> {
        self.set_state(SessionState::Closing).await;

        let mut ws_guard = self.ws_write.write().await;
        if let Some(ws) = ws_guard.as_mut() {
            // best effort close handshake; the peer may already be gone
            if let Err(e) = ws.close().await {
                tracing::debug!("close handshake failed: {e}");
            }
        }
        *ws_guard = None;

        self.set_state(SessionState::Closed).await;
        Ok(())
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}
