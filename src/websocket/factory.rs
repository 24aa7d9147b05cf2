use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::types::Result;

/// Creates WebSocket connections; the one place the transport is dialed.
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Opens a connection to one endpoint candidate.
    pub async fn create(url: &str) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        tracing::debug!("dialing {url}");
        let (stream, response) = connect_async(url).await?;
        tracing::debug!("handshake done, status {}", response.status());
        Ok(stream)
    }
}
