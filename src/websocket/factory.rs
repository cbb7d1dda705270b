use crate::types::Result;
use tokio::net::TcpStream;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

/// Creates WebSocket connections to the collector.
pub struct WebSocketFactory;

impl WebSocketFactory {
    /// Opens a WebSocket connection and returns the raw stream.
    pub async fn create(url: &str) -> Result<WebSocketStream<MaybeTlsStream<TcpStream>>> {
        tracing::debug!("Opening WebSocket connection to {}", url);
        let (ws_stream, _response) = connect_async(url).await?;
        Ok(ws_stream)
    }
}
