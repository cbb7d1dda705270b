use thiserror::Error;

/// Errors that can occur inside the relay pipeline.
///
/// None of these ever reach the host application through `report()`; they are
/// handled by the queue/retry/fallback machinery and surface only through the
/// explicit `connect()`/`disconnect()` calls and logs.
#[derive(Error, Debug)]
pub enum RelayError {
    /// WebSocket protocol error (connection failed, invalid frame, etc.)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// General connection error with descriptive message
    #[error("Connection error: {0}")]
    Connection(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP request error (fallback delivery path)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error (malformed collector endpoint)
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    /// Attempted a channel send while not connected
    #[error("Not connected")]
    NotConnected,

    /// A channel send did not complete within the send timeout
    #[error("Timeout error")]
    Timeout,
}

/// Convenience type alias for `Result<T, RelayError>`.
pub type Result<T> = std::result::Result<T, RelayError>;
