use crate::types::{
    ErrorRecord, MAX_RECONNECT_ATTEMPTS, RelayError, RelayMessage, Result, SEND_TIMEOUT,
};
use futures::SinkExt;
use futures::stream::SplitSink;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, tungstenite::Message};

/// Lifecycle state of the persistent channel. Owned by [`ConnectionManager`];
/// everything else observes it but never mutates it directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

/// Owns the persistent channel: its write half, its lifecycle state, and the
/// budget of consecutive automatic reconnection attempts.
pub struct ConnectionManager {
    ws_write: RwLock<Option<WsSink>>,
    state: RwLock<ConnectionState>,
    retry_budget: RwLock<u32>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self {
            ws_write: RwLock::new(None),
            state: RwLock::new(ConnectionState::Disconnected),
            retry_budget: RwLock::new(0),
        }
    }

    /// Sets the WebSocket write sink (called after successful connection)
    pub async fn set_writer(&self, writer: WsSink) {
        let mut ws = self.ws_write.write().await;
        *ws = Some(writer);
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, new_state: ConnectionState) {
        let mut state = self.state.write().await;
        *state = new_state;
    }

    pub async fn is_connected(&self) -> bool {
        *self.state.read().await == ConnectionState::Connected
    }

    /// Claims the `Disconnected` -> `Connecting` transition. Check and set
    /// happen under one lock, so of several racing connect attempts exactly
    /// one proceeds and opens a socket.
    pub async fn begin_connecting(&self) -> bool {
        let mut state = self.state.write().await;
        if *state != ConnectionState::Disconnected {
            return false;
        }
        *state = ConnectionState::Connecting;
        true
    }

    /// Sends a record as an `error` event over the persistent channel.
    ///
    /// "Accepted for delivery" semantics: success means the frame was handed
    /// to the socket, not that the collector acknowledged it.
    pub async fn send_record(&self, record: &ErrorRecord) -> Result<()> {
        self.send_message(RelayMessage::error(record)).await
    }

    /// Sends an envelope through the WebSocket connection.
    ///
    /// The send is bounded by [`SEND_TIMEOUT`]: a wedged socket must not hold
    /// the writer lock indefinitely, or drains and heartbeat probes behind it
    /// would stall too. Expiry counts as a send failure.
    pub async fn send_message(&self, msg: RelayMessage) -> Result<()> {
        let json = serde_json::to_string(&msg)?;
        let message = Message::Text(json.into());

        let mut ws_guard = self.ws_write.write().await;
        match ws_guard.as_mut() {
            Some(ws) => {
                match tokio::time::timeout(Duration::from_millis(SEND_TIMEOUT), ws.send(message))
                    .await
                {
                    Ok(result) => {
                        result?;
                        Ok(())
                    }
                    Err(_) => Err(RelayError::Timeout),
                }
            }
            None => Err(RelayError::NotConnected),
        }
    }

    /// Closes the WebSocket connection gracefully
    pub async fn close(&self) -> Result<()> {
        let mut ws_guard = self.ws_write.write().await;
        if let Some(ws) = ws_guard.as_mut() {
            ws.close().await?;
        }
        *ws_guard = None;

        self.set_state(ConnectionState::Disconnected).await;
        Ok(())
    }

    /// Clears the writer (used during disconnect)
    pub async fn clear_writer(&self) {
        let mut ws = self.ws_write.write().await;
        *ws = None;
    }

    /// Claims one automatic reconnection attempt. Returns the attempt number,
    /// or `None` once the cap is reached; check and increment are atomic so
    /// racing callers cannot push past the cap together.
    pub async fn try_record_attempt(&self) -> Option<u32> {
        let mut budget = self.retry_budget.write().await;
        if *budget >= MAX_RECONNECT_ATTEMPTS {
            return None;
        }
        *budget += 1;
        Some(*budget)
    }

    /// True once the automatic attempts have hit the cap. Exhaustion stops
    /// the reconnection watcher; only the heartbeat re-arms it.
    pub async fn budget_exhausted(&self) -> bool {
        *self.retry_budget.read().await >= MAX_RECONNECT_ATTEMPTS
    }

    /// Resets the budget: on any successful connection, or from the heartbeat.
    pub async fn reset_budget(&self) {
        let mut budget = self.retry_budget.write().await;
        *budget = 0;
    }

    pub async fn attempts(&self) -> u32 {
        *self.retry_budget.read().await
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ErrorRecord, RecordKind};

    #[tokio::test]
    async fn test_initial_state() {
        let connection = ConnectionManager::new();
        assert_eq!(connection.state().await, ConnectionState::Disconnected);
        assert!(!connection.is_connected().await);
        assert_eq!(connection.attempts().await, 0);
    }

    #[tokio::test]
    async fn test_begin_connecting_has_a_single_winner() {
        let connection = ConnectionManager::new();
        assert!(connection.begin_connecting().await);
        // A second claimer must lose until the state returns to Disconnected.
        assert!(!connection.begin_connecting().await);
        connection.set_state(ConnectionState::Connected).await;
        assert!(!connection.begin_connecting().await);

        connection.set_state(ConnectionState::Disconnected).await;
        assert!(connection.begin_connecting().await);
    }

    #[tokio::test]
    async fn test_send_without_writer_is_not_connected() {
        let connection = ConnectionManager::new();
        let record = ErrorRecord::new(RecordKind::ConsoleError, "oops");
        let result = connection.send_record(&record).await;
        assert!(matches!(result, Err(RelayError::NotConnected)));
    }

    #[tokio::test]
    async fn test_budget_exhausts_at_cap() {
        let connection = ConnectionManager::new();
        for attempt in 1..=MAX_RECONNECT_ATTEMPTS {
            assert!(!connection.budget_exhausted().await);
            assert_eq!(connection.try_record_attempt().await, Some(attempt));
        }
        assert!(connection.budget_exhausted().await);
        // Past the cap no further attempt can be claimed, and the counter
        // stays parked at the maximum.
        assert_eq!(connection.try_record_attempt().await, None);
        assert_eq!(connection.attempts().await, MAX_RECONNECT_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_reset_re_arms_exhausted_budget() {
        let connection = ConnectionManager::new();
        while connection.try_record_attempt().await.is_some() {}
        assert!(connection.budget_exhausted().await);

        connection.reset_budget().await;
        assert!(!connection.budget_exhausted().await);
        assert_eq!(connection.try_record_attempt().await, Some(1));
    }
}
