use super::{ConnectionManager, ConnectionState, ErrorRelayBuilder, ErrorRelayOptions, RelayState};
use crate::delivery::{DeliveryQueue, TransportSelector};
use crate::types::{ErrorRecord, MAX_RECONNECT_ATTEMPTS, RelayEvent, RelayMessage, Result};
use crate::websocket::WebSocketFactory;
use futures::stream::StreamExt;
use std::sync::Arc;
use tokio::sync::{Notify, RwLock};

/// The capture-and-delivery pipeline.
///
/// `ErrorRelay` owns the bounded delivery queue, the persistent WebSocket
/// channel to the collector, the reconnection state machine, and the HTTP
/// fallback. It is an explicitly constructed object: the host application
/// builds one instance and hands it (or a [`Reporter`](crate::capture::Reporter)
/// wrapping it) to its capture glue; there is no ambient global state.
///
/// # Example
///
/// ```no_run
/// use error_relay::{ErrorRelay, ErrorRelayOptions, ErrorRecord, RecordKind};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let relay = ErrorRelay::new("http://collector.local:3000", ErrorRelayOptions::default())?;
/// relay.connect().await?;
///
/// relay.report(ErrorRecord::new(RecordKind::ConsoleError, "boom"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ErrorRelay {
    pub(crate) endpoint: String,
    pub(crate) options: ErrorRelayOptions,

    pub(crate) connection: Arc<ConnectionManager>,
    pub(crate) queue: Arc<DeliveryQueue>,
    pub(crate) selector: Arc<TransportSelector>,

    // Consolidated mutable state
    pub(crate) state: Arc<RwLock<RelayState>>,

    // Ingress: report() enqueues directly, then wakes the pump task
    pub(crate) wake: Arc<Notify>,
}

impl ErrorRelay {
    /// Creates the pipeline and spawns its background tasks (pump,
    /// reconnection watcher, heartbeat). Does not connect; call
    /// [`connect()`](Self::connect), or just start reporting and let the
    /// lazy connect kick in.
    ///
    /// `endpoint` is the collector origin, `http(s)://` or `ws(s)://`.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::UrlParse`] if the endpoint is malformed.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime: the background tasks are
    /// spawned here. Construct the relay inside `#[tokio::main]` or from
    /// within a running runtime.
    pub fn new(endpoint: impl Into<String>, options: ErrorRelayOptions) -> Result<Self> {
        ErrorRelayBuilder::new(endpoint, options).map(|builder| builder.build())
    }

    /// Hands one record to the pipeline. Never blocks, never fails: the
    /// record enters the bounded queue synchronously (evicting the oldest
    /// when full) and the pump task is woken to move it. Safe to call from
    /// inside failure paths, including the panic hook.
    pub fn report(&self, record: ErrorRecord) {
        self.queue.enqueue(record);
        self.wake.notify_one();
    }

    /// Set connection state and notify the reconnection watcher
    pub(crate) async fn set_state(&self, new_state: ConnectionState) {
        self.connection.set_state(new_state).await;

        let state = self.state.read().await;
        state.notify_state_change(new_state, state.was_manual_disconnect);
    }

    /// Set manual disconnect flag and notify watchers
    async fn set_manual_disconnect(&self, manual: bool) {
        let mut state = self.state.write().await;
        state.was_manual_disconnect = manual;

        let conn_state = self.connection.state().await;
        state.notify_state_change(conn_state, manual);
    }

    pub(crate) async fn was_manual_disconnect(&self) -> bool {
        self.state.read().await.was_manual_disconnect
    }

    /// One reconnection attempt against the retry budget. Called by the
    /// watcher after the reconnect delay and by the pump task for lazy
    /// channel creation; the heartbeat resets the budget before calling it.
    pub async fn try_reconnect(&self) -> Result<()> {
        if self.was_manual_disconnect().await {
            tracing::info!("Manual disconnect, will not attempt to reconnect");
            return Ok(());
        }
        {
            let state = self.connection.state().await;
            if state == ConnectionState::Connected || state == ConnectionState::Connecting {
                return Ok(());
            }
        }

        let Some(attempt) = self.connection.try_record_attempt().await else {
            tracing::warn!(
                "Reconnection budget exhausted after {} attempts, waiting for heartbeat",
                MAX_RECONNECT_ATTEMPTS
            );
            return Ok(());
        };

        tracing::info!(
            "Reconnection attempt {}/{}",
            attempt,
            MAX_RECONNECT_ATTEMPTS
        );
        match self.connect().await {
            Ok(_) => tracing::info!("Reconnected successfully"),
            Err(e) => tracing::error!("Reconnection attempt failed: {}", e),
        }
        Ok(())
    }

    /// Establishes the persistent channel to the collector.
    ///
    /// On success the retry budget is reset and every queued record is
    /// drained in enqueue order. On failure the state returns to
    /// `Disconnected`, which schedules the next automatic attempt.
    /// Returns immediately if already connected or connecting.
    pub async fn connect(&self) -> Result<()> {
        // Single winner: only the caller that claims Disconnected ->
        // Connecting proceeds, so racing reconnect paths cannot open two
        // sockets.
        if !self.connection.begin_connecting().await {
            return Ok(());
        }
        self.set_state(ConnectionState::Connecting).await;

        // A read task left over from a previous connection would treat its
        // socket's eventual error as a live disconnect and tear down the new
        // channel. Stale tasks die before the new socket opens.
        {
            let mut state = self.state.write().await;
            state.task_manager.abort_all();
        }

        let url = self.channel_endpoint();
        tracing::info!("Connecting to {}", url);

        let ws_stream = match WebSocketFactory::create(&url).await {
            Ok(stream) => stream,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected).await;
                return Err(e);
            }
        };
        let (write_half, mut read_half) = ws_stream.split();

        self.connection.set_writer(write_half).await;

        // Read task: the channel's disconnect signal comes from here.
        let self_cloned = self.clone();
        {
            let mut state = self.state.write().await;
            state.task_manager.spawn(async move {
                tracing::debug!("Starting read task");
                while let Some(msg_result) = read_half.next().await {
                    match msg_result {
                        Ok(msg) => {
                            use tokio_tungstenite::tungstenite::Message;

                            match msg {
                                Message::Text(text) => {
                                    match serde_json::from_str::<RelayMessage>(&text) {
                                        Ok(reply) => self_cloned.handle_reply(reply),
                                        Err(e) => {
                                            tracing::debug!(
                                                "Ignoring unparseable collector message: {} - Raw: {}",
                                                e,
                                                text
                                            );
                                        }
                                    }
                                }
                                Message::Close(frame) => {
                                    if let Some(close_frame) = frame {
                                        tracing::warn!(
                                            "Collector closed connection: code={:?}, reason='{}'",
                                            close_frame.code,
                                            close_frame.reason
                                        );
                                    } else {
                                        tracing::warn!(
                                            "Collector closed connection without close frame"
                                        );
                                    }
                                    self_cloned.connection.clear_writer().await;
                                    self_cloned.set_state(ConnectionState::Disconnected).await;
                                    break;
                                }
                                Message::Ping(data) => {
                                    tracing::debug!("Received ping ({} bytes)", data.len());
                                }
                                Message::Pong(data) => {
                                    tracing::debug!("Received pong ({} bytes)", data.len());
                                }
                                Message::Binary(data) => {
                                    tracing::warn!(
                                        "Received unexpected binary message ({} bytes)",
                                        data.len()
                                    );
                                }
                                Message::Frame(_) => {
                                    tracing::debug!("Received raw frame (internal)");
                                }
                            }
                        }
                        Err(e) => {
                            tracing::error!("WebSocket read error: {}", e);
                            self_cloned.connection.clear_writer().await;
                            self_cloned.set_state(ConnectionState::Disconnected).await;
                            break;
                        }
                    }
                }
                tracing::debug!("Read task finished");
            });
        }

        self.set_manual_disconnect(false).await;
        self.connection.reset_budget().await;
        self.set_state(ConnectionState::Connected).await;
        tracing::info!("Connected to collector");

        // Wake-on-connect: everything queued while offline goes out now,
        // in enqueue order.
        let sent = self.selector.drain_channel().await;
        if sent > 0 {
            tracing::info!("Drained {} queued records after connect", sent);
        }

        Ok(())
    }

    fn handle_reply(&self, reply: RelayMessage) {
        match reply.event {
            RelayEvent::Ack => tracing::debug!("Collector ack: {}", reply.payload),
            RelayEvent::Heartbeat => tracing::debug!("Heartbeat reply"),
            RelayEvent::Error => {
                tracing::debug!("Ignoring unexpected error event from collector")
            }
        }
    }

    /// Tears the persistent channel down on the host's request.
    ///
    /// Marks the disconnect as manual (suppressing automatic reconnection
    /// and the heartbeat re-arm), aborts the read task, closes the socket,
    /// and re-routes any still-pending records through the HTTP fallback.
    pub async fn disconnect(&self) -> Result<()> {
        {
            // Already down with nothing pending: nothing to tear down or
            // flush. Otherwise proceed, so records queued while the channel
            // was down still leave through the fallback.
            let state = self.connection.state().await;
            if state == ConnectionState::Disconnected && self.queue.is_empty() {
                return Ok(());
            }
        }

        self.set_manual_disconnect(true).await;
        tracing::info!("Disconnecting from collector");

        {
            let mut state = self.state.write().await;
            state.task_manager.abort_all();
        }

        self.connection.close().await?;

        // Transport switch: pending records leave through the fallback.
        self.selector.flush_via_fallback().await;

        tracing::info!("Disconnected from collector");
        Ok(())
    }

    /// Whether the persistent channel is currently up.
    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    /// Number of records waiting for delivery.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub(crate) async fn send_heartbeat(&self) -> Result<()> {
        self.connection.send_message(RelayMessage::heartbeat()).await
    }

    /// WebSocket form of the configured collector endpoint.
    fn channel_endpoint(&self) -> String {
        crate::infrastructure::http_to_ws_endpoint(&self.endpoint)
    }

    /// HTTP origin of the configured collector endpoint.
    pub fn http_endpoint(&self) -> String {
        crate::infrastructure::ws_to_http_endpoint(&self.endpoint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RecordKind;
    use std::time::Duration;
    use tokio::net::TcpListener;

    /// Binds and immediately drops a listener, yielding an endpoint that
    /// refuses connections for the rest of the test.
    async fn dead_endpoint() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("local addr");
        drop(listener);
        format!("http://{}", addr)
    }

    async fn wait_until<F, Fut>(what: &str, mut check: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..300 {
            if check().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("timed out waiting for {}", what);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_automatic_reconnects_stop_at_budget_and_heartbeat_re_arms() {
        let endpoint = dead_endpoint().await;
        let relay = ErrorRelay::new(
            &endpoint,
            ErrorRelayOptions {
                reconnect_delay: Some(20),
                heartbeat_interval: Some(800),
                ..Default::default()
            },
        )
        .expect("build relay");

        // First dispatch triggers the lazy reconnect; every attempt fails.
        relay.report(ErrorRecord::new(RecordKind::ConsoleError, "offline"));

        // Automatic attempts climb to the cap and stay there.
        wait_until("budget exhaustion", || {
            let relay = relay.clone();
            async move { relay.connection.attempts().await >= MAX_RECONNECT_ATTEMPTS }
        })
        .await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(relay.connection.attempts().await, MAX_RECONNECT_ATTEMPTS);
        assert!(relay.connection.budget_exhausted().await);
        assert_eq!(relay.pending(), 1);

        // The heartbeat is the only path that re-arms an exhausted budget:
        // after its tick the counter restarts from a fresh attempt.
        wait_until("heartbeat re-arm", || {
            let relay = relay.clone();
            async move { relay.connection.attempts().await < MAX_RECONNECT_ATTEMPTS }
        })
        .await;
    }

    #[tokio::test]
    async fn test_report_never_fails_while_disconnected() {
        let endpoint = dead_endpoint().await;
        let relay = ErrorRelay::new(
            &endpoint,
            ErrorRelayOptions {
                queue_limit: Some(3),
                ..Default::default()
            },
        )
        .expect("build relay");

        for name in ["A", "B", "C", "D"] {
            relay.report(ErrorRecord::new(RecordKind::ConsoleError, name));
        }

        // The bound holds at the report() boundary itself: A was evicted
        // before report returned, B/C/D wait for wake-on-connect.
        assert_eq!(relay.pending(), 3);
        let pending = relay.queue.snapshot_and_clear();
        let names: Vec<_> = pending.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(names, ["B", "C", "D"]);
    }

    #[test]
    fn test_new_outside_runtime_panics() {
        // Construction spawns the background tasks, so a runtime is required;
        // the documented contract is a panic, not a hang or a silent no-op.
        let result = std::panic::catch_unwind(|| {
            ErrorRelay::new("http://127.0.0.1:9", ErrorRelayOptions::default())
        });
        assert!(result.is_err());
    }
}
