use super::{ConnectionManager, ConnectionState, ErrorRelay, RelayState};
use crate::delivery::{DeliveryQueue, TransportSelector};
use crate::infrastructure::{FallbackPoster, HeartbeatManager, Timer, ws_to_http_endpoint};
use crate::types::{HEARTBEAT_INTERVAL, QUEUE_LIMIT, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, RwLock, watch};
use url::Url;

/// Tuning knobs for the pipeline. All optional; defaults match the collector
/// protocol's expectations.
#[derive(Debug, Clone, Default)]
pub struct ErrorRelayOptions {
    /// Delivery queue bound; oldest records are evicted past it. Default 20.
    pub queue_limit: Option<usize>,
    /// Delay before an automatic reconnect attempt, ms. Default 3000.
    pub reconnect_delay: Option<u64>,
    /// Heartbeat period, ms. Default 30000.
    pub heartbeat_interval: Option<u64>,
    /// Override for the HTTP fallback origin; defaults to the collector
    /// endpoint itself.
    pub fallback_endpoint: Option<String>,
}

/// Builder for [`ErrorRelay`] that validates the endpoint and spawns the
/// pipeline's long-lived tasks: pump, reconnection watcher, heartbeat.
pub struct ErrorRelayBuilder {
    endpoint: String,
    options: ErrorRelayOptions,
}

impl ErrorRelayBuilder {
    pub fn new(endpoint: impl Into<String>, options: ErrorRelayOptions) -> Result<Self> {
        let endpoint = endpoint.into();
        Url::parse(&endpoint)?;
        Ok(Self { endpoint, options })
    }

    /// Build the relay and spawn its background tasks. Must run inside a
    /// tokio runtime; panics otherwise.
    pub fn build(self) -> ErrorRelay {
        let mut relay_state = RelayState::new();

        let (state_tx, state_rx) = watch::channel((ConnectionState::Disconnected, false));
        relay_state.state_change_tx = Some(state_tx);

        let connection = Arc::new(ConnectionManager::new());
        let queue = Arc::new(DeliveryQueue::with_limit(
            self.options.queue_limit.unwrap_or(QUEUE_LIMIT),
        ));
        let fallback_base = self
            .options
            .fallback_endpoint
            .clone()
            .unwrap_or_else(|| ws_to_http_endpoint(&self.endpoint));
        let selector = Arc::new(TransportSelector::new(
            Arc::clone(&connection),
            Arc::clone(&queue),
            Arc::new(FallbackPoster::new(fallback_base)),
        ));

        let wake = Arc::new(Notify::new());

        let relay = ErrorRelay {
            endpoint: self.endpoint,
            options: self.options,
            connection,
            queue,
            selector,
            state: Arc::new(RwLock::new(relay_state)),
            wake: Arc::clone(&wake),
        };

        spawn_pump_task(relay.clone(), wake);
        spawn_reconnection_watcher(relay.clone(), state_rx);

        let heartbeat_interval = relay.options.heartbeat_interval.unwrap_or(HEARTBEAT_INTERVAL);
        HeartbeatManager::new(relay.clone())
            .with_interval(Duration::from_millis(heartbeat_interval))
            .spawn();

        relay
    }
}

/// Moves `report()` ingress. A wake covers every record enqueued since the
/// last pass, so one pump pass handles a burst; a pass that leaves records
/// queued while the channel is down additionally kicks a lazy reconnect so
/// wake-on-connect delivery has something to wake on.
fn spawn_pump_task(relay: ErrorRelay, wake: Arc<Notify>) {
    tokio::spawn(async move {
        loop {
            wake.notified().await;
            relay.selector.pump().await;

            if !relay.queue.is_empty()
                && relay.connection.state().await == ConnectionState::Disconnected
                && !relay.was_manual_disconnect().await
                && !relay.connection.budget_exhausted().await
            {
                let relay = relay.clone();
                tokio::spawn(async move {
                    if let Err(e) = relay.try_reconnect().await {
                        tracing::error!("Lazy reconnect failed: {}", e);
                    }
                });
            }
        }
    });
}

/// Reacts to disconnect signals: waits the reconnect delay, then attempts a
/// reconnection, as long as the budget holds and the disconnect was not
/// requested by the host.
fn spawn_reconnection_watcher(
    relay: ErrorRelay,
    mut state_rx: watch::Receiver<(ConnectionState, bool)>,
) {
    let mut timer = match relay.options.reconnect_delay {
        Some(delay) => Timer::new(vec![delay]),
        None => Timer::default(),
    };
    tokio::spawn(async move {
        while state_rx.changed().await.is_ok() {
            let (state, was_manual) = *state_rx.borrow_and_update();

            if matches!(state, ConnectionState::Connected) {
                timer.reset();
                continue;
            }
            if !matches!(state, ConnectionState::Disconnected) || was_manual {
                continue;
            }

            if relay.connection.budget_exhausted().await {
                tracing::warn!("Reconnection budget exhausted, waiting for heartbeat to re-arm");
                continue;
            }

            timer.schedule_timeout().await;

            // The picture may have changed while we slept.
            if relay.connection.state().await != ConnectionState::Disconnected
                || relay.was_manual_disconnect().await
            {
                continue;
            }

            if let Err(e) = relay.try_reconnect().await {
                tracing::error!("Reconnection watcher failed: {}", e);
            }
        }
        tracing::debug!("Reconnection watcher finished");
    });
}
