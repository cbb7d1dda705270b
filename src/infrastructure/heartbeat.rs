use crate::client::ErrorRelay;
use crate::types::HEARTBEAT_INTERVAL;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

/// Periodic liveness check for the delivery pipeline.
///
/// While connected, each tick sends a heartbeat envelope over the persistent
/// channel; a failed probe marks the channel disconnected so the watcher
/// takes over. While disconnected (and not manually so), each tick resets
/// the retry budget and forces a reconnection attempt - this is the only
/// path that recovers from an exhausted budget, so a long outage degrades
/// delivery instead of ending it.
pub struct HeartbeatManager {
    interval: Duration,
    relay: ErrorRelay,
}

impl HeartbeatManager {
    pub fn new(relay: ErrorRelay) -> Self {
        Self {
            interval: Duration::from_millis(HEARTBEAT_INTERVAL),
            relay,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Spawns the heartbeat task that runs for the pipeline's lifetime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = time::interval(self.interval);
            ticker.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
            // interval() fires immediately; swallow the first tick.
            ticker.tick().await;

            loop {
                ticker.tick().await;

                if self.relay.was_manual_disconnect().await {
                    continue;
                }

                if self.relay.is_connected().await {
                    if let Err(e) = self.relay.send_heartbeat().await {
                        tracing::warn!("Heartbeat probe failed, marking disconnected: {}", e);
                        self.relay.connection.clear_writer().await;
                        self.relay
                            .set_state(crate::client::ConnectionState::Disconnected)
                            .await;
                    }
                } else {
                    tracing::info!("Heartbeat re-arming reconnection");
                    self.relay.connection.reset_budget().await;
                    if let Err(e) = self.relay.try_reconnect().await {
                        tracing::error!("Heartbeat reconnect failed: {}", e);
                    }
                }
            }
        })
    }
}
