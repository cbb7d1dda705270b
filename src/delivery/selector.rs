use crate::client::ConnectionManager;
use crate::delivery::DeliveryQueue;
use crate::infrastructure::FallbackPoster;
use crate::types::ErrorRecord;
use std::sync::Arc;

/// Chooses how each record travels: persistent channel first, wake-on-connect
/// queueing second, stateless HTTP fallback as the best-effort duplicate path.
///
/// Losing a report is the failure this crate exists to prevent, so the policy
/// favors over-delivery: a record that cannot be confirmed accepted on the
/// persistent channel is also posted through the fallback, and the collector
/// treats duplicate arrivals of the same record as tolerable.
pub struct TransportSelector {
    connection: Arc<ConnectionManager>,
    queue: Arc<DeliveryQueue>,
    fallback: Arc<FallbackPoster>,
}

impl TransportSelector {
    pub fn new(
        connection: Arc<ConnectionManager>,
        queue: Arc<DeliveryQueue>,
        fallback: Arc<FallbackPoster>,
    ) -> Self {
        Self {
            connection,
            queue,
            fallback,
        }
    }

    /// Routes one record. Returns true when the record was accepted for
    /// delivery on the persistent channel (not necessarily server-acked).
    ///
    /// The record always enters the queue first so a drain preserves global
    /// FIFO order. Acceptance is per record: it is judged by whether this
    /// record left the queue, so a concurrent dispatch leaving its own record
    /// queued cannot demote an already-delivered one to the fallback.
    pub async fn dispatch(&self, record: ErrorRecord) -> bool {
        self.queue.enqueue(record.clone());
        self.pump().await;
        self.connection.is_connected().await && !self.queue.contains(&record)
    }

    /// Moves whatever can move: drains the queue over the persistent channel
    /// when it is up, then gives every record still queued its one fallback
    /// attempt. Safe to call at any time from any task.
    pub async fn pump(&self) {
        if self.connection.is_connected().await {
            self.drain_channel().await;
        }
        for record in self.queue.pending_for_fallback() {
            // Best-effort duplicate path, fire-and-forget.
            let fallback = Arc::clone(&self.fallback);
            tokio::spawn(async move {
                if let Err(e) = fallback.post(&record).await {
                    tracing::debug!("Fallback delivery failed: {}", e);
                }
            });
        }
    }

    /// Drains queued records over the persistent channel in enqueue order.
    pub async fn drain_channel(&self) -> usize {
        let connection = Arc::clone(&self.connection);
        self.queue
            .drain(move |record| {
                let connection = Arc::clone(&connection);
                async move { connection.send_record(&record).await }
            })
            .await
    }

    /// Re-routes every pending record through the fallback, emptying the
    /// queue. Used when the persistent transport is being torn down.
    pub async fn flush_via_fallback(&self) {
        let pending = self.queue.snapshot_and_clear();
        if pending.is_empty() {
            return;
        }
        tracing::info!("Flushing {} pending records via fallback", pending.len());
        for record in pending {
            if let Err(e) = self.fallback.post(&record).await {
                tracing::warn!("Fallback flush failed for '{}': {}", record.message, e);
            }
        }
    }
}
