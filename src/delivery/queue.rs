use crate::types::{ErrorRecord, QUEUE_LIMIT, Result};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;

struct QueueEntry {
    record: ErrorRecord,
    fallback_attempted: bool,
}

struct QueueInner {
    entries: VecDeque<QueueEntry>,
    draining: bool,
}

/// Bounded FIFO buffer of records awaiting transmission.
///
/// Insertion order is delivery order. When the bound is exceeded the oldest
/// record is evicted, never the newest: bounded memory over a complete
/// history. The queue is the ingress buffer too - `enqueue` is synchronous
/// and lock-scoped, so the bound holds at the `report()` boundary, not just
/// behind it. A `draining` flag serializes drains, so a wake-on-connect send
/// racing a manager-driven drain is a no-op rather than a reorder.
///
/// Each entry also remembers whether the fallback transport has been tried
/// for it, so a record gets at most one best-effort duplicate post.
pub struct DeliveryQueue {
    limit: usize,
    inner: Mutex<QueueInner>,
}

impl DeliveryQueue {
    pub fn new() -> Self {
        Self::with_limit(QUEUE_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit,
            inner: Mutex::new(QueueInner {
                entries: VecDeque::new(),
                draining: false,
            }),
        }
    }

    /// Appends a record at the tail. Never fails, never blocks beyond the
    /// queue lock; evicts the head when the bound is exceeded.
    pub fn enqueue(&self, record: ErrorRecord) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.push_back(QueueEntry {
            record,
            fallback_attempted: false,
        });
        if inner.entries.len() > self.limit {
            if let Some(dropped) = inner.entries.pop_front() {
                tracing::warn!(
                    "Delivery queue full ({} records), dropping oldest: {}",
                    self.limit,
                    dropped.record.message
                );
            }
        }
    }

    /// Pops records from the head and feeds them to `send` until the queue is
    /// empty or a send fails. A failed record is re-prepended at the head and
    /// the drain stops, preserving order and avoiding a busy loop against a
    /// transport that just failed. Returns the number of records sent.
    ///
    /// A drain that starts while another is in progress returns immediately.
    /// The lock is never held across a send await.
    pub async fn drain<S, F>(&self, mut send: S) -> usize
    where
        S: FnMut(ErrorRecord) -> F,
        F: Future<Output = Result<()>>,
    {
        {
            let mut inner = self.inner.lock().unwrap();
            if inner.draining {
                return 0;
            }
            inner.draining = true;
        }

        let mut sent = 0;
        loop {
            let entry = {
                let mut inner = self.inner.lock().unwrap();
                match inner.entries.pop_front() {
                    Some(entry) => entry,
                    None => break,
                }
            };

            match send(entry.record.clone()).await {
                Ok(()) => sent += 1,
                Err(e) => {
                    tracing::debug!("Send failed, re-queuing record at head: {}", e);
                    let mut inner = self.inner.lock().unwrap();
                    inner.entries.push_front(entry);
                    break;
                }
            }
        }

        self.inner.lock().unwrap().draining = false;
        sent
    }

    /// Returns the queued records that have not yet been offered to the
    /// fallback transport, marking each as attempted. A record delivered on
    /// the persistent channel before this runs has left the queue and is
    /// never returned; a record that stays queued is returned exactly once.
    pub fn pending_for_fallback(&self) -> Vec<ErrorRecord> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .entries
            .iter_mut()
            .filter(|entry| !entry.fallback_attempted)
            .map(|entry| {
                entry.fallback_attempted = true;
                entry.record.clone()
            })
            .collect()
    }

    /// Whether the record is still waiting for delivery.
    pub fn contains(&self, record: &ErrorRecord) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.entries.iter().any(|entry| entry.record == *record)
    }

    /// Takes every pending record, emptying the queue. Used when switching
    /// transports, so pending records can be re-routed through a new path.
    pub fn snapshot_and_clear(&self) -> Vec<ErrorRecord> {
        let mut inner = self.inner.lock().unwrap();
        std::mem::take(&mut inner.entries)
            .into_iter()
            .map(|entry| entry.record)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().entries.is_empty()
    }
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new()
    }
}
