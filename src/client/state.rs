use super::connection::ConnectionState;
use crate::infrastructure::TaskManager;
use tokio::sync::watch;

/// Consolidated mutable state for the relay client.
/// A single struct behind one lock keeps contention down.
pub struct RelayState {
    /// Background task manager (read task, per-connection tasks)
    pub task_manager: TaskManager,

    /// Whether the last disconnect was requested by the host
    /// (suppresses automatic reconnection and the heartbeat re-arm)
    pub was_manual_disconnect: bool,

    /// Sender for state change notifications to the reconnection watcher
    pub state_change_tx: Option<watch::Sender<(ConnectionState, bool)>>,
}

impl RelayState {
    pub fn new() -> Self {
        Self {
            task_manager: TaskManager::new(),
            was_manual_disconnect: false,
            state_change_tx: None,
        }
    }

    /// Notify state change watchers
    pub fn notify_state_change(&self, state: ConnectionState, manual: bool) {
        if let Some(tx) = &self.state_change_tx
            && tx.send((state, manual)).is_err()
        {
            tracing::debug!(
                "State change watcher gone, could not notify state: {:?}",
                state
            );
        }
    }
}

impl Default for RelayState {
    fn default() -> Self {
        Self::new()
    }
}
