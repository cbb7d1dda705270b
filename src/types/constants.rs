/// Maximum number of records held in the delivery queue; oldest evicted first.
pub const QUEUE_LIMIT: usize = 20;

/// Delay before an automatic reconnection attempt (milliseconds).
pub const RECONNECT_DELAY: u64 = 3000;

/// Maximum consecutive automatic reconnection attempts before the budget
/// is exhausted. Only the heartbeat re-arms an exhausted budget.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

/// Heartbeat interval (milliseconds).
pub const HEARTBEAT_INTERVAL: u64 = 30000;

/// Upper bound on a single channel send (milliseconds). A socket that
/// accepts no bytes for this long is treated as failed.
pub const SEND_TIMEOUT: u64 = 10000;

/// Character budget for the free-form `data` field on a record.
pub const DATA_TRUNCATE_LEN: usize = 100;

/// Marker appended to truncated `data`.
pub const TRUNCATION_MARKER: &str = "...";

/// Path of the stateless HTTP fallback endpoint on the collector.
pub const FALLBACK_PATH: &str = "/api/error";
