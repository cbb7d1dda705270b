use crate::types::constants::{DATA_TRUNCATE_LEN, TRUNCATION_MARKER};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Classification of a captured error, matching the collector's taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    ConsoleError,
    UncaughtError,
    GlobalError,
    UnhandledPromiseRejection,
    ResourceError,
    GameFunctionError,
    JsonParseError,
    FetchError,
    TimeoutError,
    IntervalError,
    RafError,
}

/// One captured error, queued for delivery to the collector.
///
/// A record is immutable once built: constructors and consuming `with_*`
/// builders only, no mutators. `kind` and `message` are always present;
/// everything else is optional and omitted from the wire format when absent.
///
/// # Example
///
/// ```
/// use error_relay::{ErrorRecord, RecordKind};
///
/// let record = ErrorRecord::new(RecordKind::GlobalError, "boom")
///     .with_location("game.js", 42, 7);
/// assert_eq!(record.message, "boom");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    pub message: String,
    /// Epoch milliseconds, set at capture time.
    pub timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    #[serde(rename = "function", skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Free-form payload excerpt, truncated to a fixed character budget.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl ErrorRecord {
    /// Builds a record with the capture timestamp set to now. Never fails.
    pub fn new(kind: RecordKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            timestamp: epoch_millis(),
            stack: None,
            source_url: None,
            game_id: None,
            room_id: None,
            user_id: None,
            filename: None,
            line: None,
            column: None,
            function_name: None,
            endpoint: None,
            data: None,
        }
    }

    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    pub fn with_location(mut self, filename: impl Into<String>, line: u32, column: u32) -> Self {
        self.filename = Some(filename.into());
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.function_name = Some(name.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Attaches a payload excerpt, truncated to [`DATA_TRUNCATE_LEN`]
    /// characters with a trailing marker so records stay small on the wire.
    pub fn with_data(mut self, data: &str) -> Self {
        self.data = Some(truncate(data, DATA_TRUNCATE_LEN));
        self
    }
}

fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    let mut out: String = text.chars().take(budget).collect();
    out.push_str(TRUNCATION_MARKER);
    out
}
