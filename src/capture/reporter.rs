use super::PageContext;
use crate::client::ErrorRelay;
use crate::types::{ErrorRecord, RecordKind};
use std::fmt::Display;
use std::panic::PanicHookInfo;

/// Capture glue between the host application and the pipeline.
///
/// Builds records for each capture site, stamps the page context on them,
/// and hands them to [`ErrorRelay::report`]. Building is infallible and
/// reporting never raises, so no capture path can disturb the host's own
/// control flow. Functions to monitor are registered explicitly through
/// [`watch`](Self::watch) rather than discovered by name.
#[derive(Clone)]
pub struct Reporter {
    relay: ErrorRelay,
    context: PageContext,
}

impl Reporter {
    pub fn new(relay: ErrorRelay, context: PageContext) -> Self {
        Self { relay, context }
    }

    /// Stamps the page context and hands the record to the pipeline.
    pub fn report(&self, record: ErrorRecord) {
        self.relay.report(self.context.stamp(record));
    }

    /// An error-level log line emitted by the host.
    pub fn console_error(&self, message: impl Into<String>) {
        self.report(ErrorRecord::new(RecordKind::ConsoleError, message));
    }

    /// An exception that escaped every handler in the host.
    pub fn uncaught_error(&self, message: impl Into<String>, stack: Option<&str>) {
        let mut record = ErrorRecord::new(RecordKind::UncaughtError, message);
        if let Some(stack) = stack {
            record = record.with_stack(stack);
        }
        self.report(record);
    }

    /// A global error event with a known source location.
    pub fn global_error(&self, message: impl Into<String>, filename: &str, line: u32, column: u32) {
        self.report(
            ErrorRecord::new(RecordKind::GlobalError, message).with_location(filename, line, column),
        );
    }

    /// A rejected promise (or failed detached task) nobody handled.
    pub fn unhandled_rejection(&self, reason: impl Display) {
        self.report(ErrorRecord::new(
            RecordKind::UnhandledPromiseRejection,
            reason.to_string(),
        ));
    }

    /// A resource (script, image, stylesheet) that failed to load.
    pub fn resource_error(&self, resource_url: &str) {
        self.report(
            ErrorRecord::new(
                RecordKind::ResourceError,
                format!("Failed to load resource: {}", resource_url),
            )
            .with_endpoint(resource_url),
        );
    }

    /// A JSON payload that failed to parse; the raw text travels along,
    /// truncated to the record's data budget.
    pub fn json_parse_error(&self, error: impl Display, raw: &str) {
        self.report(
            ErrorRecord::new(RecordKind::JsonParseError, error.to_string()).with_data(raw),
        );
    }

    /// A failed request to a named endpoint.
    pub fn fetch_error(&self, endpoint: &str, message: impl Into<String>) {
        self.report(ErrorRecord::new(RecordKind::FetchError, message).with_endpoint(endpoint));
    }

    /// Runs an explicitly registered game function, reporting its error
    /// before handing it back unchanged. The host's own error handling is
    /// preserved: this observes, it does not swallow.
    pub fn watch<T, E, F>(&self, function_name: &str, f: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        self.watch_as(RecordKind::GameFunctionError, function_name, f)
    }

    /// [`watch`](Self::watch) with an explicit kind, for timer, interval,
    /// and frame callbacks.
    pub fn watch_as<T, E, F>(&self, kind: RecordKind, label: &str, f: F) -> Result<T, E>
    where
        E: Display,
        F: FnOnce() -> Result<T, E>,
    {
        let result = f();
        if let Err(e) = &result {
            self.report(
                ErrorRecord::new(kind, e.to_string()).with_function(label),
            );
        }
        result
    }

    /// A hook suitable for `std::panic::set_hook`, turning panics into
    /// `uncaught_error` records. Chain it with the previous hook to keep
    /// the host's own panic output.
    pub fn panic_hook(&self) -> impl Fn(&PanicHookInfo<'_>) + Send + Sync + 'static {
        let reporter = self.clone();
        move |info| {
            let message = panic_message(info);
            let mut record = ErrorRecord::new(RecordKind::UncaughtError, message);
            if let Some(location) = info.location() {
                record = record.with_location(location.file(), location.line(), location.column());
            }
            reporter.report(record);
        }
    }
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ErrorRelayOptions;

    fn test_reporter() -> (Reporter, ErrorRelay) {
        // Unroutable origin: nothing connects, records stay queued.
        let relay = ErrorRelay::new("http://127.0.0.1:9", ErrorRelayOptions::default())
            .expect("valid endpoint");
        let reporter = Reporter::new(
            relay.clone(),
            PageContext::from_url("http://host/play?gameId=g1&roomId=r1"),
        );
        (reporter, relay)
    }

    #[tokio::test]
    async fn test_reported_records_carry_page_context() {
        let (reporter, relay) = test_reporter();
        reporter.console_error("oops");

        let pending = relay.queue.snapshot_and_clear();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].kind, RecordKind::ConsoleError);
        assert_eq!(pending[0].game_id.as_deref(), Some("g1"));
        assert_eq!(pending[0].room_id.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_watch_reports_and_re_raises() {
        let (reporter, relay) = test_reporter();

        let result: Result<(), String> =
            reporter.watch("update_board", || Err("bad move".to_string()));
        assert_eq!(result, Err("bad move".to_string()));

        let pending = relay.queue.snapshot_and_clear();
        assert_eq!(pending[0].kind, RecordKind::GameFunctionError);
        assert_eq!(pending[0].message, "bad move");
        assert_eq!(pending[0].function_name.as_deref(), Some("update_board"));
    }

    #[tokio::test]
    async fn test_watch_passes_success_through_silently() {
        let (reporter, relay) = test_reporter();

        let result: Result<u32, String> = reporter.watch("tick", || Ok(7));
        assert_eq!(result, Ok(7));

        assert_eq!(relay.pending(), 0);
    }

    #[tokio::test]
    async fn test_watch_as_uses_given_kind() {
        let (reporter, relay) = test_reporter();

        let _: Result<(), String> = reporter.watch_as(RecordKind::TimeoutError, "spawn_wave", || {
            Err("wave failed".to_string())
        });

        let pending = relay.queue.snapshot_and_clear();
        assert_eq!(pending[0].kind, RecordKind::TimeoutError);
        assert_eq!(pending[0].function_name.as_deref(), Some("spawn_wave"));
    }

    #[tokio::test]
    async fn test_json_parse_error_truncates_payload() {
        let (reporter, relay) = test_reporter();
        let raw = "a".repeat(500);

        reporter.json_parse_error("expected value at line 1", &raw);

        let pending = relay.queue.snapshot_and_clear();
        let data = pending[0].data.as_deref().unwrap();
        assert!(data.len() < raw.len());
        assert!(data.ends_with("..."));
    }
}
