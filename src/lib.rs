//! # error-relay
//!
//! Client-side error capture and delivery: structured error records travel
//! from a running host application to a remote collector over an unreliable,
//! intermittently connected transport.
//!
//! The pipeline keeps a bounded FIFO queue of pending records, prefers a
//! persistent WebSocket channel, reconnects with a bounded retry budget, and
//! duplicates unconfirmed records over a stateless HTTP fallback. Delivery is
//! at-least-once: the collector tolerates duplicates, because silently losing
//! an error report is the one failure this crate exists to prevent.
//!
//! ## Example
//!
//! ```no_run
//! use error_relay::{ErrorRelay, ErrorRelayOptions, PageContext, Reporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let relay = ErrorRelay::new("http://collector.local:3000", ErrorRelayOptions::default())?;
//!     relay.connect().await?;
//!
//!     let reporter = Reporter::new(
//!         relay.clone(),
//!         PageContext::from_url("http://host/play?gameId=snake&roomId=r42"),
//!     );
//!
//!     reporter.console_error("texture atlas missing");
//!     let _ = reporter.watch("update_board", || {
//!         Err::<(), _>("board out of sync".to_string())
//!     });
//!     Ok(())
//! }
//! ```

pub mod capture;
pub mod client;
pub mod delivery;
pub mod infrastructure;
pub mod types;
pub mod websocket;

pub use capture::{PageContext, Reporter};
pub use client::{ConnectionState, ErrorRelay, ErrorRelayBuilder, ErrorRelayOptions};
pub use delivery::{DeliveryQueue, TransportSelector};
pub use types::{ErrorRecord, RecordKind, RelayError, RelayMessage, Result};
