// Module declarations
mod builder;
mod connection;
mod core;
mod state;

// Public API exports
pub use builder::{ErrorRelayBuilder, ErrorRelayOptions};
pub use connection::{ConnectionManager, ConnectionState};
pub use core::ErrorRelay;
pub use state::RelayState;
