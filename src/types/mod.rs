pub mod constants;
pub mod error;
pub mod message;
pub mod record;

pub use constants::*;
pub use error::{RelayError, Result};
pub use message::{RelayEvent, RelayMessage};
pub use record::{ErrorRecord, RecordKind};
