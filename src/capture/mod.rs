// Capture front-end - converts host events into records
pub mod context;
pub mod reporter;

pub use context::PageContext;
pub use reporter::Reporter;
