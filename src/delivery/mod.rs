// Delivery core - bounded queue and transport selection
pub mod queue;
pub mod selector;

pub use queue::DeliveryQueue;
pub use selector::TransportSelector;
