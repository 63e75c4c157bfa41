/// Core event types for reflex
///
/// This crate provides event identities, the name registry used to address them,
/// and the synchronous bus that delivers event records to listeners.
pub mod error;
pub mod identity;
pub mod manager;
pub mod record;

pub use error::EventError;
pub use identity::{EventId, EventIdRegistry};
pub use manager::{EventCallback, EventManager, ListenerId};
pub use record::EventRecord;
