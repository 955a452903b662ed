//! Change-feed primitives: events, envelopes and the pub/sub bus.
//!
//! The engine commits state first and publishes afterwards; nothing in this
//! crate is a source of truth.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
