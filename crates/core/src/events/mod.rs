//! Domain events module.
//!
//! Provides domain event types and the sink trait for emitting events
//! after committed ledger and holding mutations.

mod domain_event;
mod sink;

pub use domain_event::*;
pub use sink::*;
