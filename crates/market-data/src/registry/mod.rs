//! Fetch protection for fund data providers.
//!
//! This module provides per-fund circuit breaking so that a source that keeps
//! failing for one fund is not hammered on every reconciliation trigger.

mod circuit_breaker;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
