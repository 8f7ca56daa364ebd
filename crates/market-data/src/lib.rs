//! Navledger Market Data Crate
//!
//! This crate provides provider-agnostic fund data fetching capabilities
//! for the Navledger ledger engine.
//!
//! # Overview
//!
//! The market data crate supports:
//! - Paginated historical NAV tables per fund code
//! - Same-day NAV estimates ("latest quote")
//! - Per-fund circuit breaking so a failing fund does not hot-loop
//!
//! # Architecture
//!
//! ```text
//! +------------------+     +---------------------+
//! |   NAV Resolver   | --> |  CircuitBreaker     |  (per fund code)
//! +------------------+     +---------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          | FundDataProvider |  (remote adapter)
//!                          +------------------+
//!                                  |
//!                                  v
//!                          +------------------+
//!                          |  NavHistoryPage  |  (rows + page count)
//!                          +------------------+
//! ```
//!
//! # Core Types
//!
//! - [`NavRecord`] - One trading day's unit net asset value
//! - [`NavHistoryPage`] - One page of a fund's historical NAV table
//! - [`LatestQuote`] - Same-day estimate used to seed display values
//! - [`FundDataProvider`] - The remote collaborator trait

pub mod errors;
pub mod models;
pub mod provider;
pub mod registry;

pub use errors::{MarketDataError, RetryClass};
pub use models::{FundCode, LatestQuote, NavHistoryPage, NavRecord};
pub use provider::FundDataProvider;
pub use registry::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
