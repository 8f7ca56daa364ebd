//! Fund data provider abstractions.
//!
//! This module contains the `FundDataProvider` trait that remote fund-data
//! adapters implement. The ledger engine never talks to the network directly;
//! it only sees NAV pages and latest quotes through this trait.
//!
//! # Architecture
//!
//! The provider system is designed to be:
//! - **Provider-agnostic**: The core system doesn't know about specific providers
//! - **Extensible**: New sources can be added by implementing `FundDataProvider`
//! - **Resilient**: The per-fund circuit breaker protects against failing sources

mod traits;

pub use traits::FundDataProvider;
