//! NAV resolution.
//!
//! [`NavResolver`] answers "which NAV does this trade settle at" by scanning a
//! per-fund page cache ([`NavTableCache`]) and fetching history pages from the
//! [`FundDataProvider`](navledger_market_data::FundDataProvider) on demand.

mod nav_cache;
mod nav_errors;
mod nav_resolver;


pub use nav_cache::NavTableCache;
pub use nav_errors::{NavError, NavResult};
pub use nav_resolver::{NavKey, NavResolver};
