//! Market data models
//!
//! This module contains the core data types for fund data operations:
//! - `types` - Type alias for fund codes (FundCode)
//! - `nav` - Historical NAV rows and pages (NavRecord, NavHistoryPage)
//! - `quote` - Same-day estimate (LatestQuote)

mod nav;
mod quote;
mod types;

pub use nav::{NavHistoryPage, NavRecord};
pub use quote::LatestQuote;
pub use types::FundCode;
