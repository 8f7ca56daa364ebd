//! Settlement timing model.
//!
//! Pure functions deciding which trading day's NAV a trade settles at and
//! when an operation moves from pending to confirmed.

mod settlement;


pub use settlement::{
    apply_at, default_timing, is_qdii_fund, order_date, select_nav, status_at, SettlementRules,
    SettlementTiming,
};
