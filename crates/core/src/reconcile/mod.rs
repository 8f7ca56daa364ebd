//! Holding reconciliation.
//!
//! [`reconcile`] rebuilds a fund's holding by replaying its ledger
//! operations; [`ReconcileService`] runs that replay against live NAV data and
//! applies the result without racing concurrent ledger changes.

mod reconcile_engine;
mod reconcile_key;
mod reconcile_service;

#[cfg(test)]
mod reconcile_engine_tests;
#[cfg(test)]
mod reconcile_service_tests;

pub use reconcile_engine::{reconcile, reconcile_from};
pub use reconcile_key::reconcile_key;
pub use reconcile_service::{ReconcileOutcome, ReconcileService};
