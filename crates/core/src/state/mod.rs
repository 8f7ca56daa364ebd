//! In-memory portfolio state and its persistence.

mod portfolio_repository;
mod portfolio_state;
mod portfolio_store;

#[cfg(test)]
mod portfolio_store_tests;

pub use portfolio_repository::{LoadedState, PortfolioRepository};
pub use portfolio_state::PortfolioState;
pub use portfolio_store::PortfolioStore;
