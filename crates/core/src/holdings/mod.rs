//! Holdings module - the per-fund position model.

mod holdings_model;


pub use holdings_model::{Holding, HoldingMethod, Position};
