//! Trade, edit and batch-import orchestration.

mod status_poller;
mod trades_model;
mod trades_service;


pub use status_poller::spawn_status_poller;
pub use trades_model::{BatchImportResult, TradeInput, TradeReceipt, TradeRequest, TradeSide};
pub use trades_service::TradeService;
