//! Navledger Core - fund ledger, NAV resolution and holding reconciliation.
//!
//! The crate keeps a bounded ledger of buy/sell/edit operations per fund,
//! resolves the NAV each trade settles at from a remote
//! [`FundDataProvider`](navledger_market_data::FundDataProvider), and keeps
//! every holding equal to the replay of its ledger. Persistence goes through
//! the [`storage::StateStore`] seam.
//!
//! Typical wiring:
//!
//! ```text
//! StateStore -> PortfolioStore -> ReconcileService -> TradeService
//!                                        ^
//!              FundDataProvider -> NavResolver
//! ```

pub mod constants;
pub mod errors;
pub mod events;
pub mod holdings;
pub mod nav;
pub mod operations;
pub mod reconcile;
pub mod settings;
pub mod state;
pub mod storage;
pub mod timing;
pub mod trades;
pub mod utils;

// Re-export the types most callers touch
pub use holdings::{Holding, HoldingMethod};
pub use nav::NavResolver;
pub use operations::{Operation, OperationKind, OperationStatus, OperationType};
pub use reconcile::{ReconcileOutcome, ReconcileService};
pub use settings::LedgerSettings;
pub use state::PortfolioStore;
pub use timing::SettlementTiming;
pub use trades::{TradeRequest, TradeService};

// Re-export error types
pub use errors::Error;
pub use errors::Result;
