//! Operations module - the append-only trade/edit ledger.

mod ledger;
mod operations_model;



pub use ledger::OperationLedger;
pub use operations_model::{
    Operation, OperationKind, OperationMeta, OperationStatus, OperationType, TradeDetails,
};
