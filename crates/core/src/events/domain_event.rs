//! Domain event types.

use serde::{Deserialize, Serialize};

use crate::holdings::Holding;

/// Domain events emitted by core services after successful mutations.
///
/// These events are facts about ledger and holding changes. Hosts translate
/// them into UI refreshes, notifications or persistence hooks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// Operations were appended to the ledger.
    OperationsRecorded {
        code: String,
        operation_ids: Vec<String>,
    },

    /// An operation was undone and removed from the ledger.
    OperationRemoved { code: String, operation_id: String },

    /// Pending operations passed their confirmation instant.
    OperationsConfirmed { operation_ids: Vec<String> },

    /// A fund's holding was created or replaced.
    HoldingChanged { code: String, holding: Holding },

    /// A fund's holding was removed (fully sold or undone).
    HoldingRemoved { code: String },

    /// A fund was dropped from the portfolio with all of its operations.
    FundRemoved { code: String },
}

impl DomainEvent {
    /// Creates an OperationsRecorded event.
    pub fn operations_recorded(code: impl Into<String>, operation_ids: Vec<String>) -> Self {
        Self::OperationsRecorded {
            code: code.into(),
            operation_ids,
        }
    }

    /// Creates an OperationRemoved event.
    pub fn operation_removed(code: impl Into<String>, operation_id: impl Into<String>) -> Self {
        Self::OperationRemoved {
            code: code.into(),
            operation_id: operation_id.into(),
        }
    }

    /// Creates an OperationsConfirmed event.
    pub fn operations_confirmed(operation_ids: Vec<String>) -> Self {
        Self::OperationsConfirmed { operation_ids }
    }

    /// HoldingChanged for `Some`, HoldingRemoved for `None`.
    pub fn holding_updated(code: impl Into<String>, holding: Option<Holding>) -> Self {
        match holding {
            Some(holding) => Self::HoldingChanged {
                code: code.into(),
                holding,
            },
            None => Self::HoldingRemoved { code: code.into() },
        }
    }

    /// Creates a FundRemoved event.
    pub fn fund_removed(code: impl Into<String>) -> Self {
        Self::FundRemoved { code: code.into() }
    }

    /// Fund the event is about, when it concerns a single fund.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::OperationsRecorded { code, .. }
            | Self::OperationRemoved { code, .. }
            | Self::HoldingChanged { code, .. }
            | Self::HoldingRemoved { code }
            | Self::FundRemoved { code } => Some(code),
            Self::OperationsConfirmed { .. } => None,
        }
    }
}
