//! Operation domain models.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ValidationError;
use crate::holdings::{Holding, HoldingMethod};
use crate::timing::{self, SettlementRules, SettlementTiming};

/// Operation status for the confirmation lifecycle.
///
/// The only transition is `Pending -> Confirmed`, taken once `now >= apply_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    #[default]
    Pending,
    Confirmed,
}

/// The kind of ledger entry, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationType {
    Add,
    Reduce,
    Edit,
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Reduce => write!(f, "reduce"),
            Self::Edit => write!(f, "edit"),
        }
    }
}

impl FromStr for OperationType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "add" | "buy" => Ok(Self::Add),
            "reduce" | "sell" => Ok(Self::Reduce),
            "edit" => Ok(Self::Edit),
            other => Err(ValidationError::InvalidInput(format!(
                "Unknown operation type '{}'",
                other
            ))),
        }
    }
}

/// Trade payload carried by `add` and `reduce` operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDetails {
    /// Whether the order was sized by amount or by shares.
    pub method: HoldingMethod,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub shares: Option<Decimal>,
    /// Settlement NAV; `None` until resolved and backfilled.
    #[serde(default)]
    pub nav: Option<Decimal>,
    #[serde(default)]
    pub fee_rate: Decimal,
    #[serde(default)]
    pub fee: Decimal,
}

/// Per-type payload of an operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationKind {
    Add(TradeDetails),
    Reduce(TradeDetails),
    /// Authoritative override; the new state lives in `Operation::next`.
    Edit,
}

impl OperationKind {
    pub fn operation_type(&self) -> OperationType {
        match self {
            Self::Add(_) => OperationType::Add,
            Self::Reduce(_) => OperationType::Reduce,
            Self::Edit => OperationType::Edit,
        }
    }

    pub fn trade(&self) -> Option<&TradeDetails> {
        match self {
            Self::Add(details) | Self::Reduce(details) => Some(details),
            Self::Edit => None,
        }
    }
}

/// Order facts the timing model needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationMeta {
    pub date: NaiveDate,
    pub timing: SettlementTiming,
    pub is_qdii: bool,
}

/// One immutable ledger entry.
///
/// `prev` and `next` are full holding snapshots taken when the operation was
/// recorded, so undo is a lookup rather than a replay. Only `status` and the
/// settlement NAV of a trade may change after recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub id: String,
    pub code: String,
    #[serde(flatten)]
    pub kind: OperationKind,
    pub status: OperationStatus,
    pub created_at: DateTime<Utc>,
    pub apply_at: DateTime<Utc>,
    /// Order date (fund-local trading day)
    pub date: NaiveDate,
    pub timing: SettlementTiming,
    #[serde(default)]
    pub is_qdii: bool,
    pub prev: Option<Holding>,
    pub next: Option<Holding>,
}

impl Operation {
    /// Stamps a new trade or edit operation.
    ///
    /// `apply_at` comes from the confirmation-delay rule but never precedes
    /// `created_at`; an order whose delay has already elapsed is recorded as
    /// confirmed.
    pub fn build(
        code: &str,
        kind: OperationKind,
        prev: Option<Holding>,
        next: Option<Holding>,
        meta: OperationMeta,
        now: DateTime<Utc>,
        rules: &SettlementRules,
    ) -> Self {
        let apply_at = match kind {
            OperationKind::Edit => now,
            _ => timing::apply_at(meta.date, meta.timing, meta.is_qdii, rules).max(now),
        };
        Self {
            id: Uuid::now_v7().to_string(),
            code: code.to_string(),
            kind,
            status: timing::status_at(apply_at, now),
            created_at: now,
            apply_at,
            date: meta.date,
            timing: meta.timing,
            is_qdii: meta.is_qdii,
            prev,
            next,
        }
    }

    pub fn operation_type(&self) -> OperationType {
        self.kind.operation_type()
    }

    pub fn trade(&self) -> Option<&TradeDetails> {
        self.kind.trade()
    }

    /// Settlement NAV of a trade, if known.
    pub fn settlement_nav(&self) -> Option<Decimal> {
        self.trade().and_then(|t| t.nav)
    }

    /// Whether this trade still waits for its settlement NAV.
    pub fn needs_nav(&self) -> bool {
        self.trade().is_some_and(|t| t.nav.is_none())
    }

    pub fn is_confirmed(&self) -> bool {
        self.status == OperationStatus::Confirmed
    }

    /// Re-evaluates the status at `now`. Returns true if it flipped.
    ///
    /// Confirmed operations never go back to pending.
    pub fn refresh_status(&mut self, now: DateTime<Utc>) -> bool {
        if self.is_confirmed() {
            return false;
        }
        if timing::status_at(self.apply_at, now) == OperationStatus::Confirmed {
            self.status = OperationStatus::Confirmed;
            return true;
        }
        false
    }

    /// Patches in a settlement NAV resolved after recording.
    ///
    /// Only fills a missing NAV; returns false for edits or trades that
    /// already carry one.
    pub fn backfill_nav(&mut self, nav: Decimal) -> bool {
        match &mut self.kind {
            OperationKind::Add(details) | OperationKind::Reduce(details)
                if details.nav.is_none() =>
            {
                details.nav = Some(nav);
                true
            }
            _ => false,
        }
    }
}
