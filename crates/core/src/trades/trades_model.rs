//! Trade request models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};
use crate::holdings::{Holding, HoldingMethod};
use crate::operations::{Operation, OperationKind, TradeDetails};
use crate::timing::SettlementTiming;
use crate::utils::decimal_utils::{positive, round_money};

/// Direction of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeSide {
    Add,
    Reduce,
}

/// A single buy or sell entered by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub code: String,
    pub side: TradeSide,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub shares: Option<Decimal>,
    /// Order date; today in market time when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// Derived from the wall clock and the cutoff when omitted.
    #[serde(default)]
    pub timing: Option<SettlementTiming>,
    #[serde(default)]
    pub fee_rate: Decimal,
    /// Display name, used for QDII classification.
    #[serde(default)]
    pub fund_name: Option<String>,
    /// Overrides the name heuristic.
    #[serde(default)]
    pub is_qdii: Option<bool>,
}

impl TradeRequest {
    pub fn buy_amount(code: impl Into<String>, amount: Decimal) -> Self {
        Self::new(code, TradeSide::Add, Some(amount), None)
    }

    pub fn sell_shares(code: impl Into<String>, shares: Decimal) -> Self {
        Self::new(code, TradeSide::Reduce, None, Some(shares))
    }

    fn new(
        code: impl Into<String>,
        side: TradeSide,
        amount: Option<Decimal>,
        shares: Option<Decimal>,
    ) -> Self {
        Self {
            code: code.into(),
            side,
            amount,
            shares,
            date: None,
            timing: None,
            fee_rate: Decimal::ZERO,
            fund_name: None,
            is_qdii: None,
        }
    }

    pub fn on(mut self, date: NaiveDate, timing: SettlementTiming) -> Self {
        self.date = Some(date);
        self.timing = Some(timing);
        self
    }

    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    pub fn with_fund_name(mut self, name: impl Into<String>) -> Self {
        self.fund_name = Some(name.into());
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::MissingField("code".to_string()).into());
        }
        validate_size(self.amount, self.shares, self.fee_rate)
    }
}

/// One row of a batch import for a single fund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeInput {
    #[serde(rename = "type")]
    pub side: TradeSide,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub shares: Option<Decimal>,
    pub date: NaiveDate,
    pub timing: SettlementTiming,
    #[serde(default)]
    pub fee_rate: Decimal,
}

impl TradeInput {
    pub fn validate(&self) -> Result<()> {
        validate_size(self.amount, self.shares, self.fee_rate)
    }
}

fn validate_size(amount: Option<Decimal>, shares: Option<Decimal>, fee_rate: Decimal) -> Result<()> {
    for (field, value) in [("amount", amount), ("shares", shares)] {
        if value.is_some_and(|v| v <= Decimal::ZERO) {
            return Err(ValidationError::InvalidInput(format!("{} must be positive", field)).into());
        }
    }
    if amount.is_none() && shares.is_none() {
        return Err(ValidationError::MissingField("amount or shares".to_string()).into());
    }
    if fee_rate < Decimal::ZERO || fee_rate >= Decimal::ONE {
        return Err(ValidationError::InvalidInput(format!(
            "fee rate {} is outside [0, 1)",
            fee_rate
        ))
        .into());
    }
    Ok(())
}

/// Builds the ledger payload of a trade settled at `nav`.
///
/// Shares, when given, are authoritative. The fee is charged on the amount,
/// inferred from shares at the settlement NAV when only shares were given.
/// That inferred amount is not stored; replay values a shares-only buy at the
/// latest NAV.
pub(crate) fn trade_kind(
    side: TradeSide,
    amount: Option<Decimal>,
    shares: Option<Decimal>,
    fee_rate: Decimal,
    nav: Decimal,
) -> OperationKind {
    let shares = positive(shares);
    let method = if shares.is_some() {
        HoldingMethod::Shares
    } else {
        HoldingMethod::Amount
    };
    let gross = positive(amount).or_else(|| shares.map(|s| s * nav));
    let details = TradeDetails {
        method,
        amount: positive(amount),
        shares,
        nav: Some(nav),
        fee_rate,
        fee: round_money(gross.unwrap_or(Decimal::ZERO) * fee_rate),
    };
    match side {
        TradeSide::Add => OperationKind::Add(details),
        TradeSide::Reduce => OperationKind::Reduce(details),
    }
}

/// Result of a submitted trade.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeReceipt {
    pub operation: Operation,
    /// The fund's holding after the trade.
    pub holding: Option<Holding>,
}

/// Result of a committed batch import.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchImportResult {
    /// Recorded operations, in input order.
    pub operations: Vec<Operation>,
    pub holding: Option<Holding>,
}
