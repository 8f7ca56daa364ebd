//! Holding domain models.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, ValidationError};
use crate::utils::decimal_utils::{positive, round_money, round_price};

/// Which pair of a holding's fields is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HoldingMethod {
    /// `amount` and `profit` were entered; shares are derived from a NAV.
    Amount,
    /// `shares` and `cost_price` were entered or reconstructed.
    #[default]
    Shares,
}

/// A fund holding.
///
/// Exactly one of (`amount`, `profit`) or (`shares`, `cost_price`) is the
/// authoritative pair, chosen by `method`. Reconciliation always produces
/// `Shares` holdings with all four values filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Holding {
    pub code: String,
    pub method: HoldingMethod,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub profit: Option<Decimal>,
    #[serde(default)]
    pub shares: Option<Decimal>,
    #[serde(default)]
    pub cost_price: Option<Decimal>,
    #[serde(default)]
    pub first_buy: Option<NaiveDate>,
}

/// Running share count and total cost of a fund position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub shares: Decimal,
    pub cost: Decimal,
}

impl Position {
    pub fn new(shares: Decimal, cost: Decimal) -> Self {
        Self { shares, cost }
    }

    pub fn is_empty(&self) -> bool {
        self.shares <= Decimal::ZERO
    }
}

impl Holding {
    /// A holding entered by share count and unit cost.
    pub fn by_shares(code: impl Into<String>, shares: Decimal, cost_price: Decimal) -> Self {
        Self {
            code: code.into(),
            method: HoldingMethod::Shares,
            amount: None,
            profit: None,
            shares: Some(shares),
            cost_price: Some(cost_price),
            first_buy: None,
        }
    }

    /// A holding entered by current market value and accumulated profit.
    pub fn by_amount(code: impl Into<String>, amount: Decimal, profit: Decimal) -> Self {
        Self {
            code: code.into(),
            method: HoldingMethod::Amount,
            amount: Some(amount),
            profit: Some(profit),
            shares: None,
            cost_price: None,
            first_buy: None,
        }
    }

    pub fn with_first_buy(mut self, first_buy: Option<NaiveDate>) -> Self {
        self.first_buy = first_buy;
        self
    }

    /// Checks the authoritative pair for `method` is present and sane.
    pub fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(ValidationError::MissingField("code".to_string()).into());
        }
        match self.method {
            HoldingMethod::Shares => {
                let shares = self
                    .shares
                    .ok_or_else(|| ValidationError::MissingField("shares".to_string()))?;
                let cost_price = self
                    .cost_price
                    .ok_or_else(|| ValidationError::MissingField("costPrice".to_string()))?;
                if shares < Decimal::ZERO || cost_price < Decimal::ZERO {
                    return Err(ValidationError::InvalidInput(format!(
                        "Holding {} has negative shares or cost price",
                        self.code
                    ))
                    .into());
                }
            }
            HoldingMethod::Amount => {
                let amount = self
                    .amount
                    .ok_or_else(|| ValidationError::MissingField("amount".to_string()))?;
                if self.profit.is_none() {
                    return Err(ValidationError::MissingField("profit".to_string()).into());
                }
                if amount < Decimal::ZERO {
                    return Err(ValidationError::InvalidInput(format!(
                        "Holding {} has a negative amount",
                        self.code
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Derives (shares, total cost) from the authoritative pair.
    ///
    /// Amount-method holdings need a positive NAV to convert value into
    /// shares; `None` is returned without one.
    pub fn position(&self, nav: Decimal) -> Option<Position> {
        match self.method {
            HoldingMethod::Shares => {
                let shares = self.shares.unwrap_or(Decimal::ZERO);
                let cost_price = self.cost_price.unwrap_or(Decimal::ZERO);
                Some(Position::new(shares, shares * cost_price))
            }
            HoldingMethod::Amount => {
                let nav = positive(Some(nav))?;
                let amount = self.amount.unwrap_or(Decimal::ZERO);
                let profit = self.profit.unwrap_or(Decimal::ZERO);
                Some(Position::new(amount / nav, amount - profit))
            }
        }
    }

    /// Builds the canonical `Shares` holding for a replayed position.
    ///
    /// Returns `None` when no shares remain, which means the fund leaves the
    /// holding set.
    pub fn from_position(
        code: &str,
        position: Position,
        latest_nav: Decimal,
        first_buy: Option<NaiveDate>,
    ) -> Option<Self> {
        let shares = round_money(position.shares);
        if shares <= Decimal::ZERO {
            return None;
        }
        let amount = position.shares * latest_nav;
        Some(Self {
            code: code.to_string(),
            method: HoldingMethod::Shares,
            amount: Some(round_money(amount)),
            profit: Some(round_money(amount - position.cost)),
            shares: Some(shares),
            cost_price: Some(round_price(position.cost / position.shares)),
            first_buy,
        })
    }
}
