//! Pure replay of a fund's operations into a holding.

use chrono::NaiveDate;
use log::warn;
use rust_decimal::Decimal;

use crate::holdings::{Holding, Position};
use crate::operations::{Operation, OperationKind, TradeDetails};
use crate::utils::decimal_utils::positive;

#[derive(Debug, Clone, Copy, Default)]
struct ReplayState {
    position: Position,
    first_buy: Option<NaiveDate>,
}

impl ReplayState {
    fn seeded(baseline: Option<&Holding>, latest_nav: Decimal) -> Self {
        let Some(holding) = baseline else {
            return Self::default();
        };
        match holding.position(latest_nav) {
            Some(position) if !position.is_empty() => Self {
                position,
                first_buy: holding.first_buy,
            },
            _ => Self::default(),
        }
    }

    fn apply(&mut self, op: &Operation, latest_nav: Decimal) {
        match &op.kind {
            OperationKind::Edit => self.apply_edit(op, latest_nav),
            OperationKind::Add(details) => self.apply_add(op, details, latest_nav),
            OperationKind::Reduce(details) => self.apply_reduce(op, details, latest_nav),
        }
    }

    fn apply_edit(&mut self, op: &Operation, latest_nav: Decimal) {
        let Some(next) = op.next.as_ref() else {
            *self = Self::default();
            return;
        };
        match next.position(latest_nav) {
            Some(position) if !position.is_empty() => {
                self.position = position;
                self.first_buy = self.first_buy.or(next.first_buy).or(Some(op.date));
            }
            Some(_) => *self = Self::default(),
            None => warn!(
                "Edit {} for {} cannot be converted to shares without a NAV, skipped",
                op.id, op.code
            ),
        }
    }

    fn apply_add(&mut self, op: &Operation, details: &TradeDetails, latest_nav: Decimal) {
        let Some(delta) = share_delta(details, latest_nav) else {
            warn!("Add {} for {} has no usable size, skipped", op.id, op.code);
            return;
        };
        // A shares-only buy is valued at the latest NAV, not the settlement NAV.
        let amount = positive(details.amount).unwrap_or_else(|| delta * latest_nav);
        self.position.shares += delta;
        self.position.cost += amount + details.fee;
        if self.first_buy.is_none() {
            self.first_buy = Some(op.date);
        }
    }

    fn apply_reduce(&mut self, op: &Operation, details: &TradeDetails, latest_nav: Decimal) {
        let Some(delta) = share_delta(details, latest_nav) else {
            warn!("Reduce {} for {} has no usable size, skipped", op.id, op.code);
            return;
        };
        let previous = self.position.shares;
        if delta > previous {
            warn!(
                "Reduce {} for {} sells {} shares but only {} are held, clamping to zero",
                op.id, op.code, delta, previous
            );
        }
        let remaining = (previous - delta).max(Decimal::ZERO);
        self.position.cost = if previous > Decimal::ZERO {
            self.position.cost * remaining / previous
        } else {
            Decimal::ZERO
        };
        self.position.shares = remaining;
        if remaining.is_zero() {
            self.first_buy = None;
        }
    }
}

/// Settlement NAV if resolved, otherwise the latest NAV.
fn pricing_nav(details: &TradeDetails, latest_nav: Decimal) -> Decimal {
    positive(details.nav).unwrap_or(latest_nav)
}

/// Shares moved by a trade: explicit shares, or amount over the pricing NAV.
fn share_delta(details: &TradeDetails, latest_nav: Decimal) -> Option<Decimal> {
    if let Some(shares) = positive(details.shares) {
        return Some(shares);
    }
    let amount = positive(details.amount)?;
    let nav = positive(Some(pricing_nav(details, latest_nav)))?;
    Some(amount / nav)
}

/// Rebuilds a fund's holding from its operations alone.
///
/// See [`reconcile_from`].
pub fn reconcile<'a, I>(code: &str, operations: I, latest_nav: Decimal) -> Option<Holding>
where
    I: IntoIterator<Item = &'a Operation>,
{
    reconcile_from(code, None, operations, latest_nav)
}

/// Rebuilds a fund's holding by folding its operations onto a baseline.
///
/// `operations` are taken in insertion order and replayed by order date, ties
/// keeping insertion order. Operations of other funds are ignored. Every
/// operation takes part whatever its status; trades without a settlement NAV
/// are priced at `latest_nav`. The result is a `Shares` holding, or `None`
/// when no shares remain. Replaying the same input always yields the same
/// holding.
pub fn reconcile_from<'a, I>(
    code: &str,
    baseline: Option<&Holding>,
    operations: I,
    latest_nav: Decimal,
) -> Option<Holding>
where
    I: IntoIterator<Item = &'a Operation>,
{
    let mut ordered: Vec<&Operation> = operations
        .into_iter()
        .filter(|op| op.code == code)
        .collect();
    ordered.sort_by_key(|op| op.date);

    let mut state = ReplayState::seeded(baseline, latest_nav);
    for op in ordered {
        state.apply(op, latest_nav);
    }
    Holding::from_position(code, state.position, latest_nav, state.first_buy)
}
