//! Change-detection key for a reconciliation input.

use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use crate::holdings::Holding;
use crate::operations::Operation;

/// Computes a fingerprint of everything a replay depends on.
///
/// Covers the baseline, each operation's identity, status and settlement NAV
/// in the given order, and the latest NAV. Two inputs with the same key
/// replay to the same holding.
pub fn reconcile_key<'a, I>(baseline: Option<&Holding>, operations: I, latest_nav: Decimal) -> String
where
    I: IntoIterator<Item = &'a Operation>,
{
    let mut hasher = Sha256::new();

    if let Some(holding) = baseline {
        for value in [holding.shares, holding.cost_price, holding.amount, holding.profit] {
            hasher.update(value.map(normalize_decimal).unwrap_or_default().as_bytes());
            hasher.update(b",");
        }
    }
    hasher.update(b"|");

    for op in operations {
        hasher.update(op.id.as_bytes());
        hasher.update(b":");
        hasher.update(op.operation_type().to_string().as_bytes());
        hasher.update(b":");
        hasher.update(if op.is_confirmed() { b"c" } else { b"p" });
        hasher.update(b":");
        if let Some(nav) = op.settlement_nav() {
            hasher.update(normalize_decimal(nav).as_bytes());
        }
        hasher.update(b"|");
    }

    hasher.update(normalize_decimal(latest_nav).as_bytes());
    hex::encode(hasher.finalize())
}

fn normalize_decimal(d: Decimal) -> String {
    d.normalize().to_string()
}
