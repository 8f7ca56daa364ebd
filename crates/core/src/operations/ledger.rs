//! Bounded, newest-first operation ledger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use log::debug;
use rust_decimal::Decimal;

use super::operations_model::Operation;
use crate::constants::DEFAULT_LEDGER_CAP;
use crate::holdings::Holding;

/// Append-only operation log for all funds.
///
/// Entries are kept newest-first and capped; when the cap is exceeded the
/// oldest entries are dropped.
///
/// Each fund also has a replay baseline: the holding as it stood before the
/// fund's oldest retained operation. It is taken from the `prev` snapshot of
/// the fund's first recorded operation and moves forward to the `next`
/// snapshot of every entry dropped at the cap.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationLedger {
    entries: Vec<Operation>,
    baselines: BTreeMap<String, Option<Holding>>,
    cap: usize,
}

impl Default for OperationLedger {
    fn default() -> Self {
        Self::new(DEFAULT_LEDGER_CAP)
    }
}

impl OperationLedger {
    pub fn new(cap: usize) -> Self {
        Self {
            entries: Vec::new(),
            baselines: BTreeMap::new(),
            cap: cap.max(1),
        }
    }

    /// Restores a ledger from persisted parts; entries must be newest-first.
    pub fn from_parts(
        entries: Vec<Operation>,
        baselines: BTreeMap<String, Option<Holding>>,
        cap: usize,
    ) -> Self {
        let mut ledger = Self {
            entries,
            baselines,
            cap: cap.max(1),
        };
        ledger.truncate();
        ledger
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, newest first.
    pub fn entries(&self) -> &[Operation] {
        &self.entries
    }

    pub fn baselines(&self) -> &BTreeMap<String, Option<Holding>> {
        &self.baselines
    }

    /// Holding the replay of a fund's retained operations starts from.
    pub fn baseline(&self, code: &str) -> Option<&Holding> {
        self.baselines.get(code).and_then(Option::as_ref)
    }

    /// Prepends one operation, dropping the oldest beyond the cap.
    pub fn record(&mut self, operation: Operation) {
        self.note_baseline(&operation);
        self.entries.insert(0, operation);
        self.truncate();
    }

    /// Prepends a batch given in the order it happened (oldest first).
    pub fn record_batch(&mut self, operations: Vec<Operation>) {
        for operation in operations {
            self.note_baseline(&operation);
            self.entries.insert(0, operation);
        }
        self.truncate();
    }

    pub fn get(&self, id: &str) -> Option<&Operation> {
        self.entries.iter().find(|op| op.id == id)
    }

    /// Removes an operation; later and earlier entries are untouched.
    pub fn remove(&mut self, id: &str) -> Option<Operation> {
        let idx = self.entries.iter().position(|op| op.id == id)?;
        Some(self.entries.remove(idx))
    }

    /// Operations of one fund in insertion order (oldest first).
    pub fn for_code(&self, code: &str) -> Vec<&Operation> {
        self.entries
            .iter()
            .rev()
            .filter(|op| op.code == code)
            .collect()
    }

    /// Drops every operation and the baseline of a fund.
    pub fn purge_code(&mut self, code: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|op| op.code != code);
        self.baselines.remove(code);
        before - self.entries.len()
    }

    /// Confirms every pending operation whose `apply_at` has passed.
    ///
    /// Returns the operations that flipped.
    pub fn refresh_statuses(&mut self, now: DateTime<Utc>) -> Vec<&Operation> {
        let flipped: Vec<usize> = self
            .entries
            .iter_mut()
            .enumerate()
            .filter_map(|(idx, op)| op.refresh_status(now).then_some(idx))
            .collect();
        flipped.into_iter().map(|idx| &self.entries[idx]).collect()
    }

    /// Fills in a settlement NAV resolved after the operation was recorded.
    pub fn backfill_nav(&mut self, id: &str, nav: Decimal) -> bool {
        self.entries
            .iter_mut()
            .find(|op| op.id == id)
            .map(|op| op.backfill_nav(nav))
            .unwrap_or(false)
    }

    fn note_baseline(&mut self, operation: &Operation) {
        if self.baselines.contains_key(&operation.code)
            || self.entries.iter().any(|op| op.code == operation.code)
        {
            return;
        }
        self.baselines
            .insert(operation.code.clone(), operation.prev.clone());
    }

    fn truncate(&mut self) {
        while self.entries.len() > self.cap {
            if let Some(dropped) = self.entries.pop() {
                debug!(
                    "Ledger cap {} reached, dropping operation {} for {}",
                    self.cap, dropped.id, dropped.code
                );
                self.baselines.insert(dropped.code, dropped.next);
            }
        }
    }
}
