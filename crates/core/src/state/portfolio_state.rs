use std::collections::{BTreeMap, BTreeSet};

use crate::holdings::Holding;
use crate::operations::OperationLedger;

/// Everything the engine persists: the ledger, current holdings and the
/// user's fund selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortfolioState {
    pub ledger: OperationLedger,
    pub holdings: BTreeMap<String, Holding>,
    /// Funds shown to the user, in display order.
    pub selection: Vec<String>,
}

impl PortfolioState {
    pub fn empty(ledger_cap: usize) -> Self {
        Self {
            ledger: OperationLedger::new(ledger_cap),
            ..Self::default()
        }
    }

    pub fn holding(&self, code: &str) -> Option<&Holding> {
        self.holdings.get(code)
    }

    /// Replaces or removes a fund's holding. Returns true if it changed.
    pub fn set_holding(&mut self, code: &str, holding: Option<Holding>) -> bool {
        match holding {
            Some(holding) => {
                let changed = self.holdings.get(code) != Some(&holding);
                self.holdings.insert(code.to_string(), holding);
                changed
            }
            None => self.holdings.remove(code).is_some(),
        }
    }

    /// Adds a fund to the selection if it is not there yet.
    pub fn select(&mut self, code: &str) {
        if !self.selection.iter().any(|c| c == code) {
            self.selection.push(code.to_string());
        }
    }

    pub fn deselect(&mut self, code: &str) {
        self.selection.retain(|c| c != code);
    }

    /// Funds with a holding or ledger history.
    pub fn tracked_codes(&self) -> BTreeSet<String> {
        self.holdings
            .keys()
            .cloned()
            .chain(self.ledger.entries().iter().map(|op| op.code.clone()))
            .collect()
    }
}
