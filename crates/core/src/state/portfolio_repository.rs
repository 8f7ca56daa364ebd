//! Typed load/save of portfolio state over a [`StateStore`].

use std::collections::BTreeMap;
use std::sync::Arc;

use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::PortfolioState;
use crate::constants::{
    BASELINES_STORAGE_KEY, HOLDINGS_STORAGE_KEY, OPERATIONS_STORAGE_KEY, SELECTION_STORAGE_KEY,
};
use crate::errors::{Result, StorageError};
use crate::holdings::Holding;
use crate::operations::{Operation, OperationLedger};
use crate::storage::StateStore;

/// State read back from storage.
#[derive(Debug, Clone)]
pub struct LoadedState {
    pub state: PortfolioState,
    /// True when no ledger was ever saved.
    pub first_run: bool,
}

/// Maps [`PortfolioState`] onto storage keys.
///
/// Operations are stored newest-first as a JSON array, holdings as an array
/// of holding objects and the selection as an array of fund codes.
#[derive(Clone)]
pub struct PortfolioRepository {
    store: Arc<dyn StateStore>,
}

impl PortfolioRepository {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store }
    }

    pub fn load(&self, ledger_cap: usize) -> Result<LoadedState> {
        let operations: Option<Vec<Operation>> = self.load_key(OPERATIONS_STORAGE_KEY)?;
        let first_run = operations.is_none();
        let baselines: BTreeMap<String, Option<Holding>> =
            self.load_key(BASELINES_STORAGE_KEY)?.unwrap_or_default();
        let holdings: Vec<Holding> = self.load_key(HOLDINGS_STORAGE_KEY)?.unwrap_or_default();
        let selection: Vec<String> = self.load_key(SELECTION_STORAGE_KEY)?.unwrap_or_default();

        let ledger =
            OperationLedger::from_parts(operations.unwrap_or_default(), baselines, ledger_cap);
        if first_run {
            info!("No stored ledger found, starting empty");
        } else {
            debug!(
                "Loaded {} operations and {} holdings",
                ledger.len(),
                holdings.len()
            );
        }

        Ok(LoadedState {
            state: PortfolioState {
                ledger,
                holdings: holdings.into_iter().map(|h| (h.code.clone(), h)).collect(),
                selection,
            },
            first_run,
        })
    }

    pub fn save(&self, state: &PortfolioState) -> Result<()> {
        self.save_key(OPERATIONS_STORAGE_KEY, state.ledger.entries())?;
        self.save_key(BASELINES_STORAGE_KEY, state.ledger.baselines())?;
        let holdings: Vec<&Holding> = state.holdings.values().collect();
        self.save_key(HOLDINGS_STORAGE_KEY, &holdings)?;
        self.save_key(SELECTION_STORAGE_KEY, &state.selection)?;
        Ok(())
    }

    fn load_key<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.store.load(key)? {
            Some(value) => serde_json::from_value(value).map(Some).map_err(|e| {
                StorageError::Serialization {
                    key: key.to_string(),
                    message: e.to_string(),
                }
                .into()
            }),
            None => Ok(None),
        }
    }

    fn save_key<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|e| StorageError::Serialization {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.store.save(key, &value)
    }
}
