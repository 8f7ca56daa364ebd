use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::{error, warn};

use super::{PortfolioRepository, PortfolioState};
use crate::errors::Result;
use crate::storage::{InMemoryStateStore, StateStore};

/// Shared, persisted portfolio state.
///
/// Mutations go through [`commit`](Self::commit): the change is applied to a
/// copy, the copy is saved, and only then does it replace the live state. Any
/// failure along the way leaves the last-good state in place.
pub struct PortfolioStore {
    state: RwLock<PortfolioState>,
    repository: PortfolioRepository,
    first_run: bool,
}

impl PortfolioStore {
    /// Loads state from `store`, or starts empty on first run.
    pub fn open(store: Arc<dyn StateStore>, ledger_cap: usize) -> Result<Self> {
        let repository = PortfolioRepository::new(store);
        let loaded = repository.load(ledger_cap)?;
        Ok(Self {
            state: RwLock::new(loaded.state),
            repository,
            first_run: loaded.first_run,
        })
    }

    /// Empty state backed by an [`InMemoryStateStore`].
    pub fn in_memory(ledger_cap: usize) -> Self {
        Self {
            state: RwLock::new(PortfolioState::empty(ledger_cap)),
            repository: PortfolioRepository::new(Arc::new(InMemoryStateStore::new())),
            first_run: true,
        }
    }

    /// Whether no ledger had been saved when the store was opened.
    pub fn is_first_run(&self) -> bool {
        self.first_run
    }

    pub fn read<R>(&self, f: impl FnOnce(&PortfolioState) -> R) -> R {
        f(&self.read_guard())
    }

    pub fn snapshot(&self) -> PortfolioState {
        self.read_guard().clone()
    }

    /// Applies `f` to a copy of the state, persists it, then swaps it in.
    ///
    /// Writers are serialized. The lock is never held across an await.
    pub fn commit<R>(&self, f: impl FnOnce(&mut PortfolioState) -> Result<R>) -> Result<R> {
        let mut guard = self.write_guard();
        let mut next = guard.clone();
        let result = f(&mut next)?;
        if let Err(e) = self.repository.save(&next) {
            error!("Failed to persist portfolio state: {}", e);
            return Err(e);
        }
        *guard = next;
        Ok(result)
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, PortfolioState> {
        self.state.read().unwrap_or_else(|poisoned| {
            warn!("Portfolio state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, PortfolioState> {
        self.state.write().unwrap_or_else(|poisoned| {
            warn!("Portfolio state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}
