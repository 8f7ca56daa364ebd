#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use serde_json::Value;
    use tempfile::tempdir;

    use crate::errors::{Error, Result, StorageError};
    use crate::holdings::{Holding, HoldingMethod};
    use crate::operations::{Operation, OperationKind, OperationMeta, TradeDetails};
    use crate::reconcile::reconcile_key;
    use crate::state::PortfolioStore;
    use crate::storage::{InMemoryStateStore, JsonFileStateStore, StateStore};
    use crate::timing::{SettlementRules, SettlementTiming};

    /// Store whose writes can be switched off.
    #[derive(Default)]
    struct FlakyStore {
        inner: InMemoryStateStore,
        failing: AtomicBool,
    }

    impl StateStore for FlakyStore {
        fn load(&self, key: &str) -> Result<Option<Value>> {
            self.inner.load(key)
        }

        fn save(&self, key: &str, value: &Value) -> Result<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StorageError::Io("disk full".to_string()).into());
            }
            self.inner.save(key, value)
        }
    }

    fn add_op(code: &str) -> Operation {
        Operation::build(
            code,
            OperationKind::Add(TradeDetails {
                method: HoldingMethod::Amount,
                amount: Some(dec!(1000)),
                shares: None,
                nav: Some(dec!(1.25)),
                fee_rate: dec!(0),
                fee: dec!(0),
            }),
            None,
            Some(Holding::by_shares(code, dec!(800), dec!(1.25))),
            OperationMeta {
                date: chrono::NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
                timing: SettlementTiming::Before,
                is_qdii: false,
            },
            Utc.with_ymd_and_hms(2024, 5, 10, 2, 0, 0).unwrap(),
            &SettlementRules::default(),
        )
    }

    #[test]
    fn test_first_run_detection() {
        let backing: Arc<dyn StateStore> = Arc::new(InMemoryStateStore::new());
        let store = PortfolioStore::open(backing.clone(), 200).unwrap();
        assert!(store.is_first_run());

        store.commit(|_| Ok(())).unwrap();
        let reopened = PortfolioStore::open(backing, 200).unwrap();
        assert!(!reopened.is_first_run());
        assert!(reopened.read(|s| s.ledger.is_empty()));
    }

    #[test]
    fn test_commit_persists_and_reloads() {
        let dir = tempdir().unwrap();
        let backing: Arc<dyn StateStore> = Arc::new(JsonFileStateStore::open(dir.path()).unwrap());
        let store = PortfolioStore::open(backing.clone(), 200).unwrap();
        let op = add_op("110022");
        let op_id = op.id.clone();

        store
            .commit(|state| {
                state.set_holding("110022", op.next.clone());
                state.select("110022");
                state.ledger.record(op);
                Ok(())
            })
            .unwrap();

        let reopened = PortfolioStore::open(backing, 200).unwrap();
        let state = reopened.snapshot();
        assert_eq!(state.ledger.len(), 1);
        assert!(state.ledger.get(&op_id).is_some());
        assert_eq!(state.selection, vec!["110022".to_string()]);
        assert_eq!(
            state.holding("110022").and_then(|h| h.shares),
            Some(dec!(800))
        );
    }

    #[test]
    fn test_reload_keeps_decimals_exact() {
        let dir = tempdir().unwrap();
        let backing: Arc<dyn StateStore> = Arc::new(JsonFileStateStore::open(dir.path()).unwrap());
        let store = PortfolioStore::open(backing.clone(), 200).unwrap();
        // 28 significant digits, more than an f64 carries.
        let shares = dec!(1000) / dec!(1.3);
        let mut op = add_op("110022");
        op.next = Some(Holding::by_shares("110022", shares, dec!(1.3)));
        let key_of = |state: &crate::state::PortfolioState| {
            reconcile_key(
                state.ledger.baseline("110022"),
                state.ledger.for_code("110022"),
                dec!(1.3),
            )
        };

        store
            .commit(|state| {
                state.set_holding("110022", op.next.clone());
                state.ledger.record(op);
                Ok(())
            })
            .unwrap();
        let before = store.snapshot();

        let after = PortfolioStore::open(backing, 200).unwrap().snapshot();
        assert_eq!(after.holding("110022").and_then(|h| h.shares), Some(shares));
        assert_eq!(after.ledger.entries(), before.ledger.entries());
        assert_eq!(key_of(&after), key_of(&before));
    }

    #[test]
    fn test_failed_save_keeps_last_good_state() {
        let backing = Arc::new(FlakyStore::default());
        let store = PortfolioStore::open(backing.clone(), 200).unwrap();
        store
            .commit(|state| {
                state.select("110022");
                Ok(())
            })
            .unwrap();

        backing.failing.store(true, Ordering::SeqCst);
        let err = store
            .commit(|state| {
                state.select("161725");
                state.ledger.record(add_op("161725"));
                Ok(())
            })
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        let state = store.snapshot();
        assert_eq!(state.selection, vec!["110022".to_string()]);
        assert!(state.ledger.is_empty());
    }

    #[test]
    fn test_failed_mutation_keeps_last_good_state() {
        let store = PortfolioStore::in_memory(200);
        let result: Result<()> = store.commit(|state| {
            state.select("110022");
            Err(Error::Unexpected("boom".to_string()))
        });

        assert!(result.is_err());
        assert!(store.read(|s| s.selection.is_empty()));
    }

    #[test]
    fn test_tracked_codes_cover_holdings_and_ledger() {
        let store = PortfolioStore::in_memory(200);
        store
            .commit(|state| {
                state.set_holding("110022", Some(Holding::by_shares("110022", dec!(1), dec!(1))));
                state.ledger.record(add_op("161725"));
                Ok(())
            })
            .unwrap();

        let codes: Vec<String> = store.read(|s| s.tracked_codes().into_iter().collect());
        assert_eq!(codes, vec!["110022".to_string(), "161725".to_string()]);
    }
}
