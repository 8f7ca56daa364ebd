#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone, Utc};
    use navledger_market_data::{
        FundDataProvider, LatestQuote, MarketDataError, NavHistoryPage, NavRecord,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::events::{DomainEvent, MockDomainEventSink};
    use crate::holdings::{Holding, HoldingMethod};
    use crate::nav::NavResolver;
    use crate::operations::{Operation, OperationKind, OperationMeta, TradeDetails};
    use crate::reconcile::{ReconcileOutcome, ReconcileService};
    use crate::settings::LedgerSettings;
    use crate::state::PortfolioStore;
    use crate::timing::{SettlementRules, SettlementTiming};

    const CODE: &str = "110022";

    // --- Mock provider ---

    struct MockProvider {
        /// Single page, newest first.
        rows: Vec<NavRecord>,
        quote: Mutex<Option<Decimal>>,
        quote_delay: Option<Duration>,
        quote_calls: AtomicUsize,
        page_calls: AtomicUsize,
    }

    impl MockProvider {
        fn new(rows: Vec<NavRecord>, quote: Option<Decimal>) -> Self {
            Self {
                rows,
                quote: Mutex::new(quote),
                quote_delay: None,
                quote_calls: AtomicUsize::new(0),
                page_calls: AtomicUsize::new(0),
            }
        }

        fn slow(mut self) -> Self {
            self.quote_delay = Some(Duration::from_millis(20));
            self
        }
    }

    #[async_trait]
    impl FundDataProvider for MockProvider {
        fn id(&self) -> &'static str {
            "MOCK"
        }

        async fn fetch_history_page(
            &self,
            code: &str,
            page: u32,
        ) -> Result<NavHistoryPage, MarketDataError> {
            self.page_calls.fetch_add(1, Ordering::SeqCst);
            if page > 1 || self.rows.is_empty() {
                return Err(MarketDataError::PageOutOfRange {
                    code: code.to_string(),
                    page,
                });
            }
            Ok(NavHistoryPage::new(1, self.rows.clone(), 1))
        }

        async fn fetch_latest_quote(
            &self,
            _code: &str,
        ) -> Result<Option<LatestQuote>, MarketDataError> {
            self.quote_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.quote_delay {
                tokio::time::sleep(delay).await;
            }
            let nav = *self.quote.lock().unwrap();
            Ok(nav.map(|nav| LatestQuote::new(nav, d("2024-05-14"))))
        }
    }

    // --- Helpers ---

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn history() -> Vec<NavRecord> {
        vec![
            NavRecord::new(d("2024-05-13"), dec!(1.3000)),
            NavRecord::new(d("2024-05-10"), dec!(1.2500)),
            NavRecord::new(d("2024-05-09"), dec!(1.2000)),
        ]
    }

    fn trade(kind: fn(TradeDetails) -> OperationKind, amount: Option<Decimal>, shares: Option<Decimal>, date: &str) -> Operation {
        let details = TradeDetails {
            method: if shares.is_some() {
                HoldingMethod::Shares
            } else {
                HoldingMethod::Amount
            },
            amount,
            shares,
            nav: None,
            fee_rate: Decimal::ZERO,
            fee: Decimal::ZERO,
        };
        Operation::build(
            CODE,
            kind(details),
            None,
            None,
            OperationMeta {
                date: d(date),
                timing: SettlementTiming::Before,
                is_qdii: false,
            },
            Utc.with_ymd_and_hms(2024, 5, 14, 0, 0, 0).unwrap(),
            &SettlementRules::default(),
        )
    }

    fn buy(amount: Decimal, date: &str) -> Operation {
        trade(OperationKind::Add, Some(amount), None, date)
    }

    fn sell(shares: Decimal, date: &str) -> Operation {
        trade(OperationKind::Reduce, None, Some(shares), date)
    }

    struct Fixture {
        store: Arc<PortfolioStore>,
        provider: Arc<MockProvider>,
        events: MockDomainEventSink,
        service: ReconcileService,
    }

    fn fixture(provider: MockProvider, ops: Vec<Operation>) -> Fixture {
        let store = Arc::new(PortfolioStore::in_memory(200));
        store
            .commit(|state| {
                for op in ops {
                    state.ledger.record(op);
                }
                Ok(())
            })
            .unwrap();
        let provider = Arc::new(provider);
        let resolver = NavResolver::new(provider.clone(), &LedgerSettings::default());
        let events = MockDomainEventSink::new();
        let service = ReconcileService::new(store.clone(), resolver, Arc::new(events.clone()));
        Fixture {
            store,
            provider,
            events,
            service,
        }
    }

    // --- Passes ---

    #[tokio::test]
    async fn test_pass_updates_holding_and_backfills_nav() {
        let op = buy(dec!(1000), "2024-05-10");
        let op_id = op.id.clone();
        let fx = fixture(MockProvider::new(history(), Some(dec!(1.30))), vec![op]);

        let outcome = fx.service.reconcile_fund(CODE).await.unwrap();

        let ReconcileOutcome::Updated(Some(holding)) = outcome else {
            panic!("expected an updated holding, got {:?}", outcome);
        };
        assert_eq!(holding.shares, Some(dec!(800)));
        assert_eq!(holding.amount, Some(dec!(1040)));
        assert_eq!(holding.profit, Some(dec!(40)));
        assert_eq!(fx.store.read(|s| s.holding(CODE).cloned()), Some(holding));
        assert_eq!(
            fx.store.read(|s| s.ledger.get(&op_id).and_then(|op| op.settlement_nav())),
            Some(dec!(1.2500))
        );
        assert!(matches!(
            fx.events.events().as_slice(),
            [DomainEvent::HoldingChanged { .. }]
        ));
        assert!(fx.service.applied_key(CODE).is_some());
    }

    #[tokio::test]
    async fn test_repeat_pass_is_unchanged() {
        let fx = fixture(
            MockProvider::new(history(), Some(dec!(1.30))),
            vec![buy(dec!(1000), "2024-05-10")],
        );

        fx.service.reconcile_fund(CODE).await.unwrap();
        let page_calls = fx.provider.page_calls.load(Ordering::SeqCst);
        let outcome = fx.service.reconcile_fund(CODE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert_eq!(fx.provider.page_calls.load(Ordering::SeqCst), page_calls);
        assert_eq!(fx.events.len(), 1);
    }

    #[tokio::test]
    async fn test_full_sell_removes_holding() {
        let fx = fixture(
            MockProvider::new(history(), Some(dec!(1.30))),
            vec![buy(dec!(1000), "2024-05-10"), sell(dec!(800), "2024-05-13")],
        );

        let outcome = fx.service.reconcile_fund(CODE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Unchanged);
        assert!(fx.store.read(|s| s.holding(CODE).is_none()));
    }

    #[tokio::test]
    async fn test_full_sell_of_existing_holding_emits_removal() {
        let fx = fixture(
            MockProvider::new(history(), Some(dec!(1.30))),
            vec![sell(dec!(100), "2024-05-13")],
        );
        fx.store
            .commit(|state| {
                state.set_holding(CODE, Some(Holding::by_shares(CODE, dec!(100), dec!(1))));
                Ok(())
            })
            .unwrap();

        let outcome = fx.service.reconcile_fund(CODE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Updated(None));
        assert_eq!(
            fx.events.events(),
            vec![DomainEvent::HoldingRemoved {
                code: CODE.to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_unresolved_settlement_prices_at_latest() {
        // 05-11 is not a trading day, so a before-cutoff order stays unresolved.
        let op = buy(dec!(1300), "2024-05-11");
        let op_id = op.id.clone();
        let fx = fixture(MockProvider::new(history(), Some(dec!(1.30))), vec![op]);

        fx.service.reconcile_fund(CODE).await.unwrap();

        let holding = fx.store.read(|s| s.holding(CODE).cloned()).unwrap();
        assert_eq!(holding.shares, Some(dec!(1000)));
        assert!(fx.store.read(|s| s.ledger.get(&op_id).unwrap().needs_nav()));
    }

    #[tokio::test]
    async fn test_untracked_fund_is_skipped() {
        let fx = fixture(MockProvider::new(history(), Some(dec!(1.30))), Vec::new());
        let manual = Holding::by_shares(CODE, dec!(10), dec!(1));
        fx.store
            .commit(|state| {
                state.set_holding(CODE, Some(manual.clone()));
                Ok(())
            })
            .unwrap();

        let outcome = fx.service.reconcile_fund(CODE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert_eq!(fx.store.read(|s| s.holding(CODE).cloned()), Some(manual));
        assert_eq!(fx.provider.quote_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_latest_nav_is_skipped() {
        let fx = fixture(
            MockProvider::new(Vec::new(), None),
            vec![buy(dec!(1000), "2024-05-10")],
        );

        let outcome = fx.service.reconcile_fund(CODE).await.unwrap();

        assert_eq!(outcome, ReconcileOutcome::Skipped);
        assert!(fx.store.read(|s| s.holding(CODE).is_none()));
    }

    // --- Concurrency ---

    #[tokio::test]
    async fn test_trigger_during_pass_is_coalesced() {
        let fx = fixture(
            MockProvider::new(history(), Some(dec!(1.30))).slow(),
            vec![buy(dec!(1000), "2024-05-10")],
        );

        let (first, second) = tokio::join!(fx.service.reconcile_fund(CODE), async {
            tokio::task::yield_now().await;
            fx.service.reconcile_fund(CODE).await
        });

        assert_eq!(second.unwrap(), ReconcileOutcome::Deferred);
        // The deferred trigger ran as one follow-up pass on the first call.
        assert_eq!(first.unwrap(), ReconcileOutcome::Unchanged);
        assert_eq!(fx.provider.quote_calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            fx.store.read(|s| s.holding(CODE).and_then(|h| h.shares)),
            Some(dec!(800))
        );
    }

    #[tokio::test]
    async fn test_stale_pass_is_discarded_and_rerun() {
        let fx = fixture(
            MockProvider::new(history(), Some(dec!(1.30))).slow(),
            vec![buy(dec!(1000), "2024-05-10")],
        );
        let late = buy(dec!(1300), "2024-05-13");
        let store = fx.store.clone();

        let (outcome, _) = tokio::join!(fx.service.reconcile_fund(CODE), async move {
            tokio::task::yield_now().await;
            store
                .commit(|state| {
                    state.ledger.record(late);
                    Ok(())
                })
                .unwrap();
        });

        // The first pass saw only one buy; its result must not survive.
        let ReconcileOutcome::Updated(Some(holding)) = outcome.unwrap() else {
            panic!("expected the follow-up pass to apply");
        };
        assert_eq!(holding.shares, Some(dec!(1800)));
        assert_eq!(fx.provider.quote_calls.load(Ordering::SeqCst), 2);
        assert_eq!(fx.events.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_pass_releases_fund() {
        let fx = fixture(
            MockProvider::new(history(), Some(dec!(1.30))).slow(),
            vec![buy(dec!(1000), "2024-05-10")],
        );

        // Dropped while waiting on the quote.
        let cancelled =
            tokio::time::timeout(Duration::from_millis(5), fx.service.reconcile_fund(CODE)).await;
        assert!(cancelled.is_err());
        assert!(fx.store.read(|s| s.holding(CODE).is_none()));

        let outcome = fx.service.reconcile_fund(CODE).await.unwrap();
        assert!(matches!(outcome, ReconcileOutcome::Updated(Some(_))));
        assert_eq!(
            fx.service.reconcile_fund(CODE).await.unwrap(),
            ReconcileOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_reconcile_all_visits_tracked_funds() {
        let fx = fixture(
            MockProvider::new(history(), Some(dec!(1.30))),
            vec![buy(dec!(1000), "2024-05-10")],
        );

        let outcomes = fx.service.reconcile_all().await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].0, CODE);
        assert!(matches!(
            outcomes[0].1,
            Ok(ReconcileOutcome::Updated(Some(_)))
        ));
    }
}
