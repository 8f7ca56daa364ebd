use std::collections::BTreeSet;
use std::iter;
use std::sync::Arc;

use chrono::NaiveDate;
use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::trades_model::{
    trade_kind, BatchImportResult, TradeInput, TradeReceipt, TradeRequest, TradeSide,
};
use crate::errors::{Error, Result, ValidationError};
use crate::events::{DomainEvent, DomainEventSink};
use crate::holdings::Holding;
use crate::nav::NavResolver;
use crate::operations::{Operation, OperationKind, OperationMeta};
use crate::reconcile::{reconcile_from, ReconcileOutcome, ReconcileService};
use crate::settings::LedgerSettings;
use crate::state::PortfolioStore;
use crate::timing::{default_timing, is_qdii_fund, order_date, SettlementRules, SettlementTiming};
use crate::utils::time_utils::Clock;

/// Entry point for every user-facing ledger mutation.
///
/// NAV lookups happen before anything is committed; the commit itself is
/// synchronous, so a failed lookup or validation leaves holdings and ledger
/// untouched.
pub struct TradeService {
    store: Arc<PortfolioStore>,
    resolver: NavResolver,
    reconciler: Arc<ReconcileService>,
    settings: LedgerSettings,
    rules: SettlementRules,
    event_sink: Arc<dyn DomainEventSink>,
    clock: Arc<dyn Clock>,
}

impl TradeService {
    pub fn new(
        store: Arc<PortfolioStore>,
        resolver: NavResolver,
        reconciler: Arc<ReconcileService>,
        settings: LedgerSettings,
        event_sink: Arc<dyn DomainEventSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let rules = settings.settlement_rules();
        Self {
            store,
            resolver,
            reconciler,
            settings,
            rules,
            event_sink,
            clock,
        }
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    // --- Reads ---

    pub fn holding(&self, code: &str) -> Option<Holding> {
        self.store.read(|state| state.holding(code).cloned())
    }

    pub fn holdings(&self) -> Vec<Holding> {
        self.store
            .read(|state| state.holdings.values().cloned().collect())
    }

    pub fn selection(&self) -> Vec<String> {
        self.store.read(|state| state.selection.clone())
    }

    /// A fund's operations, newest first.
    pub fn operations(&self, code: &str) -> Vec<Operation> {
        self.store.read(|state| {
            state
                .ledger
                .entries()
                .iter()
                .filter(|op| op.code == code)
                .cloned()
                .collect()
        })
    }

    pub fn pending_operations(&self) -> Vec<Operation> {
        self.store.read(|state| {
            state
                .ledger
                .entries()
                .iter()
                .filter(|op| !op.is_confirmed())
                .cloned()
                .collect()
        })
    }

    // --- Mutations ---

    /// Stamps an operation with the current time and the settlement rules.
    pub fn build_trade_operation(
        &self,
        code: &str,
        kind: OperationKind,
        prev: Option<Holding>,
        next: Option<Holding>,
        meta: OperationMeta,
    ) -> Operation {
        Operation::build(code, kind, prev, next, meta, self.clock.now(), &self.rules)
    }

    /// Records a buy or sell.
    ///
    /// Blocks with [`Error::InsufficientNavData`] while the settlement NAV is
    /// not published, and with [`Error::Nav`] when it cannot be fetched.
    pub async fn submit_trade(&self, request: TradeRequest) -> Result<TradeReceipt> {
        request.validate()?;
        let code = request.code.trim().to_string();
        let now = self.clock.now();
        let date = request.date.unwrap_or_else(|| order_date(now, &self.rules));
        let timing = request
            .timing
            .unwrap_or_else(|| default_timing(now, &self.rules));
        let is_qdii = request.is_qdii.unwrap_or_else(|| {
            request
                .fund_name
                .as_deref()
                .is_some_and(is_qdii_fund)
        });

        if request.side == TradeSide::Reduce && self.holding(&code).is_none() {
            return Err(Error::HoldingNotFound(code));
        }
        let nav = self.settlement_nav(&code, date, timing).await?;

        let kind = trade_kind(request.side, request.amount, request.shares, request.fee_rate, nav);
        let meta = OperationMeta {
            date,
            timing,
            is_qdii,
        };
        let operation = self.store.commit(|state| {
            let prev = state.holding(&code).cloned();
            let operation = self.fold_trade(&code, kind, prev, meta, nav)?;
            state.ledger.record(operation.clone());
            state.set_holding(&code, operation.next.clone());
            state.select(&code);
            Ok(operation)
        })?;

        info!(
            "Recorded {} {} for {} at NAV {} ({} {})",
            operation.operation_type(),
            operation.id,
            code,
            nav,
            date,
            timing
        );
        self.event_sink.emit_batch(vec![
            DomainEvent::operations_recorded(&code, vec![operation.id.clone()]),
            DomainEvent::holding_updated(&code, operation.next.clone()),
        ]);
        self.reconcile_quietly(&code).await;

        Ok(TradeReceipt {
            holding: self.holding(&code),
            operation,
        })
    }

    /// Overrides a fund's holding and records the override as an edit.
    ///
    /// `None` clears the holding while keeping the fund selected.
    pub async fn edit_holding(&self, code: &str, holding: Option<Holding>) -> Result<Operation> {
        if let Some(holding) = &holding {
            holding.validate()?;
            if holding.code != code {
                return Err(ValidationError::InvalidInput(format!(
                    "holding code {} does not match {}",
                    holding.code, code
                ))
                .into());
            }
        }

        let now = self.clock.now();
        let meta = OperationMeta {
            date: order_date(now, &self.rules),
            timing: default_timing(now, &self.rules),
            is_qdii: false,
        };
        let operation = self.store.commit(|state| {
            let prev = state.holding(code).cloned();
            let operation =
                self.build_trade_operation(code, OperationKind::Edit, prev, holding.clone(), meta);
            state.ledger.record(operation.clone());
            state.set_holding(code, holding.clone());
            state.select(code);
            Ok(operation)
        })?;

        info!("Recorded edit {} for {}", operation.id, code);
        self.event_sink.emit_batch(vec![
            DomainEvent::operations_recorded(code, vec![operation.id.clone()]),
            DomainEvent::holding_updated(code, holding),
        ]);
        self.reconcile_quietly(code).await;
        Ok(operation)
    }

    /// Imports a sequence of trades for one fund, all or nothing.
    ///
    /// Every settlement NAV is resolved first. Items are then chained through
    /// a running holding so each operation's `prev` is the previous item's
    /// `next`, and the final holding is committed with the whole batch.
    pub async fn import_batch(
        &self,
        code: &str,
        items: Vec<TradeInput>,
        fund_name: Option<&str>,
    ) -> Result<BatchImportResult> {
        if items.is_empty() {
            return Err(ValidationError::InvalidInput("empty batch".to_string()).into());
        }
        for (idx, item) in items.iter().enumerate() {
            item.validate().map_err(|e| {
                Error::Validation(ValidationError::InvalidInput(format!("item {}: {}", idx + 1, e)))
            })?;
        }

        let mut navs = Vec::with_capacity(items.len());
        for item in &items {
            navs.push(self.settlement_nav(code, item.date, item.timing).await?);
        }

        let is_qdii = fund_name.is_some_and(is_qdii_fund);
        let (operations, holding) = self.store.commit(|state| {
            let mut running = state.holding(code).cloned();
            let mut operations = Vec::with_capacity(items.len());
            for (item, nav) in items.iter().zip(&navs) {
                let kind = trade_kind(item.side, item.amount, item.shares, item.fee_rate, *nav);
                let meta = OperationMeta {
                    date: item.date,
                    timing: item.timing,
                    is_qdii,
                };
                let operation = self.fold_trade(code, kind, running.take(), meta, *nav)?;
                running = operation.next.clone();
                operations.push(operation);
            }
            state.ledger.record_batch(operations.clone());
            state.set_holding(code, running.clone());
            state.select(code);
            Ok((operations, running))
        })?;

        info!("Imported {} operations for {}", operations.len(), code);
        self.event_sink.emit_batch(vec![
            DomainEvent::operations_recorded(code, operations.iter().map(|op| op.id.clone()).collect()),
            DomainEvent::holding_updated(code, holding.clone()),
        ]);
        self.reconcile_quietly(code).await;

        Ok(BatchImportResult {
            operations,
            holding,
        })
    }

    /// Reverts one operation: its `prev` snapshot becomes the holding again
    /// and the operation leaves the ledger. Other operations are untouched.
    pub fn undo(&self, operation_id: &str) -> Result<Option<Holding>> {
        let operation = self.store.commit(|state| {
            let operation = state
                .ledger
                .remove(operation_id)
                .ok_or_else(|| Error::OperationNotFound(operation_id.to_string()))?;
            state.set_holding(&operation.code, operation.prev.clone());
            Ok(operation)
        })?;

        info!("Undid {} {} for {}", operation.operation_type(), operation.id, operation.code);
        self.event_sink.emit_batch(vec![
            DomainEvent::operation_removed(&operation.code, &operation.id),
            DomainEvent::holding_updated(&operation.code, operation.prev.clone()),
        ]);
        Ok(operation.prev)
    }

    /// Drops a fund: holding, selection entry, operations and cached NAVs.
    ///
    /// Returns how many operations were purged.
    pub fn remove_fund(&self, code: &str) -> Result<usize> {
        let purged = self.store.commit(|state| {
            state.set_holding(code, None);
            state.deselect(code);
            Ok(state.ledger.purge_code(code))
        })?;
        self.resolver.invalidate(code);
        self.reconciler.forget(code);

        info!("Removed fund {} ({} operations purged)", code, purged);
        self.event_sink.emit(DomainEvent::fund_removed(code));
        Ok(purged)
    }

    /// Confirms pending operations whose time has come and reconciles the
    /// affected funds. Returns the ids of confirmed operations.
    pub async fn refresh_statuses(&self) -> Result<Vec<String>> {
        let now = self.clock.now();
        let due = self.store.read(|state| {
            state
                .ledger
                .entries()
                .iter()
                .any(|op| !op.is_confirmed() && now >= op.apply_at)
        });
        if !due {
            return Ok(Vec::new());
        }

        let flipped: Vec<(String, String)> = self.store.commit(|state| {
            Ok(state
                .ledger
                .refresh_statuses(now)
                .into_iter()
                .map(|op| (op.id.clone(), op.code.clone()))
                .collect())
        })?;
        if flipped.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<String> = flipped.iter().map(|(id, _)| id.clone()).collect();
        debug!("Confirmed {} operations", ids.len());
        self.event_sink
            .emit(DomainEvent::operations_confirmed(ids.clone()));

        let codes: BTreeSet<String> = flipped.into_iter().map(|(_, code)| code).collect();
        for code in codes {
            self.reconcile_quietly(&code).await;
        }
        Ok(ids)
    }

    /// Re-derives a fund's holding after its price moved.
    pub async fn on_price_update(&self, code: &str) -> Result<ReconcileOutcome> {
        self.reconciler.reconcile_fund(code).await
    }

    // --- Internals ---

    async fn settlement_nav(
        &self,
        code: &str,
        date: NaiveDate,
        timing: SettlementTiming,
    ) -> Result<Decimal> {
        self.resolver
            .resolve(code, date, timing)
            .await?
            .ok_or_else(|| Error::InsufficientNavData {
                code: code.to_string(),
                date,
                timing,
            })
    }

    /// Builds a trade operation on top of `prev` and computes its `next`.
    fn fold_trade(
        &self,
        code: &str,
        kind: OperationKind,
        prev: Option<Holding>,
        meta: OperationMeta,
        nav: Decimal,
    ) -> Result<Operation> {
        if matches!(kind, OperationKind::Reduce(_)) && prev.is_none() {
            return Err(Error::HoldingNotFound(code.to_string()));
        }
        let mut operation = self.build_trade_operation(code, kind, prev, None, meta);
        let next = reconcile_from(code, operation.prev.as_ref(), iter::once(&operation), nav);
        operation.next = next;
        Ok(operation)
    }

    async fn reconcile_quietly(&self, code: &str) {
        match self.reconciler.reconcile_fund(code).await {
            Ok(outcome) => debug!("Reconcile after mutation of {}: {:?}", code, outcome),
            Err(e) => warn!("Reconcile of {} failed, keeping recorded holding: {}", code, e),
        }
    }
}
