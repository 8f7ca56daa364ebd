//! Live reconciliation of holdings against NAV data.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use log::{debug, info, warn};
use rust_decimal::Decimal;

use super::{reconcile_from, reconcile_key};
use crate::errors::Result;
use crate::events::{DomainEvent, DomainEventSink};
use crate::holdings::Holding;
use crate::nav::NavResolver;
use crate::operations::Operation;
use crate::state::PortfolioStore;

/// Follow-up passes allowed for one call before giving up on a fund that
/// keeps changing underneath.
const MAX_PASSES: usize = 8;

/// What a reconciliation call did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The holding was replaced (`Some`) or removed (`None`).
    Updated(Option<Holding>),
    /// Nothing relevant changed since the last applied pass.
    Unchanged,
    /// The ledger changed while NAVs were being resolved; the result was
    /// discarded.
    Stale,
    /// A pass for the fund is already running; it will run once more after
    /// finishing.
    Deferred,
    /// No NAV or no ledger history for the fund, nothing to do.
    Skipped,
}

#[derive(Debug, Default)]
struct ReconcileGuard {
    in_flight: HashSet<String>,
    dirty: HashSet<String>,
    applied_keys: HashMap<String, String>,
}

/// Marks a fund as having a pass in flight until released or dropped.
struct InFlight<'a> {
    service: &'a ReconcileService,
    code: String,
    released: bool,
}

impl<'a> InFlight<'a> {
    /// `None` if a pass for the fund is already running; the fund is then
    /// marked dirty so that pass runs once more.
    fn enter(service: &'a ReconcileService, code: &str) -> Option<Self> {
        let mut guard = service.lock_guard();
        if !guard.in_flight.insert(code.to_string()) {
            guard.dirty.insert(code.to_string());
            return None;
        }
        Some(Self {
            service,
            code: code.to_string(),
            released: false,
        })
    }

    /// Ends the pass under the caller's lock, so no trigger slips in between
    /// the rerun decision and the release.
    fn release(mut self, guard: &mut ReconcileGuard) {
        guard.in_flight.remove(&self.code);
        self.released = true;
    }
}

impl Drop for InFlight<'_> {
    // Reached without `release` only when the pass future was cancelled.
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let mut guard = self.service.lock_guard();
        guard.in_flight.remove(&self.code);
        guard.dirty.remove(&self.code);
        debug!("Reconcile for {} was cancelled", self.code);
    }
}

struct PassInput {
    operations: Vec<Operation>,
    baseline: Option<Holding>,
}

/// Keeps each fund's holding equal to the replay of its ledger.
///
/// At most one pass per fund runs at a time. Triggers that arrive while a
/// pass is in flight are coalesced into exactly one follow-up pass.
pub struct ReconcileService {
    store: Arc<PortfolioStore>,
    resolver: NavResolver,
    event_sink: Arc<dyn DomainEventSink>,
    guard: Mutex<ReconcileGuard>,
}

impl ReconcileService {
    pub fn new(
        store: Arc<PortfolioStore>,
        resolver: NavResolver,
        event_sink: Arc<dyn DomainEventSink>,
    ) -> Self {
        Self {
            store,
            resolver,
            event_sink,
            guard: Mutex::new(ReconcileGuard::default()),
        }
    }

    fn lock_guard(&self) -> MutexGuard<'_, ReconcileGuard> {
        self.guard.lock().unwrap_or_else(|poisoned| {
            warn!("Reconcile guard mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Reconciles one fund, coalescing with a pass already in flight.
    ///
    /// Cancel-safe: dropping the returned future mid-pass releases the fund,
    /// and the next trigger runs a fresh pass.
    pub async fn reconcile_fund(&self, code: &str) -> Result<ReconcileOutcome> {
        let Some(in_flight) = InFlight::enter(self, code) else {
            debug!("Reconcile for {} already in flight, deferring", code);
            return Ok(ReconcileOutcome::Deferred);
        };

        let mut passes = 0;
        loop {
            passes += 1;
            let result = self.run_pass(code).await;

            let mut guard = self.lock_guard();
            let rerun_requested = guard.dirty.remove(code);
            let rerun = match &result {
                Ok(ReconcileOutcome::Stale) => true,
                Ok(_) => rerun_requested,
                Err(_) => false,
            };
            if !rerun || passes >= MAX_PASSES {
                in_flight.release(&mut guard);
                if rerun {
                    warn!("Reconcile for {} still changing after {} passes", code, passes);
                }
                return result;
            }
            debug!("Running follow-up reconcile pass for {}", code);
        }
    }

    /// Reconciles every fund with a holding or ledger history.
    pub async fn reconcile_all(&self) -> Vec<(String, Result<ReconcileOutcome>)> {
        let codes = self.store.read(|state| state.tracked_codes());
        let mut outcomes = Vec::with_capacity(codes.len());
        for code in codes {
            let outcome = self.reconcile_fund(&code).await;
            outcomes.push((code, outcome));
        }
        outcomes
    }

    /// Key of the last pass applied for a fund.
    pub fn applied_key(&self, code: &str) -> Option<String> {
        self.lock_guard().applied_keys.get(code).cloned()
    }

    /// Forgets per-fund bookkeeping, e.g. after the fund was removed.
    pub fn forget(&self, code: &str) {
        let mut guard = self.lock_guard();
        guard.applied_keys.remove(code);
        guard.dirty.remove(code);
    }

    async fn run_pass(&self, code: &str) -> Result<ReconcileOutcome> {
        let input = self.store.read(|state| {
            let operations: Vec<Operation> =
                state.ledger.for_code(code).into_iter().cloned().collect();
            let tracked =
                !operations.is_empty() || state.ledger.baselines().contains_key(code);
            tracked.then(|| PassInput {
                operations,
                baseline: state.ledger.baseline(code).cloned(),
            })
        });
        let Some(PassInput {
            mut operations,
            baseline,
        }) = input
        else {
            return Ok(ReconcileOutcome::Skipped);
        };

        let Some(latest_nav) = self.resolver.latest_nav(code).await? else {
            debug!("No NAV for {} yet, skipping reconcile", code);
            return Ok(ReconcileOutcome::Skipped);
        };

        let key = reconcile_key(baseline.as_ref(), &operations, latest_nav);
        if self.lock_guard().applied_keys.get(code) == Some(&key) {
            return Ok(ReconcileOutcome::Unchanged);
        }

        let resolved = self.resolve_missing_navs(code, &operations).await;
        for (id, nav) in &resolved {
            if let Some(op) = operations.iter_mut().find(|op| &op.id == id) {
                op.backfill_nav(*nav);
            }
        }
        let holding = reconcile_from(code, baseline.as_ref(), &operations, latest_nav);

        let applied = self.store.commit(|state| {
            let current_key = reconcile_key(
                state.ledger.baseline(code),
                state.ledger.for_code(code),
                latest_nav,
            );
            if current_key != key {
                return Ok(None);
            }
            for (id, nav) in &resolved {
                state.ledger.backfill_nav(id, *nav);
            }
            let changed = state.set_holding(code, holding.clone());
            let applied_key = reconcile_key(
                state.ledger.baseline(code),
                state.ledger.for_code(code),
                latest_nav,
            );
            Ok(Some((changed, applied_key)))
        })?;

        let Some((changed, applied_key)) = applied else {
            debug!("Ledger for {} changed during reconcile, discarding result", code);
            return Ok(ReconcileOutcome::Stale);
        };
        self.lock_guard()
            .applied_keys
            .insert(code.to_string(), applied_key);

        if !changed {
            return Ok(ReconcileOutcome::Unchanged);
        }
        info!(
            "Reconciled {}: {}",
            code,
            holding
                .as_ref()
                .and_then(|h| h.shares)
                .map_or_else(|| "no holding".to_string(), |s| format!("{} shares", s))
        );
        self.event_sink
            .emit(DomainEvent::holding_updated(code, holding.clone()));
        Ok(ReconcileOutcome::Updated(holding))
    }

    /// Resolves settlement NAVs still missing from trades.
    ///
    /// Failures are logged and left unresolved; the replay then prices those
    /// trades at the latest NAV.
    async fn resolve_missing_navs(
        &self,
        code: &str,
        operations: &[Operation],
    ) -> Vec<(String, Decimal)> {
        let mut resolved = Vec::new();
        for op in operations.iter().filter(|op| op.needs_nav()) {
            match self.resolver.resolve(code, op.date, op.timing).await {
                Ok(Some(nav)) => resolved.push((op.id.clone(), nav)),
                Ok(None) => debug!(
                    "Settlement NAV for {} on {} ({}) not published yet",
                    code, op.date, op.timing
                ),
                Err(e) => warn!(
                    "Could not resolve settlement NAV for operation {}: {}",
                    op.id, e
                ),
            }
        }
        resolved
    }
}
