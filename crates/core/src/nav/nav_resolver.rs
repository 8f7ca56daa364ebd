//! Settlement NAV resolution with single-flight fetching.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::{BoxFuture, FutureExt, Shared};
use log::{debug, warn};
use navledger_market_data::{
    CircuitBreaker, CircuitBreakerConfig, CircuitState, FundDataProvider, MarketDataError,
};
use rust_decimal::Decimal;

use super::nav_cache::NavTableCache;
use super::nav_errors::{NavError, NavResult};
use crate::settings::LedgerSettings;
use crate::timing::{select_nav, SettlementTiming};
use crate::utils::decimal_utils::positive;

/// Upper bound on page fetches a single lookup may issue.
const MAX_FETCHES_PER_LOOKUP: usize = 64;

/// Identity of a NAV lookup. Shared by the result cache and the in-flight map.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NavKey {
    pub code: String,
    pub date: NaiveDate,
    pub timing: SettlementTiming,
}

impl NavKey {
    pub fn new(code: &str, date: NaiveDate, timing: SettlementTiming) -> Self {
        Self {
            code: code.to_string(),
            date,
            timing,
        }
    }
}

type PendingLookup = Shared<BoxFuture<'static, NavResult>>;

enum ScanStep {
    Found(Decimal),
    NotFound,
    Fetch(u32),
}

enum PageFetch {
    Stored,
    OutOfRange,
}

struct ResolverInner {
    provider: Arc<dyn FundDataProvider>,
    tables: Mutex<NavTableCache>,
    results: Mutex<HashMap<NavKey, Decimal>>,
    pending: Mutex<HashMap<NavKey, PendingLookup>>,
    breaker: CircuitBreaker,
    page_refresh_interval: Duration,
}

/// Resolves the NAV a trade settles at.
///
/// Lookups go through three layers: resolved results, the cached page table,
/// then the provider. Concurrent lookups for the same key share one in-flight
/// future. Only positive outcomes are cached; failures and "no NAV yet" are
/// retried on the next call.
///
/// Cloning is cheap and clones share all caches.
#[derive(Clone)]
pub struct NavResolver {
    inner: Arc<ResolverInner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        warn!("NAV resolver mutex was poisoned, recovering");
        poisoned.into_inner()
    })
}

impl NavResolver {
    pub fn new(provider: Arc<dyn FundDataProvider>, settings: &LedgerSettings) -> Self {
        let breaker_config = CircuitBreakerConfig {
            failure_threshold: settings.fetch_failure_threshold.max(1),
            cooldown: settings.fetch_cooldown,
        };
        Self::with_config(provider, breaker_config, settings.page_refresh_interval)
    }

    pub fn with_config(
        provider: Arc<dyn FundDataProvider>,
        breaker_config: CircuitBreakerConfig,
        page_refresh_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(ResolverInner {
                provider,
                tables: Mutex::new(NavTableCache::new()),
                results: Mutex::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                breaker: CircuitBreaker::with_config(breaker_config),
                page_refresh_interval,
            }),
        }
    }

    /// Settlement NAV for an order, `Ok(None)` if none is published yet.
    pub async fn resolve(&self, code: &str, date: NaiveDate, timing: SettlementTiming) -> NavResult {
        let key = NavKey::new(code, date, timing);
        if let Some(nav) = self.cached_result(&key) {
            return Ok(Some(nav));
        }

        let lookup = {
            let mut pending = lock(&self.inner.pending);
            match pending.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let inner = Arc::clone(&self.inner);
                    let lookup_key = key.clone();
                    let lookup = async move {
                        let result = inner.lookup(&lookup_key).await;
                        if let Ok(Some(nav)) = result {
                            lock(&inner.results).insert(lookup_key.clone(), nav);
                        }
                        lock(&inner.pending).remove(&lookup_key);
                        result
                    }
                    .boxed()
                    .shared();
                    pending.insert(key, lookup.clone());
                    lookup
                }
            }
        };
        lookup.await
    }

    /// Previously resolved NAV for a key, without any fetching.
    pub fn cached_result(&self, key: &NavKey) -> Option<Decimal> {
        lock(&self.inner.results).get(key).copied()
    }

    /// Display NAV for a fund: the same-day estimate if the provider has one,
    /// otherwise the newest historical NAV.
    pub async fn latest_nav(&self, code: &str) -> NavResult {
        self.inner.latest_nav(code).await
    }

    /// Drops cached pages, results and the circuit state for a fund.
    pub fn invalidate(&self, code: &str) {
        lock(&self.inner.tables).evict(code);
        lock(&self.inner.results).retain(|key, _| key.code != code);
        self.inner.breaker.reset(code);
        debug!("Invalidated NAV caches for {}", code);
    }

    pub fn circuit_state(&self, code: &str) -> CircuitState {
        self.inner.breaker.state(code)
    }
}

impl ResolverInner {
    async fn lookup(&self, key: &NavKey) -> NavResult {
        let mut head_refreshed = false;
        for _ in 0..MAX_FETCHES_PER_LOOKUP {
            match self.scan(key, head_refreshed) {
                ScanStep::Found(nav) => return Ok(Some(nav)),
                ScanStep::NotFound => return Ok(None),
                ScanStep::Fetch(page) => {
                    if page == 1 {
                        head_refreshed = true;
                    }
                    match self.fetch_page(&key.code, page).await? {
                        PageFetch::Stored => {}
                        PageFetch::OutOfRange if page == 1 => return Ok(None),
                        PageFetch::OutOfRange => {
                            lock(&self.tables).truncate_pages(&key.code, page - 1);
                        }
                    }
                }
            }
        }
        warn!(
            "Gave up resolving NAV for {} on {} ({}) after {} page fetches",
            key.code, key.date, key.timing, MAX_FETCHES_PER_LOOKUP
        );
        Ok(None)
    }

    /// Decides the next step of a lookup from the cached table alone.
    fn scan(&self, key: &NavKey, head_refreshed: bool) -> ScanStep {
        let tables = lock(&self.tables);
        let code = key.code.as_str();
        if !tables.has_page(code, 1) {
            return ScanStep::Fetch(1);
        }

        // Pages are newest-first: until the table reaches back to the order
        // date, an older page may still hold the settlement NAV.
        let covers_date = tables.earliest_date(code).is_some_and(|e| e <= key.date);
        if !covers_date && !tables.is_exhausted(code) {
            if let Some(page) = tables.next_missing_page(code) {
                return ScanStep::Fetch(page);
            }
        }

        let records = tables.records(code);
        if let Some(record) = select_nav(&records, key.date, key.timing) {
            return ScanStep::Found(record.nav);
        }

        let past_newest = tables.latest_date(code).map_or(true, |l| key.date >= l);
        let head_stale = tables
            .page_age(code, 1)
            .map_or(true, |age| age >= self.page_refresh_interval);
        if past_newest && head_stale && !head_refreshed {
            return ScanStep::Fetch(1);
        }
        ScanStep::NotFound
    }

    async fn fetch_page(&self, code: &str, page: u32) -> Result<PageFetch, NavError> {
        if !self.breaker.is_allowed(code) {
            debug!("Circuit open for {}, skipping page {} fetch", code, page);
            return Err(NavError::unavailable(
                code,
                MarketDataError::CircuitOpen {
                    code: code.to_string(),
                },
            ));
        }

        debug!(
            "Fetching NAV history page {} for {} from {}",
            page,
            code,
            self.provider.id()
        );
        match self.provider.fetch_history_page(code, page).await {
            Ok(fetched) => {
                self.breaker.record_success(code);
                lock(&self.tables).insert_page(code, fetched);
                Ok(PageFetch::Stored)
            }
            Err(MarketDataError::PageOutOfRange { .. }) => {
                self.breaker.record_success(code);
                debug!("Page {} for {} is past the end of the table", page, code);
                Ok(PageFetch::OutOfRange)
            }
            Err(e) => {
                if e.counts_as_failure() {
                    self.breaker.record_failure(code);
                }
                warn!("Failed to fetch page {} for {}: {}", page, code, e);
                Err(NavError::unavailable(code, e))
            }
        }
    }

    async fn latest_nav(&self, code: &str) -> NavResult {
        if !self.breaker.is_allowed(code) {
            return Err(NavError::unavailable(
                code,
                MarketDataError::CircuitOpen {
                    code: code.to_string(),
                },
            ));
        }

        match self.provider.fetch_latest_quote(code).await {
            Ok(quote) => {
                self.breaker.record_success(code);
                if let Some(nav) = positive(quote.map(|q| q.nav)) {
                    return Ok(Some(nav));
                }
            }
            Err(e) => {
                if e.counts_as_failure() {
                    self.breaker.record_failure(code);
                }
                warn!(
                    "Latest quote for {} failed ({}), falling back to NAV history",
                    code, e
                );
            }
        }

        let has_head = lock(&self.tables).has_page(code, 1);
        if !has_head {
            if let PageFetch::OutOfRange = self.fetch_page(code, 1).await? {
                return Ok(None);
            }
        }
        Ok(positive(
            lock(&self.tables).records(code).last().map(|r| r.nav),
        ))
    }
}
