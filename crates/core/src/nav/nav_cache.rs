//! Per-fund cache of fetched NAV history pages.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use navledger_market_data::{NavHistoryPage, NavRecord};
use rust_decimal::Decimal;

#[derive(Debug, Clone)]
struct CachedPage {
    rows: Vec<NavRecord>,
    fetched_at: Instant,
}

#[derive(Debug, Clone, Default)]
struct FundTable {
    pages: BTreeMap<u32, CachedPage>,
    total_pages: u32,
}

/// Fetched history pages keyed by (fund, page number).
///
/// Pages are newest-first, so page 1 is the only one whose content changes as
/// new NAVs are published. Refetching a page merges its rows into the cached
/// ones instead of replacing them; rows that slid onto the next page stay
/// visible until that page is fetched.
#[derive(Debug, Default)]
pub struct NavTableCache {
    funds: HashMap<String, FundTable>,
}

impl NavTableCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a fetched page and the page count the provider reported with it.
    pub fn insert_page(&mut self, code: &str, page: NavHistoryPage) {
        let table = self.funds.entry(code.to_string()).or_default();
        table.total_pages = page.total_pages.max(page.page);
        let fetched_at = Instant::now();
        match table.pages.get_mut(&page.page) {
            Some(cached) => {
                let mut merged: BTreeMap<NaiveDate, Decimal> =
                    cached.rows.iter().map(|r| (r.date, r.nav)).collect();
                merged.extend(page.rows.into_iter().map(|r| (r.date, r.nav)));
                cached.rows = merged
                    .into_iter()
                    .map(|(date, nav)| NavRecord::new(date, nav))
                    .collect();
                cached.fetched_at = fetched_at;
            }
            None => {
                table.pages.insert(
                    page.page,
                    CachedPage {
                        rows: page.rows,
                        fetched_at,
                    },
                );
            }
        }
    }

    /// Lowers the known page count after the provider rejected a page.
    pub fn truncate_pages(&mut self, code: &str, total_pages: u32) {
        if let Some(table) = self.funds.get_mut(code) {
            table.total_pages = total_pages;
            table.pages.retain(|number, _| *number <= total_pages);
        }
    }

    pub fn page(&self, code: &str, number: u32) -> Option<&[NavRecord]> {
        self.funds
            .get(code)
            .and_then(|t| t.pages.get(&number))
            .map(|p| p.rows.as_slice())
    }

    pub fn has_page(&self, code: &str, number: u32) -> bool {
        self.page(code, number).is_some()
    }

    /// Time since a page was last fetched.
    pub fn page_age(&self, code: &str, number: u32) -> Option<Duration> {
        self.funds
            .get(code)
            .and_then(|t| t.pages.get(&number))
            .map(|p| p.fetched_at.elapsed())
    }

    pub fn total_pages(&self, code: &str) -> Option<u32> {
        self.funds.get(code).map(|t| t.total_pages)
    }

    /// Every cached row of a fund, ascending by date, one row per date.
    ///
    /// When two pages disagree about a date the lower page number wins, since
    /// it was published more recently.
    pub fn records(&self, code: &str) -> Vec<NavRecord> {
        let Some(table) = self.funds.get(code) else {
            return Vec::new();
        };
        let mut by_date: BTreeMap<NaiveDate, Decimal> = BTreeMap::new();
        for page in table.pages.values() {
            for row in &page.rows {
                by_date.entry(row.date).or_insert(row.nav);
            }
        }
        by_date
            .into_iter()
            .map(|(date, nav)| NavRecord::new(date, nav))
            .collect()
    }

    pub fn latest_date(&self, code: &str) -> Option<NaiveDate> {
        self.dates(code).max()
    }

    pub fn earliest_date(&self, code: &str) -> Option<NaiveDate> {
        self.dates(code).min()
    }

    /// Whether every page the provider reported has been fetched.
    pub fn is_exhausted(&self, code: &str) -> bool {
        self.funds.get(code).is_some_and(|t| {
            (1..=t.total_pages).all(|number| t.pages.contains_key(&number))
        })
    }

    /// Lowest reported page that is not cached yet.
    pub fn next_missing_page(&self, code: &str) -> Option<u32> {
        let table = self.funds.get(code)?;
        (1..=table.total_pages).find(|number| !table.pages.contains_key(number))
    }

    /// Drops everything cached for a fund.
    pub fn evict(&mut self, code: &str) -> bool {
        self.funds.remove(code).is_some()
    }

    fn dates<'a>(&'a self, code: &str) -> impl Iterator<Item = NaiveDate> + 'a {
        self.funds
            .get(code)
            .into_iter()
            .flat_map(|t| t.pages.values())
            .flat_map(|p| p.rows.iter().map(|r| r.date))
    }
}
