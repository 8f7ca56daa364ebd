use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One row of a fund's historical NAV table.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavRecord {
    /// Fund-local trading day
    pub date: NaiveDate,

    /// Unit net asset value on that day
    pub nav: Decimal,
}

impl NavRecord {
    pub fn new(date: NaiveDate, nav: Decimal) -> Self {
        Self { date, nav }
    }
}

/// One page of a fund's historical NAV table.
///
/// Providers page newest-first: page 1 holds the most recent trading days,
/// higher pages go further back in time. Rows inside a page are not assumed
/// to be in any particular order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavHistoryPage {
    /// 1-based page number
    pub page: u32,

    /// Rows on this page
    pub rows: Vec<NavRecord>,

    /// Number of pages the provider reports for the whole table
    pub total_pages: u32,
}

impl NavHistoryPage {
    pub fn new(page: u32, rows: Vec<NavRecord>, total_pages: u32) -> Self {
        Self {
            page,
            rows,
            total_pages,
        }
    }

    /// Whether the provider reports more pages after this one.
    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    /// Earliest trading day on this page.
    pub fn earliest_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).min()
    }

    /// Latest trading day on this page.
    pub fn latest_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.date).max()
    }
}
