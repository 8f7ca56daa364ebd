use std::fmt;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use navledger_market_data::NavRecord;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::operations::OperationStatus;
use crate::settings::default_market_tz;
use crate::utils::time_utils::{market_local_to_utc, market_date_from_utc};

lazy_static! {
    static ref QDII_NAME_PATTERN: Regex =
        Regex::new(r"(?i)QDII|海外|美股|全球|国际").expect("QDII pattern is valid");
}

/// Whether an order was placed before or after the daily cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettlementTiming {
    Before,
    After,
}

impl fmt::Display for SettlementTiming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Before => write!(f, "before"),
            Self::After => write!(f, "after"),
        }
    }
}

impl SettlementTiming {
    /// Calendar days from the order date to confirmation, before QDII lag.
    fn confirmation_days(&self) -> u64 {
        match self {
            Self::Before => 1,
            Self::After => 2,
        }
    }
}

/// Market parameters the timing rules depend on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SettlementRules {
    /// Daily order cutoff, also the hour of day confirmations land at.
    pub cutoff: NaiveTime,
    pub market_tz: Tz,
}

impl SettlementRules {
    pub fn default_cutoff() -> NaiveTime {
        NaiveTime::from_hms_opt(15, 0, 0).unwrap_or(NaiveTime::MIN)
    }
}

impl Default for SettlementRules {
    fn default() -> Self {
        Self {
            cutoff: Self::default_cutoff(),
            market_tz: default_market_tz(),
        }
    }
}

/// Picks the NAV a trade settles at.
///
/// `records` must be sorted ascending by date. A `Before` order settles at
/// the NAV of the order date itself and never at an adjacent day; an `After`
/// order settles at the first NAV strictly after the order date.
pub fn select_nav(
    records: &[NavRecord],
    date: NaiveDate,
    timing: SettlementTiming,
) -> Option<&NavRecord> {
    match timing {
        SettlementTiming::Before => records
            .binary_search_by(|r| r.date.cmp(&date))
            .ok()
            .map(|idx| &records[idx]),
        SettlementTiming::After => {
            let idx = records.partition_point(|r| r.date <= date);
            records.get(idx)
        }
    }
}

/// Instant at which an operation becomes confirmed.
///
/// Order date at the cutoff hour (market local time), plus one day for
/// `Before` or two for `After`, plus one more for QDII funds.
pub fn apply_at(
    date: NaiveDate,
    timing: SettlementTiming,
    is_qdii: bool,
    rules: &SettlementRules,
) -> DateTime<Utc> {
    let days = timing.confirmation_days() + u64::from(is_qdii);
    let local = (date + Days::new(days)).and_time(rules.cutoff);
    market_local_to_utc(local, rules.market_tz)
}

/// Status of an operation at `now`.
pub fn status_at(apply_at: DateTime<Utc>, now: DateTime<Utc>) -> OperationStatus {
    if now >= apply_at {
        OperationStatus::Confirmed
    } else {
        OperationStatus::Pending
    }
}

/// Timing of an order placed at `now` when the caller did not say.
pub fn default_timing(now: DateTime<Utc>, rules: &SettlementRules) -> SettlementTiming {
    if now.with_timezone(&rules.market_tz).time() < rules.cutoff {
        SettlementTiming::Before
    } else {
        SettlementTiming::After
    }
}

/// Trading date of an order placed at `now`.
pub fn order_date(now: DateTime<Utc>, rules: &SettlementRules) -> NaiveDate {
    market_date_from_utc(now, rules.market_tz)
}

/// Cross-border (QDII) classification from the fund's display name.
pub fn is_qdii_fund(name: &str) -> bool {
    QDII_NAME_PATTERN.is_match(name)
}
