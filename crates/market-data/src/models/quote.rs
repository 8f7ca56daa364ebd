use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Same-day NAV estimate for a fund.
///
/// Only used to seed the "latest NAV" for display and valuation; never used
/// as a settlement price.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestQuote {
    /// Estimated (or last published) unit NAV
    pub nav: Decimal,

    /// Trading day the estimate refers to
    pub date: NaiveDate,

    /// Estimated change versus previous close, in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub est_pct: Option<Decimal>,
}

impl LatestQuote {
    pub fn new(nav: Decimal, date: NaiveDate) -> Self {
        Self {
            nav,
            date,
            est_pct: None,
        }
    }
}
