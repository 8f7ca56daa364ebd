//! Fund data provider trait definitions.

use async_trait::async_trait;

use crate::errors::MarketDataError;
use crate::models::{LatestQuote, NavHistoryPage};

/// Trait for remote fund data sources.
///
/// Timeouts are the implementation's responsibility; the resolver treats any
/// error as "no data for this attempt" and allows a later retry.
///
/// # Example
///
/// ```ignore
/// use async_trait::async_trait;
/// use navledger_market_data::{FundDataProvider, LatestQuote, MarketDataError, NavHistoryPage};
///
/// struct FixtureProvider;
///
/// #[async_trait]
/// impl FundDataProvider for FixtureProvider {
///     fn id(&self) -> &'static str {
///         "FIXTURE"
///     }
///
///     async fn fetch_history_page(
///         &self,
///         code: &str,
///         page: u32,
///     ) -> Result<NavHistoryPage, MarketDataError> {
///         Ok(NavHistoryPage::new(page, Vec::new(), 1))
///     }
///
///     async fn fetch_latest_quote(
///         &self,
///         code: &str,
///     ) -> Result<Option<LatestQuote>, MarketDataError> {
///         Ok(None)
///     }
/// }
/// ```
#[async_trait]
pub trait FundDataProvider: Send + Sync {
    /// Unique identifier for this provider, used for logging.
    fn id(&self) -> &'static str;

    /// Fetch one page of the fund's historical NAV table.
    ///
    /// # Arguments
    ///
    /// * `code` - Fund code
    /// * `page` - 1-based page number; page 1 holds the most recent rows
    ///
    /// # Returns
    ///
    /// The page rows and the total page count reported by the source.
    async fn fetch_history_page(
        &self,
        code: &str,
        page: u32,
    ) -> Result<NavHistoryPage, MarketDataError>;

    /// Fetch the same-day estimate for a fund.
    ///
    /// Returns `Ok(None)` when the source publishes no estimate for the fund.
    async fn fetch_latest_quote(&self, code: &str) -> Result<Option<LatestQuote>, MarketDataError>;
}
