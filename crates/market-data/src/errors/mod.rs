//! Error types and retry classification for the market data crate.
//!
//! This module provides:
//! - [`MarketDataError`]: The main error enum for all fund data operations
//! - [`RetryClass`]: Classification for determining retry behavior

mod retry;

pub use retry::RetryClass;

use thiserror::Error;

/// Errors that can occur while talking to a fund data provider.
///
/// Each variant is classified into a [`RetryClass`] via the [`retry_class`](Self::retry_class)
/// method, which tells the NAV resolver whether a later attempt may succeed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MarketDataError {
    /// The provider does not know this fund code.
    /// This is a terminal error - retrying won't help.
    #[error("Fund not found: {0}")]
    FundNotFound(String),

    /// The requested history page is past the end of the table.
    #[error("Page {page} out of range for fund {code}")]
    PageOutOfRange {
        /// Fund code
        code: String,
        /// Requested page (1-based)
        page: u32,
    },

    /// The provider rate limited the request (HTTP 429).
    #[error("Rate limited: {provider}")]
    RateLimited {
        /// The provider that rate limited the request
        provider: String,
    },

    /// The request to the provider timed out.
    #[error("Timeout: {provider}")]
    Timeout {
        /// The provider that timed out
        provider: String,
    },

    /// The provider answered but the payload could not be parsed.
    #[error("Parse error: {provider} - {message}")]
    Parse {
        /// The provider that returned the payload
        provider: String,
        /// Parser message
        message: String,
    },

    /// A provider-specific error occurred.
    #[error("Provider error: {provider} - {message}")]
    ProviderError {
        /// The provider that returned the error
        provider: String,
        /// The error message from the provider
        message: String,
    },

    /// The circuit breaker is open for this fund.
    /// Skip fetching until the circuit closes.
    #[error("Circuit open: {code}")]
    CircuitOpen {
        /// The fund code with an open circuit
        code: String,
    },

    /// A transport-level error occurred while communicating with a provider.
    #[error("Network error: {0}")]
    Network(String),
}

impl MarketDataError {
    /// Returns the retry classification for this error.
    ///
    /// - [`RetryClass::Never`]: the request is invalid, retrying won't help
    /// - [`RetryClass::Transient`]: a later trigger may succeed
    /// - [`RetryClass::CircuitOpen`]: skipped because the fund's circuit is open
    ///
    /// # Examples
    ///
    /// ```
    /// use navledger_market_data::errors::{MarketDataError, RetryClass};
    ///
    /// let error = MarketDataError::RateLimited { provider: "EASTMONEY".to_string() };
    /// assert_eq!(error.retry_class(), RetryClass::Transient);
    ///
    /// let error = MarketDataError::FundNotFound("000000".to_string());
    /// assert_eq!(error.retry_class(), RetryClass::Never);
    /// ```
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::FundNotFound(_) | Self::PageOutOfRange { .. } => RetryClass::Never,

            Self::RateLimited { .. }
            | Self::Timeout { .. }
            | Self::Parse { .. }
            | Self::ProviderError { .. }
            | Self::Network(_) => RetryClass::Transient,

            Self::CircuitOpen { .. } => RetryClass::CircuitOpen,
        }
    }

    /// Whether this failure should count against the fund's circuit.
    pub fn counts_as_failure(&self) -> bool {
        self.retry_class() == RetryClass::Transient
    }
}
