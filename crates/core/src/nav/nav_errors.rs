use navledger_market_data::{MarketDataError, RetryClass};
use rust_decimal::Decimal;
use thiserror::Error;

/// Outcome of a NAV lookup: `Ok(None)` means no NAV exists (yet).
pub type NavResult = std::result::Result<Option<Decimal>, NavError>;

/// NAV data could not be obtained.
///
/// Always transient from the caller's point of view: nothing is cached for a
/// failed lookup, so a later trigger retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error("NAV data for fund {code} unavailable: {reason}")]
    Unavailable {
        code: String,
        reason: MarketDataError,
    },
}

impl NavError {
    pub fn unavailable(code: impl Into<String>, reason: MarketDataError) -> Self {
        Self::Unavailable {
            code: code.into(),
            reason,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Unavailable { code, .. } => code,
        }
    }

    /// Whether the fund's circuit was open, so no fetch was attempted.
    pub fn is_circuit_open(&self) -> bool {
        match self {
            Self::Unavailable { reason, .. } => reason.retry_class() == RetryClass::CircuitOpen,
        }
    }
}
