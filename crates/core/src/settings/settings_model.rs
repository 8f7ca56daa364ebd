//! Engine configuration.
//!
//! Settings have sensible defaults and can be overridden from the environment
//! (`NAVLEDGER_*` variables). Unparseable overrides are logged and ignored.

use std::str::FromStr;
use std::time::Duration;

use chrono::NaiveTime;
use chrono_tz::Tz;
use log::warn;

use crate::constants::{DEFAULT_CUTOFF_HOUR, DEFAULT_LEDGER_CAP, DEFAULT_MARKET_TZ};
use crate::errors::{Error, Result};
use crate::timing::SettlementRules;

pub const ENV_LEDGER_CAP: &str = "NAVLEDGER_LEDGER_CAP";
pub const ENV_CUTOFF_HOUR: &str = "NAVLEDGER_CUTOFF_HOUR";
pub const ENV_MARKET_TZ: &str = "NAVLEDGER_MARKET_TZ";
pub const ENV_STATUS_POLL_SECS: &str = "NAVLEDGER_STATUS_POLL_SECS";
pub const ENV_PAGE_REFRESH_SECS: &str = "NAVLEDGER_PAGE_REFRESH_SECS";
pub const ENV_FETCH_FAILURE_THRESHOLD: &str = "NAVLEDGER_FETCH_FAILURE_THRESHOLD";
pub const ENV_FETCH_COOLDOWN_SECS: &str = "NAVLEDGER_FETCH_COOLDOWN_SECS";

#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSettings {
    /// Maximum operations retained by the ledger.
    pub ledger_cap: usize,
    /// Daily order cutoff hour, fund-market local time.
    pub cutoff_hour: u32,
    pub market_tz: Tz,
    /// How often pending operations are checked for confirmation.
    pub status_poll_interval: Duration,
    /// Minimum age of the cached newest NAV page before a lookup past the
    /// newest published NAV refetches it.
    pub page_refresh_interval: Duration,
    /// Consecutive fetch failures that open a fund's circuit.
    pub fetch_failure_threshold: u32,
    /// How long an open circuit blocks fetches for a fund.
    pub fetch_cooldown: Duration,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            ledger_cap: DEFAULT_LEDGER_CAP,
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
            market_tz: default_market_tz(),
            status_poll_interval: Duration::from_secs(60),
            page_refresh_interval: Duration::from_secs(10 * 60),
            fetch_failure_threshold: 3,
            fetch_cooldown: Duration::from_secs(60),
        }
    }
}

impl LedgerSettings {
    /// Builds settings from the process environment on top of the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds settings from an arbitrary key lookup on top of the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let settings = Self {
            ledger_cap: parse_or(&lookup, ENV_LEDGER_CAP, defaults.ledger_cap),
            cutoff_hour: parse_or(&lookup, ENV_CUTOFF_HOUR, defaults.cutoff_hour),
            market_tz: lookup(ENV_MARKET_TZ)
                .and_then(|raw| match raw.parse::<Tz>() {
                    Ok(tz) => Some(tz),
                    Err(e) => {
                        warn!("Ignoring {}='{}': {}", ENV_MARKET_TZ, raw, e);
                        None
                    }
                })
                .unwrap_or(defaults.market_tz),
            status_poll_interval: Duration::from_secs(parse_or(
                &lookup,
                ENV_STATUS_POLL_SECS,
                defaults.status_poll_interval.as_secs(),
            )),
            page_refresh_interval: Duration::from_secs(parse_or(
                &lookup,
                ENV_PAGE_REFRESH_SECS,
                defaults.page_refresh_interval.as_secs(),
            )),
            fetch_failure_threshold: parse_or(
                &lookup,
                ENV_FETCH_FAILURE_THRESHOLD,
                defaults.fetch_failure_threshold,
            ),
            fetch_cooldown: Duration::from_secs(parse_or(
                &lookup,
                ENV_FETCH_COOLDOWN_SECS,
                defaults.fetch_cooldown.as_secs(),
            )),
        };

        match settings.validate() {
            Ok(()) => settings,
            Err(e) => {
                warn!("Invalid ledger settings ({}), falling back to defaults", e);
                defaults
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.ledger_cap == 0 {
            return Err(Error::InvalidConfigValue(
                "ledger_cap must be at least 1".to_string(),
            ));
        }
        if self.cutoff_hour > 23 {
            return Err(Error::InvalidConfigValue(format!(
                "cutoff_hour {} is not an hour of the day",
                self.cutoff_hour
            )));
        }
        if self.status_poll_interval.is_zero() {
            return Err(Error::InvalidConfigValue(
                "status_poll_interval must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// The timing parameters used by the settlement model.
    pub fn settlement_rules(&self) -> SettlementRules {
        let cutoff = NaiveTime::from_hms_opt(self.cutoff_hour, 0, 0)
            .unwrap_or_else(SettlementRules::default_cutoff);
        SettlementRules {
            cutoff,
            market_tz: self.market_tz,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(e) => {
                warn!("Ignoring {}='{}': {}", key, raw, e);
                default
            }
        },
        None => default,
    }
}

/// Parses the configured default market timezone.
pub fn default_market_tz() -> Tz {
    Tz::from_str(DEFAULT_MARKET_TZ).unwrap_or(chrono_tz::Asia::Shanghai)
}
