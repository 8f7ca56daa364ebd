//! Per-fund circuit breaker for fetch failures.
//!
//! A fund whose source keeps failing is blocked for a cooldown instead of
//! being refetched on every reconciliation trigger. After the cooldown one
//! trial fetch goes through: success closes the circuit, failure reopens it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{info, warn};

/// Observable state of a fund's circuit.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CircuitState {
    Closed,
    Open,
    /// Cooldown elapsed, a trial fetch is in progress.
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
enum Circuit {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen,
}

impl Circuit {
    fn state(&self) -> CircuitState {
        match self {
            Self::Closed { .. } => CircuitState::Closed,
            Self::Open { .. } => CircuitState::Open,
            Self::HalfOpen => CircuitState::HalfOpen,
        }
    }
}

#[derive(Clone, Debug)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open a fund's circuit.
    pub failure_threshold: u32,
    /// How long an open circuit blocks fetches.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(60),
        }
    }
}

/// Tracks fetch outcomes per fund code. Funds never seen are closed.
#[derive(Default)]
pub struct CircuitBreaker {
    circuits: Mutex<HashMap<String, Circuit>>,
    config: CircuitBreakerConfig,
}

impl CircuitBreaker {
    pub fn with_config(config: CircuitBreakerConfig) -> Self {
        Self {
            circuits: Mutex::new(HashMap::new()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Circuit>> {
        self.circuits.lock().unwrap_or_else(|poisoned| {
            warn!("Circuit breaker mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Whether a fetch for `code` may go out now.
    ///
    /// An open circuit whose cooldown has elapsed moves to half-open and lets
    /// the caller through.
    pub fn is_allowed(&self, code: &str) -> bool {
        let mut circuits = self.lock();
        let Some(circuit) = circuits.get_mut(code) else {
            return true;
        };
        match *circuit {
            Circuit::Closed { .. } | Circuit::HalfOpen => true,
            Circuit::Open { since } if since.elapsed() >= self.config.cooldown => {
                info!("Cooldown over for {}, allowing a trial fetch", code);
                *circuit = Circuit::HalfOpen;
                true
            }
            Circuit::Open { .. } => false,
        }
    }

    pub fn record_success(&self, code: &str) {
        let mut circuits = self.lock();
        if let Some(Circuit::HalfOpen) = circuits.remove(code) {
            info!("Fetches for {} recovered, closing circuit", code);
        }
    }

    pub fn record_failure(&self, code: &str) {
        let mut circuits = self.lock();
        let circuit = circuits
            .entry(code.to_string())
            .or_insert(Circuit::Closed { failures: 0 });
        *circuit = match *circuit {
            Circuit::Closed { failures } if failures + 1 < self.config.failure_threshold => {
                Circuit::Closed {
                    failures: failures + 1,
                }
            }
            Circuit::Closed { failures } => {
                warn!("Opening circuit for {} after {} failures", code, failures + 1);
                Circuit::Open {
                    since: Instant::now(),
                }
            }
            Circuit::HalfOpen => {
                warn!("Trial fetch for {} failed, reopening circuit", code);
                Circuit::Open {
                    since: Instant::now(),
                }
            }
            open @ Circuit::Open { .. } => open,
        };
    }

    pub fn state(&self, code: &str) -> CircuitState {
        self.lock()
            .get(code)
            .map_or(CircuitState::Closed, Circuit::state)
    }

    /// Forgets a fund's history, e.g. after the fund was removed.
    pub fn reset(&self, code: &str) {
        self.lock().remove(code);
    }
}
