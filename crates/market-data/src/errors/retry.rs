/// Classification for retry policy.
///
/// Used by the NAV resolver to decide whether a failed fetch may be
/// attempted again on a later trigger.
///
/// # Behavior Summary
///
/// | Class | Retry on next trigger? | Record Circuit Breaker Failure? |
/// |-------|------------------------|--------------------------------|
/// | `Never` | No | No |
/// | `Transient` | Yes | Yes |
/// | `CircuitOpen` | After recovery timeout | No (already recorded) |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - unknown fund or a page past the end of the table.
    Never,

    /// Network, timeout, rate limit or parse failure.
    ///
    /// Never cached as a negative result. The failure is recorded in the
    /// circuit breaker, which suppresses fetches for the fund after
    /// repeated failures.
    Transient,

    /// Circuit breaker is open for this fund.
    CircuitOpen,
}
