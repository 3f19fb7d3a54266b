/// Classification for retry policy.
///
/// Used by the scheduler to decide what to do after a failed fetch.
///
/// # Behavior Summary
///
/// | Class | Poll again? | Delay |
/// |-------|-------------|-------|
/// | `Never` | No | instrument is suspended until reconfigured |
/// | `WithBackoff` | Yes | exponential backoff keyed to the failure count |
/// | `AfterCooldown` | Yes | fixed cool-down, independent of the backoff curve |
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetryClass {
    /// Never retry - the instrument/exchange/currency combination was
    /// rejected by upstream and retrying won't help.
    Never,

    /// Retry with exponential backoff.
    ///
    /// Used for transport failures and malformed payloads. Upstream
    /// sometimes returns transient garbage, so these are worth retrying,
    /// but each consecutive failure widens the delay.
    WithBackoff,

    /// Retry after a mandatory cool-down.
    ///
    /// Used when upstream signals explicit throttling. The cool-down is
    /// fixed and does not accumulate with the backoff curve.
    AfterCooldown,
}
