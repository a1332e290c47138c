//! Exponential backoff for repeated accept failures.

use std::time::Duration;

/// First delay after a failed accept.
pub const ACCEPT_BACKOFF_BASE_MS: u64 = 10;

/// Ceiling for the delay between accept attempts.
pub const ACCEPT_BACKOFF_MAX_MS: u64 = 1000;

/// Delay before accept attempt number `failures + 1`.
///
/// Zero after a success; doubles per consecutive failure up to `max_ms`.
pub fn calculate_backoff(failures: u32, base_ms: u64, max_ms: u64) -> Duration {
    if failures == 0 {
        return Duration::ZERO;
    }

    let exponential_base = 2u64.saturating_pow(failures - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    Duration::from_millis(delay_ms.min(max_ms))
}
