//! Human duration strings for the countdown.
//!
//! Grammar: `<digits><unit>` with unit one of `yr`, `mo`, `w`, `d`, `h`, `m`, `s`.
//! Years are 365 days, months 30 days, weeks 7 days. No fractions, no
//! combined units, no whitespace, case-sensitive. Spans longer than
//! [`MAX_DURATION`] are rejected so every deadline stays representable.

use std::time::Duration;
use thiserror::Error;

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;
const SECS_PER_WEEK: u64 = 7 * SECS_PER_DAY;
const SECS_PER_MONTH: u64 = 30 * SECS_PER_DAY;
const SECS_PER_YEAR: u64 = 365 * SECS_PER_DAY;

/// Longest accepted countdown: 100 years.
pub const MAX_DURATION: Duration = Duration::from_secs(100 * SECS_PER_YEAR);

/// Rejected duration string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid duration format: {input:?} ({reason}); use a form like 1yr, 1mo, 1w, 2d, 3h, 30m, 45s")]
pub struct DurationError {
    pub input: String,
    pub reason: &'static str,
}

impl DurationError {
    fn new(input: &str, reason: &'static str) -> Self {
        Self {
            input: input.to_string(),
            reason,
        }
    }
}

/// Parse a duration such as `30m` or `1yr`.
pub fn parse_duration(input: &str) -> Result<Duration, DurationError> {
    if input.is_empty() {
        return Err(DurationError::new(input, "empty string"));
    }

    let digits_end = input
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(input.len());

    if digits_end == 0 {
        return Err(DurationError::new(input, "missing leading integer"));
    }
    let (number, unit) = input.split_at(digits_end);

    let unit_secs = match unit {
        "yr" => SECS_PER_YEAR,
        "mo" => SECS_PER_MONTH,
        "w" => SECS_PER_WEEK,
        "d" => SECS_PER_DAY,
        "h" => SECS_PER_HOUR,
        "m" => SECS_PER_MINUTE,
        "s" => 1,
        "" => return Err(DurationError::new(input, "missing unit")),
        _ => return Err(DurationError::new(input, "unknown unit")),
    };

    let value: u64 = number
        .parse()
        .map_err(|_| DurationError::new(input, "integer out of range"))?;

    let secs = value
        .checked_mul(unit_secs)
        .ok_or_else(|| DurationError::new(input, "duration overflows"))?;
    if secs > MAX_DURATION.as_secs() {
        return Err(DurationError::new(input, "duration too large"));
    }
    Ok(Duration::from_secs(secs))
}
