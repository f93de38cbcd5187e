//! Human-readable duration strings such as `1h30m`, `7d` or `250ms`.
//!
//! Accepted units, largest to smallest: `y` (365 days), `w`, `d`, `h`, `m`, `s`, `ms`.
//! Units must appear in that order and at most once each. A bare `0` is accepted
//! without a unit.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

const NANOS_PER_MILLI: u64 = 1_000_000;
const NANOS_PER_SEC: u64 = 1_000 * NANOS_PER_MILLI;
const NANOS_PER_MIN: u64 = 60 * NANOS_PER_SEC;
const NANOS_PER_HOUR: u64 = 60 * NANOS_PER_MIN;
const NANOS_PER_DAY: u64 = 24 * NANOS_PER_HOUR;
const NANOS_PER_WEEK: u64 = 7 * NANOS_PER_DAY;
const NANOS_PER_YEAR: u64 = 365 * NANOS_PER_DAY;

/// Largest representable total, in nanoseconds (fits a signed 64-bit counter).
const MAX_NANOS: u64 = i64::MAX as u64;

/// Units ordered from largest to smallest. The index is the unit's rank.
const UNITS: [(&str, u64); 7] = [
    ("y", NANOS_PER_YEAR),
    ("w", NANOS_PER_WEEK),
    ("d", NANOS_PER_DAY),
    ("h", NANOS_PER_HOUR),
    ("m", NANOS_PER_MIN),
    ("s", NANOS_PER_SEC),
    ("ms", NANOS_PER_MILLI),
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseDurationError {
    #[error("empty duration string")]
    Empty,
    #[error("not a valid duration string: {0:?}")]
    Invalid(String),
    #[error("unknown unit {unit:?} in duration {input:?}")]
    UnknownUnit { unit: String, input: String },
    #[error("duration out of range")]
    OutOfRange,
}

/// Parse a duration string like `1w2d` or `90s`.
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    match input {
        "0" => return Ok(Duration::ZERO),
        "" => return Err(ParseDurationError::Empty),
        _ => {}
    }

    let invalid = || ParseDurationError::Invalid(input.to_string());
    let mut rest = input;
    let mut total: u64 = 0;
    let mut last_rank: Option<usize> = None;

    while !rest.is_empty() {
        let digits = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        if digits == 0 {
            return Err(invalid());
        }
        let value: u64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit())
            .unwrap_or(rest.len());
        if unit_len == 0 {
            return Err(invalid());
        }
        let unit = &rest[..unit_len];
        rest = &rest[unit_len..];

        let (rank, nanos_per_unit) = UNITS
            .iter()
            .enumerate()
            .find(|(_, (name, _))| *name == unit)
            .map(|(rank, (_, mult))| (rank, *mult))
            .ok_or_else(|| ParseDurationError::UnknownUnit {
                unit: unit.to_string(),
                input: input.to_string(),
            })?;

        if last_rank.is_some_and(|last| rank <= last) {
            return Err(invalid());
        }
        last_rank = Some(rank);

        total = value
            .checked_mul(nanos_per_unit)
            .and_then(|nanos| total.checked_add(nanos))
            .filter(|nanos| *nanos <= MAX_NANOS)
            .ok_or(ParseDurationError::OutOfRange)?;
    }

    Ok(Duration::from_nanos(total))
}

/// Render a duration in the canonical form accepted by [`parse_duration`].
/// Anything below a millisecond is truncated; zero renders as `0s`.
pub fn format_duration(duration: Duration) -> String {
    let mut remaining = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
    let mut out = String::new();

    for (name, nanos_per_unit) in UNITS {
        let count = remaining / nanos_per_unit;
        if count > 0 {
            out.push_str(&count.to_string());
            out.push_str(name);
            remaining -= count * nanos_per_unit;
        }
    }

    if out.is_empty() {
        out.push_str("0s");
    }
    out
}

/// A [`Duration`] that parses from and displays as a human-readable string.
/// Usable as a field type in env-driven config structs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanDuration(pub Duration);

impl FromStr for HumanDuration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s.trim()).map(HumanDuration)
    }
}

impl fmt::Display for HumanDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_duration(self.0))
    }
}

impl From<HumanDuration> for Duration {
    fn from(value: HumanDuration) -> Self {
        value.0
    }
}
