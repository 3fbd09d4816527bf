//! Expiration Module
//!
//! A ttl is either a number of seconds or a relative-time expression such as
//! `"+1 day"` or `"+2 weeks -1 hour"`, resolved against a node's creation time.

use chrono::{DateTime, Duration, Months, Utc};

use crate::error::{CacheError, Result};

// == Expiration ==
/// When a node stops being served.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Expiration {
    /// The node never expires
    #[default]
    Never,
    /// Expires this many seconds after creation
    Seconds(u64),
    /// Signed offset from creation in milliseconds. Negative offsets give a
    /// node that is already expired.
    Millis(i64),
    /// Relative-time expression resolved against creation time
    Relative(String),
}

impl Expiration {
    /// Interprets a ttl given as text.
    ///
    /// Empty or `"0"` means never, any finite number is a ttl in seconds
    /// (negative and fractional ones included), anything else is kept as a
    /// relative-time expression.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() {
            return Expiration::Never;
        }
        if let Ok(seconds) = input.parse::<u64>() {
            return Expiration::seconds(seconds);
        }
        match input.parse::<f64>() {
            Ok(seconds) if seconds.is_finite() => Expiration::from_secs_f64(seconds),
            _ => Expiration::Relative(input.to_string()),
        }
    }

    /// Ttl as a possibly negative or fractional number of seconds.
    pub fn from_secs_f64(seconds: f64) -> Self {
        if seconds == 0.0 {
            Expiration::Never
        } else if seconds > 0.0 && seconds.fract() == 0.0 && seconds < u64::MAX as f64 {
            Expiration::Seconds(seconds as u64)
        } else {
            Expiration::Millis((seconds * 1000.0).round() as i64)
        }
    }

    /// Ttl in seconds. Zero means never.
    pub fn seconds(seconds: u64) -> Self {
        if seconds == 0 {
            Expiration::Never
        } else {
            Expiration::Seconds(seconds)
        }
    }

    /// Computes the absolute expiry for a node created at `created`.
    ///
    /// Returns `Ok(None)` for nodes that never expire.
    pub fn resolve(&self, created: DateTime<Utc>) -> Result<Option<DateTime<Utc>>> {
        match self {
            Expiration::Never => Ok(None),
            Expiration::Seconds(0) => Ok(None),
            Expiration::Seconds(seconds) => {
                let ttl = i64::try_from(*seconds)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .ok_or_else(|| CacheError::InvalidExpiration(format!("{seconds}s")))?;
                created
                    .checked_add_signed(ttl)
                    .map(Some)
                    .ok_or_else(|| CacheError::InvalidExpiration(format!("{seconds}s")))
            }
            Expiration::Millis(millis) => Duration::try_milliseconds(*millis)
                .and_then(|offset| created.checked_add_signed(offset))
                .map(Some)
                .ok_or_else(|| CacheError::InvalidExpiration(format!("{millis}ms"))),
            Expiration::Relative(expr) => resolve_relative(expr, created).map(Some),
        }
    }
}

impl From<u64> for Expiration {
    fn from(seconds: u64) -> Self {
        Expiration::seconds(seconds)
    }
}

impl From<&str> for Expiration {
    fn from(input: &str) -> Self {
        Expiration::parse(input)
    }
}

// == Relative Time ==
#[derive(Debug, Clone, Copy)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

impl Unit {
    fn parse(word: &str) -> Option<Self> {
        let unit = match word {
            "s" | "sec" | "secs" | "second" | "seconds" => Unit::Second,
            "min" | "mins" | "minute" | "minutes" => Unit::Minute,
            "hour" | "hours" => Unit::Hour,
            "day" | "days" => Unit::Day,
            "week" | "weeks" => Unit::Week,
            "fortnight" | "fortnights" => Unit::Fortnight,
            "month" | "months" => Unit::Month,
            "year" | "years" => Unit::Year,
            _ => return None,
        };
        Some(unit)
    }

    fn apply(self, at: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
        let seconds_per = match self {
            Unit::Month => return shift_months(at, amount),
            Unit::Year => return shift_months(at, amount.checked_mul(12)?),
            Unit::Second => 1,
            Unit::Minute => 60,
            Unit::Hour => 3_600,
            Unit::Day => 86_400,
            Unit::Week => 7 * 86_400,
            Unit::Fortnight => 14 * 86_400,
        };
        let delta = Duration::try_seconds(amount.checked_mul(seconds_per)?)?;
        at.checked_add_signed(delta)
    }
}

fn shift_months(at: DateTime<Utc>, amount: i64) -> Option<DateTime<Utc>> {
    let months = Months::new(u32::try_from(amount.unsigned_abs()).ok()?);
    if amount >= 0 {
        at.checked_add_months(months)
    } else {
        at.checked_sub_months(months)
    }
}

/// Resolves terms like `+1 day`, `-2hours` or `now +1 week 3 days`.
fn resolve_relative(expr: &str, base: DateTime<Utc>) -> Result<DateTime<Utc>> {
    let invalid = || CacheError::InvalidExpiration(expr.to_string());
    let lowered = expr.to_ascii_lowercase();
    let mut rest = lowered.trim_start();
    let mut at = base;
    let mut terms = 0;

    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix("now") {
            rest = after.trim_start();
            terms += 1;
            continue;
        }

        let (negative, after_sign) = match rest.as_bytes()[0] {
            b'+' => (false, &rest[1..]),
            b'-' => (true, &rest[1..]),
            _ => (false, rest),
        };
        let after_sign = after_sign.trim_start();

        let digits = after_sign
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(after_sign.len());
        if digits == 0 {
            return Err(invalid());
        }
        let amount: i64 = after_sign[..digits].parse().map_err(|_| invalid())?;
        let amount = if negative { -amount } else { amount };

        let after_number = after_sign[digits..].trim_start();
        let letters = after_number
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(after_number.len());
        let unit = Unit::parse(&after_number[..letters]).ok_or_else(invalid)?;

        at = unit.apply(at, amount).ok_or_else(invalid)?;
        rest = after_number[letters..].trim_start();
        terms += 1;
    }

    if terms == 0 {
        return Err(invalid());
    }
    Ok(at)
}
