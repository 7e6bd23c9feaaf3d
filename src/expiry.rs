//! Expiry resolution for newly added keys.
//!
//! Converts relative duration tokens (`7d`, `2w`, `3m`, `1y`) and the literal `life` into an
//! absolute calendar date. All arithmetic happens on UTC calendar dates.
//!
//! Month and year offsets use chrono's calendar arithmetic, which clamps to the last valid day of
//! the target month: `2024-01-31 + 1m` is `2024-02-29` and `2024-02-29 + 1y` is `2025-02-28`.
//!
//! # Functions
//! - `resolve_expiry`: Resolves a duration token against a given day.
//! - `format_expiry`: Renders a resolved date the way the key service expects it.
//! - `is_expired`: Checks an expiry string against a given day.

use std::sync::OnceLock;

use chrono::{Days, Months, NaiveDate, Utc};
use regex::Regex;

use crate::error::ExpiryError;

/// Year offset used to encode a lifetime key as an ordinary date.
pub const LIFETIME_YEARS: u32 = 99999;

/// Source of "today" for expiry arithmetic.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// The UTC wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// A clock pinned to one day. Used in tests and for reproducible CLI runs.
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Days,
    Weeks,
    Months,
    Years,
}

fn relative_token() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^(\d+)([dwmy])$").expect("valid duration pattern"))
}

/// Resolves a duration token to an absolute date.
///
/// # Arguments
///
/// * `token` - A relative token such as `7d`, `1w`, `3m`, `1y`, or `life`. Case-insensitive.
/// * `today` - The day the offset is applied to.
///
/// # Returns
///
/// The resolved date, or `ExpiryError::InvalidDurationKind` carrying the original token when it
/// matches neither form.
///
/// # Example
///
/// ```
/// let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
/// assert_eq!(resolve_expiry("7d", today)?, NaiveDate::from_ymd_opt(2024, 1, 8).unwrap());
/// ```
pub fn resolve_expiry(token: &str, today: NaiveDate) -> Result<NaiveDate, ExpiryError> {
    if token.eq_ignore_ascii_case("life") {
        return today
            .checked_add_months(Months::new(LIFETIME_YEARS * 12))
            .ok_or_else(|| ExpiryError::DurationOutOfRange(token.to_string()));
    }

    let captures = relative_token()
        .captures(token)
        .ok_or_else(|| ExpiryError::InvalidDurationKind(token.to_string()))?;

    let out_of_range = || ExpiryError::DurationOutOfRange(token.to_string());
    let amount: u32 = captures[1].parse().map_err(|_| out_of_range())?;
    let unit = match captures[2].to_ascii_lowercase().as_str() {
        "d" => Unit::Days,
        "w" => Unit::Weeks,
        "m" => Unit::Months,
        _ => Unit::Years,
    };

    let resolved = match unit {
        Unit::Days => today.checked_add_days(Days::new(amount.into())),
        Unit::Weeks => today.checked_add_days(Days::new(u64::from(amount) * 7)),
        Unit::Months => today.checked_add_months(Months::new(amount)),
        Unit::Years => amount
            .checked_mul(12)
            .and_then(|months| today.checked_add_months(Months::new(months))),
    };
    resolved.ok_or_else(out_of_range)
}

/// Renders a date as `YYYY-MM-DD`. Years past 9999 carry a leading `+`.
pub fn format_expiry(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Checks whether an expiry string denotes a day strictly before `today`.
///
/// Strings that do not parse as a date are treated as unexpired; the key service remains the
/// authority on those.
pub fn is_expired(expiry: &str, today: NaiveDate) -> bool {
    match NaiveDate::parse_from_str(expiry.trim(), "%Y-%m-%d") {
        Ok(date) => date < today,
        Err(_) => false,
    }
}
