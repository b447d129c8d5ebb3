//! civil-calendar date arithmetic shared by the fee, interest and schedule code
//!
//! All day counts are whole days between calendar dates; time of day never
//! participates. "Today" always comes from an injected [`SafeTimeProvider`].

use chrono::{DateTime, Duration, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;

/// the current civil date according to the provider
pub fn today(time_provider: &SafeTimeProvider) -> NaiveDate {
    time_provider.now().date_naive()
}

/// signed whole days from `from` to `to`
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// days elapsed since `start`, negative before it
pub fn days_since(start: NaiveDate, reference: NaiveDate) -> i64 {
    days_between(start, reference)
}

/// days between two timestamps ignoring time of day
pub fn civil_days_between(from: DateTime<Utc>, to: DateTime<Utc>) -> i64 {
    days_between(from.date_naive(), to.date_naive())
}

pub fn add_days(date: NaiveDate, days: i64) -> NaiveDate {
    date + Duration::days(days)
}

/// ceiling division for day counts; `None` for a zero or negative divisor
pub fn ceil_div(numerator: i64, divisor: i64) -> Option<i64> {
    if divisor <= 0 {
        return None;
    }
    let quotient = numerator.div_euclid(divisor);
    if numerator.rem_euclid(divisor) == 0 {
        Some(quotient)
    } else {
        Some(quotient + 1)
    }
}
