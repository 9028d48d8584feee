//! Publish-date normalization.
//!
//! Accepted idioms:
//! - `Yesterday at 07:30`
//! - `04 April at 07:30` / `April 4 at 7:30 PM` (current year implied)
//! - `04 April 2020 at 07:30` / `April 4, 2020 at 7:30 PM`
//! - `5 hrs`, `1 min`, `2 days` (relative to now)
//!
//! Anything else yields `None`.

use std::str::FromStr;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, Duration, FixedOffset, Month, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use regex::Regex;

static RELATIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+|an?|one)\s*([a-z]+)\s+ago$").expect("invalid relative date pattern")
});

/// Normalize a date string against the current instant.
pub fn normalize(date_str: &str, reference_year: i32, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    normalize_at(date_str, reference_year, offset, Utc::now())
}

/// Normalize the current year's dates, using `now` in `offset` for the year.
pub fn normalize_now(date_str: &str, offset: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let now = Utc::now();
    normalize_at(date_str, now.with_timezone(&offset).year(), offset, now)
}

/// Normalize a date string against an explicit `now`.
///
/// `reference_year` fills in dates written without a year. Absolute dates are
/// read as wall-clock time in `offset`; relative dates are offsets from `now`.
pub fn normalize_at(
    date_str: &str, reference_year: i32, offset: FixedOffset, now: DateTime<Utc>,
) -> Option<DateTime<FixedOffset>> {
    let date_str = date_str.trim();

    match date_str.split_once(" at ") {
        Some((date_part, time_part)) => {
            let time = parse_time(time_part)?;
            let date = if date_part.trim() == "Yesterday" {
                now.with_timezone(&offset).date_naive().pred_opt()?
            } else {
                parse_absolute_date(date_part, reference_year)?
            };
            offset.from_local_datetime(&date.and_time(time)).single()
        }
        None => parse_relative(&format!("{date_str} ago"), now).map(|dt| dt.with_timezone(&offset)),
    }
}

fn parse_time(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    ["%H:%M", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(input, format).ok())
}

/// `04 April`, `April 4`, `04 April 2020`, `April 4, 2020`.
fn parse_absolute_date(date_part: &str, reference_year: i32) -> Option<NaiveDate> {
    let cleaned = date_part.replace(',', " ");
    let tokens: Vec<&str> = cleaned.split_whitespace().collect();

    let (first, second, year) = match tokens.as_slice() {
        [first, second] => (*first, *second, reference_year),
        [first, second, year] => (*first, *second, parse_year(year)?),
        _ => return None,
    };

    let (day, month) = match (first.parse::<u32>(), second.parse::<u32>()) {
        (Ok(day), Err(_)) => (day, Month::from_str(second).ok()?),
        (Err(_), Ok(day)) => (day, Month::from_str(first).ok()?),
        _ => return None,
    };

    NaiveDate::from_ymd_opt(year, month.number_from_month(), day)
}

/// Four-digit years only, so `04 Apr 20` is rejected instead of read as year 20.
fn parse_year(token: &str) -> Option<i32> {
    if token.len() == 4 && token.bytes().all(|b| b.is_ascii_digit()) { token.parse().ok() } else { None }
}

/// `N unit(s) ago` relative to `now`.
fn parse_relative(input: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if input.eq_ignore_ascii_case("just now ago") {
        return Some(now);
    }

    let caps = RELATIVE.captures(input)?;
    let amount: u32 = match caps[1].to_ascii_lowercase().as_str() {
        "a" | "an" | "one" => 1,
        digits => digits.parse().ok()?,
    };
    let unit = caps[2].to_ascii_lowercase();

    match unit.trim_end_matches('s') {
        "sec" | "second" => now.checked_sub_signed(Duration::seconds(amount.into())),
        "min" | "minute" => now.checked_sub_signed(Duration::minutes(amount.into())),
        "hr" | "hour" | "h" => now.checked_sub_signed(Duration::hours(amount.into())),
        "day" | "d" => now.checked_sub_signed(Duration::days(amount.into())),
        "wk" | "week" | "w" => now.checked_sub_signed(Duration::weeks(amount.into())),
        "mo" | "month" | "mth" => now.checked_sub_months(Months::new(amount)),
        "yr" | "year" | "y" => now.checked_sub_months(Months::new(amount.checked_mul(12)?)),
        _ => None,
    }
}
