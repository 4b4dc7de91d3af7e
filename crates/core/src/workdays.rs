use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Weekday};

/// Parses a company timezone given as a UTC offset (`UTC`, `+06:00`,
/// `UTC-05:30`). Invalid input falls back to UTC with a warning rather
/// than failing the caller.
pub fn company_offset(raw: &str) -> FixedOffset {
    parse_offset(raw).unwrap_or_else(|| {
        tracing::warn!(
            event_name = "workdays.timezone_fallback",
            offset = raw,
            "unrecognized company timezone offset, falling back to UTC"
        );
        FixedOffset::east_opt(0).expect("zero offset is always valid")
    })
}

fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let trimmed = raw.trim();
    let rest = trimmed.strip_prefix("UTC").unwrap_or(trimmed);
    if rest.is_empty() {
        return FixedOffset::east_opt(0);
    }

    let (sign, body) = match rest.as_bytes().first()? {
        b'+' => (1i32, &rest[1..]),
        b'-' => (-1i32, &rest[1..]),
        _ => return None,
    };
    let (hours, minutes) = match body.split_once(':') {
        Some((h, m)) => (h.parse::<i32>().ok()?, m.parse::<i32>().ok()?),
        None => (body.parse::<i32>().ok()?, 0),
    };
    if !(0..=14).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

pub fn is_business_day(date: NaiveDate, holidays: &HashSet<NaiveDate>) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&date)
}

/// Steps `days` business days backwards from `from`, preserving the time of
/// day. Weekends and holiday dates do not count as steps.
pub fn subtract_business_days(
    from: DateTime<FixedOffset>,
    days: u32,
    holidays: &HashSet<NaiveDate>,
) -> DateTime<FixedOffset> {
    let mut cursor = from;
    let mut remaining = days;
    while remaining > 0 {
        cursor -= Duration::days(1);
        if is_business_day(cursor.date_naive(), holidays) {
            remaining -= 1;
        }
    }
    cursor
}

/// Counts business days in the inclusive span [start, end]. Returns 0 for
/// an inverted span.
pub fn count_business_days(
    start: NaiveDate,
    end: NaiveDate,
    holidays: &HashSet<NaiveDate>,
) -> i64 {
    if start > end {
        return 0;
    }
    let mut count = 0;
    let mut cursor = start;
    while cursor <= end {
        if is_business_day(cursor, holidays) {
            count += 1;
        }
        cursor += Duration::days(1);
    }
    count
}
