//! Display helpers shared by the page templates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Formats an amount in cents the way en-CA renders CAD: `$1,234.56`, `-$5.00`.
pub fn currency(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    let dollars = abs / 100;
    let rem = abs % 100;
    format!("{}${}.{:02}", sign, group_thousands(dollars), rem)
}

/// Like [`currency`] but blank for missing or zero amounts, used for
/// optional ledger columns.
pub fn optional_currency(cents: Option<i64>) -> String {
    match cents {
        Some(c) if c != 0 => currency(c),
        _ => String::new(),
    }
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Parses the timestamp shapes the backend emits and returns the wall-clock
/// time in `tz`. Epoch milliseconds and offset-carrying RFC 3339 values are
/// converted; naive ISO date-times and bare dates are taken as already local.
pub fn parse_timestamp(raw: &str, tz: Tz) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
        let millis: i64 = raw.parse().ok()?;
        return DateTime::from_timestamp_millis(millis)
            .map(|dt| dt.with_timezone(&tz).naive_local());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&tz).naive_local());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Today's date on the wall clock of `tz`.
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

/// `2024-05-17, 14:05:09`
pub fn date_time(raw: &str, tz: Tz) -> String {
    parse_timestamp(raw, tz)
        .map(|dt| dt.format("%Y-%m-%d, %H:%M:%S").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// `May 17, 14:05`
pub fn short_date_time(raw: &str, tz: Tz) -> String {
    parse_timestamp(raw, tz)
        .map(|dt| dt.format("%b %-d, %H:%M").to_string())
        .unwrap_or_else(|| raw.to_string())
}

/// `14:05`
pub fn time_of_day(raw: &str, tz: Tz) -> String {
    parse_timestamp(raw, tz)
        .map(|dt| dt.format("%H:%M").to_string())
        .unwrap_or_default()
}

/// `Friday, May 17`
pub fn long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d").to_string()
}

/// `TABLE_TIME` -> `Table time`
pub fn humanize_key(key: &str) -> String {
    let lower = key.replace('_', " ").to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency() {
        assert_eq!(currency(0), "$0.00");
        assert_eq!(currency(5), "$0.05");
        assert_eq!(currency(123456), "$1,234.56");
        assert_eq!(currency(100000000), "$1,000,000.00");
        assert_eq!(currency(-500), "-$5.00");
    }

    #[test]
    fn test_optional_currency() {
        assert_eq!(optional_currency(None), "");
        assert_eq!(optional_currency(Some(0)), "");
        assert_eq!(optional_currency(Some(1999)), "$19.99");
    }

    #[test]
    fn test_date_formats() {
        let tz = chrono_tz::UTC;
        assert_eq!(date_time("2024-05-17T14:05:09Z", tz), "2024-05-17, 14:05:09");
        assert_eq!(short_date_time("2024-05-17T14:05:09.123", tz), "May 17, 14:05");
        assert_eq!(short_date_time("2024-05-07", tz), "May 7, 00:00");
        assert_eq!(short_date_time("not a date", tz), "not a date");
    }

    #[test]
    fn test_timestamps_follow_room_timezone() {
        let toronto = chrono_tz::America::Toronto;

        // 2024-05-21T01:00:00Z is the evening before in Toronto
        let dt = parse_timestamp("1716253200000", toronto).unwrap();
        assert_eq!(dt.date(), NaiveDate::from_ymd_opt(2024, 5, 20).unwrap());
        assert_eq!(time_of_day("1716253200000", toronto), "21:00");

        assert_eq!(time_of_day("2024-05-21T01:00:00Z", toronto), "21:00");
        assert_eq!(time_of_day("2024-05-17T09:30:00+02:00", toronto), "03:30");
        // Winter offset is -05:00
        assert_eq!(date_time("2024-01-15T17:00:00Z", toronto), "2024-01-15, 12:00:00");
        // Naive values are already wall-clock time
        assert_eq!(time_of_day("2024-05-17T19:00:00", toronto), "19:00");
    }

    #[test]
    fn test_long_date() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 17).unwrap();
        assert_eq!(long_date(date), "Friday, May 17");
    }

    #[test]
    fn test_humanize_key() {
        assert_eq!(humanize_key("TABLE_TIME"), "Table time");
        assert_eq!(humanize_key("STREAMING"), "Streaming");
        assert_eq!(humanize_key(""), "");
    }
}
