use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::Regex;

/// Pacific offset for a given month, using the fixed DST heuristic the
/// listings table assumes: UTC-7 for March through October, UTC-8 otherwise.
pub fn pacific_offset(month: u32) -> FixedOffset {
    let hours = if (3..=10).contains(&month) { 7 } else { 8 };
    FixedOffset::west_opt(hours * 3600).unwrap()
}

/// Stamps a naive local timestamp with the Pacific offset for its month.
pub fn stamp_pacific(naive: NaiveDateTime) -> DateTime<FixedOffset> {
    let offset = pacific_offset(naive.month());
    // Always representable: the heuristic offsets are fixed, no gaps
    offset.from_local_datetime(&naive).unwrap()
}

static FREE_TEXT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:monday|tuesday|wednesday|thursday|friday|saturday|sunday),?\s+
        (january|february|march|april|may|june|july|august|september|october|november|december)\s+
        (\d{1,2})(?:st|nd|rd|th)?
        (?:,)?
        (?:\s+(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm))?",
    )
    .unwrap()
});

fn month_number(name: &str) -> Option<u32> {
    let month = match name.to_lowercase().as_str() {
        "january" => 1,
        "february" => 2,
        "march" => 3,
        "april" => 4,
        "may" => 5,
        "june" => 6,
        "july" => 7,
        "august" => 8,
        "september" => 9,
        "october" => 10,
        "november" => 11,
        "december" => 12,
        _ => return None,
    };
    Some(month)
}

/// Parses a free-text heading like "Wednesday, July 15, 2PM". The year is
/// inferred as this year, or next year if that date has already passed
/// relative to `today`. The result always carries the Pacific offset for
/// the matched month.
pub fn parse_free_text_date(text: &str, today: NaiveDate) -> Option<DateTime<FixedOffset>> {
    let caps = FREE_TEXT_DATE.captures(text)?;

    let month = month_number(caps.get(1)?.as_str())?;
    let day: u32 = caps.get(2)?.as_str().parse().ok()?;

    let mut date = NaiveDate::from_ymd_opt(today.year(), month, day)?;
    if date < today {
        date = NaiveDate::from_ymd_opt(today.year() + 1, month, day)?;
    }

    let time = match caps.get(3) {
        Some(hour_match) => {
            let hour: u32 = hour_match.as_str().parse().ok()?;
            let minute: u32 = caps
                .get(4)
                .map(|m| m.as_str().parse().unwrap_or(0))
                .unwrap_or(0);
            let is_pm = caps
                .get(5)
                .map(|m| m.as_str().eq_ignore_ascii_case("pm"))
                .unwrap_or(false);
            let hour_24 = if is_pm && hour != 12 {
                hour + 12
            } else if !is_pm && hour == 12 {
                0
            } else {
                hour
            };
            NaiveTime::from_hms_opt(hour_24, minute, 0)?
        }
        None => NaiveTime::from_hms_opt(0, 0, 0)?,
    };

    Some(stamp_pacific(date.and_time(time)))
}

/// Decodes an already-correct timestamp from a `date=` query parameter on a
/// ticketing link. Accepts a full RFC 3339 value or a bare `YYYY-MM-DD`
/// (stamped midnight Pacific).
pub fn parse_date_query_param(url: &str) -> Option<DateTime<FixedOffset>> {
    let query = url.split_once('?')?.1;
    let raw = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("date="))?;
    let decoded = percent_decode(raw);

    if let Ok(dt) = DateTime::parse_from_rfc3339(&decoded) {
        return Some(dt);
    }
    let date = NaiveDate::parse_from_str(&decoded, "%Y-%m-%d").ok()?;
    Some(stamp_pacific(date.and_time(NaiveTime::from_hms_opt(0, 0, 0)?)))
}

/// Parses a structured startDate string (JSON-LD or feed field): either a
/// full RFC 3339 value, or a naive local timestamp stamped Pacific.
pub fn parse_structured_date(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        return Some(stamp_pacific(naive));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(stamp_pacific(date.and_time(NaiveTime::from_hms_opt(0, 0, 0)?)));
    }
    None
}

/// Minimal percent-decoding for query parameter values.
fn percent_decode(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' if i + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap_or("");
                if let Ok(byte) = u8::from_str_radix(hex, 16) {
                    out.push(byte);
                    i += 3;
                } else {
                    out.push(bytes[i]);
                    i += 1;
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
