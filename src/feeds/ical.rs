use crate::heuristics::dates::stamp_pacific;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};

/// One VEVENT entry from an RFC 5545-style feed.
#[derive(Debug, Clone, Default)]
pub struct VEvent {
    pub uid: Option<String>,
    pub summary: Option<String>,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub geo: Option<(f64, f64)>,
}

/// Parses an iCal feed into discrete VEVENT entries. Folded lines
/// (continuations starting with a space or tab) are unfolded first; unknown
/// properties are ignored.
pub fn parse_ical(feed: &str) -> Vec<VEvent> {
    let mut events = Vec::new();
    let mut current: Option<VEvent> = None;

    for line in unfold_lines(feed) {
        let Some((name_part, value)) = line.split_once(':') else {
            continue;
        };
        // Property parameters (TZID=..., VALUE=DATE) follow the name
        let name = name_part.split(';').next().unwrap_or(name_part);

        match name.to_ascii_uppercase().as_str() {
            "BEGIN" if value.eq_ignore_ascii_case("VEVENT") => {
                current = Some(VEvent::default());
            }
            "END" if value.eq_ignore_ascii_case("VEVENT") => {
                if let Some(event) = current.take() {
                    events.push(event);
                }
            }
            "UID" => {
                if let Some(event) = current.as_mut() {
                    event.uid = Some(value.trim().to_string());
                }
            }
            "SUMMARY" => {
                if let Some(event) = current.as_mut() {
                    event.summary = Some(unescape_text(value));
                }
            }
            "DTSTART" => {
                if let Some(event) = current.as_mut() {
                    event.start = parse_ical_datetime(value.trim());
                }
            }
            "DTEND" => {
                if let Some(event) = current.as_mut() {
                    event.end = parse_ical_datetime(value.trim());
                }
            }
            "LOCATION" => {
                if let Some(event) = current.as_mut() {
                    event.location = Some(unescape_text(value));
                }
            }
            "DESCRIPTION" => {
                if let Some(event) = current.as_mut() {
                    event.description = Some(unescape_text(value));
                }
            }
            "GEO" => {
                if let Some(event) = current.as_mut() {
                    event.geo = parse_geo(value.trim());
                }
            }
            _ => {}
        }
    }

    events
}

fn unfold_lines(feed: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in feed.lines() {
        let raw = raw.trim_end_matches('\r');
        if (raw.starts_with(' ') || raw.starts_with('\t')) && !lines.is_empty() {
            if let Some(last) = lines.last_mut() {
                last.push_str(&raw[1..]);
            }
        } else {
            lines.push(raw.to_string());
        }
    }
    lines
}

fn unescape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') | Some('N') => out.push('\n'),
                Some(escaped) => out.push(escaped),
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out.trim().to_string()
}

/// Handles the three DTSTART shapes we see in practice: UTC instants
/// (`...Z`), floating local timestamps (stamped Pacific), and all-day
/// dates (midnight Pacific).
fn parse_ical_datetime(value: &str) -> Option<DateTime<FixedOffset>> {
    if let Some(utc_part) = value.strip_suffix('Z') {
        let naive = NaiveDateTime::parse_from_str(utc_part, "%Y%m%dT%H%M%S").ok()?;
        return Some(Utc.from_utc_datetime(&naive).fixed_offset());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S") {
        return Some(stamp_pacific(naive));
    }
    let date = NaiveDate::parse_from_str(value, "%Y%m%d").ok()?;
    Some(stamp_pacific(date.and_time(NaiveTime::from_hms_opt(0, 0, 0)?)))
}

fn parse_geo(value: &str) -> Option<(f64, f64)> {
    let (lat, lng) = value.split_once(';')?;
    Some((lat.trim().parse().ok()?, lng.trim().parse().ok()?))
}
