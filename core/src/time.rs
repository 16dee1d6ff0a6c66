//! Recency buckets and human-readable formatting for backend timestamps.
//!
//! Backend timestamps are UTC wall-clock strings. Bucketing compares calendar
//! days in the time zone of the supplied `now`.

use crate::item::ClipboardItem;
use chrono::{DateTime, Datelike, Month, NaiveDateTime, TimeZone, Utc};
use std::fmt;

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    for format in TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DateGroup {
    Today,
    Yesterday,
    ThisWeek,
    ThisMonth,
    Month { year: i32, month: u32 },
    /// Timestamp could not be parsed.
    Undated,
}

impl fmt::Display for DateGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateGroup::Today => f.write_str("Today"),
            DateGroup::Yesterday => f.write_str("Yesterday"),
            DateGroup::ThisWeek => f.write_str("This Week"),
            DateGroup::ThisMonth => f.write_str("This Month"),
            DateGroup::Month { year, month } => match u8::try_from(*month)
                .ok()
                .and_then(|m| Month::try_from(m).ok())
            {
                Some(name) => write!(f, "{} {}", name.name(), year),
                None => write!(f, "{}-{:02}", year, month),
            },
            DateGroup::Undated => f.write_str("Undated"),
        }
    }
}

/// Bucket for one timestamp. Timestamps ahead of `now` count as today.
pub fn date_group<Tz: TimeZone>(updated_at: &str, now: &DateTime<Tz>) -> DateGroup {
    let Some(utc) = parse_timestamp(updated_at) else {
        return DateGroup::Undated;
    };
    let local = utc.with_timezone(&now.timezone());
    let days = (now.date_naive() - local.date_naive()).num_days();

    match days {
        d if d <= 0 => DateGroup::Today,
        1 => DateGroup::Yesterday,
        d if d < 7 => DateGroup::ThisWeek,
        d if d < 30 => DateGroup::ThisMonth,
        _ => DateGroup::Month {
            year: local.year(),
            month: local.month(),
        },
    }
}

/// A contiguous run of list entries sharing a bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupSpan {
    pub group: DateGroup,
    pub start: usize,
    pub len: usize,
}

impl GroupSpan {
    pub fn end(&self) -> usize {
        self.start + self.len
    }

    pub fn contains(&self, index: usize) -> bool {
        (self.start..self.end()).contains(&index)
    }
}

/// Splits an already recency-ordered list where the bucket label changes.
pub fn group_spans<Tz: TimeZone>(items: &[ClipboardItem], now: &DateTime<Tz>) -> Vec<GroupSpan> {
    let mut spans: Vec<GroupSpan> = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let group = date_group(&item.updated_at, now);
        match spans.last_mut() {
            Some(span) if span.group == group => span.len += 1,
            _ => spans.push(GroupSpan {
                group,
                start: index,
                len: 1,
            }),
        }
    }
    spans
}

pub fn relative_time(updated_at: &str, now: &DateTime<Utc>) -> String {
    let Some(then) = parse_timestamp(updated_at) else {
        return updated_at.to_string();
    };
    let secs = (*now - then).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if secs < 60 {
        "Just now".to_string()
    } else if mins < 60 {
        format!("{}m ago", mins)
    } else if hours < 24 {
        format!("{}h ago", hours)
    } else if days == 1 {
        "Yesterday".to_string()
    } else if days < 7 {
        format!("{}d ago", days)
    } else {
        then.format("%Y-%m-%d").to_string()
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
