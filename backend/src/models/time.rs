use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed interval `[start, end]` used to filter incidents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A window whose start lies after its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("start {start} is after end {end}")]
pub struct InvalidRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Create a window, rejecting `start > end`.
    ///
    /// A zero-length window (`start == end`) is valid.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, InvalidRange> {
        if start > end {
            return Err(InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Window ending at `end` and spanning `duration` back in time.
    pub fn ending_at(end: DateTime<Utc>, duration: Duration) -> Self {
        Self {
            start: end - duration,
            end,
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Both bounds are inclusive.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )
    }
}

/// Fixed timeframe shortcuts offered by the dashboard selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Preset {
    #[serde(rename = "1h")]
    OneHour,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHours,
    #[serde(rename = "7d")]
    SevenDays,
    #[serde(rename = "30d")]
    ThirtyDays,
    #[serde(rename = "90d")]
    NinetyDays,
}

impl Preset {
    /// Every preset, in selector order.
    pub const ALL: [Preset; 5] = [
        Preset::OneHour,
        Preset::TwentyFourHours,
        Preset::SevenDays,
        Preset::ThirtyDays,
        Preset::NinetyDays,
    ];

    /// Short machine key (`24h`).
    pub fn key(&self) -> &'static str {
        match self {
            Preset::OneHour => "1h",
            Preset::TwentyFourHours => "24h",
            Preset::SevenDays => "7d",
            Preset::ThirtyDays => "30d",
            Preset::NinetyDays => "90d",
        }
    }

    /// Label shown in the selector (`24 Hours`).
    pub fn label(&self) -> &'static str {
        match self {
            Preset::OneHour => "1 Hour",
            Preset::TwentyFourHours => "24 Hours",
            Preset::SevenDays => "7 Days",
            Preset::ThirtyDays => "30 Days",
            Preset::NinetyDays => "90 Days",
        }
    }

    /// Interval literal understood by Postgres (`24 hours`).
    pub fn interval_literal(&self) -> &'static str {
        match self {
            Preset::OneHour => "1 hour",
            Preset::TwentyFourHours => "24 hours",
            Preset::SevenDays => "7 days",
            Preset::ThirtyDays => "30 days",
            Preset::NinetyDays => "90 days",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Preset::OneHour => Duration::hours(1),
            Preset::TwentyFourHours => Duration::hours(24),
            Preset::SevenDays => Duration::days(7),
            Preset::ThirtyDays => Duration::days(30),
            Preset::NinetyDays => Duration::days(90),
        }
    }
}

impl FromStr for Preset {
    type Err = String;

    /// Accepts the key, the label or the interval literal, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Preset::ALL
            .into_iter()
            .find(|p| {
                wanted == p.key()
                    || wanted == p.label().to_lowercase()
                    || wanted == p.interval_literal()
            })
            .ok_or_else(|| format!("Unknown timeframe: {}", s))
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What the user picked in the timeframe selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TimeframeSelection {
    Preset { preset: Preset },
    Custom {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

impl TimeframeSelection {
    pub fn preset(preset: Preset) -> Self {
        Self::Preset { preset }
    }

    pub fn custom(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self::Custom { start, end }
    }

    /// Human description used in progress and empty-state messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Preset { preset } => format!("the last {}", preset.label()),
            Self::Custom { start, end } => format!(
                "{} to {}",
                format_timestamp(*start),
                format_timestamp(*end)
            ),
        }
    }
}

impl Default for TimeframeSelection {
    fn default() -> Self {
        Self::preset(Preset::default())
    }
}

/// Timestamp text that could not be understood.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid timestamp '{input}': expected RFC 3339 or YYYY-MM-DDTHH:MM[:SS]")]
pub struct TimestampParseError {
    pub input: String,
}

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parse a custom-range bound. Naive timestamps are taken as UTC.
pub fn parse_timestamp(input: &str) -> Result<DateTime<Utc>, TimestampParseError> {
    let trimmed = input.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| TimestampParseError {
            input: input.to_string(),
        })
}

/// Combine separately picked date and time inputs (`2024-01-01`, `11:00`).
pub fn parse_date_time(date: &str, time: &str) -> Result<DateTime<Utc>, TimestampParseError> {
    let err = || TimestampParseError {
        input: format!("{} {}", date, time),
    };
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| err())?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M"))
        .map_err(|_| err())?;
    Ok(date.and_time(time).and_utc())
}

/// Render a timestamp the way the dashboard displays it.
pub fn format_timestamp(instant: DateTime<Utc>) -> String {
    instant.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
#[path = "time_tests.rs"]
mod tests;
