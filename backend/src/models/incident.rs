//! Incident rows as returned by the review query, plus the boundary
//! normalization that turns raw database values into typed rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Annotator name used for leaderboard rows that arrive without one.
pub const UNATTRIBUTED: &str = "unattributed";

/// Which subset of the result a row belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    Summary,
    Leaderboard,
}

impl ReportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportType::Summary => "summary",
            ReportType::Leaderboard => "leaderboard",
        }
    }
}

impl FromStr for ReportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "summary" => Ok(ReportType::Summary),
            "leaderboard" => Ok(ReportType::Leaderboard),
            other => Err(format!("Unknown report type: {}", other)),
        }
    }
}

/// Review status of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewLabel {
    #[serde(rename = "reviewed")]
    Reviewed,
    #[serde(rename = "needs-review")]
    NeedsReview,
}

impl ReviewLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewLabel::Reviewed => "reviewed",
            ReviewLabel::NeedsReview => "needs-review",
        }
    }
}

impl fmt::Display for ReviewLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewLabel {
    type Err = String;

    /// `needs_review` and `need to review` are accepted as spellings of
    /// `needs-review`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "reviewed" => Ok(ReviewLabel::Reviewed),
            "needs-review" | "needs_review" | "need to review" => Ok(ReviewLabel::NeedsReview),
            other => Err(format!("Unknown review label: {}", other)),
        }
    }
}

/// One typed row of the review query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentRow {
    pub report_type: ReportType,
    pub label: Option<ReviewLabel>,
    pub annotator: Option<String>,
    pub count: u64,
}

impl IncidentRow {
    pub fn summary(label: ReviewLabel, count: u64) -> Self {
        Self {
            report_type: ReportType::Summary,
            label: Some(label),
            annotator: None,
            count,
        }
    }

    pub fn leaderboard(annotator: impl Into<String>, count: u64) -> Self {
        Self {
            report_type: ReportType::Leaderboard,
            label: None,
            annotator: Some(annotator.into()),
            count,
        }
    }

    /// Annotator name with the `unattributed` fallback applied.
    pub fn annotator_or_unattributed(&self) -> &str {
        match self.annotator.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => UNATTRIBUTED,
        }
    }
}

/// Collapse a numeric count from the database into a non-negative integer.
///
/// Null, NaN, infinities and negatives become zero. Fractions are truncated.
pub fn coerce_count(raw: Option<f64>) -> u64 {
    match raw {
        Some(value) if value.is_finite() && value > 0.0 => {
            if value >= u64::MAX as f64 {
                u64::MAX
            } else {
                value.trunc() as u64
            }
        }
        _ => 0,
    }
}

/// Untyped row in the `report` result shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReportRow {
    pub report_type: Option<String>,
    pub label: Option<String>,
    pub annotator: Option<String>,
    pub count: Option<f64>,
}

impl RawReportRow {
    /// Validate report type and summary label, coerce the count.
    pub fn normalize(self) -> Result<IncidentRow, String> {
        let report_type: ReportType = self
            .report_type
            .as_deref()
            .ok_or_else(|| "Missing report_type column value".to_string())?
            .parse()?;

        // Only summary rows carry a meaningful label.
        let label = match report_type {
            ReportType::Summary => match self.label.as_deref().map(str::trim) {
                None | Some("") => return Err("Summary row without a review label".to_string()),
                Some(text) => Some(text.parse::<ReviewLabel>()?),
            },
            ReportType::Leaderboard => None,
        };

        Ok(IncidentRow {
            report_type,
            label,
            annotator: self.annotator,
            count: coerce_count(self.count),
        })
    }
}

/// Row in the older two-column shape (`incident_check`, `incident_count`).
///
/// Only summary information is available in this shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LegacyIncidentRow {
    pub incident_check: Option<String>,
    pub incident_count: Option<f64>,
}

impl LegacyIncidentRow {
    pub fn normalize(self) -> Result<IncidentRow, String> {
        let label: ReviewLabel = self
            .incident_check
            .as_deref()
            .ok_or_else(|| "Missing incident_check column value".to_string())?
            .parse()?;
        Ok(IncidentRow::summary(label, coerce_count(self.incident_count)))
    }
}

/// Column layout the query definition is expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    #[default]
    Report,
    Legacy,
}

impl FromStr for ResultShape {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "report" => Ok(ResultShape::Report),
            "legacy" => Ok(ResultShape::Legacy),
            other => Err(format!("Unknown result shape: {}", other)),
        }
    }
}

/// A single recorded incident, as held by the in-memory repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentEvent {
    pub occurred_at: DateTime<Utc>,
    pub label: ReviewLabel,
    /// Reviewer credited for the incident, if any.
    pub annotator: Option<String>,
}

impl IncidentEvent {
    pub fn needs_review(occurred_at: DateTime<Utc>) -> Self {
        Self {
            occurred_at,
            label: ReviewLabel::NeedsReview,
            annotator: None,
        }
    }

    pub fn reviewed(occurred_at: DateTime<Utc>, annotator: impl Into<String>) -> Self {
        Self {
            occurred_at,
            label: ReviewLabel::Reviewed,
            annotator: Some(annotator.into()),
        }
    }
}
