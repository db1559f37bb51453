//! Presentation DTOs for the review dashboard.
//!
//! These types only reshape [`DashboardReport`] for a renderer. No counting
//! happens here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{format_timestamp, TimeWindow, TimeframeSelection};
use crate::services::{DashboardReport, WindowBasis};

/// Slice color for reviewed incidents.
pub const REVIEWED_COLOR: &str = "#00CC96";
/// Slice color for incidents still waiting for review.
pub const NEEDS_REVIEW_COLOR: &str = "#EF553B";
/// Inner radius of the donut as a fraction of the outer radius.
pub const DONUT_HOLE: f64 = 0.75;

pub const REVIEWED_PILL_LABEL: &str = "Reviewed";
pub const NEEDS_REVIEW_PILL_LABEL: &str = "Need to review";

/// Headline metric shown above the charts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricPill {
    pub label: String,
    pub value: u64,
    /// `value` with thousands separators.
    pub display: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonutSlice {
    /// Review label (`reviewed` / `needs-review`).
    pub label: String,
    pub value: u64,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DonutChart {
    pub slices: Vec<DonutSlice>,
    pub hole: f64,
    pub center_title: String,
    pub center_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardRow {
    /// 1-based position.
    pub rank: usize,
    pub annotator: String,
    pub count: u64,
    pub display: String,
}

/// Horizontal bar series, in the same order as the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarSeries {
    pub categories: Vec<String>,
    pub values: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardPanel {
    pub rows: Vec<LeaderboardRow>,
    pub bars: BarSeries,
}

/// Whether the run produced anything to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardState {
    Ready,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardResponse {
    pub state: DashboardState,
    /// The no-data notice; `None` when `state` is `ready`.
    pub message: Option<String>,
    pub selection: TimeframeSelection,
    pub window: TimeWindow,
    /// `database_clock` when the query ignored `window` and used its own `now()`.
    pub window_basis: WindowBasis,
    pub reference_now: DateTime<Utc>,
    pub pills: Vec<MetricPill>,
    pub donut: Option<DonutChart>,
    pub leaderboard: LeaderboardPanel,
}

/// Format an integer with `,` thousands separators.
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Notice shown when the window holds no incidents.
pub fn no_data_message(selection: &TimeframeSelection, window: &TimeWindow) -> String {
    match selection {
        TimeframeSelection::Preset { preset } => {
            format!("No incidents found in the last {}.", preset.label())
        }
        TimeframeSelection::Custom { .. } => format!(
            "No incidents found between {} and {}.",
            format_timestamp(window.start),
            format_timestamp(window.end)
        ),
    }
}

fn pill(label: &str, value: u64) -> MetricPill {
    MetricPill {
        label: label.to_string(),
        value,
        display: format_count(value),
    }
}

impl From<&DashboardReport> for DashboardResponse {
    fn from(report: &DashboardReport) -> Self {
        let summary = report.summary;
        let pills = vec![
            pill(REVIEWED_PILL_LABEL, summary.reviewed),
            pill(NEEDS_REVIEW_PILL_LABEL, summary.needs_review),
        ];

        let rows: Vec<LeaderboardRow> = report
            .leaderboard
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| LeaderboardRow {
                rank: i + 1,
                annotator: entry.annotator.clone(),
                count: entry.count,
                display: format_count(entry.count),
            })
            .collect();
        let bars = BarSeries {
            categories: rows.iter().map(|r| r.annotator.clone()).collect(),
            values: rows.iter().map(|r| r.count).collect(),
        };

        let (state, message, donut) = if report.has_data() {
            let donut = DonutChart {
                slices: vec![
                    DonutSlice {
                        label: "reviewed".to_string(),
                        value: summary.reviewed,
                        color: REVIEWED_COLOR.to_string(),
                    },
                    DonutSlice {
                        label: "needs-review".to_string(),
                        value: summary.needs_review,
                        color: NEEDS_REVIEW_COLOR.to_string(),
                    },
                ],
                hole: DONUT_HOLE,
                center_title: "Total".to_string(),
                center_value: format_count(summary.total),
            };
            (DashboardState::Ready, None, Some(donut))
        } else {
            (
                DashboardState::Empty,
                Some(no_data_message(&report.selection, &report.window)),
                None,
            )
        };

        Self {
            state,
            message,
            selection: report.selection,
            window: report.window,
            window_basis: report.window_basis,
            reference_now: report.reference_now,
            pills,
            donut,
            leaderboard: LeaderboardPanel { rows, bars },
        }
    }
}
