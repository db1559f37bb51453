//! One dashboard run: resolve the window, run the query, partition the rows.

use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::error::DashboardResult;
use super::partition::partition;
use super::timeframe::resolve_window;
use crate::db::{
    execute_report_query, prepare_report_query, IncidentRepository, ParameterContract,
};
use crate::models::{LeaderboardView, ResultShape, SummaryView, TimeWindow, TimeframeSelection};

/// Query file looked up when none is configured.
pub const DEFAULT_QUERY_FILE: &str = "review-check.sql";

/// Where the review query lives and which columns it returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySettings {
    pub query_file: PathBuf,
    pub result_shape: ResultShape,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            query_file: PathBuf::from(DEFAULT_QUERY_FILE),
            result_shape: ResultShape::default(),
        }
    }
}

/// What the database actually filtered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowBasis {
    /// The reported window was bound into the query.
    Anchor,
    /// The query measured the preset interval from the database's `now()`;
    /// the reported window is the anchor's approximation of it.
    DatabaseClock,
    /// The query takes no time parameters.
    Unfiltered,
}

impl From<ParameterContract> for WindowBasis {
    fn from(contract: ParameterContract) -> Self {
        match contract {
            ParameterContract::Range => WindowBasis::Anchor,
            ParameterContract::Interval => WindowBasis::DatabaseClock,
            ParameterContract::None => WindowBasis::Unfiltered,
        }
    }
}

/// Views produced by one run, ready for presentation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardReport {
    pub selection: TimeframeSelection,
    pub window: TimeWindow,
    pub window_basis: WindowBasis,
    pub reference_now: DateTime<Utc>,
    pub summary: SummaryView,
    pub leaderboard: LeaderboardView,
    /// Rows returned by the query before partitioning.
    pub row_count: usize,
}

impl DashboardReport {
    /// `false` when the query returned no rows at all.
    pub fn has_data(&self) -> bool {
        self.row_count > 0
    }
}

/// Message shown while a run is in flight.
pub fn progress_message(selection: &TimeframeSelection) -> String {
    format!("Fetching incident data for {}...", selection.describe())
}

/// Run the pipeline once.
///
/// Each call reads the query file again and issues exactly one query. An
/// invalid range fails before the repository is touched.
pub async fn run_dashboard<R: IncidentRepository + ?Sized>(
    repo: &R,
    settings: &QuerySettings,
    selection: TimeframeSelection,
    reference_now: DateTime<Utc>,
) -> DashboardResult<DashboardReport> {
    let window = resolve_window(&selection, reference_now)?;
    info!("{}", progress_message(&selection));

    let query =
        prepare_report_query(&settings.query_file, window, &selection, settings.result_shape)
            .await?;
    let rows = execute_report_query(repo, &query).await?;

    let report = partition(rows);
    Ok(DashboardReport {
        selection,
        window,
        window_basis: WindowBasis::from(query.contract),
        reference_now,
        summary: report.summary_view(),
        leaderboard: report.leaderboard_view(),
        row_count: report.row_count(),
    })
}
