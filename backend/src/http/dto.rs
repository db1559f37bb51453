//! Data Transfer Objects for the HTTP API.
//!
//! Dashboard and selector DTOs are re-exported from the routes module since
//! they already derive Serialize/Deserialize.

use serde::{Deserialize, Serialize};

pub use crate::api::{
    // Dashboard
    BarSeries, DashboardResponse, DashboardState, DonutChart, DonutSlice, LeaderboardPanel,
    LeaderboardRow, MetricPill,
    // Selector
    TimeframeOption, TimeframesResponse,
    // Sessions
    SessionAnchor,
};
use crate::services::SelectionInput;

/// Header carrying the dashboard session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// API version
    pub version: String,
    /// Database connection status
    pub database: String,
    /// Repository backend in use
    pub backend: String,
}

/// Query parameters of `GET /v1/dashboard`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardQuery {
    /// Preset key or label (`24h`, `7 Days`)
    pub timeframe: Option<String>,
    /// Custom range start as a timestamp
    pub start: Option<String>,
    /// Custom range end as a timestamp
    pub end: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
    /// Session whose reference time anchors preset windows
    pub session: Option<String>,
}

impl DashboardQuery {
    pub fn selection_input(&self) -> SelectionInput {
        SelectionInput {
            timeframe: self.timeframe.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            start_date: self.start_date.clone(),
            start_time: self.start_time.clone(),
            end_date: self.end_date.clone(),
            end_time: self.end_time.clone(),
        }
    }
}
