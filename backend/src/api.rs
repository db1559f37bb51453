//! Public API surface for the dashboard backend.
//!
//! This file consolidates the DTO types for the HTTP API.
//! All types derive Serialize/Deserialize for JSON serialization.

pub use crate::routes::dashboard::BarSeries;
pub use crate::routes::dashboard::DashboardResponse;
pub use crate::routes::dashboard::DashboardState;
pub use crate::routes::dashboard::DonutChart;
pub use crate::routes::dashboard::DonutSlice;
pub use crate::routes::dashboard::LeaderboardPanel;
pub use crate::routes::dashboard::LeaderboardRow;
pub use crate::routes::dashboard::MetricPill;
pub use crate::routes::timeframes::TimeframeOption;
pub use crate::routes::timeframes::TimeframesResponse;
pub use crate::services::pipeline::WindowBasis;
pub use crate::services::session::SessionAnchor;

pub use crate::models::{
    LeaderboardEntry, LeaderboardView, Preset, SummaryView, TimeWindow, TimeframeSelection,
};

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
