//! Service layer for business logic and orchestration.
//!
//! This module sits between the database layer and the HTTP handlers: it
//! resolves time windows, keeps per-session reference times, runs the review
//! query and turns its rows into summary and leaderboard views.

pub mod error;
pub mod partition;
pub mod pipeline;
pub mod session;
pub mod timeframe;

pub use error::{DashboardError, DashboardResult};
pub use partition::{partition, PartitionedReport};
pub use pipeline::{
    progress_message, run_dashboard, DashboardReport, QuerySettings, WindowBasis,
    DEFAULT_QUERY_FILE,
};
pub use session::{
    Clock, FixedClock, SessionAnchor, SessionStore, SystemClock, DEFAULT_MAX_SESSIONS,
};
pub use timeframe::{resolve_window, SelectionInput};
