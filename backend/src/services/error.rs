//! Errors surfaced by the dashboard pipeline.

use crate::db::RepositoryError;
use crate::models::{InvalidRange, TimestampParseError};

pub type DashboardResult<T> = Result<T, DashboardError>;

/// Failure of one dashboard run. None of these are fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum DashboardError {
    /// The query definition file is missing or unreadable.
    #[error("{message}")]
    ResourceNotFound { message: String, details: Option<String> },

    /// The database could not be reached.
    #[error("Database connection failed: {message}")]
    ConnectionError { message: String },

    #[error("Invalid time range: {0}")]
    InvalidRange(#[from] InvalidRange),

    /// Malformed SQL, parameter mismatch or rows outside the result contract.
    #[error("Query failed: {message}")]
    QueryError { message: String, details: Option<String> },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Unknown timeframe: {0}")]
    UnknownTimeframe(String),

    #[error(transparent)]
    InvalidTimestamp(#[from] TimestampParseError),
}

impl DashboardError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            DashboardError::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            DashboardError::ConnectionError { .. } => "CONNECTION_ERROR",
            DashboardError::InvalidRange(_) => "INVALID_RANGE",
            DashboardError::QueryError { .. } => "QUERY_ERROR",
            DashboardError::Configuration { .. } => "CONFIGURATION_ERROR",
            DashboardError::UnknownTimeframe(_) | DashboardError::InvalidTimestamp(_) => {
                "BAD_REQUEST"
            }
        }
    }
}

impl From<RepositoryError> for DashboardError {
    fn from(err: RepositoryError) -> Self {
        let details = err.context().details.clone();
        match err {
            RepositoryError::NotFound { message, .. } => {
                DashboardError::ResourceNotFound { message, details }
            }
            RepositoryError::ConnectionError { message, .. }
            | RepositoryError::TimeoutError { message, .. } => {
                DashboardError::ConnectionError { message }
            }
            RepositoryError::ConfigurationError { message, .. } => {
                DashboardError::Configuration { message }
            }
            RepositoryError::QueryError { message, .. }
            | RepositoryError::InternalError { message, .. } => {
                DashboardError::QueryError { message, details }
            }
        }
    }
}
