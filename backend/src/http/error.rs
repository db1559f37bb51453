//! HTTP error handling and response types.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::db::repository::RepositoryError;
use crate::services::DashboardError;

/// API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Application error type for HTTP handlers.
#[derive(Debug)]
pub enum AppError {
    /// Invalid request (validation error)
    BadRequest(String),
    /// Internal server error
    Internal(String),
    /// Failure of a dashboard run
    Dashboard(DashboardError),
}

fn dashboard_status(err: &DashboardError) -> StatusCode {
    match err {
        DashboardError::InvalidRange(_)
        | DashboardError::UnknownTimeframe(_)
        | DashboardError::InvalidTimestamp(_) => StatusCode::BAD_REQUEST,
        DashboardError::ConnectionError { .. } => StatusCode::SERVICE_UNAVAILABLE,
        DashboardError::ResourceNotFound { .. }
        | DashboardError::QueryError { .. }
        | DashboardError::Configuration { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ApiError::new("BAD_REQUEST", msg)),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("INTERNAL_ERROR", msg),
            ),
            AppError::Dashboard(e) => {
                let status = dashboard_status(&e);
                let mut error = ApiError::new(e.code(), e.to_string());
                match &e {
                    DashboardError::ResourceNotFound {
                        details: Some(details),
                        ..
                    }
                    | DashboardError::QueryError {
                        details: Some(details),
                        ..
                    } => error = error.with_details(details.clone()),
                    _ => {}
                }
                (status, error)
            }
        };

        if status.is_server_error() {
            tracing::error!(code = %error.code, "{}", error.message);
        } else {
            tracing::debug!(code = %error.code, "{}", error.message);
        }

        (status, Json(error)).into_response()
    }
}

impl From<DashboardError> for AppError {
    fn from(err: DashboardError) -> Self {
        AppError::Dashboard(err)
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        AppError::Dashboard(err.into())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
