//! HTTP handlers for the REST API.
//!
//! Each handler corresponds to an API endpoint and delegates to the
//! service layer for business logic.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use super::dto::{
    DashboardQuery, DashboardResponse, HealthResponse, SessionAnchor, TimeframesResponse,
    SESSION_HEADER,
};
use super::error::AppError;
use super::state::AppState;
use crate::db::services as db_services;
use crate::services::{resolve_window, run_dashboard, DashboardError};

/// Result type for handlers.
pub type HandlerResult<T> = Result<Json<T>, AppError>;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Health check endpoint to verify the service is running and database is accessible.
pub async fn health_check(State(state): State<AppState>) -> HandlerResult<HealthResponse> {
    let db_status = match db_services::health_check(state.repository.as_ref()).await {
        Ok(true) => "connected".to_string(),
        Ok(false) => "disconnected".to_string(),
        Err(e) => format!("error: {}", e),
    };

    Ok(Json(HealthResponse {
        status: "ok".to_string(),
        version: "v1".to_string(),
        database: db_status,
        backend: state.repository.backend_name().to_string(),
    }))
}

// =============================================================================
// Selector & Sessions
// =============================================================================

/// GET /v1/timeframes
pub async fn list_timeframes(State(state): State<AppState>) -> HandlerResult<TimeframesResponse> {
    Ok(Json(TimeframesResponse::new(state.default_timeframe)))
}

/// POST /v1/sessions
///
/// Open a session whose reference time is "now".
pub async fn create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionAnchor>), AppError> {
    let session = state.sessions.create();
    tracing::info!(session_id = %session.session_id, "session created");
    Ok((StatusCode::CREATED, Json(session)))
}

/// POST /v1/sessions/{session_id}/refresh
///
/// Manual refresh: move the session's reference time to "now".
pub async fn refresh_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> HandlerResult<SessionAnchor> {
    if session_id.trim().is_empty() {
        return Err(AppError::BadRequest("session id must not be empty".into()));
    }
    let session = state.sessions.refresh(&session_id);
    tracing::info!(session_id = %session.session_id, anchor = %session.anchor, "session refreshed");
    Ok(Json(session))
}

// =============================================================================
// Dashboard
// =============================================================================

/// GET /v1/dashboard
///
/// Resolve the requested timeframe, run the review query and return the
/// dashboard panels. Invalid selector input is rejected before any session
/// is touched.
pub async fn get_dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<DashboardQuery>,
) -> HandlerResult<DashboardResponse> {
    let selection = query
        .selection_input()
        .into_selection(state.default_timeframe)?;
    resolve_window(&selection, state.sessions.now()).map_err(DashboardError::from)?;

    let session_id = query
        .session
        .clone()
        .or_else(|| {
            headers
                .get(SESSION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .filter(|id| !id.trim().is_empty());

    let reference_now = match session_id.as_deref() {
        Some(id) => state.sessions.anchor_for(id),
        None => state.sessions.now(),
    };

    let report = run_dashboard(
        state.repository.as_ref(),
        &state.query,
        selection,
        reference_now,
    )
    .await?;

    Ok(Json(DashboardResponse::from(&report)))
}
