//! High-level database service layer.
//!
//! Repository-agnostic operations used by the dashboard pipeline and the HTTP
//! health endpoint. Query loading and binding happen here so every backend
//! sees the same bound query.
//!
//! # Usage
//!
//! ```no_run
//! use incident_review::db::{services, repositories::LocalRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let repo = LocalRepository::new();
//!     let healthy = services::health_check(&repo).await?;
//!     println!("database healthy: {}", healthy);
//!     Ok(())
//! }
//! ```

use log::{debug, info, warn};
use std::path::Path;

use super::query::{BoundQuery, QueryDefinition};
use super::repository::{IncidentRepository, RepositoryResult};
use crate::models::{IncidentRow, ResultShape, TimeWindow, TimeframeSelection};

// ==================== Health & Connection ====================

/// Check if the database connection is healthy.
pub async fn health_check<R: IncidentRepository + ?Sized>(repo: &R) -> RepositoryResult<bool> {
    repo.health_check().await
}

// ==================== Review Query ====================

/// Load the query file and bind the resolved window to it.
pub async fn prepare_report_query(
    query_file: &Path,
    window: TimeWindow,
    selection: &TimeframeSelection,
    shape: ResultShape,
) -> RepositoryResult<BoundQuery> {
    let definition = QueryDefinition::load(query_file).await?;
    debug!(
        "Loaded query {} ({:?} contract, {} parameter(s))",
        query_file.display(),
        definition.contract(),
        definition.params().len()
    );
    definition.bind(window, selection, shape)
}

/// Run one bound review query and return its rows.
pub async fn execute_report_query<R: IncidentRepository + ?Sized>(
    repo: &R,
    query: &BoundQuery,
) -> RepositoryResult<Vec<IncidentRow>> {
    match repo.fetch_incident_rows(query).await {
        Ok(rows) => {
            info!(
                "Review query returned {} row(s) from {} for {}",
                rows.len(),
                repo.backend_name(),
                query.window
            );
            Ok(rows)
        }
        Err(e) => {
            warn!("Review query failed on {}: {}", repo.backend_name(), e);
            Err(e)
        }
    }
}
