//! Incident repository trait for read-only review queries.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::db::query::BoundQuery;
use crate::models::IncidentRow;

/// Repository trait for incident review data.
///
/// Implementations never write to the incident store and never retry: a
/// failed query is reported to the caller, who decides whether to run it
/// again.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Check that the backing store is reachable.
    ///
    /// # Returns
    /// * `Ok(true)` - The store answered
    /// * `Err(RepositoryError)` - If the store cannot be reached
    async fn health_check(&self) -> RepositoryResult<bool>;

    /// Run a bound review query and return its normalized rows.
    ///
    /// Exactly one connection is used for the query and released before this
    /// returns, whether the query succeeded or not. An empty result is `Ok`.
    ///
    /// # Arguments
    /// * `query` - Query text with positional values and the expected shape
    async fn fetch_incident_rows(&self, query: &BoundQuery) -> RepositoryResult<Vec<IncidentRow>>;

    /// Short backend name used in logs and health responses.
    fn backend_name(&self) -> &'static str;
}
