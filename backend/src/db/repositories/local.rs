//! In-memory local repository implementation.
//!
//! Holds incident events in memory and answers review queries by aggregating
//! them over the bound window, the same way the SQL query does in the
//! database. Suitable for unit tests and local development.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::db::query::BoundQuery;
use crate::db::repository::*;
use crate::models::{IncidentEvent, IncidentRow, ResultShape, ReviewLabel};

/// In-memory local repository.
///
/// # Example
/// ```
/// use incident_review::db::repositories::LocalRepository;
/// use incident_review::models::IncidentEvent;
/// use chrono::Utc;
///
/// let repo = LocalRepository::new();
/// repo.add_event(IncidentEvent::reviewed(Utc::now(), "alice"));
/// assert_eq!(repo.event_count(), 1);
/// ```
#[derive(Clone, Default)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

struct LocalData {
    events: Vec<IncidentEvent>,
    /// When set, returned verbatim instead of aggregating `events`.
    scripted_rows: Option<Vec<IncidentRow>>,
    /// Every query this repository has been asked to run.
    executed: Vec<BoundQuery>,
    is_healthy: bool,
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            scripted_rows: None,
            executed: Vec::new(),
            is_healthy: true,
        }
    }
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a repository pre-populated with events.
    pub fn with_events(events: impl IntoIterator<Item = IncidentEvent>) -> Self {
        let repo = Self::new();
        repo.data.write().events.extend(events);
        repo
    }

    /// Create a repository that answers every query with `rows`.
    pub fn with_rows(rows: Vec<IncidentRow>) -> Self {
        let repo = Self::new();
        repo.set_scripted_rows(Some(rows));
        repo
    }

    pub fn add_event(&self, event: IncidentEvent) {
        self.data.write().events.push(event);
    }

    pub fn set_scripted_rows(&self, rows: Option<Vec<IncidentRow>>) {
        self.data.write().scripted_rows = rows;
    }

    /// Set the health status for testing connection failures.
    pub fn set_healthy(&self, healthy: bool) {
        self.data.write().is_healthy = healthy;
    }

    /// Clear all data from the repository, keeping the health flag.
    pub fn clear(&self) {
        let mut data = self.data.write();
        *data = LocalData {
            is_healthy: data.is_healthy,
            ..Default::default()
        };
    }

    pub fn event_count(&self) -> usize {
        self.data.read().events.len()
    }

    /// Queries run so far, oldest first.
    pub fn executed_queries(&self) -> Vec<BoundQuery> {
        self.data.read().executed.clone()
    }

    fn check_health(&self) -> RepositoryResult<()> {
        if !self.data.read().is_healthy {
            return Err(RepositoryError::connection_with_context(
                "Database is not healthy",
                ErrorContext::new("fetch_incident_rows").with_entity("local"),
            ));
        }
        Ok(())
    }
}

/// Aggregate events inside the query window into result rows.
///
/// Summary rows come first (reviewed, then needs-review), followed by one
/// leaderboard row per annotator of reviewed events in order of first
/// appearance. Labels with no events produce no row.
fn aggregate(events: &[IncidentEvent], query: &BoundQuery) -> Vec<IncidentRow> {
    let in_window: Vec<&IncidentEvent> = events
        .iter()
        .filter(|e| query.window.contains(e.occurred_at))
        .collect();

    let mut rows = Vec::new();
    for label in [ReviewLabel::Reviewed, ReviewLabel::NeedsReview] {
        let count = in_window.iter().filter(|e| e.label == label).count() as u64;
        if count > 0 {
            rows.push(IncidentRow::summary(label, count));
        }
    }

    if query.shape == ResultShape::Legacy {
        return rows;
    }

    let mut leaderboard: Vec<(Option<String>, u64)> = Vec::new();
    for event in in_window
        .iter()
        .filter(|e| e.label == ReviewLabel::Reviewed)
    {
        match leaderboard.iter_mut().find(|(name, _)| *name == event.annotator) {
            Some((_, count)) => *count += 1,
            None => leaderboard.push((event.annotator.clone(), 1)),
        }
    }
    rows.extend(leaderboard.into_iter().map(|(annotator, count)| IncidentRow {
        report_type: crate::models::ReportType::Leaderboard,
        label: None,
        annotator,
        count,
    }));
    rows
}

#[async_trait]
impl IncidentRepository for LocalRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        Ok(self.data.read().is_healthy)
    }

    async fn fetch_incident_rows(&self, query: &BoundQuery) -> RepositoryResult<Vec<IncidentRow>> {
        self.check_health()?;

        let mut data = self.data.write();
        data.executed.push(query.clone());
        let rows = match &data.scripted_rows {
            Some(rows) => rows.clone(),
            None => aggregate(&data.events, query),
        };
        Ok(rows)
    }

    fn backend_name(&self) -> &'static str {
        "local"
    }
}
