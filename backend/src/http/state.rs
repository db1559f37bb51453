//! Application state for the HTTP server.

use std::sync::Arc;

use crate::db::repository::IncidentRepository;
use crate::models::Preset;
use crate::services::{QuerySettings, SessionStore};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn IncidentRepository>,
    /// Reference times of the open dashboard sessions
    pub sessions: SessionStore,
    /// Query file and result shape used for every run
    pub query: Arc<QuerySettings>,
    /// Preset used when a request names no timeframe
    pub default_timeframe: Preset,
}

impl AppState {
    /// Create a new application state with the given repository and default
    /// settings.
    pub fn new(repository: Arc<dyn IncidentRepository>) -> Self {
        Self {
            repository,
            sessions: SessionStore::new(),
            query: Arc::new(QuerySettings::default()),
            default_timeframe: Preset::default(),
        }
    }

    pub fn with_query_settings(mut self, settings: QuerySettings) -> Self {
        self.query = Arc::new(settings);
        self
    }

    pub fn with_sessions(mut self, sessions: SessionStore) -> Self {
        self.sessions = sessions;
        self
    }

    pub fn with_default_timeframe(mut self, preset: Preset) -> Self {
        self.default_timeframe = preset;
        self
    }
}
