//! Postgres repository implementation using Diesel.
//!
//! Runs the review query against a Postgres database through an r2d2 pool.
//! The pool is created lazily, so an unreachable database surfaces as a
//! `ConnectionError` on the request that needed it rather than at startup.
//!
//! ## Configuration
//!
//! See [`PostgresConfig::from_env`] for the environment variables read.

use async_trait::async_trait;
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::sql_query;
use diesel::sql_types::{Text, Timestamptz};
use std::time::Duration;
use tokio::task;

use crate::db::query::{BoundQuery, BoundValue};
use crate::db::repository::{
    ErrorContext, IncidentRepository, RepositoryError, RepositoryResult,
};
use crate::models::{IncidentRow, LegacyIncidentRow, RawReportRow, ResultShape};

pub use crate::db::config::PostgresConfig;

mod models;

use models::*;

type PgPool = Pool<ConnectionManager<PgConnection>>;

/// Diesel-backed repository for Postgres.
#[derive(Clone, Debug)]
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Create a new repository.
    ///
    /// No connection is opened here; the first query does that.
    pub fn new(config: PostgresConfig) -> RepositoryResult<Self> {
        if config.database_url.trim().is_empty() {
            return Err(RepositoryError::configuration_with_context(
                "Database URL is empty",
                ErrorContext::new("create_pool"),
            ));
        }

        let max_size = config.max_pool_size.max(1);
        let manager = ConnectionManager::<PgConnection>::new(&config.database_url);
        let pool = Pool::builder()
            .max_size(max_size)
            .min_idle(Some(config.min_pool_size.min(max_size)))
            .connection_timeout(Duration::from_secs(config.connection_timeout_sec.max(1)))
            .idle_timeout(idle_timeout(config.idle_timeout_sec))
            .test_on_check_out(true)
            .build_unchecked(manager);

        log::info!(
            "Postgres pool configured (max_size={}, timeout={}s)",
            max_size,
            config.connection_timeout_sec
        );

        Ok(Self { pool })
    }

    /// Check out one connection, run `f` on the blocking pool, and return
    /// the connection whatever the outcome.
    async fn with_conn<T, F>(&self, operation: &'static str, f: F) -> RepositoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> RepositoryResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();

        task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| {
                RepositoryError::connection_with_context(
                    e.to_string(),
                    ErrorContext::new(operation).with_details("pool_checkout"),
                )
            })?;
            f(&mut conn).map_err(|e| e.with_operation(operation))
        })
        .await
        .map_err(|e| RepositoryError::internal(format!("Task join error: {}", e)))?
    }
}

/// r2d2 rejects a zero idle timeout; zero means connections never expire.
fn idle_timeout(seconds: u64) -> Option<Duration> {
    (seconds > 0).then(|| Duration::from_secs(seconds))
}

fn normalize_rows<R, F>(rows: Vec<R>, normalize: F) -> RepositoryResult<Vec<IncidentRow>>
where
    F: Fn(R) -> Result<IncidentRow, String>,
{
    rows.into_iter()
        .map(|row| {
            normalize(row).map_err(|message| {
                RepositoryError::query_with_context(
                    message,
                    ErrorContext::default().with_entity("incident_rows"),
                )
            })
        })
        .collect()
}

#[async_trait]
impl IncidentRepository for PostgresRepository {
    async fn health_check(&self) -> RepositoryResult<bool> {
        self.with_conn("health_check", |conn| {
            sql_query("SELECT 1")
                .execute(conn)
                .map(|_| true)
                .map_err(RepositoryError::from)
        })
        .await
    }

    async fn fetch_incident_rows(&self, query: &BoundQuery) -> RepositoryResult<Vec<IncidentRow>> {
        let query = query.clone();
        self.with_conn("fetch_incident_rows", move |conn| {
            let mut statement = sql_query(query.sql).into_boxed::<Pg>();
            for value in query.values {
                statement = match value {
                    BoundValue::Timestamp(ts) => statement.bind::<Timestamptz, _>(ts),
                    BoundValue::Text(text) => statement.bind::<Text, _>(text),
                };
            }

            match query.shape {
                ResultShape::Report => {
                    let rows = statement.load::<ReportRow>(conn)?;
                    normalize_rows(rows, |row| RawReportRow::from(row).normalize())
                }
                ResultShape::Legacy => {
                    let rows = statement.load::<LegacyRow>(conn)?;
                    normalize_rows(rows, |row| LegacyIncidentRow::from(row).normalize())
                }
            }
        })
        .await
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
