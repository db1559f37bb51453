#![allow(dead_code)]

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Report-shaped query filtered by the resolved window.
pub const RANGE_QUERY: &str = "SELECT report_type, label, annotator, count \
    FROM review_check WHERE occurred_at BETWEEN :start_time AND :end_time;";

/// Legacy query relative to the database clock.
pub const INTERVAL_QUERY: &str = "SELECT incident_check, incident_count FROM incidents \
    WHERE occurred_at >= now() - :time_window::interval";

/// Fixed reference time shared by the pipeline tests.
pub fn reference_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
}

/// Write `sql` to a query file inside a fresh temporary directory.
///
/// The directory must outlive the returned path.
pub fn query_file(sql: &str) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("review-check.sql");
    std::fs::write(&path, sql).expect("write query file");
    (dir, path)
}

/// Runs `f` with environment variables temporarily modified.
///
/// Variables are restored on unwind and access is serialized across tests.
///
/// `changes` is a list of `(key, value)` pairs:
/// - `Some(v)` sets the variable to `v`
/// - `None` removes the variable
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    snapshot: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let snapshot = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect::<Vec<_>>();

        for (k, v) in changes {
            match v {
                Some(val) => std::env::set_var(k, val),
                None => std::env::remove_var(k),
            }
        }

        Self { snapshot }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (k, v) in self.snapshot.drain(..) {
            match v {
                Some(val) => std::env::set_var(&k, val),
                None => std::env::remove_var(&k),
            }
        }
    }
}
