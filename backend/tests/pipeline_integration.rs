//! End-to-end dashboard runs against the in-memory repository.

mod support;

use chrono::{Duration, TimeZone, Utc};
use incident_review::db::repositories::LocalRepository;
use incident_review::db::{BoundValue, ParameterContract};
use incident_review::models::{
    IncidentEvent, IncidentRow, Preset, ResultShape, ReviewLabel, TimeframeSelection,
};
use incident_review::services::{run_dashboard, DashboardError, QuerySettings, WindowBasis};
use std::path::PathBuf;
use support::{query_file, reference_now, INTERVAL_QUERY, RANGE_QUERY};

fn settings(path: PathBuf) -> QuerySettings {
    QuerySettings {
        query_file: path,
        result_shape: ResultShape::Report,
    }
}

fn seeded_repo() -> LocalRepository {
    let now = reference_now();
    LocalRepository::with_events(vec![
        IncidentEvent::reviewed(now - Duration::minutes(10), "alice"),
        IncidentEvent::reviewed(now - Duration::minutes(20), "bob"),
        IncidentEvent::reviewed(now - Duration::minutes(30), "alice"),
        IncidentEvent::needs_review(now - Duration::minutes(40)),
        // Only inside the 7 day window
        IncidentEvent::reviewed(now - Duration::days(3), "carol"),
        IncidentEvent::needs_review(now - Duration::days(3)),
        // Outside every preset but 30/90 days
        IncidentEvent::reviewed(now - Duration::days(20), "dave"),
    ])
}

#[tokio::test]
async fn test_one_hour_preset() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = seeded_repo();

    let report = run_dashboard(
        &repo,
        &settings(path),
        TimeframeSelection::preset(Preset::OneHour),
        reference_now(),
    )
    .await
    .unwrap();

    assert!(report.has_data());
    assert_eq!(report.window_basis, WindowBasis::Anchor);
    assert_eq!(report.summary.reviewed, 3);
    assert_eq!(report.summary.needs_review, 1);
    assert_eq!(report.summary.total, 4);
    assert_eq!(report.window.end, reference_now());
    assert_eq!(report.window.start, reference_now() - Duration::hours(1));

    let board: Vec<(&str, u64)> = report
        .leaderboard
        .entries
        .iter()
        .map(|e| (e.annotator.as_str(), e.count))
        .collect();
    assert_eq!(board, vec![("alice", 2), ("bob", 1)]);
}

#[tokio::test]
async fn test_wider_preset_includes_older_incidents() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = seeded_repo();

    let report = run_dashboard(
        &repo,
        &settings(path),
        TimeframeSelection::preset(Preset::SevenDays),
        reference_now(),
    )
    .await
    .unwrap();

    assert_eq!(report.summary.reviewed, 4);
    assert_eq!(report.summary.needs_review, 2);
    assert_eq!(report.leaderboard.len(), 3);
    assert_eq!(report.leaderboard.entries[0].annotator, "alice");
}

#[tokio::test]
async fn test_range_query_binds_window_bounds() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = seeded_repo();

    run_dashboard(
        &repo,
        &settings(path),
        TimeframeSelection::preset(Preset::TwentyFourHours),
        reference_now(),
    )
    .await
    .unwrap();

    let executed = repo.executed_queries();
    assert_eq!(executed.len(), 1);
    let query = &executed[0];
    assert_eq!(query.contract, ParameterContract::Range);
    assert_eq!(
        query.values,
        vec![
            BoundValue::Timestamp(reference_now() - Duration::hours(24)),
            BoundValue::Timestamp(reference_now()),
        ]
    );
    assert!(query.sql.contains("$1") && query.sql.contains("$2"));
    assert!(!query.sql.contains(":start_time"));
}

#[tokio::test]
async fn test_custom_range() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = seeded_repo();
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 20, 0, 0, 0).unwrap();

    let report = run_dashboard(
        &repo,
        &settings(path),
        TimeframeSelection::custom(start, end),
        reference_now(),
    )
    .await
    .unwrap();

    assert_eq!(report.summary.reviewed, 1);
    assert_eq!(report.summary.needs_review, 0);
    assert_eq!(report.leaderboard.entries[0].annotator, "dave");
}

#[tokio::test]
async fn test_reversed_custom_range_runs_no_query() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = seeded_repo();
    let start = Utc.with_ymd_and_hms(2024, 5, 31, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();

    let err = run_dashboard(
        &repo,
        &settings(path),
        TimeframeSelection::custom(start, end),
        reference_now(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DashboardError::InvalidRange(_)));
    assert!(repo.executed_queries().is_empty());
}

#[tokio::test]
async fn test_empty_window_has_no_data() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = LocalRepository::new();

    let report = run_dashboard(
        &repo,
        &settings(path),
        TimeframeSelection::default(),
        reference_now(),
    )
    .await
    .unwrap();

    assert!(!report.has_data());
    assert_eq!(report.summary.total, 0);
    assert!(report.leaderboard.is_empty());
}

#[tokio::test]
async fn test_missing_query_file() {
    let repo = seeded_repo();
    let settings = settings(PathBuf::from("/nonexistent/dir/review-check.sql"));

    let err = run_dashboard(&repo, &settings, TimeframeSelection::default(), reference_now())
        .await
        .unwrap_err();

    match err {
        DashboardError::ResourceNotFound { message, .. } => {
            assert_eq!(
                message,
                "Error: 'review-check.sql' file not found in the directory."
            );
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(repo.executed_queries().is_empty());
}

#[tokio::test]
async fn test_query_file_is_reread_each_run() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = seeded_repo();
    let settings = settings(path.clone());

    run_dashboard(&repo, &settings, TimeframeSelection::default(), reference_now())
        .await
        .unwrap();

    std::fs::write(&path, "SELECT :start_time, $1").unwrap();
    let err = run_dashboard(&repo, &settings, TimeframeSelection::default(), reference_now())
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::QueryError { .. }));
    assert_eq!(repo.executed_queries().len(), 1);
}

#[tokio::test]
async fn test_connection_failure_then_recovery() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = seeded_repo();
    let settings = settings(path);
    repo.set_healthy(false);

    let err = run_dashboard(&repo, &settings, TimeframeSelection::default(), reference_now())
        .await
        .unwrap_err();
    assert!(matches!(err, DashboardError::ConnectionError { .. }));

    repo.set_healthy(true);
    let report = run_dashboard(&repo, &settings, TimeframeSelection::default(), reference_now())
        .await
        .unwrap();
    assert_eq!(report.summary.total, 4);
}

#[tokio::test]
async fn test_interval_query_with_preset() {
    let (_dir, path) = query_file(INTERVAL_QUERY);
    let repo = seeded_repo();
    let settings = QuerySettings {
        query_file: path,
        result_shape: ResultShape::Legacy,
    };

    let report = run_dashboard(
        &repo,
        &settings,
        TimeframeSelection::preset(Preset::SevenDays),
        reference_now(),
    )
    .await
    .unwrap();

    assert_eq!(report.summary.reviewed, 4);
    assert!(report.leaderboard.is_empty());

    assert_eq!(report.window_basis, WindowBasis::DatabaseClock);

    let executed = repo.executed_queries();
    assert_eq!(executed[0].contract, ParameterContract::Interval);
    assert_eq!(executed[0].values, vec![BoundValue::Text("7 days".to_string())]);
}

#[tokio::test]
async fn test_interval_query_rejects_custom_range() {
    let (_dir, path) = query_file(INTERVAL_QUERY);
    let repo = seeded_repo();
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

    let err = run_dashboard(
        &repo,
        &settings(path),
        TimeframeSelection::custom(start, end),
        reference_now(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, DashboardError::QueryError { .. }));
    assert!(repo.executed_queries().is_empty());
}

#[tokio::test]
async fn test_scripted_rows_with_unattributed_leaderboard_entry() {
    let (_dir, path) = query_file(RANGE_QUERY);
    let repo = LocalRepository::with_rows(vec![
        IncidentRow::summary(ReviewLabel::Reviewed, 5),
        IncidentRow::summary(ReviewLabel::NeedsReview, 2),
        IncidentRow::leaderboard("alice", 3),
        IncidentRow {
            report_type: incident_review::models::ReportType::Leaderboard,
            label: None,
            annotator: None,
            count: 2,
        },
    ]);

    let report = run_dashboard(
        &repo,
        &settings(path),
        TimeframeSelection::default(),
        reference_now(),
    )
    .await
    .unwrap();

    assert_eq!(report.summary.total, 7);
    assert_eq!(report.row_count, 4);
    assert_eq!(report.leaderboard.entries[1].annotator, "unattributed");
}
