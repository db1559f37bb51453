//! # Incident Review Dashboard Backend
//!
//! Read-only analytics backend for dashcam incident review.
//!
//! Each request resolves a timeframe (a preset such as "24 Hours" or a
//! custom range) against the session's reference time, runs one review
//! query against the incident database, and returns the review totals and
//! the per-annotator leaderboard as display-ready JSON.
//!
//! ## Architecture
//!
//! - [`models`]: Time windows, presets, incident rows and derived views
//! - [`db`]: Query file loading, parameter binding and repositories
//! - [`services`]: Window resolution, partitioning, sessions and the pipeline
//! - [`routes`]: Presentation DTOs (metric pills, donut, leaderboard)
//! - [`api`]: Re-exports of the DTOs served over HTTP
//! - [`http`]: Axum-based HTTP server and request handlers

// RepositoryError carries structured context
#![allow(clippy::result_large_err)]

pub mod api;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
