//! Presentation DTOs served by the HTTP layer.

pub mod dashboard;
pub mod timeframes;
