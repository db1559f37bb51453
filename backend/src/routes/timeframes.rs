use serde::{Deserialize, Serialize};

use crate::models::Preset;

/// One entry of the timeframe selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframeOption {
    pub key: String,
    pub label: String,
    pub interval: String,
    pub duration_seconds: i64,
}

impl From<Preset> for TimeframeOption {
    fn from(preset: Preset) -> Self {
        Self {
            key: preset.key().to_string(),
            label: preset.label().to_string(),
            interval: preset.interval_literal().to_string(),
            duration_seconds: preset.duration().num_seconds(),
        }
    }
}

/// Selector options plus the one selected by default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeframesResponse {
    pub options: Vec<TimeframeOption>,
    pub default: String,
}

impl TimeframesResponse {
    pub fn new(default: Preset) -> Self {
        Self {
            options: Preset::ALL.into_iter().map(TimeframeOption::from).collect(),
            default: default.key().to_string(),
        }
    }
}
