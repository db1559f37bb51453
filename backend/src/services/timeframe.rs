//! Time-window resolution.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::error::{DashboardError, DashboardResult};
use crate::models::{
    parse_date_time, parse_timestamp, InvalidRange, Preset, TimeWindow, TimeframeSelection,
};

/// Time of day assumed when a custom range gives a start date alone.
const DAY_START: &str = "00:00:00";
/// Time of day assumed when a custom range gives an end date alone.
const DAY_END: &str = "23:59:59";

/// Raw selector inputs as they arrive from a client.
///
/// Either `timeframe` names a preset, or a custom range is given as full
/// timestamps (`start`, `end`) or as separate date and time parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectionInput {
    pub timeframe: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub start_date: Option<String>,
    pub start_time: Option<String>,
    pub end_date: Option<String>,
    pub end_time: Option<String>,
}

impl SelectionInput {
    fn is_custom(&self) -> bool {
        [
            &self.start,
            &self.end,
            &self.start_date,
            &self.start_time,
            &self.end_date,
            &self.end_time,
        ]
        .iter()
        .any(|field| field.as_deref().is_some_and(|v| !v.trim().is_empty()))
    }

    /// Turn the inputs into a selection, falling back to `default_preset`
    /// when nothing was chosen.
    pub fn into_selection(self, default_preset: Preset) -> DashboardResult<TimeframeSelection> {
        if !self.is_custom() {
            let preset = match self.timeframe.as_deref().map(str::trim) {
                None | Some("") => default_preset,
                Some(name) => name
                    .parse::<Preset>()
                    .map_err(|_| DashboardError::UnknownTimeframe(name.to_string()))?,
            };
            return Ok(TimeframeSelection::preset(preset));
        }

        if self.timeframe.as_deref().is_some_and(|t| !t.trim().is_empty()) {
            return Err(DashboardError::UnknownTimeframe(
                "timeframe cannot be combined with a custom range".to_string(),
            ));
        }

        let start = bound_from(self.start, self.start_date, self.start_time, DAY_START, "start")?;
        let end = bound_from(self.end, self.end_date, self.end_time, DAY_END, "end")?;
        Ok(TimeframeSelection::custom(start, end))
    }
}

fn bound_from(
    timestamp: Option<String>,
    date: Option<String>,
    time: Option<String>,
    default_time: &str,
    which: &str,
) -> DashboardResult<DateTime<Utc>> {
    if let Some(ts) = timestamp.filter(|v| !v.trim().is_empty()) {
        return Ok(parse_timestamp(&ts)?);
    }
    match date.filter(|v| !v.trim().is_empty()) {
        Some(date) => {
            let time = time
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_time.to_string());
            Ok(parse_date_time(&date, &time)?)
        }
        None => Err(DashboardError::UnknownTimeframe(format!(
            "custom range is missing its {}",
            which
        ))),
    }
}

/// Map a selection to a concrete window relative to `reference_now`.
///
/// Presets end at `reference_now`; custom ranges are taken as given and
/// rejected when `start > end`. The reference time is always supplied by the
/// caller so the same inputs give the same window.
pub fn resolve_window(
    selection: &TimeframeSelection,
    reference_now: DateTime<Utc>,
) -> Result<TimeWindow, InvalidRange> {
    match *selection {
        TimeframeSelection::Preset { preset } => {
            Ok(TimeWindow::ending_at(reference_now, preset.duration()))
        }
        TimeframeSelection::Custom { start, end } => TimeWindow::new(start, end),
    }
}
