use diesel::prelude::*;
use diesel::sql_types::{Double, Nullable, Text};

use crate::models::{LegacyIncidentRow, RawReportRow};

/// Row of the wrapped review query in the `report` shape.
///
/// Every column is nullable; validation happens in [`RawReportRow::normalize`].
#[derive(Debug, Clone, QueryableByName)]
pub struct ReportRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub report_type: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub label: Option<String>,
    #[diesel(sql_type = Nullable<Text>)]
    pub annotator: Option<String>,
    #[diesel(sql_type = Nullable<Double>)]
    pub count: Option<f64>,
}

impl From<ReportRow> for RawReportRow {
    fn from(row: ReportRow) -> Self {
        Self {
            report_type: row.report_type,
            label: row.label,
            annotator: row.annotator,
            count: row.count,
        }
    }
}

/// Row of the wrapped review query in the `legacy` shape.
#[derive(Debug, Clone, QueryableByName)]
pub struct LegacyRow {
    #[diesel(sql_type = Nullable<Text>)]
    pub incident_check: Option<String>,
    #[diesel(sql_type = Nullable<Double>)]
    pub incident_count: Option<f64>,
}

impl From<LegacyRow> for LegacyIncidentRow {
    fn from(row: LegacyRow) -> Self {
        Self {
            incident_check: row.incident_check,
            incident_count: row.incident_count,
        }
    }
}
