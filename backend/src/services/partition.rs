//! Splitting query rows into the summary and leaderboard views.

use serde::Serialize;

use crate::models::{
    IncidentRow, LeaderboardEntry, LeaderboardView, ReportType, ReviewLabel, SummaryView,
};

/// Rows of one query result, split by report type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PartitionedReport {
    pub summary: Vec<IncidentRow>,
    pub leaderboard: Vec<IncidentRow>,
}

/// Split rows by report type. Relative order within each subset is kept.
pub fn partition(rows: impl IntoIterator<Item = IncidentRow>) -> PartitionedReport {
    let (summary, leaderboard) = rows
        .into_iter()
        .partition(|row| row.report_type == ReportType::Summary);
    PartitionedReport {
        summary,
        leaderboard,
    }
}

impl PartitionedReport {
    /// Both subsets back as one row list, summary rows first.
    pub fn union(&self) -> Vec<IncidentRow> {
        self.summary
            .iter()
            .chain(self.leaderboard.iter())
            .cloned()
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.leaderboard.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.summary.len() + self.leaderboard.len()
    }

    /// Totals per review label. Labels with no rows count as zero.
    pub fn summary_view(&self) -> SummaryView {
        let sum_for = |label: ReviewLabel| {
            self.summary
                .iter()
                .filter(|row| row.label == Some(label))
                .fold(0u64, |acc, row| acc.saturating_add(row.count))
        };
        SummaryView::new(sum_for(ReviewLabel::Reviewed), sum_for(ReviewLabel::NeedsReview))
    }

    /// Leaderboard ordered by count, highest first; ties keep query order.
    ///
    /// Rows without an annotator are credited to `unattributed`.
    pub fn leaderboard_view(&self) -> LeaderboardView {
        let mut entries: Vec<LeaderboardEntry> = self
            .leaderboard
            .iter()
            .map(|row| LeaderboardEntry {
                annotator: row.annotator_or_unattributed().to_string(),
                count: row.count,
            })
            .collect();
        entries.sort_by(|a, b| b.count.cmp(&a.count));
        LeaderboardView { entries }
    }
}
