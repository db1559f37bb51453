use serde::{Deserialize, Serialize};

/// Review totals for the summary metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryView {
    pub reviewed: u64,
    pub needs_review: u64,
    pub total: u64,
}

impl SummaryView {
    pub fn new(reviewed: u64, needs_review: u64) -> Self {
        Self {
            reviewed,
            needs_review,
            total: reviewed.saturating_add(needs_review),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub annotator: String,
    pub count: u64,
}

/// Annotators ordered by reviewed count, highest first.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeaderboardView {
    pub entries: Vec<LeaderboardEntry>,
}

impl LeaderboardView {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
