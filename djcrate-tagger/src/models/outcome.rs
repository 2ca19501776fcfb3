//! Update and batch outcome types
//!
//! Per-track outcomes are values, not errors: a missed identity or an
//! analysis that produced nothing are normal results the caller reports,
//! so the batch loop can keep going.

/// How validated tags are applied to a track's existing tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Discard existing tags, keep only the new set.
    Replace,
    /// Set union: existing tags keep their order, novel tags append in
    /// analysis order.
    Merge,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Replace => "replace",
            UpdateMode::Merge => "merge",
        }
    }
}

/// Result of applying a sanitized analysis to the collection.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// Track updated in place; previous tag list kept for reporting.
    Updated { previous_tags: Vec<String> },
    /// No track matched the identity. The collection was not touched.
    NotFound,
}

/// Everything worth reporting about one successful track update.
#[derive(Debug, Clone)]
pub struct UpdateReport {
    pub filename: String,
    pub mode: UpdateMode,
    pub previous_tags: Vec<String>,
    pub new_tags: Vec<String>,
    pub confidence: u8,
    pub research_notes: String,
    /// Tags the taxonomy rejected during sanitization.
    pub discarded: Vec<String>,
}

/// Terminal outcome of one analyze-and-update pass.
#[derive(Debug, Clone)]
pub enum TrackOutcome {
    /// Track analyzed, tags applied, store persisted.
    Updated(UpdateReport),
    /// Analysis produced no usable tags; nothing was written.
    AnalysisFailed { filename: String, notes: String },
    /// An explicit identity matched no track; nothing was written.
    NotFound { identity: String },
    /// No untagged tracks remain. Normal terminal state, not an error.
    NothingToDo,
}

/// Why a batch run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Requested track count processed.
    CountReached,
    /// Collection has no untagged tracks left.
    Exhausted,
    /// Operator requested cancellation.
    Cancelled,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::CountReached => "count reached",
            StopReason::Exhausted => "no untagged tracks remain",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Tallies for a batch run.
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub attempted: usize,
    pub updated: usize,
    pub failed: usize,
    pub stop_reason: StopReason,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_mode_names() {
        assert_eq!(UpdateMode::Replace.as_str(), "replace");
        assert_eq!(UpdateMode::Merge.as_str(), "merge");
    }

    #[test]
    fn stop_reason_names() {
        assert_eq!(StopReason::Exhausted.as_str(), "no untagged tracks remain");
    }
}
