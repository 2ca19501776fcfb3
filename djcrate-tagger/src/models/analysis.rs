//! Analysis result types
//!
//! [`AnalysisResult`] is what a backend reported, before any taxonomy
//! check. [`SanitizedResult`] is what may touch the store: tags filtered to
//! taxonomy members, confidence adjusted for anything discarded.

use serde::{Deserialize, Serialize};

/// Maximum confidence score a backend can report.
pub const MAX_CONFIDENCE: u8 = 100;

/// Raw per-track analysis as reported by a backend.
///
/// Analysis never fails hard: provider errors, timeouts, and unparseable
/// responses all collapse into an empty-tags result whose notes explain
/// what happened. Callers detect failure with [`AnalysisResult::is_empty`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Tags the model proposed, in model order. Not yet validated.
    pub tags: Vec<String>,
    /// Self-reported confidence, clamped to 0-100.
    pub confidence: u8,
    /// Free-text reasoning or diagnostic notes.
    pub research_notes: String,
    /// Musical key the model inferred, when asked to.
    pub detected_key: Option<String>,
}

impl AnalysisResult {
    pub fn new(
        tags: Vec<String>,
        confidence: u8,
        research_notes: String,
        detected_key: Option<String>,
    ) -> Self {
        Self {
            tags,
            confidence: confidence.min(MAX_CONFIDENCE),
            research_notes,
            detected_key,
        }
    }

    /// Soft-failure result: no tags, zero confidence, diagnostic notes.
    pub fn failure(notes: impl Into<String>) -> Self {
        Self {
            tags: Vec::new(),
            confidence: 0,
            research_notes: notes.into(),
            detected_key: None,
        }
    }

    /// True when the analysis produced no usable tags.
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Taxonomy-validated analysis, safe to merge into the store.
#[derive(Debug, Clone, PartialEq)]
pub struct SanitizedResult {
    /// Taxonomy members only, in analysis order.
    pub tags: Vec<String>,
    /// Confidence after the per-invalid-tag deduction.
    pub confidence: u8,
    /// Analysis notes, annotated when tags were discarded.
    pub research_notes: String,
    /// Musical key the model inferred, when asked to.
    pub detected_key: Option<String>,
    /// Tags the taxonomy rejected, kept for reporting.
    pub discarded: Vec<String>,
}

impl SanitizedResult {
    /// Sanitize a raw result against a validation partition: keep the valid
    /// tags, deduct `penalty` confidence points per rejected tag
    /// (saturating at zero), and note what was removed.
    pub fn from_validated(
        result: &AnalysisResult,
        valid: Vec<String>,
        invalid: Vec<String>,
        penalty: u32,
    ) -> Self {
        let deduction = penalty.saturating_mul(invalid.len() as u32);
        let confidence = u32::from(result.confidence).saturating_sub(deduction) as u8;

        let mut notes = result.research_notes.clone();
        if !invalid.is_empty() {
            if !notes.is_empty() {
                notes.push(' ');
            }
            notes.push_str(&format!(
                "[{} invalid tags filtered: {}]",
                invalid.len(),
                invalid.join(", ")
            ));
        }

        Self {
            tags: valid,
            confidence,
            research_notes: notes,
            detected_key: result.detected_key.clone(),
            discarded: invalid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped_at_construction() {
        let r = AnalysisResult::new(vec!["deep".into()], 150, String::new(), None);
        assert_eq!(r.confidence, 100);
    }

    #[test]
    fn failure_result_is_empty_with_zero_confidence() {
        let r = AnalysisResult::failure("provider timeout");
        assert!(r.is_empty());
        assert_eq!(r.confidence, 0);
        assert_eq!(r.research_notes, "provider timeout");
    }

    #[test]
    fn sanitize_deducts_per_invalid_tag() {
        let raw = AnalysisResult::new(
            vec!["deep".into(), "fake-a".into(), "fake-b".into()],
            90,
            "solid groove".into(),
            None,
        );
        let s = SanitizedResult::from_validated(
            &raw,
            vec!["deep".into()],
            vec!["fake-a".into(), "fake-b".into()],
            5,
        );
        assert_eq!(s.confidence, 80);
        assert_eq!(s.tags, vec!["deep"]);
        assert!(s.research_notes.contains("solid groove"));
        assert!(s.research_notes.contains("[2 invalid tags filtered: fake-a, fake-b]"));
    }

    #[test]
    fn sanitize_saturates_at_zero() {
        let raw = AnalysisResult::new(vec!["x".into()], 10, String::new(), None);
        let s = SanitizedResult::from_validated(
            &raw,
            vec![],
            vec!["a".into(), "b".into(), "c".into()],
            5,
        );
        assert_eq!(s.confidence, 0);
    }

    #[test]
    fn sanitize_without_rejects_leaves_notes_alone() {
        let raw = AnalysisResult::new(vec!["deep".into()], 75, "clean".into(), None);
        let s = SanitizedResult::from_validated(&raw, vec!["deep".into()], vec![], 5);
        assert_eq!(s.confidence, 75);
        assert_eq!(s.research_notes, "clean");
        assert!(s.discarded.is_empty());
    }
}
