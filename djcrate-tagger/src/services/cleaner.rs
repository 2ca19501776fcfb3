//! Store cleaner
//!
//! Strips every AI-written field from the collection so a library can be
//! re-tagged from scratch. `assigned_tags` is emptied rather than removed
//! (the scanner schema expects the key), everything else the analysis
//! pipeline ever wrote is deleted, including fields from older pipeline
//! versions that are no longer produced.

use djcrate_common::Collection;
use tracing::debug;

use crate::services::updater::{
    AI_MODEL, AI_PROCESSED, ESTIMATED_KEY, PROCESSED_DATE, PROCESSING_ID,
};

/// Extra-map fields removed by a clean, current and legacy.
const AI_EXTRA_FIELDS: &[&str] = &[
    AI_PROCESSED,
    PROCESSING_ID,
    PROCESSED_DATE,
    AI_MODEL,
    ESTIMATED_KEY,
    "confidence",
    "estimated_bpm",
    "energy_level",
    "danceability",
    "mood",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    /// Tracks that had at least one AI field.
    pub tracks_cleaned: usize,
    /// Total fields removed or emptied, across all tracks.
    pub fields_removed: usize,
}

/// Remove AI-written fields from every track in place.
///
/// Pure collection mutation; persisting the result is the caller's choice,
/// which is what makes a dry run possible.
pub fn clean_collection(collection: &mut Collection) -> CleanReport {
    let mut report = CleanReport::default();

    for track in &mut collection.tracks {
        let mut removed = 0;

        if !track.assigned_tags.is_empty() {
            track.assigned_tags.clear();
            removed += 1;
        }
        if track.tag_confidence.take().is_some() {
            removed += 1;
        }
        if track.research_notes.take().is_some() {
            removed += 1;
        }
        for field in AI_EXTRA_FIELDS {
            if track.extra.remove(*field).is_some() {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!(track = %track.filename, fields = removed, "track cleaned");
            report.tracks_cleaned += 1;
            report.fields_removed += removed;
        }
    }

    report
}
