//! Tag merge and update engine
//!
//! Applies a sanitized analysis to one track in the in-memory collection.
//! Two modes: Replace discards the existing tag list, Merge unions into it
//! (existing order first, novel tags appended in analysis order). In both
//! modes `tag_confidence` and `research_notes` describe the latest
//! analysis, and the audit stamps are refreshed. Persistence is the
//! caller's job.

use djcrate_common::Collection;
use tracing::debug;

use crate::models::{ApplyOutcome, SanitizedResult, UpdateMode};
use crate::services::selector::find_index_by_identity;

/// Audit stamp fields written on every update.
pub const AI_PROCESSED: &str = "ai_processed";
pub const PROCESSING_ID: &str = "processing_id";
pub const PROCESSED_DATE: &str = "processed_date";
pub const AI_MODEL: &str = "ai_model";
/// Written only when the model inferred a key for a track without one.
pub const ESTIMATED_KEY: &str = "estimated_key";

fn merge_tags(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut merged = existing.to_vec();
    for tag in incoming {
        if !merged.iter().any(|t| t == tag) {
            merged.push(tag.clone());
        }
    }
    merged
}

/// Resolve `identity` and apply the result. A miss returns
/// [`ApplyOutcome::NotFound`] and leaves the collection untouched.
pub fn apply_result(
    collection: &mut Collection,
    identity: &str,
    result: &SanitizedResult,
    mode: UpdateMode,
    model: &str,
) -> ApplyOutcome {
    match find_index_by_identity(collection, identity) {
        Some(index) => ApplyOutcome::Updated {
            previous_tags: apply_at(collection, index, result, mode, model),
        },
        None => ApplyOutcome::NotFound,
    }
}

/// Apply the result to the track at `index`, returning the previous tag
/// list.
///
/// The index must come from a selector lookup on this same collection.
pub fn apply_at(
    collection: &mut Collection,
    index: usize,
    result: &SanitizedResult,
    mode: UpdateMode,
    model: &str,
) -> Vec<String> {
    let track = &mut collection.tracks[index];
    let previous_tags = track.assigned_tags.clone();

    track.assigned_tags = match mode {
        UpdateMode::Replace => result.tags.clone(),
        UpdateMode::Merge => merge_tags(&previous_tags, &result.tags),
    };
    track.tag_confidence = Some(serde_json::Number::from(result.confidence));
    track.research_notes = Some(result.research_notes.clone());

    track
        .extra
        .insert(AI_PROCESSED.to_string(), serde_json::Value::from(true));
    track.extra.insert(
        PROCESSING_ID.to_string(),
        serde_json::Value::from(uuid::Uuid::new_v4().to_string()),
    );
    track.extra.insert(
        PROCESSED_DATE.to_string(),
        serde_json::Value::from(chrono::Utc::now().to_rfc3339()),
    );
    track
        .extra
        .insert(AI_MODEL.to_string(), serde_json::Value::from(model));

    if let Some(key) = &result.detected_key {
        if track.key_is_unknown() {
            track
                .extra
                .insert(ESTIMATED_KEY.to_string(), serde_json::Value::from(key.as_str()));
        }
    }

    debug!(
        track = %track.filename,
        mode = mode.as_str(),
        previous = previous_tags.len(),
        current = track.assigned_tags.len(),
        confidence = result.confidence,
        "track updated"
    );

    previous_tags
}

#[cfg(test)]
mod tests {
    use super::*;
    use djcrate_common::{CollectionInfo, Track};
    use serde_json::Map;

    fn sanitized(tags: &[&str], confidence: u8) -> SanitizedResult {
        SanitizedResult {
            tags: tags.iter().map(|s| s.to_string()).collect(),
            confidence,
            research_notes: "fresh notes".to_string(),
            detected_key: None,
            discarded: vec![],
        }
    }

    fn track(filename: &str, tags: &[&str]) -> Track {
        Track {
            relative_path: format!("House/{}", filename),
            filename: filename.to_string(),
            artist: None,
            title: None,
            album: None,
            genre: None,
            date: None,
            bpm: None,
            key: None,
            composer: None,
            duration_formatted: None,
            assigned_tags: tags.iter().map(|s| s.to_string()).collect(),
            tag_confidence: Some(serde_json::Number::from(40u8)),
            research_notes: Some("stale notes".to_string()),
            extra: Map::new(),
        }
    }

    fn collection(tracks: Vec<Track>) -> Collection {
        Collection {
            metadata: CollectionInfo::default(),
            tracks,
        }
    }

    #[test]
    fn merge_unions_and_preserves_existing_order() {
        let mut c = collection(vec![track("t.mp3", &["a", "b"])]);
        let result = sanitized(&["b", "c"], 80);
        let outcome = apply_result(&mut c, "t.mp3", &result, UpdateMode::Merge, "m1");

        assert_eq!(
            outcome,
            ApplyOutcome::Updated { previous_tags: vec!["a".to_string(), "b".to_string()] }
        );
        assert_eq!(c.tracks[0].assigned_tags, vec!["a", "b", "c"]);
    }

    #[test]
    fn replace_discards_existing_tags() {
        let mut c = collection(vec![track("t.mp3", &["a", "b"])]);
        let result = sanitized(&["b", "c"], 80);
        apply_result(&mut c, "t.mp3", &result, UpdateMode::Replace, "m1");
        assert_eq!(c.tracks[0].assigned_tags, vec!["b", "c"]);
    }

    #[test]
    fn confidence_and_notes_always_overwritten() {
        let mut c = collection(vec![track("t.mp3", &["a"])]);
        // Merge adds nothing new, but the analysis record still refreshes.
        let result = sanitized(&["a"], 95);
        apply_result(&mut c, "t.mp3", &result, UpdateMode::Merge, "m1");

        let t = &c.tracks[0];
        assert_eq!(t.assigned_tags, vec!["a"]);
        assert_eq!(t.tag_confidence, Some(serde_json::Number::from(95u8)));
        assert_eq!(t.research_notes.as_deref(), Some("fresh notes"));
    }

    #[test]
    fn audit_stamps_are_written() {
        let mut c = collection(vec![track("t.mp3", &[])]);
        apply_result(&mut c, "t.mp3", &sanitized(&["a"], 70), UpdateMode::Replace, "model-x");

        let extra = &c.tracks[0].extra;
        assert_eq!(extra.get(AI_PROCESSED), Some(&serde_json::Value::from(true)));
        assert_eq!(extra.get(AI_MODEL), Some(&serde_json::Value::from("model-x")));
        assert!(extra.get(PROCESSING_ID).is_some());
        assert!(extra.get(PROCESSED_DATE).is_some());
    }

    #[test]
    fn estimated_key_written_only_when_track_key_unknown() {
        let mut with_key = sanitized(&["a"], 70);
        with_key.detected_key = Some("8A".to_string());

        let mut c = collection(vec![track("t.mp3", &[])]);
        apply_result(&mut c, "t.mp3", &with_key, UpdateMode::Replace, "m");
        assert_eq!(
            c.tracks[0].extra.get(ESTIMATED_KEY),
            Some(&serde_json::Value::from("8A"))
        );

        let mut keyed = track("k.mp3", &[]);
        keyed.key = Some("5B".to_string());
        let mut c = collection(vec![keyed]);
        apply_result(&mut c, "k.mp3", &with_key, UpdateMode::Replace, "m");
        assert!(c.tracks[0].extra.get(ESTIMATED_KEY).is_none());
    }

    #[test]
    fn not_found_leaves_collection_untouched() {
        let mut c = collection(vec![track("t.mp3", &["a"])]);
        let before = serde_json::to_value(&c).unwrap();

        let outcome =
            apply_result(&mut c, "missing.mp3", &sanitized(&["b"], 80), UpdateMode::Merge, "m");

        assert_eq!(outcome, ApplyOutcome::NotFound);
        assert_eq!(serde_json::to_value(&c).unwrap(), before);
    }
}
