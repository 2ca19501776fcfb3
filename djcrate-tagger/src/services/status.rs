//! Tagging coverage report

use std::collections::HashSet;

use djcrate_common::Collection;

use crate::services::selector::find_first_untagged;

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub total_tracks: usize,
    pub tagged: usize,
    pub untagged: usize,
    /// Distinct tags currently in use across the collection.
    pub distinct_tags: usize,
    /// The track the next batch run would pick up.
    pub next_untagged: Option<String>,
}

impl StatusReport {
    pub fn tagged_percent(&self) -> f64 {
        if self.total_tracks == 0 {
            0.0
        } else {
            self.tagged as f64 * 100.0 / self.total_tracks as f64
        }
    }
}

pub fn collection_status(collection: &Collection) -> StatusReport {
    let tagged = collection.tagged_count();
    let distinct: HashSet<&str> = collection
        .tracks
        .iter()
        .flat_map(|t| t.assigned_tags.iter().map(|s| s.as_str()))
        .collect();

    StatusReport {
        total_tracks: collection.tracks.len(),
        tagged,
        untagged: collection.tracks.len() - tagged,
        distinct_tags: distinct.len(),
        next_untagged: find_first_untagged(collection).map(|t| t.filename.clone()),
    }
}
