//! End-to-end tagging workflow
//!
//! `run_one` is the whole pipeline for a single track: resolve the target,
//! analyze, enforce the taxonomy, merge, persist. `run_batch` repeats it
//! sequentially with a pacing delay between items and cooperative
//! cancellation checked between items, never inside one. Soft failures are
//! tallied and the loop continues; only store and configuration errors
//! propagate.

use std::time::{Duration, Instant};

use djcrate_common::{Taxonomy, TrackStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::TaggerResult;
use crate::models::{
    BatchSummary, SanitizedResult, StopReason, TrackOutcome, UpdateMode, UpdateReport,
};
use crate::services::analyzer::Analyzer;
use crate::services::{selector, updater};

pub struct TaggingWorkflow {
    store: TrackStore,
    taxonomy: Taxonomy,
    analyzer: Analyzer,
    invalid_tag_penalty: u32,
}

impl TaggingWorkflow {
    pub fn new(
        store: TrackStore,
        taxonomy: Taxonomy,
        analyzer: Analyzer,
        invalid_tag_penalty: u32,
    ) -> Self {
        Self {
            store,
            taxonomy,
            analyzer,
            invalid_tag_penalty,
        }
    }

    /// Analyze and update one track.
    ///
    /// With an explicit identity the target must match it; otherwise the
    /// first untagged track is taken. The collection is re-read from disk
    /// on every call so concurrent manual edits between batch items are
    /// picked up rather than overwritten.
    pub async fn run_one(&self, explicit: Option<&str>) -> TaggerResult<TrackOutcome> {
        let mut collection = self.store.load()?;

        let index = match explicit {
            Some(identity) => match selector::find_index_by_identity(&collection, identity) {
                Some(index) => index,
                None => {
                    warn!(identity = %identity, "no track matched identity");
                    return Ok(TrackOutcome::NotFound {
                        identity: identity.to_string(),
                    });
                }
            },
            None => match selector::find_first_untagged_index(&collection) {
                Some(index) => index,
                None => return Ok(TrackOutcome::NothingToDo),
            },
        };

        let filename = collection.tracks[index].filename.clone();
        let had_tags = !collection.tracks[index].is_untagged();

        info!(
            track = %filename,
            backend = self.analyzer.backend_name(),
            model = %self.analyzer.model(),
            "analyzing track"
        );
        let analysis = self
            .analyzer
            .analyze(&collection.tracks[index], &self.taxonomy)
            .await;

        if analysis.is_empty() {
            return Ok(TrackOutcome::AnalysisFailed {
                filename,
                notes: analysis.research_notes,
            });
        }

        let validation = self.taxonomy.validate(&analysis.tags);
        if validation.invalid_count() > 0 {
            warn!(
                track = %filename,
                invalid = ?validation.invalid,
                "model proposed tags outside the taxonomy"
            );
        }
        let sanitized = SanitizedResult::from_validated(
            &analysis,
            validation.valid,
            validation.invalid,
            self.invalid_tag_penalty,
        );
        if sanitized.tags.is_empty() {
            // Every proposed tag was outside the taxonomy. Nothing usable
            // survived, so nothing is written.
            return Ok(TrackOutcome::AnalysisFailed {
                filename,
                notes: sanitized.research_notes,
            });
        }

        // A track that already carries tags is enriched, never clobbered.
        let mode = if had_tags {
            UpdateMode::Merge
        } else {
            UpdateMode::Replace
        };
        let previous_tags = updater::apply_at(
            &mut collection,
            index,
            &sanitized,
            mode,
            self.analyzer.model(),
        );
        let new_tags = collection.tracks[index].assigned_tags.clone();

        self.store.save(&collection)?;
        info!(
            track = %filename,
            mode = mode.as_str(),
            tags = new_tags.len(),
            confidence = sanitized.confidence,
            "track updated and saved"
        );

        Ok(TrackOutcome::Updated(UpdateReport {
            filename,
            mode,
            previous_tags,
            new_tags,
            confidence: sanitized.confidence,
            research_notes: sanitized.research_notes,
            discarded: sanitized.discarded,
        }))
    }

    /// Tag up to `count` untagged tracks, pacing between items.
    ///
    /// Stops early when the collection runs out of untagged tracks or when
    /// `cancel` fires. Cancellation is only honored between items, so the
    /// in-flight track always finishes and persists.
    pub async fn run_batch(
        &self,
        count: usize,
        pacing: Duration,
        cancel: CancellationToken,
    ) -> TaggerResult<BatchSummary> {
        let started = Instant::now();
        let mut summary = BatchSummary {
            attempted: 0,
            updated: 0,
            failed: 0,
            stop_reason: StopReason::CountReached,
        };

        for n in 0..count {
            if cancel.is_cancelled() {
                summary.stop_reason = StopReason::Cancelled;
                break;
            }

            match self.run_one(None).await? {
                TrackOutcome::NothingToDo => {
                    summary.stop_reason = StopReason::Exhausted;
                    break;
                }
                TrackOutcome::Updated(report) => {
                    summary.attempted += 1;
                    summary.updated += 1;
                    info!(
                        item = n + 1,
                        of = count,
                        track = %report.filename,
                        tags = report.new_tags.len(),
                        confidence = report.confidence,
                        "batch item updated"
                    );
                }
                TrackOutcome::AnalysisFailed { filename, notes } => {
                    summary.attempted += 1;
                    summary.failed += 1;
                    warn!(
                        item = n + 1,
                        of = count,
                        track = %filename,
                        notes = %notes,
                        "batch item failed"
                    );
                }
                TrackOutcome::NotFound { identity } => {
                    // run_one(None) does not produce identity misses.
                    summary.attempted += 1;
                    summary.failed += 1;
                    warn!(identity = %identity, "batch item reported an identity miss");
                }
            }

            if n + 1 < count && !pacing.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        summary.stop_reason = StopReason::Cancelled;
                        break;
                    }
                    _ = tokio::time::sleep(pacing) => {}
                }
            }
        }

        info!(
            attempted = summary.attempted,
            updated = summary.updated,
            failed = summary.failed,
            reason = summary.stop_reason.as_str(),
            elapsed_secs = started.elapsed().as_secs(),
            "batch complete"
        );
        Ok(summary)
    }
}
