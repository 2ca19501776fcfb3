//! Core data types for the tagging pipeline

pub mod analysis;
pub mod outcome;

pub use analysis::{AnalysisResult, SanitizedResult};
pub use outcome::{ApplyOutcome, BatchSummary, StopReason, TrackOutcome, UpdateMode, UpdateReport};
