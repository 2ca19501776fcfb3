//! Music collection JSON store
//!
//! The collection lives in a single JSON document produced by the library
//! scanner: a `metadata` bookkeeping header plus a `tracks` array. This
//! module models both halves and provides [`TrackStore`], the load/save
//! accessor used by every command.
//!
//! Fidelity rule: fields this tool does not model must survive a load/save
//! cycle untouched. Both [`CollectionInfo`] and [`Track`] carry a flattened
//! extra map for that purpose, and scanner fields that older scans stored
//! with a different JSON type (string vs number) are kept as written.

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// Scalar scanner field that may be a JSON number or a string depending on
/// the scan that produced it. Round-trips exactly as written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Number(serde_json::Number),
    Text(String),
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Number(n) => write!(f, "{}", n),
            MetaValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Bookkeeping header written by the library scanner.
///
/// This tool never interprets these values; they are preserved so that a
/// tagging pass does not degrade the scanner's own records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectionInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_files: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub successful_extractions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_extractions: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collection_duration_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size_gb: Option<f64>,

    /// Header fields this tool does not model.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One audio file as recorded by the scanner, plus the tagging fields this
/// tool writes (`assigned_tags`, `tag_confidence`, `research_notes` and the
/// audit stamps kept in `extra`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    /// Path relative to the collection root, always present.
    pub relative_path: String,
    /// Base filename, always present.
    pub filename: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<MetaValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bpm: Option<MetaValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_formatted: Option<String>,

    /// Curated taxonomy tags. Empty means the track has not been tagged yet.
    #[serde(default)]
    pub assigned_tags: Vec<String>,

    /// Confidence score (0-100) from the most recent analysis. Kept as a raw
    /// JSON number so legacy float scores load without loss.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_confidence: Option<serde_json::Number>,

    /// Free-text notes from the most recent analysis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_notes: Option<String>,

    /// Track fields this tool does not model, including the audit stamps
    /// (`ai_processed`, `processing_id`, `processed_date`, `ai_model`,
    /// `estimated_key`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Track {
    /// A track is untagged when it carries no assigned tags.
    pub fn is_untagged(&self) -> bool {
        self.assigned_tags.is_empty()
    }

    /// True when the scanner recorded no usable musical key.
    pub fn key_is_unknown(&self) -> bool {
        self.key.as_deref().map_or(true, |k| k.trim().is_empty())
    }
}

/// The whole collection document: scanner header plus tracks in scan order.
///
/// Track order is identity-stable: load and save never reorder entries, so
/// "first untagged" and playlist ordering are deterministic across runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collection {
    pub metadata: CollectionInfo,
    pub tracks: Vec<Track>,
}

impl Collection {
    /// Number of tracks with at least one assigned tag.
    pub fn tagged_count(&self) -> usize {
        self.tracks.iter().filter(|t| !t.is_untagged()).count()
    }
}

/// Write a whole file through a temporary sibling plus rename, so readers
/// never observe a torn write.
pub fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

/// Load/save accessor for the collection document.
///
/// Operations are whole-document: `load` reads everything, `save` rewrites
/// everything. Saves go through a temporary file in the store's directory
/// followed by an atomic rename, so a crash mid-write can never leave a
/// truncated store behind. Single-writer discipline is assumed; nothing here
/// locks the file against concurrent writers.
#[derive(Debug, Clone)]
pub struct TrackStore {
    path: PathBuf,
}

impl TrackStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and deserialize the collection document.
    ///
    /// Missing file is [`Error::NotFound`]; malformed JSON is
    /// [`Error::Parse`] with the serde detail preserved.
    pub fn load(&self) -> Result<Collection> {
        if !self.path.exists() {
            return Err(Error::NotFound(format!(
                "collection store {}",
                self.path.display()
            )));
        }
        let raw = std::fs::read_to_string(&self.path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::Parse(format!(
                "collection store {} is not valid JSON: {}",
                self.path.display(),
                e
            ))
        })
    }

    /// Serialize and persist the collection document.
    ///
    /// Writes to a temporary file beside the store, then renames it over the
    /// original.
    pub fn save(&self, collection: &Collection) -> Result<()> {
        let json = serde_json::to_string_pretty(collection)?;
        write_atomic(&self.path, &json)?;
        tracing::debug!(
            store = %self.path.display(),
            tracks = collection.tracks.len(),
            "collection saved"
        );
        Ok(())
    }
}
