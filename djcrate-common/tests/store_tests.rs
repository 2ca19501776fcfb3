//! On-disk tests for the collection store accessor.

use djcrate_common::{Error, TrackStore};

const FIXTURE: &str = r#"{
  "metadata": {
    "total_files": 3,
    "successful_extractions": 3,
    "failed_extractions": 0,
    "scan_date": "2025-11-02",
    "scan_time": "14:55:01",
    "directory_path": "/music/alldj",
    "collection_duration_hours": 0.25,
    "total_size_gb": 0.4,
    "scanner_version": "2.1"
  },
  "tracks": [
    {
      "relative_path": "House/Artist One - Opener.mp3",
      "filename": "Artist One - Opener.mp3",
      "artist": "Artist One",
      "title": "Opener",
      "bpm": 122,
      "key": "8A",
      "assigned_tags": ["deep", "warmup"],
      "tag_confidence": 85,
      "research_notes": "first pass",
      "waveform_cache": "abc123"
    },
    {
      "relative_path": "House/Artist Two - Peak.mp3",
      "filename": "Artist Two - Peak.mp3",
      "artist": "Artist Two",
      "title": "Peak",
      "bpm": "128",
      "assigned_tags": []
    },
    {
      "relative_path": "Techno/Artist Three - Closer.mp3",
      "filename": "Artist Three - Closer.mp3"
    }
  ]
}"#;

fn fixture_store(dir: &tempfile::TempDir) -> TrackStore {
    let path = dir.path().join("music_collection.json");
    std::fs::write(&path, FIXTURE).unwrap();
    TrackStore::new(path)
}

#[test]
fn load_reads_tracks_in_document_order() {
    let dir = tempfile::tempdir().unwrap();
    let store = fixture_store(&dir);

    let collection = store.load().unwrap();
    assert_eq!(collection.tracks.len(), 3);
    assert_eq!(collection.tracks[0].filename, "Artist One - Opener.mp3");
    assert_eq!(collection.tracks[2].filename, "Artist Three - Closer.mp3");
    assert_eq!(collection.metadata.total_files, Some(3));
}

#[test]
fn save_then_load_preserves_everything() {
    let dir = tempfile::tempdir().unwrap();
    let store = fixture_store(&dir);

    let collection = store.load().unwrap();
    store.save(&collection).unwrap();
    let reloaded = store.load().unwrap();

    // Scanner fields this tool does not model survive the cycle.
    assert_eq!(
        reloaded.metadata.extra.get("scanner_version"),
        Some(&serde_json::Value::from("2.1"))
    );
    assert_eq!(
        reloaded.tracks[0].extra.get("waveform_cache"),
        Some(&serde_json::Value::from("abc123"))
    );

    // Typed fields survive with their original JSON types.
    let raw: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.path()).unwrap()).unwrap();
    assert_eq!(raw["tracks"][0]["bpm"], serde_json::Value::from(122));
    assert_eq!(raw["tracks"][1]["bpm"], serde_json::Value::from("128"));
    assert_eq!(raw["tracks"][0]["tag_confidence"], serde_json::Value::from(85));

    // Order and tag state are identity-stable.
    assert_eq!(reloaded.tracks[0].assigned_tags, vec!["deep", "warmup"]);
    assert!(reloaded.tracks[1].is_untagged());
    assert!(reloaded.tracks[2].is_untagged());
}

#[test]
fn save_replaces_existing_file_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let store = fixture_store(&dir);

    let mut collection = store.load().unwrap();
    collection.tracks[1].assigned_tags = vec!["energetic".to_string()];
    store.save(&collection).unwrap();

    let reloaded = store.load().unwrap();
    assert_eq!(reloaded.tracks[1].assigned_tags, vec!["energetic"]);
    // No stray temp files left beside the store.
    let entries: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec!["music_collection.json"]);
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("music_collection.json");
    std::fs::write(&path, "{ not json").unwrap();

    match TrackStore::new(path).load() {
        Err(Error::Parse(msg)) => assert!(msg.contains("not valid JSON")),
        other => panic!("expected Parse error, got {:?}", other),
    }
}
