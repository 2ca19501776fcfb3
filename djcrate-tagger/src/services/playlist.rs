//! Per-tag playlist export
//!
//! Writes one m3u8 playlist per taxonomy tag, grouped into directories by
//! taxonomy category. Entries use the extended m3u format (`#EXTM3U` /
//! `#EXTINF`) with paths relative to the collection root, which is how DJ
//! software expects a portable playlist to look. Tracks appear in
//! collection order.

use std::path::{Path, PathBuf};

use chrono::Local;
use djcrate_common::{write_atomic, Collection, Result, Taxonomy, Track};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct PlaylistOptions {
    pub output_dir: PathBuf,
    /// Tags carried by fewer tracks than this are skipped.
    pub min_tracks: usize,
}

#[derive(Debug, Clone, Default)]
pub struct PlaylistReport {
    pub written: usize,
    pub skipped: usize,
    /// Playlists written per category, in taxonomy order.
    pub by_category: Vec<(String, usize)>,
}

/// "peak-time" renders as "Peak Time" in playlist headers.
fn humanize_tag(tag: &str) -> String {
    tag.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Category names become directory names: keep alphanumerics, spaces,
/// underscores, and hyphens; collapse whitespace runs to underscores.
fn sanitize_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let joined = safe.split_whitespace().collect::<Vec<_>>().join("_");
    joined.chars().take(200).collect()
}

fn entry_title(track: &Track) -> String {
    let artist = track
        .artist
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or("Unknown Artist");
    let title = track
        .title
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(&track.filename);
    format!("{} - {}", artist, title)
}

fn render_playlist(tag: &str, members: &[&Track]) -> String {
    let mut lines = vec![
        "#EXTM3U".to_string(),
        format!("# {}", humanize_tag(tag)),
        format!(
            "# Generated by djcrate on {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ),
        String::new(),
    ];
    for track in members {
        lines.push(format!("#EXTINF:-1,{}", entry_title(track)));
        lines.push(track.relative_path.clone());
    }
    lines.join("\n") + "\n"
}

fn playlist_path(output_dir: &Path, category: &str, tag: &str) -> PathBuf {
    output_dir
        .join(sanitize_name(category))
        .join(format!("{}.m3u8", tag))
}

/// Export one playlist per taxonomy tag with at least `min_tracks` member
/// tracks. Returns what was written and what was skipped.
pub fn export_playlists(
    collection: &Collection,
    taxonomy: &Taxonomy,
    options: &PlaylistOptions,
) -> Result<PlaylistReport> {
    let mut report = PlaylistReport::default();

    for category in taxonomy.categories() {
        let mut written_here = 0;
        for tag in &category.tags {
            let members: Vec<&Track> = collection
                .tracks
                .iter()
                .filter(|t| t.assigned_tags.iter().any(|x| x == tag))
                .collect();
            if members.len() < options.min_tracks {
                debug!(tag = %tag, members = members.len(), "playlist below threshold, skipped");
                report.skipped += 1;
                continue;
            }

            let path = playlist_path(&options.output_dir, &category.name, tag);
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            write_atomic(&path, &render_playlist(tag, &members))?;
            debug!(playlist = %path.display(), tracks = members.len(), "playlist written");
            report.written += 1;
            written_here += 1;
        }
        if written_here > 0 {
            report.by_category.push((category.name.clone(), written_here));
        }
    }

    info!(
        written = report.written,
        skipped = report.skipped,
        output = %options.output_dir.display(),
        "playlist export complete"
    );
    Ok(report)
}
