//! Analysis prompt assembly
//!
//! One prompt format for every backend. Missing metadata is presented as
//! the literal "Unknown" rather than omitted, so the model knows the field
//! exists and was not extractable, and the full taxonomy text is embedded
//! verbatim as the only permitted tag vocabulary.

use djcrate_common::{store::MetaValue, Taxonomy, Track};

const UNKNOWN: &str = "Unknown";

/// Suggested tag-count range in the prompt. Guidance for the model, not an
/// enforced bound.
const TAG_COUNT_MIN: usize = 10;
const TAG_COUNT_MAX: usize = 15;

fn text_or_unknown(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => UNKNOWN,
    }
}

fn meta_or_unknown(value: Option<&MetaValue>) -> String {
    match value {
        Some(v) => {
            let s = v.to_string();
            if s.trim().is_empty() {
                UNKNOWN.to_string()
            } else {
                s
            }
        }
        None => UNKNOWN.to_string(),
    }
}

/// Build the per-track analysis prompt.
pub fn build_analysis_prompt(track: &Track, taxonomy: &Taxonomy) -> String {
    let current_tags = if track.assigned_tags.is_empty() {
        "(none)".to_string()
    } else {
        track.assigned_tags.join(", ")
    };

    let mut prompt = format!(
        "You are an expert DJ and music analyst. Analyze the following track \
         from a DJ library and assign descriptive tags to it.\n\
         \n\
         TRACK INFORMATION:\n\
         - Filename: {filename}\n\
         - Artist: {artist}\n\
         - Title: {title}\n\
         - Album: {album}\n\
         - Genre: {genre}\n\
         - Date: {date}\n\
         - BPM: {bpm}\n\
         - Key: {key}\n\
         - Composer: {composer}\n\
         - Duration: {duration}\n\
         - Current tags: {current_tags}\n\
         \n\
         TAG TAXONOMY:\n\
         {taxonomy}\n\
         \n\
         INSTRUCTIONS:\n\
         1. Assign {tag_min}-{tag_max} tags that best describe this track for DJ set planning.\n\
         2. Use ONLY tags that appear in the taxonomy above, spelled exactly as shown.\n\
         3. Rate your overall confidence in the assignment from 0 to 100.\n\
         4. Summarize your reasoning in one or two sentences of research notes.\n",
        tag_min = TAG_COUNT_MIN,
        tag_max = TAG_COUNT_MAX,
        filename = track.filename,
        artist = text_or_unknown(track.artist.as_deref()),
        title = text_or_unknown(track.title.as_deref()),
        album = text_or_unknown(track.album.as_deref()),
        genre = text_or_unknown(track.genre.as_deref()),
        date = meta_or_unknown(track.date.as_ref()),
        bpm = meta_or_unknown(track.bpm.as_ref()),
        key = text_or_unknown(track.key.as_deref()),
        composer = text_or_unknown(track.composer.as_deref()),
        duration = text_or_unknown(track.duration_formatted.as_deref()),
        current_tags = current_tags,
        taxonomy = taxonomy.raw_text().trim_end(),
    );

    if track.key_is_unknown() {
        prompt.push_str(
            "5. The musical key is unknown. Include a \"detected_key\" field with your \
             best estimate of the key (for example \"8A\" or \"A minor\").\n",
        );
    }

    prompt.push_str(
        "\nRespond with a single JSON object and nothing else, in this form:\n\
         {\"tags\": [\"tag-one\", \"tag-two\"], \"confidence\": 85, \
         \"research_notes\": \"brief reasoning\"}\n",
    );

    prompt
}
