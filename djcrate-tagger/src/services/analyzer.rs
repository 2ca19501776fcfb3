//! Track analysis
//!
//! Wraps a backend call plus response parsing into one infallible
//! operation. Provider errors, timeouts, and unparseable output all
//! degrade to an empty-tags result carrying a diagnostic, so a flaky
//! model response can cost at most one track, never a batch.

use djcrate_common::{Taxonomy, Track};
use tracing::{debug, warn};

use crate::backends::AnalysisBackend;
use crate::models::AnalysisResult;
use crate::services::parser::parse_analysis_response;
use crate::services::prompt::build_analysis_prompt;

/// How much raw response text a diagnostic note may quote.
const SNIPPET_LEN: usize = 120;

fn snippet(raw: &str) -> String {
    let flat: String = raw
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let mut s: String = flat.trim().chars().take(SNIPPET_LEN).collect();
    if flat.trim().chars().count() > SNIPPET_LEN {
        s.push_str("...");
    }
    s
}

pub struct Analyzer {
    backend: Box<dyn AnalysisBackend>,
}

impl Analyzer {
    pub fn new(backend: Box<dyn AnalysisBackend>) -> Self {
        Self { backend }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Model identifier recorded on updated tracks.
    pub fn model(&self) -> &str {
        self.backend.model()
    }

    /// Analyze one track against the taxonomy.
    ///
    /// Never fails: every error class produces a zero-confidence result
    /// whose notes say what went wrong. Tags are returned exactly as the
    /// model proposed them; taxonomy enforcement happens in the caller.
    pub async fn analyze(&self, track: &Track, taxonomy: &Taxonomy) -> AnalysisResult {
        let prompt = build_analysis_prompt(track, taxonomy);

        let raw = match self.backend.complete(&prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    track = %track.filename,
                    backend = self.backend.name(),
                    error = %e,
                    "analysis request failed"
                );
                return AnalysisResult::failure(format!(
                    "analysis request failed ({}): {}",
                    self.backend.name(),
                    e
                ));
            }
        };

        match parse_analysis_response(&raw) {
            Ok(parsed) => {
                debug!(
                    track = %track.filename,
                    strategy = parsed.strategy,
                    tags = parsed.result.tags.len(),
                    confidence = parsed.result.confidence,
                    "analysis response parsed"
                );
                parsed.result
            }
            Err(e) => {
                warn!(
                    track = %track.filename,
                    backend = self.backend.name(),
                    error = %e,
                    "analysis response unparseable"
                );
                AnalysisResult::failure(format!(
                    "unparseable analysis response ({}): {}. Response began: {}",
                    self.backend.name(),
                    e,
                    snippet(&raw)
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendError;
    use serde_json::Map;
    use std::time::Duration;

    struct ScriptedBackend {
        reply: Result<String, fn() -> BackendError>,
    }

    #[async_trait::async_trait]
    impl AnalysisBackend for ScriptedBackend {
        fn name(&self) -> &'static str {
            "scripted"
        }

        fn model(&self) -> &str {
            "scripted-model"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, BackendError> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(make) => Err(make()),
            }
        }
    }

    fn track() -> Track {
        Track {
            relative_path: "House/t.mp3".to_string(),
            filename: "t.mp3".to_string(),
            artist: None,
            title: None,
            album: None,
            genre: None,
            date: None,
            bpm: None,
            key: None,
            composer: None,
            duration_formatted: None,
            assigned_tags: vec![],
            tag_confidence: None,
            research_notes: None,
            extra: Map::new(),
        }
    }

    fn taxonomy() -> Taxonomy {
        Taxonomy::parse("deep - a\nenergetic - b\n").unwrap()
    }

    #[tokio::test]
    async fn good_response_passes_through_unfiltered() {
        let analyzer = Analyzer::new(Box::new(ScriptedBackend {
            reply: Ok(r#"{"tags": ["deep", "made-up"], "confidence": 90}"#.to_string()),
        }));
        let result = analyzer.analyze(&track(), &taxonomy()).await;
        // The analyzer does not enforce the taxonomy.
        assert_eq!(result.tags, vec!["deep", "made-up"]);
        assert_eq!(result.confidence, 90);
    }

    #[tokio::test]
    async fn backend_error_becomes_soft_failure() {
        let analyzer = Analyzer::new(Box::new(ScriptedBackend {
            reply: Err(|| BackendError::Timeout(Duration::from_secs(600))),
        }));
        let result = analyzer.analyze(&track(), &taxonomy()).await;
        assert!(result.is_empty());
        assert_eq!(result.confidence, 0);
        assert!(result.research_notes.contains("analysis request failed"));
        assert!(result.research_notes.contains("timed out"));
    }

    #[tokio::test]
    async fn unparseable_response_becomes_soft_failure_with_snippet() {
        let analyzer = Analyzer::new(Box::new(ScriptedBackend {
            reply: Ok("I cannot produce structured output today.".to_string()),
        }));
        let result = analyzer.analyze(&track(), &taxonomy()).await;
        assert!(result.is_empty());
        assert!(result.research_notes.contains("unparseable analysis response"));
        assert!(result.research_notes.contains("I cannot produce"));
    }

    #[test]
    fn snippet_flattens_and_truncates() {
        let long = format!("line one\nline two {}", "x".repeat(200));
        let s = snippet(&long);
        assert!(s.starts_with("line one line two"));
        assert!(s.ends_with("..."));
        assert!(s.chars().count() <= SNIPPET_LEN + 3);
    }
}
