//! Tolerant analysis-response parsing
//!
//! Models rarely return bare JSON. The reply may be wrapped in prose,
//! fenced as a Markdown code block, or carry several JSON fragments. This
//! module runs a fixed chain of extraction strategies and accepts the first
//! candidate that parses into an object with a `tags` array:
//!
//! 1. `direct`: the substring from the first `{` to the last `}`
//! 2. `fenced`: each Markdown code fence, then the direct rule inside it
//! 3. `brace-scan`: every balanced top-level `{...}` span, in order
//!
//! Nothing here throws for bad model output; the caller converts a
//! [`ParseError`] into a soft zero-confidence result.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::models::AnalysisResult;

static CODE_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```[a-zA-Z]*\s*(.*?)```").unwrap());

/// Why no structured analysis could be extracted.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("response contains no JSON object")]
    NoJsonObject,
    #[error("no JSON candidate in the response parsed as an analysis object")]
    NoValidCandidate,
}

/// A successfully extracted analysis plus the strategy that found it.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub result: AnalysisResult,
    pub strategy: &'static str,
}

/// Shape we require of a candidate object. `tags` must be present; the
/// other fields are coerced leniently and extra keys are ignored.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    tags: Vec<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    research_notes: Option<String>,
    #[serde(default)]
    detected_key: Option<String>,
}

/// Accept a confidence as a JSON number or a numeric string; anything else
/// counts as unreported (zero).
fn coerce_confidence(value: Option<&Value>) -> u8 {
    let score = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    score.clamp(0.0, 100.0).round() as u8
}

fn try_candidate(candidate: &str) -> Option<AnalysisResult> {
    let raw: RawAnalysis = serde_json::from_str(candidate).ok()?;
    let tags: Vec<String> = raw
        .tags
        .iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    Some(AnalysisResult::new(
        tags,
        coerce_confidence(raw.confidence.as_ref()),
        raw.research_notes.unwrap_or_default(),
        raw.detected_key.filter(|k| !k.trim().is_empty()),
    ))
}

/// Substring from the first `{` to the last `}`, when both exist in order.
fn direct_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Contents of each Markdown code fence, in document order.
fn fenced_blocks(text: &str) -> Vec<&str> {
    CODE_FENCE
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect()
}

/// Every balanced top-level `{...}` span, tracking string literals so
/// braces inside quoted text do not confuse the depth count.
fn brace_candidates(text: &str) -> Vec<&str> {
    let mut candidates = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }
        match ch {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            '}' => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0 {
                        if let Some(s) = start.take() {
                            candidates.push(&text[s..=i]);
                        }
                    }
                }
            }
            _ => {}
        }
    }
    candidates
}

/// Run the strategy chain over raw response text.
pub fn parse_analysis_response(raw: &str) -> Result<ParsedResponse, ParseError> {
    if !raw.contains('{') {
        return Err(ParseError::NoJsonObject);
    }

    if let Some(candidate) = direct_span(raw) {
        if let Some(result) = try_candidate(candidate) {
            return Ok(ParsedResponse { result, strategy: "direct" });
        }
    }

    for block in fenced_blocks(raw) {
        if let Some(candidate) = direct_span(block) {
            if let Some(result) = try_candidate(candidate) {
                return Ok(ParsedResponse { result, strategy: "fenced" });
            }
        }
    }

    for candidate in brace_candidates(raw) {
        if let Some(result) = try_candidate(candidate) {
            return Ok(ParsedResponse { result, strategy: "brace-scan" });
        }
    }

    Err(ParseError::NoValidCandidate)
}
