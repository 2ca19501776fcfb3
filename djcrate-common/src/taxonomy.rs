//! Curated tag taxonomy
//!
//! The taxonomy is a plain-text file maintained by hand. Lines of the form
//! `tag-name - description` define tags; any other non-empty line opens a
//! category section that groups the tag lines after it. Tag names are
//! lowercase words joined by hyphens, and membership checks are exact and
//! case-sensitive: the taxonomy is the single source of truth for which
//! tags may ever reach the collection store.

use std::collections::HashSet;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::{Error, Result};

/// A line defines a tag when it starts with a lowercase/hyphen token
/// followed by a dash separator.
static TAG_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([a-z-]+)\s*-").unwrap());

/// One category section and the tags declared under it, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct TagCategory {
    pub name: String,
    pub tags: Vec<String>,
}

/// Result of checking candidate tags against the taxonomy: a stable
/// partition of the input into members and non-members.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagValidation {
    /// Candidates found in the taxonomy, in candidate order.
    pub valid: Vec<String>,
    /// Candidates rejected, in candidate order.
    pub invalid: Vec<String>,
}

impl TagValidation {
    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }
}

/// Parsed taxonomy: ordered tag list, membership set, category grouping,
/// and the verbatim source text (embedded into analysis prompts).
#[derive(Debug, Clone)]
pub struct Taxonomy {
    raw: String,
    tags: Vec<String>,
    members: HashSet<String>,
    categories: Vec<TagCategory>,
}

impl Taxonomy {
    /// Load and parse the taxonomy file. A missing file or a file that
    /// defines no tags is a configuration error: nothing downstream can
    /// work without the curated tag list.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::Config(format!(
                "taxonomy file not found: {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Parse taxonomy text.
    ///
    /// Tag lines contribute their leading token, first occurrence wins.
    /// Non-empty lines that are not tag lines are category headers; tags
    /// parsed before any header land in an "Uncategorized" section.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut tags = Vec::new();
        let mut members = HashSet::new();
        let mut categories: Vec<TagCategory> = Vec::new();
        let mut current_category: Option<usize> = None;

        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(caps) = TAG_LINE.captures(line) {
                let tag = caps[1].to_string();
                if !members.insert(tag.clone()) {
                    continue;
                }
                let idx = match current_category {
                    Some(idx) => idx,
                    None => {
                        categories.push(TagCategory {
                            name: "Uncategorized".to_string(),
                            tags: Vec::new(),
                        });
                        let idx = categories.len() - 1;
                        current_category = Some(idx);
                        idx
                    }
                };
                categories[idx].tags.push(tag.clone());
                tags.push(tag);
            } else {
                categories.push(TagCategory {
                    name: line.to_string(),
                    tags: Vec::new(),
                });
                current_category = Some(categories.len() - 1);
            }
        }

        if tags.is_empty() {
            return Err(Error::Config(
                "taxonomy defines no tags (expected lines of the form 'tag-name - description')"
                    .to_string(),
            ));
        }

        tracing::debug!(tags = tags.len(), categories = categories.len(), "taxonomy parsed");

        Ok(Self {
            raw: raw.to_string(),
            tags,
            members,
            categories,
        })
    }

    /// All tags in file order.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Exact, case-sensitive membership.
    pub fn contains(&self, tag: &str) -> bool {
        self.members.contains(tag)
    }

    /// The verbatim source text, for embedding into prompts.
    pub fn raw_text(&self) -> &str {
        &self.raw
    }

    /// Category sections in file order. Empty sections are retained so the
    /// grouping mirrors the file.
    pub fn categories(&self) -> &[TagCategory] {
        &self.categories
    }

    /// Category name a tag was declared under, if any.
    pub fn category_of(&self, tag: &str) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.tags.iter().any(|t| t == tag))
            .map(|c| c.name.as_str())
    }

    /// Partition candidates into taxonomy members and rejects, preserving
    /// candidate order. A repeated candidate is kept only the first time.
    /// Pure: identical inputs always produce identical partitions.
    pub fn validate<S: AsRef<str>>(&self, candidates: &[S]) -> TagValidation {
        let mut seen = HashSet::new();
        let mut result = TagValidation::default();
        for candidate in candidates {
            let candidate = candidate.as_ref();
            if !seen.insert(candidate.to_string()) {
                continue;
            }
            if self.members.contains(candidate) {
                result.valid.push(candidate.to_string());
            } else {
                result.invalid.push(candidate.to_string());
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
DJ TAG TAXONOMY

Energy & Mood
deep - atmospheric, introspective
energetic - high-intensity, driving
dark - brooding, heavy atmosphere

Set Position
warmup - early-set material
peak-time - main-room prime slot
";

    #[test]
    fn parses_tags_in_file_order() {
        let tax = Taxonomy::parse(SAMPLE).unwrap();
        assert_eq!(
            tax.tags(),
            &["deep", "energetic", "dark", "warmup", "peak-time"]
        );
    }

    #[test]
    fn groups_tags_under_category_headers() {
        let tax = Taxonomy::parse(SAMPLE).unwrap();
        let energy = tax
            .categories()
            .iter()
            .find(|c| c.name == "Energy & Mood")
            .unwrap();
        assert_eq!(energy.tags, &["deep", "energetic", "dark"]);
        assert_eq!(tax.category_of("peak-time"), Some("Set Position"));
        assert_eq!(tax.category_of("nonexistent"), None);
    }

    #[test]
    fn membership_is_case_sensitive() {
        let tax = Taxonomy::parse(SAMPLE).unwrap();
        assert!(tax.contains("deep"));
        assert!(!tax.contains("Deep"));
        assert!(!tax.contains("DEEP"));
    }

    #[test]
    fn duplicate_tag_lines_keep_first_occurrence() {
        let text = "deep - one\ndeep - again\nenergetic - two\n";
        let tax = Taxonomy::parse(text).unwrap();
        assert_eq!(tax.tags(), &["deep", "energetic"]);
    }

    #[test]
    fn validate_partitions_in_candidate_order() {
        let tax = Taxonomy::parse(SAMPLE).unwrap();
        let got = tax.validate(&["deep", "bogus", "peak-time", "Deep"]);
        assert_eq!(got.valid, &["deep", "peak-time"]);
        assert_eq!(got.invalid, &["bogus", "Deep"]);
    }

    #[test]
    fn validate_is_idempotent_on_valid_output() {
        let tax = Taxonomy::parse(SAMPLE).unwrap();
        let first = tax.validate(&["deep", "bogus", "energetic"]);
        let second = tax.validate(&first.valid);
        assert_eq!(second.valid, first.valid);
        assert!(second.invalid.is_empty());
    }

    #[test]
    fn validate_drops_repeated_candidates() {
        let tax = Taxonomy::parse(SAMPLE).unwrap();
        let got = tax.validate(&["deep", "deep", "bogus", "bogus"]);
        assert_eq!(got.valid, &["deep"]);
        assert_eq!(got.invalid, &["bogus"]);
    }

    #[test]
    fn empty_taxonomy_is_a_config_error() {
        let err = Taxonomy::parse("JUST A TITLE\n\n").unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("no tags")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn raw_text_is_preserved_verbatim() {
        let tax = Taxonomy::parse(SAMPLE).unwrap();
        assert_eq!(tax.raw_text(), SAMPLE);
    }
}
