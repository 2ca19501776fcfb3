//! Analysis backends
//!
//! Defines the common interface for the LLM providers that perform track
//! analysis. Both backends receive the identical prompt and return raw
//! response text; everything downstream (parsing, validation, merging) is
//! provider-agnostic, so the two are interchangeable per run.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicBackend;
pub use openai::OpenAiBackend;

const USER_AGENT: &str = "djcrate/0.1.0";

/// Backend errors. These surface as soft analysis failures in the pipeline;
/// only construction errors abort a run.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Empty response from {0}")]
    EmptyResponse(&'static str),

    #[error("Client build error: {0}")]
    Build(String),
}

/// Which provider performs the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    OpenAi,
    Anthropic,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(BackendKind::OpenAi),
            "anthropic" => Ok(BackendKind::Anthropic),
            other => Err(format!(
                "unknown backend '{}' (expected 'openai' or 'anthropic')",
                other
            )),
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a backend needs at construction time.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    /// Ask the provider to consult web sources while analyzing.
    pub web_research: bool,
}

/// Common interface for analysis providers.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Short provider name for logs and reports.
    fn name(&self) -> &'static str;

    /// Model identifier, recorded on updated tracks.
    fn model(&self) -> &str;

    /// Run one analysis prompt and return the raw response text.
    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}

/// Construct the selected backend.
pub fn create_backend(
    kind: BackendKind,
    config: BackendConfig,
) -> Result<Box<dyn AnalysisBackend>, BackendError> {
    match kind {
        BackendKind::OpenAi => Ok(Box::new(OpenAiBackend::new(config)?)),
        BackendKind::Anthropic => Ok(Box::new(AnthropicBackend::new(config)?)),
    }
}

/// Shared reqwest client: identifying user agent plus a whole-request
/// timeout covering connect, send, and body read.
pub(crate) fn build_http_client(timeout: Duration) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| BackendError::Build(e.to_string()))
}

/// Map a reqwest transport failure onto a backend error.
pub(crate) fn transport_error(e: reqwest::Error, timeout: Duration) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout(timeout)
    } else {
        BackendError::Network(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_kind_parses_case_insensitively() {
        assert_eq!(BackendKind::from_str("openai").unwrap(), BackendKind::OpenAi);
        assert_eq!(BackendKind::from_str("OpenAI").unwrap(), BackendKind::OpenAi);
        assert_eq!(
            BackendKind::from_str(" Anthropic ").unwrap(),
            BackendKind::Anthropic
        );
    }

    #[test]
    fn unknown_backend_kind_is_rejected() {
        let err = BackendKind::from_str("gemini").unwrap_err();
        assert!(err.contains("gemini"));
        assert!(err.contains("expected"));
    }
}
