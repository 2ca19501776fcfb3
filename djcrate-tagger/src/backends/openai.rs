//! OpenAI Responses API backend
//!
//! The deep-reasoning provider: a reasoning model driven through the
//! Responses API, optionally with the hosted web-search tool enabled so the
//! model can research a release before committing to tags.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{build_http_client, transport_error, AnalysisBackend, BackendConfig, BackendError};

const OPENAI_RESPONSES_URL: &str = "https://api.openai.com/v1/responses";
const REASONING_EFFORT: &str = "high";

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    reasoning: ReasoningSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ToolSpec>>,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReasoningSpec {
    effort: &'static str,
}

#[derive(Debug, Serialize)]
struct ToolSpec {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Responses API reply, reduced to the parts we read. Reasoning items and
/// tool-call items deserialize with an empty content list and drop out.
#[derive(Debug, Deserialize)]
struct ResponsesReply {
    #[serde(default)]
    output: Vec<OutputItem>,
}

#[derive(Debug, Deserialize)]
struct OutputItem {
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn collect_output_text(reply: &ResponsesReply) -> String {
    let mut parts = Vec::new();
    for item in &reply.output {
        for part in &item.content {
            if part.kind == "output_text" && !part.text.is_empty() {
                parts.push(part.text.as_str());
            }
        }
    }
    parts.join("\n")
}

pub struct OpenAiBackend {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    timeout: Duration,
    web_research: bool,
}

impl OpenAiBackend {
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let http_client = build_http_client(config.timeout)?;
        Ok(Self {
            http_client,
            api_key: config.api_key,
            model: config.model,
            timeout: config.timeout,
            web_research: config.web_research,
        })
    }
}

#[async_trait::async_trait]
impl AnalysisBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let tools = self
            .web_research
            .then(|| vec![ToolSpec { kind: "web_search_preview" }]);
        let request = ResponsesRequest {
            model: &self.model,
            input: vec![InputMessage { role: "user", content: prompt }],
            reasoning: ReasoningSpec { effort: REASONING_EFFORT },
            tools,
        };

        tracing::debug!(model = %self.model, research = self.web_research, "querying OpenAI");

        let response = self
            .http_client
            .post(OPENAI_RESPONSES_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(BackendError::Auth("OpenAI rejected the API key".to_string()));
        }
        if status.as_u16() == 429 {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::RateLimited(detail));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(status.as_u16(), detail));
        }

        let reply: ResponsesReply = response
            .json()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let text = collect_output_text(&reply);
        if text.trim().is_empty() {
            return Err(BackendError::EmptyResponse("openai"));
        }
        Ok(text)
    }
}
