//! Anthropic Messages API backend
//!
//! Alternative provider speaking the Messages API. Interchangeable with the
//! OpenAI backend: same prompt in, raw text out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{build_http_client, transport_error, AnalysisBackend, BackendConfig, BackendError};

const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
/// Server-side web search tool, capped so one track cannot burn a search
/// budget.
const WEB_SEARCH_TOOL_TYPE: &str = "web_search_20250305";
const WEB_SEARCH_MAX_USES: u32 = 3;

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<RequestMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WebSearchTool>>,
}

#[derive(Debug, Serialize)]
struct RequestMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct WebSearchTool {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'static str,
    max_uses: u32,
}

/// Messages API reply, reduced to the text blocks. Tool-use and citation
/// blocks deserialize with empty text and drop out.
#[derive(Debug, Deserialize)]
struct MessagesReply {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

fn collect_text_blocks(reply: &MessagesReply) -> String {
    let parts: Vec<&str> = reply
        .content
        .iter()
        .filter(|b| b.kind == "text" && !b.text.is_empty())
        .map(|b| b.text.as_str())
        .collect();
    parts.join("\n")
}

pub struct AnthropicBackend {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    timeout: Duration,
    web_research: bool,
}

impl AnthropicBackend {
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
impl AnalysisBackend for AnthropicBackend {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, BackendError> {
        let tools = self.web_research.then(|| {
            vec![WebSearchTool {
                kind: WEB_SEARCH_TOOL_TYPE,
                name: "web_search",
                max_uses: WEB_SEARCH_MAX_USES,
            }]
        });
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            messages: vec![RequestMessage { role: "user", content: prompt }],
            tools,
        };

        tracing::debug!(model = %self.model, research = self.web_research, "querying Anthropic");

        let response = self
            .http_client
            .post(ANTHROPIC_MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error(e, self.timeout))?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(BackendError::Auth("Anthropic rejected the API key".to_string()));
        }
        if status.as_u16() == 429 {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::RateLimited(detail));
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(status.as_u16(), detail));
        }

        let reply: MessagesReply = response
            .json()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let text = collect_text_blocks(&reply);
        if text.trim().is_empty() {
            return Err(BackendError::EmptyResponse("anthropic"));
        }
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_only_text_blocks() {
        let reply: MessagesReply = serde_json::from_str(
            r#"{
                "content": [
                    {"type": "server_tool_use", "id": "t1", "name": "web_search"},
                    {"type": "text", "text": "{\"tags\": [\"deep\"]}"},
                    {"type": "text", "text": "done"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(collect_text_blocks(&reply), "{\"tags\": [\"deep\"]}\ndone");
    }

    #[test]
    fn empty_content_collects_to_empty_string() {
        let reply: MessagesReply = serde_json::from_str(r#"{"content": []}"#).unwrap();
        assert_eq!(collect_text_blocks(&reply), "");
    }

    #[test]
    fn web_search_tool_is_opt_in() {
        let request = MessagesRequest {
            model: "claude-sonnet-4-5",
            max_tokens: MAX_TOKENS,
            messages: vec![RequestMessage { role: "user", content: "p" }],
            tools: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("tools").is_none());
        assert_eq!(json["max_tokens"], 4096);
    }
}
