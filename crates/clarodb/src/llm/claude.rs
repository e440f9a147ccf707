//! Claude Provider Implementation
//!
//! Implements the LlmProvider trait for Anthropic's Messages API.
//!
//! # Configuration
//!
//! - API key: Set via `ANTHROPIC_API_KEY` environment variable
//! - Model: Defaults to claude-sonnet-4-20250514, configurable via constructor

use super::prompt::{insights_prompt, strip_sql_fences};
use super::{
    ChatSession, GeneratedInsights, GeneratedSql, LlmError, LlmProvider, Message, Usage,
};
use async_trait::async_trait;
use clarodb_db::QueryRows;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Anthropic API base URL
const API_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Default model to use
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";

/// API version header
const API_VERSION: &str = "2023-06-01";

/// Default generation budget
const DEFAULT_MAX_TOKENS: u32 = 1024;

// =============================================================================
// API Request/Response Types
// =============================================================================

/// Request body for the Messages API
#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ApiMessage>,
}

/// Message format for the API
#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: String,
}

/// Response body from the Messages API
#[derive(Debug, Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ApiContentBlock>,
    usage: ApiUsage,
}

#[derive(Debug, Deserialize)]
struct ApiContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Per-model pricing in USD per million tokens (input, output).
fn pricing(model: &str) -> (f64, f64) {
    if model.contains("haiku") {
        (0.80, 4.00)
    } else if model.contains("opus") {
        (15.00, 75.00)
    } else {
        // Sonnet family and anything unrecognized
        (3.00, 15.00)
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Claude provider backed by the Anthropic Messages API.
pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl ClaudeProvider {
    /// Create a provider with an explicit API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }

    /// Create a provider from the `ANTHROPIC_API_KEY` environment variable.
    pub fn from_env() -> Result<Self, LlmError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            LlmError::ApiKey(
                "ANTHROPIC_API_KEY environment variable not found. \
                 Please set it to enable SQL generation."
                    .to_string(),
            )
        })?;

        if api_key.is_empty() {
            return Err(LlmError::ApiKey("ANTHROPIC_API_KEY is empty".to_string()));
        }

        Ok(Self::new(api_key))
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set max tokens
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn to_api_messages(history: &[Message], question: &str) -> Vec<ApiMessage> {
        let mut messages: Vec<ApiMessage> = history
            .iter()
            .map(|m| ApiMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect();
        messages.push(ApiMessage {
            role: "user".to_string(),
            content: question.to_string(),
        });
        messages
    }

    /// One non-streaming completion round-trip.
    async fn complete(
        &self,
        system: Option<String>,
        messages: Vec<ApiMessage>,
    ) -> Result<(String, Usage), LlmError> {
        let request = MessagesRequest {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            system,
            messages,
        };

        let response = self
            .client
            .post(format!("{}/messages", API_BASE_URL))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => LlmError::ApiKey(body),
                429 => LlmError::Quota(body),
                _ => LlmError::Provider {
                    provider: "Claude".to_string(),
                    message: format!("HTTP {status}: {body}"),
                },
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text: String = parsed
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .map(|b| b.text.as_str())
            .collect();
        if text.is_empty() {
            return Err(LlmError::InvalidResponse(
                "Response contained no text content".to_string(),
            ));
        }

        let (input_price, output_price) = pricing(&parsed.model);
        let usage = Usage {
            model: parsed.model,
            cost: parsed.usage.input_tokens as f64 / 1_000_000.0 * input_price
                + parsed.usage.output_tokens as f64 / 1_000_000.0 * output_price,
            prompt_tokens: parsed.usage.input_tokens,
            completion_tokens: parsed.usage.output_tokens,
        };

        Ok((text, usage))
    }
}

#[async_trait]
impl LlmProvider for ClaudeProvider {
    fn name(&self) -> &str {
        "Claude"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn generate_sql(
        &self,
        session: &ChatSession,
        question: &str,
    ) -> Result<GeneratedSql, LlmError> {
        let messages = Self::to_api_messages(session.history(), question);
        let (text, usage) = self
            .complete(Some(session.system_prompt().to_string()), messages)
            .await?;

        Ok(GeneratedSql {
            sql: strip_sql_fences(&text),
            usage,
        })
    }

    async fn generate_insights(
        &self,
        question: &str,
        rows: &QueryRows,
    ) -> Result<GeneratedInsights, LlmError> {
        let user = insights_prompt(question, rows);
        let messages = vec![ApiMessage {
            role: "user".to_string(),
            content: user,
        }];
        let system = "You are a data analyst. Be concrete and brief.".to_string();
        let (text, usage) = self.complete(Some(system), messages).await?;

        Ok(GeneratedInsights {
            insights: text.trim().to_string(),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pricing_by_family() {
        assert_eq!(pricing("claude-haiku-3-5"), (0.80, 4.00));
        assert_eq!(pricing("claude-opus-4-20250514"), (15.00, 75.00));
        assert_eq!(pricing(DEFAULT_MODEL), (3.00, 15.00));
        assert_eq!(pricing("unknown-model"), (3.00, 15.00));
    }

    #[test]
    fn test_history_precedes_new_question() {
        let mut session = ChatSession::default();
        session.push_exchange("q1", "SELECT 1");

        let messages = ClaudeProvider::to_api_messages(session.history(), "q2");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "user");
        assert_eq!(messages[1].role, "assistant");
        assert_eq!(messages[2].content, "q2");
    }

    #[test]
    fn test_provider_readiness() {
        assert!(ClaudeProvider::new("key").is_ready());
        assert!(!ClaudeProvider::new("").is_ready());
    }
}
