//! LLM Provider Abstraction
//!
//! Trait-based abstraction for the cloud model that turns natural-language
//! questions into SQL and result rows into narrative insights. Implementations:
//! Claude (reqwest-backed) and a deterministic mock for testing.

pub mod claude;
pub mod mock;
pub mod prompt;

use async_trait::async_trait;
use clarodb_db::{Correction, Join, QueryRows, TableSchema};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during LLM operations
#[derive(Debug, Error)]
pub enum LlmError {
    /// API key not found or invalid
    #[error("API key error: {0}")]
    ApiKey(String),

    /// Usage quota or rate limit exceeded
    #[error("Quota exceeded: {0}")]
    Quota(String),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider-specific error
    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LlmError {
    /// Message shown to the user, distinguishing credential and quota cases.
    pub fn user_message(&self) -> String {
        match self {
            LlmError::ApiKey(_) => {
                "Invalid or missing API credentials. Set ANTHROPIC_API_KEY and retry.".to_string()
            }
            LlmError::Quota(_) => {
                "API quota exceeded. Wait a moment or check your plan limits.".to_string()
            }
            other => format!("Generation failed: {other}"),
        }
    }
}

// =============================================================================
// Message Types
// =============================================================================

/// Role of a message participant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A message in the conversation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: text.into(),
        }
    }
}

// =============================================================================
// Usage / Generation Types
// =============================================================================

/// Usage metadata attached to every generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub model: String,
    /// Monetary cost in USD
    pub cost: f64,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// SQL generated for one question, with usage metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedSql {
    pub sql: String,
    pub usage: Usage,
}

/// Narrative insights generated for one result set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedInsights {
    pub insights: String,
    pub usage: Usage,
}

// =============================================================================
// Chat Session
// =============================================================================

/// Everything a fresh chat session is seeded with.
#[derive(Debug, Clone, Default)]
pub struct SessionSeed {
    pub schema: TableSchema,
    pub dialect: String,
    /// Best-effort per-table previews; tables that failed to preview are absent.
    pub previews: BTreeMap<String, QueryRows>,
    pub joins: Vec<Join>,
    /// Most recent corrections, oldest first.
    pub corrections: Vec<Correction>,
}

/// Opaque continuation context for one workspace's conversation.
///
/// Holds the seeded system prompt plus the running question/SQL history.
/// Invalidated (dropped) whenever schema, joins, or the correction log change.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub(crate) system: String,
    pub(crate) messages: Vec<Message>,
}

impl ChatSession {
    /// Create a session from seed context.
    pub fn seed(seed: &SessionSeed) -> Self {
        Self {
            system: prompt::session_system_prompt(seed),
            messages: Vec::new(),
        }
    }

    /// Record a completed question/SQL exchange.
    pub fn push_exchange(&mut self, question: &str, sql: &str) {
        self.messages.push(Message::user(question));
        self.messages.push(Message::assistant(sql));
    }

    pub fn system_prompt(&self) -> &str {
        &self.system
    }

    pub fn history(&self) -> &[Message] {
        &self.messages
    }
}

// =============================================================================
// Provider Trait
// =============================================================================

/// Trait for LLM providers.
///
/// Implementations must be thread-safe; calls run on spawned tasks while the
/// TUI keeps handling events.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name (e.g., "Claude", "Mock")
    fn name(&self) -> &str;

    /// Get the current model being used
    fn model(&self) -> &str;

    /// Check if the provider is configured and ready
    fn is_ready(&self) -> bool;

    /// Translate a question into a single SQL statement, continuing the
    /// given session's history.
    async fn generate_sql(
        &self,
        session: &ChatSession,
        question: &str,
    ) -> Result<GeneratedSql, LlmError>;

    /// Produce narrative insights for a question's result rows.
    async fn generate_insights(
        &self,
        question: &str,
        rows: &QueryRows,
    ) -> Result<GeneratedInsights, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use clarodb_db::ColumnSchema;

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::User).unwrap(), "\"user\"");
        assert_eq!(
            serde_json::to_string(&Role::Assistant).unwrap(),
            "\"assistant\""
        );
    }

    #[test]
    fn test_session_records_exchanges() {
        let mut session = ChatSession::seed(&SessionSeed::default());
        session.push_exchange("total sales?", "SELECT SUM(amount) FROM orders");

        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].role, Role::User);
        assert_eq!(session.history()[1].role, Role::Assistant);
    }

    #[test]
    fn test_seed_reaches_system_prompt() {
        let mut seed = SessionSeed {
            dialect: "sqlite".into(),
            ..Default::default()
        };
        seed.schema.insert(
            "orders".into(),
            vec![ColumnSchema::new("amount", "NUMBER")],
        );

        let session = ChatSession::seed(&seed);
        assert!(session.system_prompt().contains("orders"));
        assert!(session.system_prompt().contains("sqlite"));
    }

    #[test]
    fn test_error_user_messages() {
        assert!(LlmError::ApiKey("x".into()).user_message().contains("credentials"));
        assert!(LlmError::Quota("x".into()).user_message().contains("quota"));
        assert!(LlmError::Internal("boom".into()).user_message().contains("boom"));
    }
}
