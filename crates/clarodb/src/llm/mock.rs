//! Mock LLM Provider for deterministic testing
//!
//! Provides canned responses without network calls. Use this for autonomous
//! testing where we need deterministic results.

use async_trait::async_trait;
use clarodb_db::QueryRows;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{ChatSession, GeneratedInsights, GeneratedSql, LlmError, LlmProvider, Usage};

/// A queued canned outcome: either text to return or an error to raise.
#[derive(Debug, Clone)]
enum Canned {
    Ok(String),
    Err(String),
}

fn mock_usage() -> Usage {
    Usage {
        model: "mock-test-model".to_string(),
        cost: 0.0001,
        prompt_tokens: 100,
        completion_tokens: 20,
    }
}

/// Mock LLM provider with deterministic responses
///
/// Responses are queued and consumed in order. If no responses are queued,
/// returns an error (to catch test configuration issues).
pub struct MockProvider {
    sql_responses: Arc<Mutex<VecDeque<Canned>>>,
    insight_responses: Arc<Mutex<VecDeque<Canned>>>,
    /// Record of (system prompt, question) pairs received (for assertions)
    received_questions: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            sql_responses: Arc::new(Mutex::new(VecDeque::new())),
            insight_responses: Arc::new(Mutex::new(VecDeque::new())),
            received_questions: Arc::new(Mutex::new(vec![])),
        }
    }

    /// Queue SQL for the next generate_sql call
    pub fn queue_sql(&self, sql: impl Into<String>) {
        self.sql_responses.lock().unwrap().push_back(Canned::Ok(sql.into()));
    }

    /// Queue a failure for the next generate_sql call
    pub fn queue_sql_error(&self, message: impl Into<String>) {
        self.sql_responses.lock().unwrap().push_back(Canned::Err(message.into()));
    }

    /// Queue text for the next generate_insights call
    pub fn queue_insights(&self, text: impl Into<String>) {
        self.insight_responses.lock().unwrap().push_back(Canned::Ok(text.into()));
    }

    /// Queue a failure for the next generate_insights call
    pub fn queue_insights_error(&self, message: impl Into<String>) {
        self.insight_responses.lock().unwrap().push_back(Canned::Err(message.into()));
    }

    /// Get all (system prompt, question) pairs received by this provider
    pub fn received_questions(&self) -> Vec<(String, String)> {
        self.received_questions.lock().unwrap().clone()
    }

    /// Check how many SQL responses are still queued
    pub fn sql_responses_remaining(&self) -> usize {
        self.sql_responses.lock().unwrap().len()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn pop(queue: &Mutex<VecDeque<Canned>>, kind: &str) -> Result<String, LlmError> {
    match queue.lock().unwrap().pop_front() {
        Some(Canned::Ok(text)) => Ok(text),
        Some(Canned::Err(message)) => Err(LlmError::Provider {
            provider: "Mock".to_string(),
            message,
        }),
        None => Err(LlmError::Internal(format!(
            "MockProvider: no {kind} responses queued! Queue responses before calling"
        ))),
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    fn model(&self) -> &str {
        "mock-test-model"
    }

    fn is_ready(&self) -> bool {
        true // Always ready for testing
    }

    async fn generate_sql(
        &self,
        session: &ChatSession,
        question: &str,
    ) -> Result<GeneratedSql, LlmError> {
        self.received_questions
            .lock()
            .unwrap()
            .push((session.system_prompt().to_string(), question.to_string()));

        let sql = pop(&self.sql_responses, "SQL")?;
        Ok(GeneratedSql {
            sql,
            usage: mock_usage(),
        })
    }

    async fn generate_insights(
        &self,
        _question: &str,
        _rows: &QueryRows,
    ) -> Result<GeneratedInsights, LlmError> {
        let insights = pop(&self.insight_responses, "insight")?;
        Ok(GeneratedInsights {
            insights,
            usage: mock_usage(),
        })
    }
}
