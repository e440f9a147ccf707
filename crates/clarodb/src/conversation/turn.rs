//! A single question/answer turn and its lifecycle.

use clarodb_db::QueryRows;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::conversation::chart::BarChartSpec;
use crate::llm::Usage;

pub type TurnId = Uuid;

/// Lifecycle of a turn. `Complete` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnState {
    SqlGenerating,
    SqlReady,
    Executing,
    Complete,
    Error,
}

impl TurnState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnState::SqlGenerating => "sqlGenerating",
            TurnState::SqlReady => "sqlReady",
            TurnState::Executing => "executing",
            TurnState::Complete => "complete",
            TurnState::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Complete | TurnState::Error)
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum TurnError {
    #[error("turn is {actual}, expected {expected} for {operation}")]
    InvalidState {
        operation: &'static str,
        expected: TurnState,
        actual: TurnState,
    },

    #[error("no turn with id {0}")]
    UnknownTurn(TurnId),

    #[error("question must not be empty")]
    EmptyQuestion,
}

/// SQL produced for the turn, plus what the provider charged for it.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlResult {
    pub sql: String,
    pub usage: Usage,
}

/// The executed query and its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    /// SQL that actually ran, which may differ from the generated SQL
    /// when the user edited it before execution.
    pub sql: String,
    pub data: QueryRows,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsightsResult {
    pub insights: String,
    pub usage: Usage,
}

/// One question and everything produced while answering it.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub id: TurnId,
    pub question: String,
    pub state: TurnState,
    pub sql_result: Option<SqlResult>,
    pub analysis: Option<AnalysisResult>,
    pub insights: Option<InsightsResult>,
    pub chart: Option<BarChartSpec>,
    pub chart_error: Option<String>,
    pub insights_loading: bool,
    pub error: Option<String>,
}

impl ConversationTurn {
    pub fn new(question: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            state: TurnState::SqlGenerating,
            sql_result: None,
            analysis: None,
            insights: None,
            chart: None,
            chart_error: None,
            insights_loading: false,
            error: None,
        }
    }

    /// Check that the turn is in `expected` before applying `operation`.
    pub fn ensure_state(
        &self,
        operation: &'static str,
        expected: TurnState,
    ) -> Result<(), TurnError> {
        if self.state != expected {
            return Err(TurnError::InvalidState {
                operation,
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.state = TurnState::Error;
        self.error = Some(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_turn_starts_generating() {
        let turn = ConversationTurn::new("how many orders?".to_string());
        assert_eq!(turn.state, TurnState::SqlGenerating);
        assert!(turn.sql_result.is_none());
        assert!(turn.error.is_none());
    }

    #[test]
    fn test_ensure_state_rejects_mismatch() {
        let turn = ConversationTurn::new("q".to_string());
        let err = turn.ensure_state("execute", TurnState::SqlReady).unwrap_err();
        assert!(matches!(
            err,
            TurnError::InvalidState {
                expected: TurnState::SqlReady,
                actual: TurnState::SqlGenerating,
                ..
            }
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(TurnState::Complete.is_terminal());
        assert!(TurnState::Error.is_terminal());
        assert!(!TurnState::SqlReady.is_terminal());
    }

    #[test]
    fn test_fail_is_terminal_with_message() {
        let mut turn = ConversationTurn::new("q".to_string());
        turn.fail("provider unavailable");
        assert_eq!(turn.state, TurnState::Error);
        assert_eq!(turn.error.as_deref(), Some("provider unavailable"));
    }
}
