//! Per-workspace conversation state machine.
//!
//! `Conversation` owns the turn list and the cached chat session for one
//! workspace. All transitions are synchronous; async work (LLM calls, query
//! execution) happens elsewhere and reports back through the `apply_*`
//! methods. Results for turns that no longer exist are dropped, so a stale
//! in-flight response can never mutate a reset conversation.

use tracing::{debug, warn};

use crate::conversation::chart::{build_bar_chart, BarChartSpec};
use crate::conversation::turn::{
    AnalysisResult, ConversationTurn, InsightsResult, SqlResult, TurnError, TurnId, TurnState,
};
use crate::llm::{ChatSession, GeneratedInsights, GeneratedSql, LlmError, Usage};

/// What the executor needs to run a turn's SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutePlan {
    pub turn_id: TurnId,
    pub sql: String,
    /// True when the user edited the generated SQL before running it,
    /// in which case a successful run is recorded as a correction.
    pub is_correction: bool,
}

#[derive(Debug, Default)]
pub struct Conversation {
    turns: Vec<ConversationTurn>,
    chat_session: Option<ChatSession>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn turn(&self, id: TurnId) -> Option<&ConversationTurn> {
        self.turns.iter().find(|t| t.id == id)
    }

    fn turn_mut(&mut self, id: TurnId) -> Option<&mut ConversationTurn> {
        self.turns.iter_mut().find(|t| t.id == id)
    }

    /// Total provider cost across every turn, in dollars.
    pub fn total_cost(&self) -> f64 {
        self.usages().map(|u| u.cost).sum()
    }

    pub fn total_tokens(&self) -> u64 {
        self.usages()
            .map(|u| u64::from(u.prompt_tokens) + u64::from(u.completion_tokens))
            .sum()
    }

    fn usages(&self) -> impl Iterator<Item = &Usage> {
        self.turns.iter().flat_map(|t| {
            t.sql_result
                .iter()
                .map(|r| &r.usage)
                .chain(t.insights.iter().map(|r| &r.usage))
        })
    }

    // ==================== chat session cache ====================

    pub fn chat_session(&self) -> Option<&ChatSession> {
        self.chat_session.as_ref()
    }

    pub fn set_chat_session(&mut self, session: ChatSession) {
        self.chat_session = Some(session);
    }

    /// Drop the cached session so the next question rebuilds it from the
    /// current schema, joins and corrections. Called after a correction is
    /// recorded or the data model changes.
    pub fn invalidate_chat_session(&mut self) {
        self.chat_session = None;
    }

    // ==================== transitions ====================

    /// Start a new turn for `question`. The turn enters `SqlGenerating`.
    pub fn begin_ask(&mut self, question: &str) -> Result<TurnId, TurnError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TurnError::EmptyQuestion);
        }
        let turn = ConversationTurn::new(question.to_string());
        let id = turn.id;
        debug!(turn_id = %id, "turn started");
        self.turns.push(turn);
        Ok(id)
    }

    /// Deliver the SQL-generation outcome. Returns false when the turn no
    /// longer exists (stale response after a reset).
    pub fn apply_sql(&mut self, id: TurnId, outcome: Result<GeneratedSql, LlmError>) -> bool {
        let Some(turn) = self.turn_mut(id) else {
            warn!(turn_id = %id, "dropping SQL result for unknown turn");
            return false;
        };
        if turn.state != TurnState::SqlGenerating {
            warn!(turn_id = %id, state = %turn.state, "dropping SQL result, turn moved on");
            return false;
        }
        match outcome {
            Ok(generated) => {
                turn.sql_result = Some(SqlResult {
                    sql: generated.sql,
                    usage: generated.usage,
                });
                turn.state = TurnState::SqlReady;
            }
            Err(err) => turn.fail(err.user_message()),
        }
        true
    }

    /// Move a `SqlReady` turn into `Executing`. `sql` is whatever the user
    /// is about to run; if it differs from the generated SQL (ignoring
    /// surrounding whitespace) the run counts as a correction.
    pub fn begin_execute(&mut self, id: TurnId, sql: &str) -> Result<ExecutePlan, TurnError> {
        let turn = self.turn_mut(id).ok_or(TurnError::UnknownTurn(id))?;
        turn.ensure_state("execute", TurnState::SqlReady)?;

        let generated = turn
            .sql_result
            .as_ref()
            .map(|r| r.sql.trim())
            .unwrap_or_default();
        let is_correction = sql.trim() != generated;
        turn.state = TurnState::Executing;
        Ok(ExecutePlan {
            turn_id: id,
            sql: sql.trim().to_string(),
            is_correction,
        })
    }

    /// Deliver the execution outcome. On success the turn completes with
    /// its rows; on failure it enters `Error` with the executor's message.
    pub fn apply_execute(&mut self, id: TurnId, outcome: Result<AnalysisResult, String>) -> bool {
        let Some(turn) = self.turn_mut(id) else {
            warn!(turn_id = %id, "dropping execution result for unknown turn");
            return false;
        };
        if turn.state != TurnState::Executing {
            warn!(turn_id = %id, state = %turn.state, "dropping execution result, turn moved on");
            return false;
        }
        match outcome {
            Ok(analysis) => {
                turn.analysis = Some(analysis);
                turn.state = TurnState::Complete;
            }
            Err(message) => turn.fail(message),
        }
        true
    }

    /// Mark a completed turn as waiting for insights. Returns the rows the
    /// insights request should summarize.
    pub fn begin_insights(&mut self, id: TurnId) -> Result<AnalysisResult, TurnError> {
        let turn = self.turn_mut(id).ok_or(TurnError::UnknownTurn(id))?;
        turn.ensure_state("insights", TurnState::Complete)?;
        let analysis = turn
            .analysis
            .clone()
            .ok_or(TurnError::UnknownTurn(id))?;
        turn.insights_loading = true;
        Ok(analysis)
    }

    /// Deliver the insights outcome. A provider failure does not fail the
    /// turn: the error text is shown in place of insights and the caller
    /// gets it back for a toast.
    pub fn apply_insights(
        &mut self,
        id: TurnId,
        outcome: Result<GeneratedInsights, LlmError>,
    ) -> Option<String> {
        let Some(turn) = self.turn_mut(id) else {
            warn!(turn_id = %id, "dropping insights for unknown turn");
            return None;
        };
        turn.insights_loading = false;
        match outcome {
            Ok(generated) => {
                turn.insights = Some(InsightsResult {
                    insights: generated.insights,
                    usage: generated.usage,
                });
                None
            }
            Err(err) => {
                let message = err.user_message();
                turn.insights = Some(InsightsResult {
                    insights: format!("Could not generate insights: {}", message),
                    usage: Usage::default(),
                });
                Some(message)
            }
        }
    }

    /// Build a bar chart for a completed turn from its own rows. Runs
    /// locally with no provider call. Returns the failure message when the
    /// rows cannot be charted.
    pub fn generate_chart(&mut self, id: TurnId) -> Result<Option<String>, TurnError> {
        let turn = self.turn_mut(id).ok_or(TurnError::UnknownTurn(id))?;
        turn.ensure_state("chart", TurnState::Complete)?;
        let Some(analysis) = turn.analysis.as_ref() else {
            return Err(TurnError::UnknownTurn(id));
        };
        match build_bar_chart(&analysis.data) {
            Ok(spec) => {
                turn.chart = Some(spec);
                turn.chart_error = None;
                Ok(None)
            }
            Err(message) => {
                turn.chart = None;
                turn.chart_error = Some(message.clone());
                Ok(Some(message))
            }
        }
    }

    pub fn chart_for(&self, id: TurnId) -> Option<&BarChartSpec> {
        self.turn(id).and_then(|t| t.chart.as_ref())
    }

    /// Clear every turn and the cached chat session.
    pub fn reset(&mut self) {
        self.turns.clear();
        self.chat_session = None;
    }
}
