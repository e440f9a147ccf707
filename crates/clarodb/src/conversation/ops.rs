//! Async operations backing the conversation state machine.
//!
//! These run on spawned tasks; the synchronous `Conversation` methods
//! consume their results when they arrive back on the event channel.

use std::collections::BTreeMap;

use clarodb_db::{Correction, Join, WorkspaceDb};
use tracing::{debug, warn};

use crate::conversation::session::ExecutePlan;
use crate::conversation::turn::AnalysisResult;
use crate::llm::{ChatSession, GeneratedSql, LlmError, LlmProvider, SessionSeed};

/// How many sample rows per table go into the session seed.
const SEED_PREVIEW_ROWS: usize = 3;
/// How many recent corrections go into the session seed.
const SEED_CORRECTION_LIMIT: usize = 10;

/// Build a fresh chat session from the workspace's current state.
///
/// Previews are best effort: a table that fails to preview is left out of
/// the seed rather than failing session creation.
pub async fn initialize_chat_session(
    db: &WorkspaceDb,
    joins: &[Join],
) -> Result<ChatSession, clarodb_db::DbError> {
    let schema = db.schemas().await?;

    let mut previews = BTreeMap::new();
    for table in schema.keys() {
        match db.preview(table, SEED_PREVIEW_ROWS).await {
            Ok(rows) => {
                previews.insert(table.clone(), rows);
            }
            Err(err) => {
                warn!(table = %table, error = %err, "skipping preview for session seed");
            }
        }
    }

    let corrections = db.corrections(SEED_CORRECTION_LIMIT).await?;
    debug!(
        tables = schema.len(),
        joins = joins.len(),
        corrections = corrections.len(),
        "chat session seeded"
    );

    Ok(ChatSession::seed(&SessionSeed {
        schema,
        dialect: db.dialect().to_string(),
        previews,
        joins: joins.to_vec(),
        corrections,
    }))
}

/// Ask the provider for SQL, recording the exchange in the session on
/// success. Returns the session either way so the caller can re-cache it.
pub async fn generate_sql_op(
    provider: &dyn LlmProvider,
    mut session: ChatSession,
    question: &str,
) -> (ChatSession, Result<GeneratedSql, LlmError>) {
    let outcome = provider.generate_sql(&session, question).await;
    if let Ok(generated) = &outcome {
        session.push_exchange(question, &generated.sql);
    }
    (session, outcome)
}

/// Result of running a turn's SQL against the workspace.
#[derive(Debug)]
pub struct ExecuteOutcome {
    pub result: Result<AnalysisResult, String>,
    /// True when the run was a correction and it was stored.
    pub recorded_correction: bool,
}

/// Execute a turn's SQL. A successful run of edited SQL is stored as a
/// correction so future sessions learn from it; a failure to store is
/// logged but does not fail the run.
pub async fn execute_op(db: &WorkspaceDb, plan: &ExecutePlan, question: &str) -> ExecuteOutcome {
    let rows = match db.execute(&plan.sql).await {
        Ok(rows) => rows,
        Err(err) => {
            return ExecuteOutcome {
                result: Err(err.to_string()),
                recorded_correction: false,
            }
        }
    };

    let mut recorded_correction = false;
    if plan.is_correction {
        let correction = Correction {
            question: question.to_string(),
            sql: plan.sql.clone(),
        };
        match db.add_correction(&correction).await {
            Ok(()) => {
                debug!(question = %question, "correction recorded");
                recorded_correction = true;
            }
            Err(err) => warn!(error = %err, "failed to record correction"),
        }
    }

    ExecuteOutcome {
        result: Ok(AnalysisResult {
            sql: plan.sql.clone(),
            data: rows,
        }),
        recorded_correction,
    }
}
