//! Question/answer turns over a workspace.
//!
//! `session::Conversation` is the synchronous state machine; `ops` holds the
//! async work (LLM calls, query execution) that feeds results back into it.

pub mod chart;
pub mod ops;
pub mod session;
pub mod turn;

pub use chart::{build_bar_chart, chart_data, classify_columns, BarChartSpec, ColumnClasses};
pub use ops::{execute_op, generate_sql_op, initialize_chat_session, ExecuteOutcome};
pub use session::{Conversation, ExecutePlan};
pub use turn::{
    AnalysisResult, ConversationTurn, InsightsResult, SqlResult, TurnError, TurnId, TurnState,
};
