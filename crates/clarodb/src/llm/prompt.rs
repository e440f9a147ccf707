//! Prompt construction for the SQL assistant.
//!
//! The session system prompt carries everything the model needs to write
//! dialect-correct SQL against the workspace: schema, sample rows, modeled
//! joins, and previously recorded corrections.

use super::SessionSeed;
use clarodb_db::QueryRows;
use std::fmt::Write;

/// Rows of a preview included verbatim in the prompt.
const MAX_PROMPT_PREVIEW_ROWS: usize = 3;
/// Result rows included in an insights request.
const MAX_INSIGHT_ROWS: usize = 50;

/// Build the system prompt a fresh chat session is seeded with.
pub fn session_system_prompt(seed: &SessionSeed) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "You are a SQL assistant for the {} dialect. Answer every question with \
         exactly one SQL statement and nothing else: no prose, no markdown fences.",
        if seed.dialect.is_empty() { "sqlite" } else { &seed.dialect }
    );

    let _ = writeln!(out, "\nSchema:");
    for (table, columns) in &seed.schema {
        let cols: Vec<String> = columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.column_type))
            .collect();
        let _ = writeln!(out, "  {}({})", table, cols.join(", "));
    }

    if !seed.previews.is_empty() {
        let _ = writeln!(out, "\nSample rows:");
        for (table, preview) in &seed.previews {
            let _ = writeln!(out, "  {table}:");
            for line in render_rows(preview, MAX_PROMPT_PREVIEW_ROWS) {
                let _ = writeln!(out, "    {line}");
            }
        }
    }

    if !seed.joins.is_empty() {
        let _ = writeln!(out, "\nModeled joins (prefer these when combining tables):");
        for join in &seed.joins {
            let _ = writeln!(
                out,
                "  {}.{} {} {}.{}",
                join.table1,
                join.column1,
                join.join_type.sql_keyword(),
                join.table2,
                join.column2
            );
        }
    }

    if !seed.corrections.is_empty() {
        let _ = writeln!(
            out,
            "\nThe user previously corrected generated SQL. Follow these patterns:"
        );
        for correction in &seed.corrections {
            let _ = writeln!(out, "  Q: {}", correction.question);
            let _ = writeln!(out, "  SQL: {}", correction.sql);
        }
    }

    out
}

/// Build the user prompt for an insights request.
pub fn insights_prompt(question: &str, rows: &QueryRows) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "The user asked: {question}\n\nThe query returned these rows:"
    );
    for line in render_rows(rows, MAX_INSIGHT_ROWS) {
        let _ = writeln!(out, "{line}");
    }
    if rows.len() > MAX_INSIGHT_ROWS {
        let _ = writeln!(out, "... ({} rows total)", rows.len());
    }
    let _ = write!(
        out,
        "\nWrite two or three sentences of plain-language insight about this result. \
         Mention concrete values. Do not restate the question."
    );
    out
}

/// Strip markdown code fences a model sometimes wraps SQL in.
pub fn strip_sql_fences(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed.to_string();
    };
    let rest = rest.strip_prefix("sql").unwrap_or(rest);
    let rest = rest.strip_suffix("```").unwrap_or(rest);
    rest.trim().to_string()
}

fn render_rows(rows: &QueryRows, limit: usize) -> Vec<String> {
    let mut lines = Vec::new();
    if !rows.columns.is_empty() {
        lines.push(rows.columns.join(" | "));
    }
    for row in rows.rows.iter().take(limit) {
        let cells: Vec<String> = row.iter().map(|c| c.display()).collect();
        lines.push(cells.join(" | "));
    }
    lines
}
