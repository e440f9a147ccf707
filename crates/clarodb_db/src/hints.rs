//! Rewrites raw query-execution errors into user-facing hints.
//!
//! Generated SQL fails in predictable ways: a hallucinated table name, a
//! column that only exists in another table, or plain syntax trouble. The
//! driver message identifies the cause; the hint tells the user what to do.

use regex::Regex;
use std::sync::OnceLock;

fn unknown_table_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"no such table:\s*([A-Za-z0-9_."]+)"#).unwrap())
}

fn unknown_column_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"no such column:\s*([A-Za-z0-9_."]+)"#).unwrap())
}

/// Turn a raw driver error into a hint that identifies the likely cause.
pub fn explain_query_error(sql: &str, raw: &str) -> String {
    if let Some(caps) = unknown_table_re().captures(raw) {
        let table = caps[1].trim_matches('"');
        return format!(
            "Unknown table \"{table}\". Check the table name against the schema canvas; \
             imported tables are named after their files."
        );
    }

    if let Some(caps) = unknown_column_re().captures(raw) {
        let column = caps[1].trim_matches('"');
        return format!(
            "Unknown column \"{column}\". It may belong to a different table or need \
             a table qualifier."
        );
    }

    if raw.contains("syntax error") {
        let near = raw
            .split("near ")
            .nth(1)
            .map(|s| s.trim_end_matches(": syntax error").trim())
            .unwrap_or("");
        if near.is_empty() {
            return "SQL syntax error. Edit the query and try again.".to_string();
        }
        return format!("SQL syntax error near {near}. Edit the query and try again.");
    }

    // Fall back to the raw message but keep the failed statement out of it;
    // the turn already shows the SQL.
    let _ = sql;
    format!("Query failed: {raw}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_table_hint() {
        let hint = explain_query_error(
            "SELECT * FROM userz",
            "error returned from database: (code: 1) no such table: userz",
        );
        assert!(hint.contains("Unknown table \"userz\""));
    }

    #[test]
    fn test_unknown_column_hint() {
        let hint = explain_query_error(
            "SELECT nme FROM users",
            "error returned from database: (code: 1) no such column: nme",
        );
        assert!(hint.contains("Unknown column \"nme\""));
    }

    #[test]
    fn test_syntax_error_hint() {
        let hint = explain_query_error(
            "SELEC 1",
            "error returned from database: (code: 1) near \"SELEC\": syntax error",
        );
        assert!(hint.contains("syntax error"));
    }

    #[test]
    fn test_generic_error_passes_through() {
        let hint = explain_query_error("SELECT 1", "disk I/O error");
        assert!(hint.contains("disk I/O error"));
    }
}
