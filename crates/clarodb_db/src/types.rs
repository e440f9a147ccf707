//! Unified types for ClaroDB workspace data.
//!
//! These types are the single source of truth. All interfaces (CLI, TUI)
//! should use these types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Schema Types
// ============================================================================

/// One column of one table. Immutable once introspected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSchema {
    /// Column name
    pub name: String,
    /// Declared type (NUMBER, TEXT, ...)
    pub column_type: String,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column_type: column_type.into(),
        }
    }
}

/// Mapping from table name to its ordered columns.
///
/// BTreeMap keeps table iteration deterministic; that order seeds the
/// layout engine's component traversal.
pub type TableSchema = BTreeMap<String, Vec<ColumnSchema>>;

// ============================================================================
// Join Types
// ============================================================================

/// SQL join type selected when a join is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinType {
    #[default]
    Inner,
    Left,
    Right,
    Outer,
}

impl JoinType {
    pub const ALL: [JoinType; 4] = [
        JoinType::Inner,
        JoinType::Left,
        JoinType::Right,
        JoinType::Outer,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "inner" => Some(Self::Inner),
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            "outer" => Some(Self::Outer),
            _ => None,
        }
    }

    /// SQL keyword for this join type.
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Outer => "FULL OUTER JOIN",
        }
    }
}

impl std::fmt::Display for JoinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-confirmed join between columns of two different tables.
///
/// Invariant: `table1 != table2` (checked at commit time by the canvas).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Join {
    /// Unique identifier
    pub id: String,
    pub table1: String,
    pub column1: String,
    pub table2: String,
    pub column2: String,
    pub join_type: JoinType,
}

// ============================================================================
// Row Value Types
// ============================================================================

/// A single cell value from a query result or imported file.
///
/// Tagged union of the primitive kinds the system distinguishes; numeric
/// vs. categorical classification for charts is a pure function over these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Number(f64),
    Text(String),
    Boolean(bool),
}

impl CellValue {
    /// True when the value is null or a number (the chart classifier's
    /// definition of "numeric-compatible").
    pub fn is_numeric_compatible(&self) -> bool {
        matches!(self, CellValue::Null | CellValue::Number(_))
    }

    /// Display string for table rendering.
    pub fn display(&self) -> String {
        match self {
            CellValue::Null => "NULL".to_string(),
            CellValue::Number(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    format!("{}", *v as i64)
                } else {
                    v.to_string()
                }
            }
            CellValue::Text(v) => v.clone(),
            CellValue::Boolean(v) => v.to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            _ => None,
        }
    }
}

/// Ordered query result: column names plus row-major values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRows {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl QueryRows {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// All values of one column, by name.
    pub fn column_values(&self, name: &str) -> Option<Vec<&CellValue>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().filter_map(|r| r.get(idx)).collect())
    }
}

// ============================================================================
// Correction Types
// ============================================================================

/// A recorded SQL correction: the user edited generated SQL before a
/// successful execution. Fed back into future chat sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub question: String,
    pub sql: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_type_roundtrip() {
        for jt in JoinType::ALL {
            let s = jt.as_str();
            let parsed = JoinType::parse(s).unwrap();
            assert_eq!(jt, parsed);
        }
    }

    #[test]
    fn test_join_type_parse_rejects_unknown() {
        assert_eq!(JoinType::parse("cross"), None);
    }

    #[test]
    fn test_cell_value_numeric_compat() {
        assert!(CellValue::Null.is_numeric_compatible());
        assert!(CellValue::Number(3.5).is_numeric_compatible());
        assert!(!CellValue::Text("x".into()).is_numeric_compatible());
        assert!(!CellValue::Boolean(true).is_numeric_compatible());
    }

    #[test]
    fn test_cell_value_display_integers_without_fraction() {
        assert_eq!(CellValue::Number(10.0).display(), "10");
        assert_eq!(CellValue::Number(10.5).display(), "10.5");
        assert_eq!(CellValue::Null.display(), "NULL");
    }

    #[test]
    fn test_query_rows_column_values() {
        let rows = QueryRows {
            columns: vec!["region".into(), "sales".into()],
            rows: vec![
                vec![CellValue::Text("East".into()), CellValue::Number(10.0)],
                vec![CellValue::Text("West".into()), CellValue::Number(20.0)],
            ],
        };
        let sales = rows.column_values("sales").unwrap();
        assert_eq!(sales.len(), 2);
        assert!(rows.column_values("missing").is_none());
    }
}
