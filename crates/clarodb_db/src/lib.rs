//! Workspace database layer for ClaroDB.
//!
//! This crate provides a single source of truth for all workspace data
//! operations. All interfaces (CLI, TUI) should use this crate for database
//! access.
//!
//! # Usage
//!
//! ```rust,ignore
//! use clarodb_db::{WorkspaceDb, Result};
//!
//! let db = WorkspaceDb::open("~/.clarodb/workspaces/demo.sqlite3").await?;
//!
//! let schema = db.schemas().await?;
//! let preview = db.preview("orders", 3).await?;
//! let rows = db.execute("SELECT COUNT(*) AS n FROM orders").await?;
//! ```

mod error;
mod hints;
mod ingest;
mod types;

pub use error::{DbError, Result};
pub use ingest::{infer_column_type, sniff_delimiter, table_name_from_path};
pub use types::*;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use std::path::Path;
use tracing::{debug, info};

/// Tables the workspace layer owns for bookkeeping; hidden from user schemas.
const CORRECTIONS_TABLE: &str = "_clarodb_corrections";

/// One workspace's database: imported tables plus the correction log.
///
/// This is the ONLY way ClaroDB touches SQLite. Do not use raw sqlx elsewhere.
#[derive(Clone)]
pub struct WorkspaceDb {
    pool: SqlitePool,
}

impl WorkspaceDb {
    /// Open or create a workspace database at the given path.
    ///
    /// Creates the bookkeeping tables if they don't exist.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let url = format!("sqlite:{}?mode=rwc", path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;

        info!(path = %path.display(), "Workspace database opened");

        Ok(db)
    }

    /// Open an in-memory workspace (tests and demo sampling).
    pub async fn open_in_memory() -> Result<Self> {
        // A shared pool over :memory: must stay on one connection or each
        // checkout would see a different empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.ensure_schema().await?;
        Ok(db)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {CORRECTIONS_TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                sql_text TEXT NOT NULL,
                created_at INTEGER NOT NULL
            )"
        ))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The SQL dialect name, used when seeding chat sessions.
    pub fn dialect(&self) -> &'static str {
        "sqlite"
    }

    /// Get the underlying connection pool (escape hatch for ingestion).
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

// Schema introspection and queries
impl WorkspaceDb {
    /// All user tables with their ordered columns.
    ///
    /// Bookkeeping tables (`_clarodb_*`, `sqlite_*`) are excluded. Declared
    /// SQLite types are normalized to the NUMBER/TEXT vocabulary the rest of
    /// the system speaks.
    pub async fn schemas(&self) -> Result<TableSchema> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut schema = TableSchema::new();
        for row in rows {
            let name: String = row.try_get(0)?;
            if name.starts_with("sqlite_") || name.starts_with("_clarodb_") {
                continue;
            }
            schema.insert(name.clone(), self.table_columns(&name).await?);
        }
        Ok(schema)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<ColumnSchema>> {
        let rows = sqlx::query(&format!("PRAGMA table_info({})", quote_ident(table)))
            .fetch_all(&self.pool)
            .await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let declared: String = row.try_get("type")?;
            columns.push(ColumnSchema::new(name, normalize_type(&declared)));
        }
        Ok(columns)
    }

    /// First `limit` rows of one table, for chat-session seeding and cards.
    pub async fn preview(&self, table: &str, limit: usize) -> Result<QueryRows> {
        let sql = format!("SELECT * FROM {} LIMIT {}", quote_ident(table), limit);
        self.execute(&sql).await
    }

    /// Execute arbitrary SQL and return ordered rows of tagged values.
    ///
    /// Failures are rewritten into user-facing hints (unknown table, unknown
    /// column, syntax error) and never carry raw driver noise.
    pub async fn execute(&self, sql: &str) -> Result<QueryRows> {
        debug!(sql, "Executing workspace query");

        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DbError::Query(hints::explain_query_error(sql, &e.to_string())))?;

        let columns: Vec<String> = match rows.first() {
            Some(row) => row.columns().iter().map(|c| c.name().to_string()).collect(),
            None => Vec::new(),
        };

        let mut out = Vec::with_capacity(rows.len());
        for row in &rows {
            out.push(row_to_cells(row)?);
        }

        Ok(QueryRows { columns, rows: out })
    }
}

// Correction log
impl WorkspaceDb {
    /// Record a correction: the user's question and the SQL that actually
    /// worked after editing.
    pub async fn add_correction(&self, correction: &Correction) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {CORRECTIONS_TABLE} (question, sql_text, created_at) VALUES (?, ?, ?)"
        ))
        .bind(&correction.question)
        .bind(&correction.sql)
        .bind(chrono::Utc::now().timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// The most recent corrections, oldest first, at most `limit` entries.
    pub async fn corrections(&self, limit: usize) -> Result<Vec<Correction>> {
        let rows = sqlx::query(&format!(
            "SELECT question, sql_text FROM {CORRECTIONS_TABLE} ORDER BY id DESC LIMIT ?"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut corrections: Vec<Correction> = rows
            .iter()
            .map(|row| {
                Ok(Correction {
                    question: row.try_get(0)?,
                    sql: row.try_get(1)?,
                })
            })
            .collect::<Result<_>>()?;
        corrections.reverse();
        Ok(corrections)
    }
}

/// Decode one SQLite row into tagged cell values.
fn row_to_cells(row: &SqliteRow) -> Result<Vec<CellValue>> {
    let mut cells = Vec::with_capacity(row.len());
    for i in 0..row.len() {
        let raw = row.try_get_raw(i)?;
        if raw.is_null() {
            cells.push(CellValue::Null);
            continue;
        }
        let cell = match raw.type_info().name() {
            "INTEGER" => CellValue::Number(row.try_get::<i64, _>(i)? as f64),
            "REAL" => CellValue::Number(row.try_get::<f64, _>(i)?),
            "BOOLEAN" => CellValue::Boolean(row.try_get::<bool, _>(i)?),
            "BLOB" => {
                let bytes: Vec<u8> = row.try_get(i)?;
                CellValue::Text(format!("<blob {} bytes>", bytes.len()))
            }
            _ => CellValue::Text(row.try_get::<String, _>(i)?),
        };
        cells.push(cell);
    }
    Ok(cells)
}

/// Map a declared SQLite type to the NUMBER/TEXT vocabulary.
fn normalize_type(declared: &str) -> &'static str {
    let upper = declared.to_uppercase();
    if upper.contains("INT") || upper.contains("REAL") || upper.contains("NUMERIC")
        || upper.contains("DOUBLE") || upper.contains("FLOAT") || upper.contains("DECIMAL")
    {
        "NUMBER"
    } else if upper.contains("BOOL") {
        "BOOLEAN"
    } else {
        "TEXT"
    }
}

/// Quote a SQL identifier.
pub fn quote_ident(ident: &str) -> String {
    let escaped = ident.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_creates_database() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("test.sqlite3");

        let db = WorkspaceDb::open(&db_path).await.unwrap();
        assert!(db_path.exists());

        db.close().await;
    }

    #[tokio::test]
    async fn test_schemas_exclude_bookkeeping_tables() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE orders (id INTEGER, amount REAL)")
            .execute(db.pool())
            .await
            .unwrap();

        let schema = db.schemas().await.unwrap();
        assert_eq!(schema.len(), 1);
        let columns = &schema["orders"];
        assert_eq!(columns[0], ColumnSchema::new("id", "NUMBER"));
        assert_eq!(columns[1], ColumnSchema::new("amount", "NUMBER"));
    }

    #[tokio::test]
    async fn test_execute_returns_tagged_values() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        let rows = db
            .execute("SELECT 1 AS n, 'x' AS s, NULL AS missing, 2.5 AS r")
            .await
            .unwrap();

        assert_eq!(rows.columns, vec!["n", "s", "missing", "r"]);
        assert_eq!(
            rows.rows[0],
            vec![
                CellValue::Number(1.0),
                CellValue::Text("x".into()),
                CellValue::Null,
                CellValue::Number(2.5),
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_unknown_table_gets_hint() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        let err = db.execute("SELECT * FROM nope").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("nope"), "hint should name the table: {msg}");
        assert!(!msg.contains("code:"), "raw driver noise leaked: {msg}");
    }

    #[tokio::test]
    async fn test_correction_round_trip_bounded() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        for i in 0..5 {
            db.add_correction(&Correction {
                question: format!("q{i}"),
                sql: format!("SELECT {i}"),
            })
            .await
            .unwrap();
        }

        // New correction appears for any limit >= 1 and length never exceeds it
        let one = db.corrections(1).await.unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].question, "q4");

        let three = db.corrections(3).await.unwrap();
        assert_eq!(three.len(), 3);
        // Most-recent-last ordering
        assert_eq!(three.last().unwrap().question, "q4");
        assert_eq!(three[0].question, "q2");

        let many = db.corrections(100).await.unwrap();
        assert_eq!(many.len(), 5);
    }

    #[tokio::test]
    async fn test_preview_limits_rows() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        sqlx::query("CREATE TABLE t (v INTEGER)").execute(db.pool()).await.unwrap();
        for i in 0..10 {
            sqlx::query("INSERT INTO t VALUES (?)")
                .bind(i)
                .execute(db.pool())
                .await
                .unwrap();
        }
        let preview = db.preview("t", 3).await.unwrap();
        assert_eq!(preview.len(), 3);
    }
}
