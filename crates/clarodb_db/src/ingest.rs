//! File ingestion: CSV/JSON/TXT into workspace tables.
//!
//! Each imported file becomes one table, replacing any previous table of the
//! same name. Column types are inferred from a bounded sample (NUMBER when
//! every non-empty value parses as a number, BOOLEAN for all-boolean JSON
//! columns, TEXT otherwise).

use crate::error::{DbError, Result};
use crate::types::CellValue;
use crate::{quote_ident, WorkspaceDb};
use std::path::Path;
use tracing::info;

/// Rows sampled when inferring a column's type.
const TYPE_SAMPLE_ROWS: usize = 100;

/// Derive a safe table name from a file path.
pub fn table_name_from_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("imported");
    let mut name: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect();
    if name.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true) {
        name.insert(0, 't');
    }
    name
}

/// Guess the delimiter of a TXT file from its first line.
pub fn sniff_delimiter(first_line: &str) -> u8 {
    [b'\t', b';', b'|', b',']
        .into_iter()
        .max_by_key(|d| first_line.bytes().filter(|b| b == d).count())
        .filter(|d| first_line.bytes().any(|b| b == *d))
        .unwrap_or(b',')
}

/// Infer a column type from sampled string values.
///
/// Empty strings count as null and constrain nothing; a column of only
/// empties stays TEXT.
pub fn infer_column_type<'a>(samples: impl IntoIterator<Item = &'a str>) -> &'static str {
    let mut saw_value = false;
    for s in samples {
        let s = s.trim();
        if s.is_empty() {
            continue;
        }
        if s.parse::<f64>().is_err() {
            return "TEXT";
        }
        saw_value = true;
    }
    if saw_value {
        "NUMBER"
    } else {
        "TEXT"
    }
}

impl WorkspaceDb {
    /// Import a file based on its extension (csv/json/txt).
    ///
    /// `table` overrides the name derived from the file name.
    /// Returns (table name, row count).
    pub async fn ingest_file(&self, path: &Path, table: Option<&str>) -> Result<(String, usize)> {
        let data = std::fs::read_to_string(path)?;
        let table = table
            .map(str::to_string)
            .unwrap_or_else(|| table_name_from_path(path));
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let count = match ext.as_str() {
            "csv" => self.ingest_csv(&table, &data).await?,
            "json" => self.ingest_json(&table, &data).await?,
            "txt" => self.ingest_txt(&table, &data).await?,
            other => {
                return Err(DbError::data_processing(format!(
                    "Unsupported file format \".{other}\": expected csv, json, or txt"
                )))
            }
        };
        Ok((table, count))
    }

    /// Import comma-separated data into `table`.
    pub async fn ingest_csv(&self, table: &str, data: &str) -> Result<usize> {
        self.ingest_delimited(table, data, b',').await
    }

    /// Import delimiter-sniffed text data into `table`.
    pub async fn ingest_txt(&self, table: &str, data: &str) -> Result<usize> {
        let delimiter = sniff_delimiter(data.lines().next().unwrap_or(""));
        self.ingest_delimited(table, data, delimiter).await
    }

    async fn ingest_delimited(&self, table: &str, data: &str, delimiter: u8) -> Result<usize> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(data.as_bytes());

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| DbError::data_processing(format!("Malformed header row: {e}")))?
            .iter()
            .enumerate()
            .map(|(i, h)| sanitize_column(h, i))
            .collect();
        if headers.is_empty() {
            return Err(DbError::data_processing("File has no columns"));
        }

        let mut records: Vec<Vec<String>> = Vec::new();
        for record in reader.records() {
            let record =
                record.map_err(|e| DbError::data_processing(format!("Malformed row: {e}")))?;
            let mut row: Vec<String> = record.iter().map(|s| s.to_string()).collect();
            row.resize(headers.len(), String::new());
            records.push(row);
        }
        if records.is_empty() {
            return Err(DbError::data_processing("File contains no data rows"));
        }

        let types: Vec<&'static str> = (0..headers.len())
            .map(|col| {
                infer_column_type(
                    records
                        .iter()
                        .take(TYPE_SAMPLE_ROWS)
                        .map(|r| r[col].as_str()),
                )
            })
            .collect();

        let rows: Vec<Vec<CellValue>> = records
            .iter()
            .map(|record| {
                record
                    .iter()
                    .zip(&types)
                    .map(|(raw, ty)| {
                        let raw = raw.trim();
                        if raw.is_empty() {
                            CellValue::Null
                        } else if *ty == "NUMBER" {
                            raw.parse::<f64>().map(CellValue::Number).unwrap_or(CellValue::Null)
                        } else {
                            CellValue::Text(raw.to_string())
                        }
                    })
                    .collect()
            })
            .collect();

        self.create_and_fill(table, &headers, &types, &rows).await
    }

    /// Import a JSON array of flat objects into `table`.
    pub async fn ingest_json(&self, table: &str, data: &str) -> Result<usize> {
        let value: serde_json::Value = serde_json::from_str(data)
            .map_err(|e| DbError::data_processing(format!("Invalid JSON: {e}")))?;
        let array = value
            .as_array()
            .ok_or_else(|| DbError::data_processing("Expected a JSON array of objects"))?;
        if array.is_empty() {
            return Err(DbError::data_processing("File contains no data rows"));
        }

        let first = array[0]
            .as_object()
            .ok_or_else(|| DbError::data_processing("Expected a JSON array of objects"))?;
        let headers: Vec<String> = first
            .keys()
            .enumerate()
            .map(|(i, k)| sanitize_column(k, i))
            .collect();
        let keys: Vec<&String> = first.keys().collect();

        let rows: Vec<Vec<CellValue>> = array
            .iter()
            .map(|item| {
                let obj = item.as_object();
                keys.iter()
                    .map(|key| match obj.and_then(|o| o.get(key.as_str())) {
                        None | Some(serde_json::Value::Null) => CellValue::Null,
                        Some(serde_json::Value::Number(n)) => {
                            CellValue::Number(n.as_f64().unwrap_or(f64::NAN))
                        }
                        Some(serde_json::Value::Bool(b)) => CellValue::Boolean(*b),
                        Some(serde_json::Value::String(s)) => CellValue::Text(s.clone()),
                        Some(other) => CellValue::Text(other.to_string()),
                    })
                    .collect()
            })
            .collect();

        let types: Vec<&'static str> = (0..headers.len())
            .map(|col| {
                let sample = rows.iter().take(TYPE_SAMPLE_ROWS).map(|r| &r[col]);
                let mut ty = None;
                for cell in sample {
                    let kind = match cell {
                        CellValue::Null => continue,
                        CellValue::Number(_) => "NUMBER",
                        CellValue::Boolean(_) => "BOOLEAN",
                        CellValue::Text(_) => "TEXT",
                    };
                    match ty {
                        None => ty = Some(kind),
                        Some(existing) if existing == kind => {}
                        Some(_) => return "TEXT",
                    }
                }
                ty.unwrap_or("TEXT")
            })
            .collect();

        self.create_and_fill(table, &headers, &types, &rows).await
    }

    async fn create_and_fill(
        &self,
        table: &str,
        headers: &[String],
        types: &[&'static str],
        rows: &[Vec<CellValue>],
    ) -> Result<usize> {
        let column_defs: Vec<String> = headers
            .iter()
            .zip(types)
            .map(|(name, ty)| {
                let sql_type = match *ty {
                    "NUMBER" => "REAL",
                    "BOOLEAN" => "BOOLEAN",
                    _ => "TEXT",
                };
                format!("{} {}", quote_ident(name), sql_type)
            })
            .collect();

        let mut tx = self.pool().begin().await?;

        sqlx::query(&format!("DROP TABLE IF EXISTS {}", quote_ident(table)))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!(
            "CREATE TABLE {} ({})",
            quote_ident(table),
            column_defs.join(", ")
        ))
        .execute(&mut *tx)
        .await?;

        let placeholders = vec!["?"; headers.len()].join(", ");
        let insert = format!("INSERT INTO {} VALUES ({})", quote_ident(table), placeholders);
        for row in rows {
            let mut query = sqlx::query(&insert);
            for cell in row {
                query = match cell {
                    CellValue::Null => query.bind(Option::<String>::None),
                    CellValue::Number(v) => query.bind(*v),
                    CellValue::Text(v) => query.bind(v.clone()),
                    CellValue::Boolean(v) => query.bind(*v),
                };
            }
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;

        info!(table, rows = rows.len(), "Imported table");
        Ok(rows.len())
    }
}

fn sanitize_column(raw: &str, index: usize) -> String {
    let name: String = raw
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.chars().all(|c| c == '_') {
        format!("col{index}")
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_name_from_path() {
        assert_eq!(table_name_from_path(Path::new("/tmp/Sales Data.csv")), "sales_data");
        assert_eq!(table_name_from_path(Path::new("2024.csv")), "t2024");
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a\tb\tc"), b'\t');
        assert_eq!(sniff_delimiter("a;b;c"), b';');
        assert_eq!(sniff_delimiter("a,b,c"), b',');
        assert_eq!(sniff_delimiter("single"), b',');
    }

    #[test]
    fn test_infer_column_type() {
        assert_eq!(infer_column_type(["1", "2.5", ""]), "NUMBER");
        assert_eq!(infer_column_type(["1", "x"]), "TEXT");
        assert_eq!(infer_column_type(["", ""]), "TEXT");
    }

    #[tokio::test]
    async fn test_ingest_file_table_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Widget Sales.csv");
        std::fs::write(&path, "id,amount\n1,10\n").unwrap();

        let db = WorkspaceDb::open_in_memory().await.unwrap();
        let (table, count) = db.ingest_file(&path, Some("sales")).await.unwrap();
        assert_eq!(table, "sales");
        assert_eq!(count, 1);

        let (derived, _) = db.ingest_file(&path, None).await.unwrap();
        assert_eq!(derived, "widget_sales");
    }

    #[tokio::test]
    async fn test_ingest_csv_infers_types() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        let count = db
            .ingest_csv("orders", "id,amount,note\n1,10.5,first\n2,20,second\n")
            .await
            .unwrap();
        assert_eq!(count, 2);

        let schema = db.schemas().await.unwrap();
        let columns = &schema["orders"];
        assert_eq!(columns[0].column_type, "NUMBER");
        assert_eq!(columns[1].column_type, "NUMBER");
        assert_eq!(columns[2].column_type, "TEXT");
    }

    #[tokio::test]
    async fn test_ingest_empty_csv_rejected() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        let err = db.ingest_csv("empty", "id,amount\n").await.unwrap_err();
        assert!(matches!(err, DbError::DataProcessing(_)));
    }

    #[tokio::test]
    async fn test_ingest_json_objects() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        let count = db
            .ingest_json(
                "users",
                r#"[{"id": 1, "name": "Ada", "active": true}, {"id": 2, "name": "Grace", "active": false}]"#,
            )
            .await
            .unwrap();
        assert_eq!(count, 2);

        let rows = db.execute("SELECT name FROM users ORDER BY id").await.unwrap();
        assert_eq!(rows.rows[0][0], CellValue::Text("Ada".into()));
    }

    #[tokio::test]
    async fn test_ingest_replaces_existing_table() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        db.ingest_csv("t", "a\n1\n2\n3\n").await.unwrap();
        db.ingest_csv("t", "a\n9\n").await.unwrap();
        let rows = db.execute("SELECT COUNT(*) AS n FROM t").await.unwrap();
        assert_eq!(rows.rows[0][0], CellValue::Number(1.0));
    }

    #[tokio::test]
    async fn test_ingest_txt_sniffs_tabs() {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        db.ingest_txt("log", "region\tsales\nEast\t10\nWest\t20\n").await.unwrap();
        let rows = db.execute("SELECT sales FROM log ORDER BY sales").await.unwrap();
        assert_eq!(rows.rows[1][0], CellValue::Number(20.0));
    }
}
