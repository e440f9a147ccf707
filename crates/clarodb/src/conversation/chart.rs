//! Chart suggestion from result rows.
//!
//! Column classification is a pure function over the tagged result values:
//! a column is numeric when every value across all rows is null or a number,
//! categorical otherwise. A bar chart needs one of each.

use clarodb_db::QueryRows;
use serde::{Deserialize, Serialize};

/// Result of partitioning result columns by value kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnClasses {
    pub numeric: Vec<String>,
    pub categorical: Vec<String>,
}

/// Partition result columns into numeric and categorical.
pub fn classify_columns(rows: &QueryRows) -> ColumnClasses {
    let mut classes = ColumnClasses::default();
    for (idx, name) in rows.columns.iter().enumerate() {
        let all_numeric = rows
            .rows
            .iter()
            .filter_map(|r| r.get(idx))
            .all(|v| v.is_numeric_compatible());
        if all_numeric {
            classes.numeric.push(name.clone());
        } else {
            classes.categorical.push(name.clone());
        }
    }
    classes
}

/// A minimal bar-chart configuration over a result set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BarChartSpec {
    pub title: String,
    /// Categorical column labelling each bar
    pub name_key: String,
    /// Numeric columns plotted as values (currently always one)
    pub data_keys: Vec<String>,
}

/// Build a bar chart from the first numeric and first categorical column.
pub fn build_bar_chart(rows: &QueryRows) -> Result<BarChartSpec, String> {
    if rows.is_empty() {
        return Err("No rows to chart: run a query that returns data first".to_string());
    }

    let classes = classify_columns(rows);
    let value = classes
        .numeric
        .first()
        .ok_or_else(|| "No numeric column found: a bar chart needs values to plot".to_string())?;
    let category = classes.categorical.first().ok_or_else(|| {
        "No category column found: a bar chart needs labels for its bars".to_string()
    })?;

    Ok(BarChartSpec {
        title: format!("{} by {}", value, category),
        name_key: category.clone(),
        data_keys: vec![value.clone()],
    })
}

/// Resolve a chart spec against its rows into (label, value) bars.
pub fn chart_data(spec: &BarChartSpec, rows: &QueryRows) -> Vec<(String, f64)> {
    let name_idx = rows.columns.iter().position(|c| c == &spec.name_key);
    let value_idx = spec
        .data_keys
        .first()
        .and_then(|k| rows.columns.iter().position(|c| c == k));
    let (Some(name_idx), Some(value_idx)) = (name_idx, value_idx) else {
        return Vec::new();
    };

    rows.rows
        .iter()
        .filter_map(|row| {
            let label = row.get(name_idx)?.display();
            let value = row.get(value_idx)?.as_number()?;
            Some((label, value))
        })
        .collect()
}
