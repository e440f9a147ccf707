//! Tables command: list a workspace's tables and columns.

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};

use clarodb_db::{TableSchema, WorkspaceDb};

use crate::cli::config::{workspace_db_path, Settings};

#[derive(Debug, Args)]
pub struct TablesArgs {
    /// Workspace to inspect
    #[arg(short, long)]
    pub workspace: Option<String>,

    /// Emit machine-readable JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: TablesArgs) -> Result<()> {
    let settings = Settings::load()?;
    let workspace = settings.workspace_or_default(args.workspace.as_deref());
    let db_path = workspace_db_path(&workspace);
    if !db_path.exists() {
        anyhow::bail!("workspace '{workspace}' has no data yet; run `clarodb import` first");
    }

    let db = WorkspaceDb::open(&db_path)
        .await
        .with_context(|| format!("failed to open workspace '{workspace}'"))?;
    let schema = db.schemas().await?;
    db.close().await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&schema)?);
    } else if schema.is_empty() {
        println!("Workspace '{}' has no tables", workspace);
    } else {
        println!("{}", render_schema(&schema));
    }
    Ok(())
}

fn render_schema(schema: &TableSchema) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Table", "Column", "Type"]);
    for (name, columns) in schema {
        for (idx, column) in columns.iter().enumerate() {
            let table_cell = if idx == 0 { name.as_str() } else { "" };
            table.add_row(vec![table_cell, &column.name, &column.column_type]);
        }
    }
    table
}
