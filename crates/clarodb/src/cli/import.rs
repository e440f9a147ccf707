//! Import command: load a CSV/JSON/TXT file into a workspace table.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use clarodb_db::WorkspaceDb;

use crate::cli::config::{workspace_db_path, Settings};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// File to import (.csv, .json, or .txt)
    pub file: PathBuf,

    /// Target table name (default: derived from the file name)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Workspace to import into
    #[arg(short, long)]
    pub workspace: Option<String>,
}

pub async fn run(args: ImportArgs) -> Result<()> {
    let settings = Settings::load()?;
    let workspace = settings.workspace_or_default(args.workspace.as_deref());
    let db_path = workspace_db_path(&workspace);

    let db = WorkspaceDb::open(&db_path)
        .await
        .with_context(|| format!("failed to open workspace '{workspace}'"))?;

    let (table, rows) = db
        .ingest_file(&args.file, args.table.as_deref())
        .await
        .with_context(|| format!("failed to import {}", args.file.display()))?;

    info!(workspace = %workspace, table = %table, rows, "import finished");
    println!("Imported {} rows into '{}' (workspace '{}')", rows, table, workspace);

    db.close().await;
    Ok(())
}
