use anyhow::Result;
use clap::{Parser, Subcommand};

use clarodb::cli::{import, tables};
use clarodb::tui;
use clarodb_logging::{init_logging, LogConfig};

#[derive(Parser, Debug)]
#[command(name = "clarodb", about = "Explore tabular data with LLM-assisted SQL")]
struct Cli {
    /// Enable verbose logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the interactive workbench
    Tui(tui::TuiArgs),
    /// Import a CSV/JSON/TXT file into a workspace
    Import(import::ImportArgs),
    /// List a workspace's tables
    Tables(tables::TablesArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // While the TUI owns the terminal stderr only carries warnings.
    let tui_mode = matches!(cli.command, Commands::Tui(_));
    init_logging(LogConfig {
        app_name: "clarodb",
        verbose: cli.verbose,
        tui_mode,
    })?;

    match cli.command {
        Commands::Tui(args) => tui::run(args).await,
        Commands::Import(args) => import::run(args).await,
        Commands::Tables(args) => tables::run(args).await,
    }
}
