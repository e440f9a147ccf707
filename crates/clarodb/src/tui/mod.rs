//! Terminal workbench for ClaroDB
//!
//! Canvas mode models the schema and joins with mouse-driven drag
//! interactions; Chat mode runs the question/SQL/results conversation.

pub mod app;
pub mod components;
pub mod event;
pub mod ui;

use anyhow::{Context, Result};
use clap::Args;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, prelude::*, Terminal};
use std::io::stdout;
use std::sync::Arc;

use clarodb_db::WorkspaceDb;

use crate::cli::config::{workspace_db_path, Settings};
use crate::llm::claude::ClaudeProvider;
use crate::llm::LlmProvider;
use crate::tui::app::App;
use crate::tui::event::{Event, EventPump};

/// TUI command arguments
#[derive(Debug, Args)]
pub struct TuiArgs {
    /// Workspace to open
    #[arg(short, long)]
    pub workspace: Option<String>,
}

/// Run the TUI
pub async fn run(args: TuiArgs) -> Result<()> {
    let settings = Settings::load()?;
    let workspace = settings.workspace_or_default(args.workspace.as_deref());

    let db = WorkspaceDb::open(workspace_db_path(&workspace))
        .await
        .with_context(|| format!("failed to open workspace '{workspace}'"))?;

    let provider: Arc<dyn LlmProvider> = match ClaudeProvider::from_env() {
        Ok(claude) => match &settings.model {
            Some(model) => Arc::new(claude.with_model(model.clone())),
            None => Arc::new(claude),
        },
        // Not fatal: canvas modeling works offline; asking a question
        // surfaces the credential error.
        Err(_) => Arc::new(ClaudeProvider::new(String::new())),
    };

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Create app state
    let mut app = App::new(workspace, db, provider);
    if let Some(width) = settings.canvas_width {
        if let Some(session) = app.session_mut() {
            session.canvas.set_canvas_width(width);
        }
    }
    app.refresh_schema().await;

    // Create event handler
    let mut events = EventPump::new(std::time::Duration::from_millis(250));

    // Main loop
    let result = run_app(&mut terminal, &mut app, &mut events).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    result
}

/// Run the application loop
async fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut EventPump,
) -> Result<()> {
    while app.running {
        // Geometry registry and frame layout are rebuilt before drawing so
        // that drawing and mouse handling agree on positions.
        let size = terminal.size()?;
        app.prepare_frame(Rect::new(0, 0, size.width, size.height));

        terminal.draw(|frame| ui::draw(frame, app))?;

        match events.next().await {
            Event::Key(key) => app.handle_key(key).await,
            Event::Mouse(mouse) => app.handle_mouse(mouse),
            Event::Tick => app.tick().await,
            Event::Resize(_, _) => {} // next prepare_frame picks up the size
        }
    }

    Ok(())
}
