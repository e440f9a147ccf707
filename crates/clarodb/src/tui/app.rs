//! Application state and event handling for the TUI.
//!
//! LLM and query work runs on spawned tasks; results come back over a
//! `std::sync::mpsc` channel tagged with workspace and turn id, drained on
//! tick. A result for a turn that no longer exists is dropped by the
//! conversation state machine.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use tracing::{info, warn};
use uuid::Uuid;

use clarodb_db::{Join, JoinType, TableSchema, WorkspaceDb};

use crate::canvas::{AnchorId, CanvasState, PendingJoin, Point};
use crate::cli::config::{workspace_db_path, KNOWN_WORKSPACES};
use crate::conversation::{
    execute_op, generate_sql_op, initialize_chat_session, Conversation, ExecuteOutcome, TurnId,
    TurnState,
};
use crate::llm::{ChatSession, GeneratedInsights, GeneratedSql, LlmError, LlmProvider};

// Projection between terminal cells and canvas pixels.
pub const PX_PER_CELL_X: f64 = 8.0;
pub const PX_PER_CELL_Y: f64 = 20.0;

/// Card header height and per-column row height in canvas pixels.
pub const CARD_HEADER_PX: f64 = 40.0;
pub const COLUMN_ROW_PX: f64 = 20.0;
/// Width of the anchor hit-zone at the right edge of a column row.
pub const ANCHOR_ZONE_PX: f64 = 16.0;
/// Most column rows shown on a card before "+n more".
pub const MAX_VISIBLE_COLUMNS: usize = 11;

const TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TuiMode {
    Canvas,
    Chat,
}

#[derive(Debug)]
pub struct Toast {
    pub message: String,
    pub is_error: bool,
    shown_at: Instant,
}

/// Join-type confirmation for a proposed join.
#[derive(Debug)]
pub struct JoinTypeModal {
    pub pending: PendingJoin,
    pub selected: usize,
}

impl JoinTypeModal {
    pub fn new(pending: PendingJoin) -> Self {
        Self {
            pending,
            selected: 0,
        }
    }

    pub fn join_type(&self) -> JoinType {
        JoinType::ALL[self.selected.min(JoinType::ALL.len() - 1)]
    }
}

/// SQL buffer for a turn awaiting approval.
#[derive(Debug)]
pub struct SqlEdit {
    pub turn_id: TurnId,
    pub buffer: String,
    pub editing: bool,
}

/// Results of background work, routed back to the owning workspace.
pub enum SessionEvent {
    SqlGenerated {
        workspace: String,
        turn_id: TurnId,
        session: Option<ChatSession>,
        outcome: Result<GeneratedSql, LlmError>,
    },
    Executed {
        workspace: String,
        turn_id: TurnId,
        outcome: ExecuteOutcome,
    },
    InsightsReady {
        workspace: String,
        turn_id: TurnId,
        outcome: Result<GeneratedInsights, LlmError>,
    },
}

/// Everything the app holds for one open workspace.
pub struct WorkspaceSession {
    pub db: WorkspaceDb,
    pub schema: TableSchema,
    pub joins: Vec<Join>,
    pub canvas: CanvasState,
    pub conversation: Conversation,
}

impl WorkspaceSession {
    pub fn new(db: WorkspaceDb) -> Self {
        Self {
            db,
            schema: TableSchema::new(),
            joins: Vec::new(),
            canvas: CanvasState::new(),
            conversation: Conversation::new(),
        }
    }
}

pub struct App {
    pub running: bool,
    pub mode: TuiMode,
    pub workspace: String,
    pub sessions: HashMap<String, WorkspaceSession>,
    pub provider: Arc<dyn LlmProvider>,
    pub toast: Option<Toast>,
    pub question_input: String,
    pub sql_edit: Option<SqlEdit>,
    pub join_modal: Option<JoinTypeModal>,
    /// Index into the join list for keyboard hover
    pub join_cursor: usize,

    event_tx: mpsc::Sender<SessionEvent>,
    event_rx: mpsc::Receiver<SessionEvent>,

    // Cell-space layout computed by prepare_frame, shared with ui::draw and
    // mouse handling so both see the same frame geometry.
    pub frame_size: (u16, u16),
    pub canvas_cells: ratatui::layout::Rect,
    pub divider_col: u16,
}

impl App {
    pub fn new(workspace: String, db: WorkspaceDb, provider: Arc<dyn LlmProvider>) -> Self {
        let (event_tx, event_rx) = mpsc::channel();
        let mut sessions = HashMap::new();
        sessions.insert(workspace.clone(), WorkspaceSession::new(db));
        Self {
            running: true,
            mode: TuiMode::Canvas,
            workspace,
            sessions,
            provider,
            toast: None,
            question_input: String::new(),
            sql_edit: None,
            join_modal: None,
            join_cursor: 0,
            event_tx,
            event_rx,
            frame_size: (0, 0),
            canvas_cells: ratatui::layout::Rect::default(),
            divider_col: 0,
        }
    }

    pub fn session(&self) -> Option<&WorkspaceSession> {
        self.sessions.get(&self.workspace)
    }

    pub fn session_mut(&mut self) -> Option<&mut WorkspaceSession> {
        self.sessions.get_mut(&self.workspace)
    }

    pub fn toast(&mut self, message: impl Into<String>, is_error: bool) {
        self.toast = Some(Toast {
            message: message.into(),
            is_error,
            shown_at: Instant::now(),
        });
    }

    // ==================== workspace lifecycle ====================

    /// Load the schema from disk and reconcile canvas/join state with it.
    pub async fn refresh_schema(&mut self) {
        let Some(session) = self.sessions.get_mut(&self.workspace) else {
            return;
        };
        match session.db.schemas().await {
            Ok(schema) => {
                session
                    .joins
                    .retain(|j| schema.contains_key(&j.table1) && schema.contains_key(&j.table2));
                session.canvas.ensure_positions(&schema);
                session.schema = schema;
                session.conversation.invalidate_chat_session();
            }
            Err(err) => {
                warn!(error = %err, "schema refresh failed");
                self.toast(format!("Failed to load schema: {err}"), true);
            }
        }
    }

    /// Switch to the next preset workspace, opening its database on first
    /// visit. In-memory session state survives switching away and back.
    pub async fn cycle_workspace(&mut self) {
        let current = KNOWN_WORKSPACES
            .iter()
            .position(|w| *w == self.workspace)
            .unwrap_or(0);
        let next = KNOWN_WORKSPACES[(current + 1) % KNOWN_WORKSPACES.len()].to_string();
        if next == self.workspace {
            return;
        }
        if !self.sessions.contains_key(&next) {
            match WorkspaceDb::open(workspace_db_path(&next)).await {
                Ok(db) => {
                    self.sessions.insert(next.clone(), WorkspaceSession::new(db));
                }
                Err(err) => {
                    self.toast(format!("Failed to open workspace '{next}': {err}"), true);
                    return;
                }
            }
        }
        info!(workspace = %next, "workspace switched");
        self.workspace = next;
        self.sql_edit = None;
        self.join_modal = None;
        self.join_cursor = 0;
        self.refresh_schema().await;
    }

    // ==================== key handling ====================

    pub async fn handle_key(&mut self, key: KeyEvent) {
        if self.join_modal.is_some() {
            self.handle_modal_key(key);
            return;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match (key.code, ctrl) {
            (KeyCode::Char('c'), true) => self.running = false,
            (KeyCode::Tab, _) => {
                self.mode = match self.mode {
                    TuiMode::Canvas => TuiMode::Chat,
                    TuiMode::Chat => TuiMode::Canvas,
                };
            }
            (KeyCode::Char('w'), true) => self.cycle_workspace().await,
            _ => match self.mode {
                TuiMode::Canvas => self.handle_canvas_key(key).await,
                TuiMode::Chat => self.handle_chat_key(key).await,
            },
        }
    }

    fn handle_modal_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Left | KeyCode::Up => {
                if let Some(modal) = self.join_modal.as_mut() {
                    modal.selected =
                        modal.selected.checked_sub(1).unwrap_or(JoinType::ALL.len() - 1);
                }
            }
            KeyCode::Right | KeyCode::Down => {
                if let Some(modal) = self.join_modal.as_mut() {
                    modal.selected = (modal.selected + 1) % JoinType::ALL.len();
                }
            }
            KeyCode::Enter => self.confirm_pending_join(),
            KeyCode::Esc => self.join_modal = None,
            _ => {}
        }
    }

    fn confirm_pending_join(&mut self) {
        let Some(modal) = self.join_modal.take() else {
            return;
        };
        let join_type = modal.join_type();
        let join = Join {
            id: Uuid::new_v4().to_string(),
            table1: modal.pending.table1,
            column1: modal.pending.column1,
            table2: modal.pending.table2,
            column2: modal.pending.column2,
            join_type,
        };
        if let Some(session) = self.sessions.get_mut(&self.workspace) {
            info!(join = %join.id, "join added");
            session.joins.push(join);
            session.conversation.invalidate_chat_session();
        }
    }

    async fn handle_canvas_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.running = false,
            KeyCode::Char('r') => self.refresh_schema().await,
            KeyCode::Char('a') => {
                if let Some(session) = self.sessions.get_mut(&self.workspace) {
                    let schema = session.schema.clone();
                    let joins = session.joins.clone();
                    session.canvas.run_auto_layout(&schema, &joins);
                }
            }
            KeyCode::Char('j') | KeyCode::Char('k') => {
                let down = key.code == KeyCode::Char('j');
                if let Some(session) = self.sessions.get_mut(&self.workspace) {
                    let len = session.joins.len();
                    if len > 0 {
                        self.join_cursor = if down {
                            (self.join_cursor + 1) % len
                        } else {
                            self.join_cursor.checked_sub(1).unwrap_or(len - 1)
                        };
                        session.canvas.hovered_join =
                            session.joins.get(self.join_cursor).map(|j| j.id.clone());
                    }
                }
            }
            KeyCode::Char('d') => self.delete_hovered_join(),
            KeyCode::Esc => {
                if let Some(session) = self.sessions.get_mut(&self.workspace) {
                    session.canvas.hovered_join = None;
                }
            }
            _ => {}
        }
    }

    fn delete_hovered_join(&mut self) {
        if let Some(session) = self.sessions.get_mut(&self.workspace) {
            let Some(id) = session.canvas.hovered_join.take() else {
                return;
            };
            session.joins.retain(|j| j.id != id);
            session.conversation.invalidate_chat_session();
            self.join_cursor = 0;
            self.toast("Join removed", false);
        }
    }

    async fn handle_chat_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if self.sql_edit.as_ref().is_some_and(|e| e.editing) {
            match (key.code, ctrl) {
                (KeyCode::Esc, _) | (KeyCode::Char('e'), true) => {
                    if let Some(edit) = self.sql_edit.as_mut() {
                        edit.editing = false;
                    }
                }
                (KeyCode::Enter, _) => self.execute_pending(),
                (KeyCode::Backspace, _) => {
                    if let Some(edit) = self.sql_edit.as_mut() {
                        edit.buffer.pop();
                    }
                }
                (KeyCode::Char(c), false) => {
                    if let Some(edit) = self.sql_edit.as_mut() {
                        edit.buffer.push(c);
                    }
                }
                _ => {}
            }
            return;
        }

        match (key.code, ctrl) {
            (KeyCode::Char('e'), true) => {
                if let Some(edit) = self.sql_edit.as_mut() {
                    edit.editing = true;
                }
            }
            (KeyCode::Char('r'), true) => self.execute_pending(),
            (KeyCode::Char('g'), true) => self.request_insights(),
            (KeyCode::Char('b'), true) => self.request_chart(),
            (KeyCode::Char('x'), true) => {
                if let Some(session) = self.sessions.get_mut(&self.workspace) {
                    session.conversation.reset();
                    self.sql_edit = None;
                    self.toast("Conversation reset", false);
                }
            }
            (KeyCode::Enter, _) => self.ask(),
            (KeyCode::Backspace, _) => {
                self.question_input.pop();
            }
            (KeyCode::Char(c), false) => self.question_input.push(c),
            _ => {}
        }
    }

    // ==================== conversation operations ====================

    /// Submit the question buffer as a new turn and spawn SQL generation.
    pub fn ask(&mut self) {
        if !self.provider.is_ready() {
            self.toast(
                "LLM provider not configured. Set ANTHROPIC_API_KEY and restart.",
                true,
            );
            return;
        }
        let question = self.question_input.trim().to_string();
        let workspace = self.workspace.clone();
        let Some(session) = self.sessions.get_mut(&workspace) else {
            return;
        };
        let turn_id = match session.conversation.begin_ask(&question) {
            Ok(id) => id,
            Err(err) => {
                self.toast(err.to_string(), true);
                return;
            }
        };
        self.question_input.clear();

        let provider = Arc::clone(&self.provider);
        let tx = self.event_tx.clone();
        let db = session.db.clone();
        let joins = session.joins.clone();
        let cached = session.conversation.chat_session().cloned();

        tokio::spawn(async move {
            let seeded = match cached {
                Some(existing) => Ok(existing),
                None => initialize_chat_session(&db, &joins)
                    .await
                    .map_err(|err| LlmError::Internal(err.to_string())),
            };
            let event = match seeded {
                Ok(chat) => {
                    let (chat, outcome) = generate_sql_op(provider.as_ref(), chat, &question).await;
                    SessionEvent::SqlGenerated {
                        workspace,
                        turn_id,
                        session: Some(chat),
                        outcome,
                    }
                }
                Err(err) => SessionEvent::SqlGenerated {
                    workspace,
                    turn_id,
                    session: None,
                    outcome: Err(err),
                },
            };
            let _ = tx.send(event);
        });
    }

    /// Run the SQL buffer of the pending turn.
    pub fn execute_pending(&mut self) {
        let workspace = self.workspace.clone();
        let Some(edit) = self.sql_edit.as_ref() else {
            self.toast("No SQL awaiting approval", true);
            return;
        };
        let turn_id = edit.turn_id;
        let sql = edit.buffer.clone();
        let Some(session) = self.sessions.get_mut(&workspace) else {
            return;
        };
        let question = session
            .conversation
            .turn(turn_id)
            .map(|t| t.question.clone())
            .unwrap_or_default();
        let plan = match session.conversation.begin_execute(turn_id, &sql) {
            Ok(plan) => plan,
            Err(err) => {
                self.toast(err.to_string(), true);
                return;
            }
        };
        self.sql_edit = None;

        let tx = self.event_tx.clone();
        let db = session.db.clone();
        tokio::spawn(async move {
            let outcome = execute_op(&db, &plan, &question).await;
            let _ = tx.send(SessionEvent::Executed {
                workspace,
                turn_id: plan.turn_id,
                outcome,
            });
        });
    }

    /// Request insights for the most recent completed turn.
    pub fn request_insights(&mut self) {
        let workspace = self.workspace.clone();
        let Some(session) = self.sessions.get_mut(&workspace) else {
            return;
        };
        let Some(turn_id) = latest_turn_in(&session.conversation, TurnState::Complete) else {
            self.toast("No completed result to analyze", true);
            return;
        };
        let analysis = match session.conversation.begin_insights(turn_id) {
            Ok(analysis) => analysis,
            Err(err) => {
                self.toast(err.to_string(), true);
                return;
            }
        };
        let question = session
            .conversation
            .turn(turn_id)
            .map(|t| t.question.clone())
            .unwrap_or_default();

        let provider = Arc::clone(&self.provider);
        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let outcome = provider.generate_insights(&question, &analysis.data).await;
            let _ = tx.send(SessionEvent::InsightsReady {
                workspace,
                turn_id,
                outcome,
            });
        });
    }

    /// Build a chart for the most recent completed turn. Local, synchronous.
    pub fn request_chart(&mut self) {
        let workspace = self.workspace.clone();
        let Some(session) = self.sessions.get_mut(&workspace) else {
            return;
        };
        let Some(turn_id) = latest_turn_in(&session.conversation, TurnState::Complete) else {
            self.toast("No completed result to chart", true);
            return;
        };
        match session.conversation.generate_chart(turn_id) {
            Ok(None) => {}
            Ok(Some(message)) => self.toast(message, true),
            Err(err) => self.toast(err.to_string(), true),
        }
    }

    // ==================== mouse handling ====================

    pub fn handle_mouse(&mut self, mouse: MouseEvent) {
        if self.mode != TuiMode::Canvas || self.join_modal.is_some() {
            return;
        }
        let pointer = self.cell_to_canvas(mouse.column, mouse.row);
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.pointer_down(mouse.column, pointer),
            MouseEventKind::Drag(MouseButton::Left) => self.pointer_drag(pointer),
            MouseEventKind::Up(MouseButton::Left) => self.pointer_up(),
            _ => {}
        }
    }

    fn pointer_down(&mut self, column: u16, pointer: Point) {
        // Divider gets a one-cell grab tolerance on either side.
        if column.abs_diff(self.divider_col) <= 1 {
            if let Some(session) = self.sessions.get_mut(&self.workspace) {
                session.canvas.panel.begin_drag();
            }
            return;
        }
        let Some(session) = self.sessions.get_mut(&self.workspace) else {
            return;
        };
        if let Some(anchor) = session.canvas.registry.anchor_at(pointer).cloned() {
            session.canvas.drawing.begin(anchor, pointer);
        } else if let Some(table) = session.canvas.registry.header_at(pointer).map(String::from) {
            session.canvas.begin_card_drag(&table, pointer);
        }
    }

    fn pointer_drag(&mut self, pointer: Point) {
        let window_px = f64::from(self.frame_size.0) * PX_PER_CELL_X;
        let Some(session) = self.sessions.get_mut(&self.workspace) else {
            return;
        };
        if session.canvas.panel.is_dragging() {
            session.canvas.panel.pointer_moved(window_px, pointer.x);
        } else if session.canvas.drawing.is_dragging() {
            session.canvas.drawing.move_to(pointer);
            let hovered = session.canvas.registry.anchor_at(pointer).cloned();
            session.canvas.drawing.hover(hovered);
        } else if session.canvas.is_dragging_card() {
            session.canvas.drag_card_to(pointer);
        }
    }

    fn pointer_up(&mut self) {
        let Some(session) = self.sessions.get_mut(&self.workspace) else {
            return;
        };
        session.canvas.panel.end_drag();
        session.canvas.end_card_drag();
        if let Some(pending) = session.canvas.drawing.release() {
            self.join_modal = Some(JoinTypeModal::new(pending));
        }
    }

    /// Map a terminal cell to canvas pixels. The pointer is somewhere inside
    /// the cell, so resolve to the cell's center; a 16-px anchor zone always
    /// covers at least one cell center, keeping every anchor hittable.
    pub fn cell_to_canvas(&self, column: u16, row: u16) -> Point {
        let col = column.saturating_sub(self.canvas_cells.x);
        let row = row.saturating_sub(self.canvas_cells.y);
        Point::new(
            f64::from(col) * PX_PER_CELL_X + PX_PER_CELL_X / 2.0,
            f64::from(row) * PX_PER_CELL_Y + PX_PER_CELL_Y / 2.0,
        )
    }

    // ==================== frame preparation ====================

    /// Compute the frame layout and rebuild the geometry registry so that
    /// drawing and mouse handling share one view of where everything is.
    pub fn prepare_frame(&mut self, size: ratatui::layout::Rect) {
        self.frame_size = (size.width, size.height);

        let panel_px = self
            .session()
            .map(|s| s.canvas.panel.width())
            .unwrap_or(crate::canvas::DEFAULT_PANEL_WIDTH);
        let panel_cells = (panel_px / PX_PER_CELL_X).round() as u16;
        let panel_cells = panel_cells.min(size.width.saturating_sub(10));

        // One row of chrome at top and bottom.
        let body_height = size.height.saturating_sub(2);
        self.canvas_cells = ratatui::layout::Rect::new(
            0,
            1,
            size.width.saturating_sub(panel_cells),
            body_height,
        );
        self.divider_col = self.canvas_cells.width.saturating_sub(1);

        let canvas_width_px = f64::from(self.canvas_cells.width) * PX_PER_CELL_X;
        if let Some(session) = self.sessions.get_mut(&self.workspace) {
            session.canvas.set_canvas_width(canvas_width_px.max(1.0));
            rebuild_registry(session);
        }
    }

    // ==================== tick ====================

    pub async fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.shown_at.elapsed() > TOAST_DURATION {
                self.toast = None;
            }
        }
        while let Ok(event) = self.event_rx.try_recv() {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SqlGenerated {
                workspace,
                turn_id,
                session,
                outcome,
            } => {
                let Some(ws) = self.sessions.get_mut(&workspace) else {
                    return;
                };
                let applied = ws.conversation.apply_sql(turn_id, outcome);
                // A stale response (turn gone after reset or invalidation)
                // must not repopulate the session cache with old schema.
                if applied {
                    if let Some(chat) = session {
                        // Concurrent turns race here; last write wins.
                        ws.conversation.set_chat_session(chat);
                    }
                }
                if let Some(turn) = ws.conversation.turn(turn_id) {
                    if turn.state == TurnState::SqlReady && workspace == self.workspace {
                        let sql = turn
                            .sql_result
                            .as_ref()
                            .map(|r| r.sql.clone())
                            .unwrap_or_default();
                        self.sql_edit = Some(SqlEdit {
                            turn_id,
                            buffer: sql,
                            editing: false,
                        });
                    }
                }
            }
            SessionEvent::Executed {
                workspace,
                turn_id,
                outcome,
            } => {
                let Some(ws) = self.sessions.get_mut(&workspace) else {
                    return;
                };
                ws.conversation.apply_execute(turn_id, outcome.result);
                if outcome.recorded_correction {
                    ws.conversation.invalidate_chat_session();
                    self.toast("Correction saved for future questions", false);
                }
            }
            SessionEvent::InsightsReady {
                workspace,
                turn_id,
                outcome,
            } => {
                let Some(ws) = self.sessions.get_mut(&workspace) else {
                    return;
                };
                if let Some(message) = ws.conversation.apply_insights(turn_id, outcome) {
                    self.toast(message, true);
                }
            }
        }
    }
}

/// Most recent turn in the given state.
fn latest_turn_in(conversation: &Conversation, state: TurnState) -> Option<TurnId> {
    conversation
        .turns()
        .iter()
        .rev()
        .find(|t| t.state == state)
        .map(|t| t.id)
}

/// How many column rows a card shows for `total` columns. Truncated cards
/// give up one row to the "+n more" marker, so the hit zones recorded in the
/// registry and the rows the renderer draws always describe the same columns.
pub fn visible_columns(total: usize) -> usize {
    if total > MAX_VISIBLE_COLUMNS {
        MAX_VISIBLE_COLUMNS - 1
    } else {
        total
    }
}

/// Re-record every card and anchor from current positions. Called once per
/// frame before drawing.
fn rebuild_registry(session: &mut WorkspaceSession) {
    use crate::canvas::{Rect, CARD_WIDTH};

    let positions: Vec<(String, Point)> = session
        .canvas
        .positions()
        .iter()
        .map(|(t, p)| (t.clone(), *p))
        .collect();
    session.canvas.registry.clear();

    for (table, pos) in positions {
        let columns = session.schema.get(&table).map(Vec::len).unwrap_or(0);
        let visible = visible_columns(columns);
        // one extra row for the "+n more" marker on truncated cards
        let rows = visible + usize::from(visible < columns);
        let height = CARD_HEADER_PX + rows.max(1) as f64 * COLUMN_ROW_PX;
        let bounds = Rect::new(pos.x, pos.y, CARD_WIDTH, height);
        let header = Rect::new(pos.x, pos.y, CARD_WIDTH, CARD_HEADER_PX);
        session.canvas.registry.record_card(&table, bounds, header);

        if let Some(schema_columns) = session.schema.get(&table) {
            for (idx, column) in schema_columns.iter().take(visible).enumerate() {
                let row_y = pos.y + CARD_HEADER_PX + idx as f64 * COLUMN_ROW_PX;
                session.canvas.registry.record_anchor(
                    AnchorId::new(table.clone(), column.name.clone()),
                    Rect::new(
                        pos.x + CARD_WIDTH - ANCHOR_ZONE_PX,
                        row_y,
                        ANCHOR_ZONE_PX,
                        COLUMN_ROW_PX,
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockProvider;
    use clarodb_db::ColumnSchema;

    async fn test_app() -> App {
        let db = WorkspaceDb::open_in_memory().await.unwrap();
        App::new("demo".to_string(), db, Arc::new(MockProvider::new()))
    }

    fn seed_schema(app: &mut App) {
        let session = app.session_mut().unwrap();
        session.schema.insert(
            "orders".to_string(),
            vec![
                ColumnSchema::new("id", "NUMBER"),
                ColumnSchema::new("user_id", "NUMBER"),
            ],
        );
        session.schema.insert(
            "users".to_string(),
            vec![ColumnSchema::new("id", "NUMBER")],
        );
        let schema = session.schema.clone();
        session.canvas.ensure_positions(&schema);
    }

    #[tokio::test]
    async fn test_tab_toggles_mode() {
        let mut app = test_app().await;
        assert_eq!(app.mode, TuiMode::Canvas);
        app.handle_key(KeyEvent::from(KeyCode::Tab)).await;
        assert_eq!(app.mode, TuiMode::Chat);
        app.handle_key(KeyEvent::from(KeyCode::Tab)).await;
        assert_eq!(app.mode, TuiMode::Canvas);
    }

    #[tokio::test]
    async fn test_modal_confirm_adds_join_and_invalidates_session() {
        let mut app = test_app().await;
        seed_schema(&mut app);
        app.session_mut()
            .unwrap()
            .conversation
            .set_chat_session(ChatSession::default());

        app.join_modal = Some(JoinTypeModal::new(PendingJoin {
            table1: "orders".to_string(),
            column1: "user_id".to_string(),
            table2: "users".to_string(),
            column2: "id".to_string(),
        }));
        app.handle_key(KeyEvent::from(KeyCode::Right)).await;
        app.handle_key(KeyEvent::from(KeyCode::Enter)).await;

        let session = app.session().unwrap();
        assert_eq!(session.joins.len(), 1);
        assert_eq!(session.joins[0].join_type, JoinType::Left);
        assert!(session.conversation.chat_session().is_none());
        assert!(app.join_modal.is_none());
    }

    #[tokio::test]
    async fn test_ask_then_tick_reaches_sql_ready() {
        let mut app = test_app().await;
        let provider: Arc<MockProvider> = Arc::new(MockProvider::new());
        provider.queue_sql("SELECT 1");
        app.provider = provider;

        app.mode = TuiMode::Chat;
        app.question_input = "how many?".to_string();
        app.ask();

        // spawned task needs the runtime to run it
        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            app.tick().await;
            let turn = &app.session().unwrap().conversation.turns()[0];
            if turn.state == TurnState::SqlReady {
                break;
            }
        }
        let turn = &app.session().unwrap().conversation.turns()[0];
        assert_eq!(turn.state, TurnState::SqlReady);
        let edit = app.sql_edit.as_ref().unwrap();
        assert_eq!(edit.buffer, "SELECT 1");
    }

    #[tokio::test]
    async fn test_stale_sql_event_does_not_recache_session_after_reset() {
        let mut app = test_app().await;
        let provider: Arc<MockProvider> = Arc::new(MockProvider::new());
        provider.queue_sql("SELECT 1");
        app.provider = provider;

        app.mode = TuiMode::Chat;
        app.question_input = "how many?".to_string();
        app.ask();

        // conversation is reset while the spawned task is still in flight
        app.session_mut().unwrap().conversation.reset();

        for _ in 0..50 {
            tokio::time::sleep(Duration::from_millis(10)).await;
            app.tick().await;
        }
        let conversation = &app.session().unwrap().conversation;
        assert!(conversation.turns().is_empty());
        assert!(conversation.chat_session().is_none());
        assert!(app.sql_edit.is_none());
    }

    #[tokio::test]
    async fn test_registry_rebuilt_on_prepare_frame() {
        let mut app = test_app().await;
        seed_schema(&mut app);
        app.prepare_frame(ratatui::layout::Rect::new(0, 0, 160, 48));

        let session = app.session().unwrap();
        assert!(session.canvas.registry.card("orders").is_some());
        assert!(session
            .canvas
            .registry
            .anchor(&AnchorId::new("orders", "user_id"))
            .is_some());
    }

    #[tokio::test]
    async fn test_truncated_card_records_anchors_only_for_rendered_rows() {
        assert_eq!(visible_columns(MAX_VISIBLE_COLUMNS), MAX_VISIBLE_COLUMNS);
        assert_eq!(visible_columns(MAX_VISIBLE_COLUMNS + 1), MAX_VISIBLE_COLUMNS - 1);

        let mut app = test_app().await;
        let total = MAX_VISIBLE_COLUMNS + 3;
        {
            let session = app.session_mut().unwrap();
            let columns: Vec<ColumnSchema> = (0..total)
                .map(|i| ColumnSchema::new(format!("c{i}"), "NUMBER"))
                .collect();
            session.schema.insert("wide".to_string(), columns);
            let schema = session.schema.clone();
            session.canvas.ensure_positions(&schema);
        }
        app.prepare_frame(ratatui::layout::Rect::new(0, 0, 200, 60));

        let session = app.session().unwrap();
        let shown = visible_columns(total);
        for i in 0..shown {
            let id = AnchorId::new("wide", format!("c{i}"));
            assert!(session.canvas.registry.anchor(&id).is_some());
        }
        // rows past the cutoff render as "+n more" and must not be hittable
        for i in shown..total {
            let id = AnchorId::new("wide", format!("c{i}"));
            assert!(session.canvas.registry.anchor(&id).is_none());
        }
        // card bounds cover the shown rows plus the marker row
        let card = session.canvas.registry.card("wide").unwrap();
        let expected = CARD_HEADER_PX + (shown + 1) as f64 * COLUMN_ROW_PX;
        assert!((card.height - expected).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_mouse_drag_proposes_join_via_modal() {
        let mut app = test_app().await;
        seed_schema(&mut app);
        // spread cards so anchors don't overlap
        {
            let session = app.session_mut().unwrap();
            let schema = session.schema.clone();
            session.canvas.run_auto_layout(&schema, &[]);
        }
        app.prepare_frame(ratatui::layout::Rect::new(0, 0, 200, 60));

        let (orders_anchor, users_anchor) = {
            let session = app.session().unwrap();
            (
                session
                    .canvas
                    .registry
                    .anchor(&AnchorId::new("orders", "user_id"))
                    .unwrap(),
                session
                    .canvas
                    .registry
                    .anchor(&AnchorId::new("users", "id"))
                    .unwrap(),
            )
        };

        // aim at the middle of each anchor zone
        let to_cell = |px: f64, per: f64, offset: u16| (px / per) as u16 + offset;
        let (cells_x, cells_y) = (app.canvas_cells.x, app.canvas_cells.y);
        let anchor_cell = |zone: &crate::canvas::Rect| {
            (
                to_cell(zone.x + zone.width / 2.0, PX_PER_CELL_X, cells_x),
                to_cell(zone.y + zone.height / 2.0, PX_PER_CELL_Y, cells_y),
            )
        };
        let (down_col, down_row) = anchor_cell(&orders_anchor);
        let down = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: down_col,
            row: down_row,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_mouse(down);
        assert!(app.session().unwrap().canvas.drawing.is_dragging());

        let (drag_col, drag_row) = anchor_cell(&users_anchor);
        let drag = MouseEvent {
            kind: MouseEventKind::Drag(MouseButton::Left),
            column: drag_col,
            row: drag_row,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_mouse(drag);
        let up = MouseEvent {
            kind: MouseEventKind::Up(MouseButton::Left),
            column: drag.column,
            row: drag.row,
            modifiers: KeyModifiers::NONE,
        };
        app.handle_mouse(up);

        let modal = app.join_modal.as_ref().expect("join modal open");
        assert_eq!(modal.pending.table1, "orders");
        assert_eq!(modal.pending.table2, "users");
    }

    #[tokio::test]
    async fn test_chart_request_without_complete_turn_toasts() {
        let mut app = test_app().await;
        app.request_chart();
        let toast = app.toast.as_ref().unwrap();
        assert!(toast.is_error);
    }
}
