//! UI rendering for the TUI

use ratatui::{
    prelude::*,
    symbols,
    widgets::{
        canvas::{Canvas, Line as CanvasLine},
        BarChart, Block, Borders, Cell, Paragraph, Row, Table, Wrap,
    },
};

use clarodb_db::JoinType;

use crate::canvas::AnchorId;
use crate::conversation::{chart_data, ConversationTurn, TurnState};
use crate::tui::app::{App, TuiMode, PX_PER_CELL_X, PX_PER_CELL_Y};
use crate::tui::components::modal::draw_dialog;

/// Draw the entire UI
pub fn draw(frame: &mut Frame, app: &App) {
    let area = frame.area();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(area);

    draw_top_bar(frame, app, chunks[0]);
    match app.mode {
        TuiMode::Canvas => draw_canvas_mode(frame, app, chunks[1]),
        TuiMode::Chat => draw_chat_mode(frame, app, chunks[1]),
    }
    draw_footer(frame, app, chunks[2]);

    if app.join_modal.is_some() {
        draw_join_modal(frame, app, area);
    }
}

fn draw_top_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mode = match app.mode {
        TuiMode::Canvas => "Canvas",
        TuiMode::Chat => "Chat",
    };
    let cost = app
        .session()
        .map(|s| s.conversation.total_cost())
        .unwrap_or(0.0);
    let line = Line::from(vec![
        Span::styled(" ClaroDB ", Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::raw(format!(" {} · workspace: {} ", mode, app.workspace)),
        Span::styled(
            format!("· {} · ${:.4} ", app.provider.name(), cost),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

// ==================== canvas mode ====================

fn draw_canvas_mode(frame: &mut Frame, app: &App, area: Rect) {
    let Some(session) = app.session() else {
        frame.render_widget(
            Paragraph::new("No workspace open").alignment(Alignment::Center),
            area,
        );
        return;
    };

    let canvas_area = Rect {
        x: area.x,
        y: area.y,
        width: app.canvas_cells.width.min(area.width),
        height: area.height,
    };
    let side_area = Rect {
        x: canvas_area.x + canvas_area.width,
        y: area.y,
        width: area.width.saturating_sub(canvas_area.width),
        height: area.height,
    };

    if session.schema.is_empty() {
        frame.render_widget(
            Paragraph::new("No tables yet. Import data with `clarodb import <file>`.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title(" Schema ")),
            canvas_area,
        );
    } else {
        draw_cards(frame, session, canvas_area);
        draw_join_lines(frame, session, canvas_area);
    }
    draw_join_list(frame, app, session, side_area);
}

fn cell_rect(canvas_area: Rect, px: crate::canvas::Rect) -> Option<Rect> {
    let x = canvas_area.x + (px.x / PX_PER_CELL_X) as u16;
    let y = canvas_area.y + (px.y / PX_PER_CELL_Y) as u16;
    let width = (px.width / PX_PER_CELL_X).round() as u16;
    let height = (px.height / PX_PER_CELL_Y).round().max(1.0) as u16;
    if x >= canvas_area.right() || y >= canvas_area.bottom() {
        return None;
    }
    let width = width.min(canvas_area.right() - x);
    let height = height.min(canvas_area.bottom() - y);
    if width < 4 || height < 2 {
        return None;
    }
    Some(Rect::new(x, y, width, height))
}

fn draw_cards(frame: &mut Frame, session: &crate::tui::app::WorkspaceSession, area: Rect) {
    let highlighted = session.canvas.highlighted_anchors(&session.joins);
    let drag_source = session.canvas.drawing.source();

    for (table, columns) in &session.schema {
        let Some(bounds) = session.canvas.registry.card(table) else {
            continue;
        };
        let Some(cells) = cell_rect(area, bounds) else {
            continue;
        };

        let block = Block::default()
            .title(format!(" {} ", table))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue));
        let inner = block.inner(cells);
        frame.render_widget(block, cells);

        let mut lines = Vec::new();
        // same count the geometry registry recorded anchors for, clipped to
        // whatever actually fits on screen
        let shown = crate::tui::app::visible_columns(columns.len()).min(inner.height as usize);
        for column in columns.iter().take(shown) {
            let anchor = AnchorId::new(table.clone(), column.name.clone());
            let is_highlighted = highlighted
                .as_ref()
                .is_some_and(|(a, b)| *a == anchor || *b == anchor)
                || drag_source == Some(&anchor);
            let style = if is_highlighted {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            let name_width = inner.width.saturating_sub(9) as usize;
            lines.push(Line::from(vec![
                Span::styled(format!("{:<name_width$.name_width$}", column.name), style),
                Span::styled(
                    format!("{:>7.7}", column.column_type),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled("●", style),
            ]));
        }
        if shown < columns.len() {
            lines.push(Line::styled(
                format!("+{} more", columns.len() - shown),
                Style::default().fg(Color::DarkGray),
            ));
        }
        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn draw_join_lines(frame: &mut Frame, session: &crate::tui::app::WorkspaceSession, area: Rect) {
    let lines = session.canvas.join_lines(&session.joins);
    let drawing_line = session.canvas.drawing.line(&session.canvas.registry);
    if lines.is_empty() && drawing_line.is_none() {
        return;
    }

    let width_px = f64::from(area.width) * PX_PER_CELL_X;
    let height_px = f64::from(area.height) * PX_PER_CELL_Y;
    let widget = Canvas::default()
        .marker(symbols::Marker::Braille)
        .x_bounds([0.0, width_px])
        .y_bounds([0.0, height_px])
        .paint(move |ctx| {
            // canvas widget y axis points up
            let flip = |y: f64| height_px - y;
            for line in &lines {
                let color = if line.highlighted {
                    Color::Yellow
                } else {
                    Color::Cyan
                };
                ctx.draw(&CanvasLine {
                    x1: line.start.x,
                    y1: flip(line.start.y),
                    x2: line.end.x,
                    y2: flip(line.end.y),
                    color,
                });
            }
            if let Some((start, end)) = drawing_line {
                ctx.draw(&CanvasLine {
                    x1: start.x,
                    y1: flip(start.y),
                    x2: end.x,
                    y2: flip(end.y),
                    color: Color::Magenta,
                });
            }
        });
    frame.render_widget(widget, area);
}

fn draw_join_list(
    frame: &mut Frame,
    app: &App,
    session: &crate::tui::app::WorkspaceSession,
    area: Rect,
) {
    let block = Block::default().title(" Joins ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if session.joins.is_empty() {
        frame.render_widget(
            Paragraph::new("Drag a column handle (●) onto another table's column to model a join.")
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    let mut lines = Vec::new();
    for (idx, join) in session.joins.iter().enumerate() {
        let hovered = session.canvas.hovered_join.as_deref() == Some(join.id.as_str());
        let style = if hovered {
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
        } else {
            Style::default()
        };
        let marker = if idx == app.join_cursor { ">" } else { " " };
        lines.push(Line::styled(
            format!(
                "{} {}.{} {} {}.{}",
                marker,
                join.table1,
                join.column1,
                join.join_type.sql_keyword(),
                join.table2,
                join.column2
            ),
            style,
        ));
    }
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

// ==================== chat mode ====================

fn draw_chat_mode(frame: &mut Frame, app: &App, area: Rect) {
    let Some(session) = app.session() else {
        return;
    };
    let panel_cells = ((session.canvas.panel.width() / PX_PER_CELL_X) as u16)
        .min(area.width.saturating_sub(20));
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(panel_cells)])
        .split(area);

    draw_conversation(frame, app, session, chunks[0]);
    draw_results_panel(frame, session, chunks[1]);
}

fn turn_lines(turn: &ConversationTurn, sql_edit: Option<&crate::tui::app::SqlEdit>) -> Vec<Line<'static>> {
    let mut lines = vec![Line::styled(
        format!("❯ {}", turn.question),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    match turn.state {
        TurnState::SqlGenerating => {
            lines.push(Line::styled(
                "  generating SQL...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        TurnState::SqlReady => {
            let (sql, editing) = match sql_edit.filter(|e| e.turn_id == turn.id) {
                Some(edit) => (edit.buffer.clone(), edit.editing),
                None => (
                    turn.sql_result.as_ref().map(|r| r.sql.clone()).unwrap_or_default(),
                    false,
                ),
            };
            let style = if editing {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::Green)
            };
            for sql_line in sql.lines() {
                lines.push(Line::styled(format!("  {}", sql_line), style));
            }
            lines.push(Line::styled(
                if editing {
                    "  [editing] Enter: run · Esc: done"
                } else {
                    "  Ctrl+R: run · Ctrl+E: edit"
                },
                Style::default().fg(Color::DarkGray),
            ));
        }
        TurnState::Executing => {
            lines.push(Line::styled(
                "  running query...",
                Style::default().fg(Color::DarkGray),
            ));
        }
        TurnState::Complete => {
            if let Some(analysis) = &turn.analysis {
                for sql_line in analysis.sql.lines() {
                    lines.push(Line::styled(
                        format!("  {}", sql_line),
                        Style::default().fg(Color::Green),
                    ));
                }
                lines.push(Line::raw(format!(
                    "  {} row(s)",
                    analysis.data.rows.len()
                )));
            }
            if turn.insights_loading {
                lines.push(Line::styled(
                    "  generating insights...",
                    Style::default().fg(Color::DarkGray),
                ));
            } else if let Some(insights) = &turn.insights {
                for text_line in insights.insights.lines() {
                    lines.push(Line::styled(
                        format!("  {}", text_line),
                        Style::default().fg(Color::Cyan),
                    ));
                }
            }
            if let Some(err) = &turn.chart_error {
                lines.push(Line::styled(
                    format!("  {}", err),
                    Style::default().fg(Color::Red),
                ));
            }
        }
        TurnState::Error => {
            lines.push(Line::styled(
                format!("  {}", turn.error.as_deref().unwrap_or("failed")),
                Style::default().fg(Color::Red),
            ));
        }
    }
    if let Some(usage) = turn.sql_result.as_ref().map(|r| &r.usage) {
        lines.push(Line::styled(
            format!(
                "  {} · ${:.4} · {}+{} tokens",
                usage.model, usage.cost, usage.prompt_tokens, usage.completion_tokens
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }
    lines.push(Line::raw(""));
    lines
}

fn draw_conversation(
    frame: &mut Frame,
    app: &App,
    session: &crate::tui::app::WorkspaceSession,
    area: Rect,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(area);

    let mut lines = Vec::new();
    for turn in session.conversation.turns() {
        lines.extend(turn_lines(turn, app.sql_edit.as_ref()));
    }
    if lines.is_empty() {
        lines.push(Line::styled(
            "Ask a question about your data to get started.",
            Style::default().fg(Color::DarkGray),
        ));
    }
    // keep the tail visible
    let visible = chunks[0].height.saturating_sub(2) as usize;
    let scroll = lines.len().saturating_sub(visible) as u16;
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((scroll, 0))
            .block(Block::default().borders(Borders::ALL).title(" Conversation ")),
        chunks[0],
    );

    frame.render_widget(
        Paragraph::new(format!("{}▏", app.question_input))
            .block(Block::default().borders(Borders::ALL).title(" Question ")),
        chunks[1],
    );
}

fn draw_results_panel(frame: &mut Frame, session: &crate::tui::app::WorkspaceSession, area: Rect) {
    let block = Block::default().title(" Results ").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let latest = session
        .conversation
        .turns()
        .iter()
        .rev()
        .find(|t| t.state == TurnState::Complete);
    let Some(turn) = latest else {
        frame.render_widget(
            Paragraph::new("Results will appear here after a query runs.")
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    };
    let Some(analysis) = &turn.analysis else {
        return;
    };

    // chart takes the lower half when present
    let (table_area, chart_area) = match &turn.chart {
        Some(_) if inner.height > 10 => {
            let halves = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(inner);
            (halves[0], Some(halves[1]))
        }
        _ => (inner, None),
    };

    let header = Row::new(
        analysis
            .data
            .columns
            .iter()
            .map(|c| Cell::from(c.clone()).style(Style::default().add_modifier(Modifier::BOLD))),
    );
    let col_count = analysis.data.columns.len().max(1);
    let widths = vec![Constraint::Ratio(1, col_count as u32); col_count];
    let rows = analysis
        .data
        .rows
        .iter()
        .take(table_area.height.saturating_sub(2) as usize)
        .map(|row| Row::new(row.iter().map(|v| Cell::from(v.display()))));
    frame.render_widget(Table::new(rows, widths).header(header), table_area);

    if let (Some(chart_area), Some(spec)) = (chart_area, &turn.chart) {
        let bars = chart_data(spec, &analysis.data);
        let data: Vec<(&str, u64)> = bars
            .iter()
            .map(|(label, value)| (label.as_str(), value.max(0.0).round() as u64))
            .collect();
        frame.render_widget(
            BarChart::default()
                .block(Block::default().borders(Borders::TOP).title(format!(" {} ", spec.title)))
                .bar_width(8)
                .bar_gap(1)
                .data(&data),
            chart_area,
        );
    }
}

// ==================== chrome ====================

fn draw_footer(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(toast) = &app.toast {
        let style = if toast.is_error {
            Style::default().fg(Color::White).bg(Color::Red)
        } else {
            Style::default().fg(Color::Black).bg(Color::Green)
        };
        frame.render_widget(
            Paragraph::new(format!(" {} ", toast.message)).style(style),
            area,
        );
        return;
    }
    let hints = match app.mode {
        TuiMode::Canvas => {
            " Tab chat · a auto-layout · j/k joins · d delete join · r refresh · Ctrl+W workspace · q quit"
        }
        TuiMode::Chat => {
            " Tab canvas · Enter ask · Ctrl+R run · Ctrl+E edit SQL · Ctrl+G insights · Ctrl+B chart · Ctrl+X reset"
        }
    };
    frame.render_widget(
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn draw_join_modal(frame: &mut Frame, app: &App, area: Rect) {
    let Some(modal) = &app.join_modal else {
        return;
    };
    let body = draw_dialog(
        frame,
        area,
        " Join type ",
        48,
        9,
        "←/→ select · Enter confirm · Esc cancel",
        Style::default().fg(Color::Cyan),
    );

    let mut lines = vec![
        Line::raw(format!(
            "{}.{}  ↔  {}.{}",
            modal.pending.table1, modal.pending.column1, modal.pending.table2, modal.pending.column2
        )),
        Line::raw(""),
    ];
    let options = JoinType::ALL
        .iter()
        .enumerate()
        .map(|(idx, jt)| {
            if idx == modal.selected {
                Span::styled(
                    format!(" [{}] ", jt.as_str()),
                    Style::default().fg(Color::Black).bg(Color::Cyan),
                )
            } else {
                Span::raw(format!("  {}  ", jt.as_str()))
            }
        })
        .collect::<Vec<_>>();
    lines.push(Line::from(options));
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), body);
}
