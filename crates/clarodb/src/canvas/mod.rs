//! Schema/join canvas.
//!
//! `CanvasState` composes the pieces: per-table card positions, the
//! drag-to-connect join drawing, the resizable results panel, and the
//! geometry registry the renderer rebuilds each frame.

pub mod drawing;
pub mod geometry;
pub mod layout;
pub mod panel;

use std::collections::BTreeMap;

use clarodb_db::{Join, TableSchema};

pub use drawing::{compatible_targets, JoinDrawing, PendingJoin};
pub use geometry::{AnchorId, GeometryRegistry, Point, Rect};
pub use layout::{auto_layout, connected_components, CARD_HEIGHT, CARD_PADDING, CARD_WIDTH};
pub use panel::{PanelController, DEFAULT_PANEL_WIDTH, MAX_PANEL_WIDTH, MIN_PANEL_WIDTH};

pub const DEFAULT_CANVAS_WIDTH: f64 = 1600.0;

#[derive(Debug)]
struct CardDrag {
    table: String,
    /// Pointer offset from the card origin at grab time.
    grab: Point,
}

/// A join line resolved to canvas coordinates for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinLine {
    pub join_id: String,
    pub start: Point,
    pub end: Point,
    pub highlighted: bool,
}

#[derive(Debug, Default)]
pub struct CanvasState {
    positions: BTreeMap<String, Point>,
    pub registry: GeometryRegistry,
    pub drawing: JoinDrawing,
    pub panel: PanelController,
    card_drag: Option<CardDrag>,
    /// Join id hovered in the join list; highlights both anchors and the line.
    pub hovered_join: Option<String>,
    canvas_width: f64,
}

impl CanvasState {
    pub fn new() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            ..Self::default()
        }
    }

    pub fn canvas_width(&self) -> f64 {
        self.canvas_width
    }

    pub fn set_canvas_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.canvas_width = width;
        }
    }

    pub fn positions(&self) -> &BTreeMap<String, Point> {
        &self.positions
    }

    pub fn position(&self, table: &str) -> Option<Point> {
        self.positions.get(table).copied()
    }

    /// Give every schema table a position and drop positions for tables that
    /// no longer exist. New tables get staggered default slots; existing
    /// positions are left alone.
    pub fn ensure_positions(&mut self, schema: &TableSchema) {
        self.positions.retain(|table, _| schema.contains_key(table));
        for table in schema.keys() {
            if !self.positions.contains_key(table) {
                let n = self.positions.len();
                let col = n % 3;
                let row = n / 3;
                self.positions.insert(
                    table.clone(),
                    Point::new(
                        CARD_PADDING + col as f64 * (CARD_WIDTH + CARD_PADDING),
                        CARD_PADDING + row as f64 * (CARD_HEIGHT + CARD_PADDING),
                    ),
                );
            }
        }
    }

    /// Replace all positions with the clustered auto-layout.
    pub fn run_auto_layout(&mut self, schema: &TableSchema, joins: &[Join]) {
        self.positions = auto_layout(schema, joins, self.canvas_width);
    }

    // ==================== card dragging ====================

    pub fn begin_card_drag(&mut self, table: &str, pointer: Point) {
        let Some(card) = self.registry.card(table) else {
            return;
        };
        self.card_drag = Some(CardDrag {
            table: table.to_string(),
            grab: Point::new(pointer.x - card.x, pointer.y - card.y),
        });
    }

    pub fn is_dragging_card(&self) -> bool {
        self.card_drag.is_some()
    }

    pub fn drag_card_to(&mut self, pointer: Point) {
        if let Some(drag) = &self.card_drag {
            self.positions.insert(
                drag.table.clone(),
                Point::new(pointer.x - drag.grab.x, pointer.y - drag.grab.y),
            );
        }
    }

    pub fn end_card_drag(&mut self) {
        self.card_drag = None;
    }

    // ==================== join lines ====================

    /// Resolve the join list against the registry. Joins whose anchors were
    /// not drawn this frame are skipped.
    pub fn join_lines(&self, joins: &[Join]) -> Vec<JoinLine> {
        joins
            .iter()
            .filter_map(|join| {
                let start = self
                    .registry
                    .anchor_point(&AnchorId::new(join.table1.clone(), join.column1.clone()))?;
                let end = self
                    .registry
                    .anchor_point(&AnchorId::new(join.table2.clone(), join.column2.clone()))?;
                Some(JoinLine {
                    join_id: join.id.clone(),
                    start,
                    end,
                    highlighted: self.hovered_join.as_deref() == Some(join.id.as_str()),
                })
            })
            .collect()
    }

    /// The two anchors to highlight for the hovered join-list entry.
    pub fn highlighted_anchors(&self, joins: &[Join]) -> Option<(AnchorId, AnchorId)> {
        let id = self.hovered_join.as_deref()?;
        let join = joins.iter().find(|j| j.id == id)?;
        Some((
            AnchorId::new(join.table1.clone(), join.column1.clone()),
            AnchorId::new(join.table2.clone(), join.column2.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clarodb_db::{ColumnSchema, JoinType};

    fn schema_of(tables: &[&str]) -> TableSchema {
        tables
            .iter()
            .map(|t| (t.to_string(), vec![ColumnSchema::new("id", "NUMBER")]))
            .collect()
    }

    fn join(id: &str, t1: &str, t2: &str) -> Join {
        Join {
            id: id.to_string(),
            table1: t1.to_string(),
            column1: "id".to_string(),
            table2: t2.to_string(),
            column2: "id".to_string(),
            join_type: JoinType::Inner,
        }
    }

    #[test]
    fn test_ensure_positions_adds_and_removes() {
        let mut canvas = CanvasState::new();
        canvas.ensure_positions(&schema_of(&["a", "b"]));
        assert_eq!(canvas.positions().len(), 2);
        let a_before = canvas.position("a").unwrap();

        canvas.ensure_positions(&schema_of(&["a", "c"]));
        assert_eq!(canvas.positions().len(), 2);
        assert!(canvas.position("b").is_none());
        assert_eq!(canvas.position("a").unwrap(), a_before);
    }

    #[test]
    fn test_card_drag_moves_by_grab_offset() {
        let mut canvas = CanvasState::new();
        canvas.ensure_positions(&schema_of(&["a"]));
        canvas.registry.record_card(
            "a",
            Rect::new(100.0, 100.0, CARD_WIDTH, CARD_HEIGHT),
            Rect::new(100.0, 100.0, CARD_WIDTH, 24.0),
        );

        canvas.begin_card_drag("a", Point::new(110.0, 105.0));
        canvas.drag_card_to(Point::new(210.0, 305.0));
        canvas.end_card_drag();

        assert_eq!(canvas.position("a").unwrap(), Point::new(200.0, 300.0));
        assert!(!canvas.is_dragging_card());
    }

    #[test]
    fn test_card_drag_without_registry_entry_is_noop() {
        let mut canvas = CanvasState::new();
        canvas.begin_card_drag("ghost", Point::new(0.0, 0.0));
        assert!(!canvas.is_dragging_card());
    }

    #[test]
    fn test_join_lines_skip_missing_anchors() {
        let mut canvas = CanvasState::new();
        canvas
            .registry
            .record_anchor(AnchorId::new("a", "id"), Rect::new(0.0, 0.0, 280.0, 20.0));
        canvas
            .registry
            .record_anchor(AnchorId::new("b", "id"), Rect::new(500.0, 0.0, 280.0, 20.0));

        let joins = vec![join("j1", "a", "b"), join("j2", "a", "ghost")];
        let lines = canvas.join_lines(&joins);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].join_id, "j1");
    }

    #[test]
    fn test_hovered_join_highlights_line_and_anchors() {
        let mut canvas = CanvasState::new();
        canvas
            .registry
            .record_anchor(AnchorId::new("a", "id"), Rect::new(0.0, 0.0, 280.0, 20.0));
        canvas
            .registry
            .record_anchor(AnchorId::new("b", "id"), Rect::new(500.0, 0.0, 280.0, 20.0));
        canvas.hovered_join = Some("j1".to_string());

        let joins = vec![join("j1", "a", "b")];
        assert!(canvas.join_lines(&joins)[0].highlighted);
        let (a1, a2) = canvas.highlighted_anchors(&joins).unwrap();
        assert_eq!(a1, AnchorId::new("a", "id"));
        assert_eq!(a2, AnchorId::new("b", "id"));
    }

    #[test]
    fn test_auto_layout_replaces_positions() {
        let mut canvas = CanvasState::new();
        let schema = schema_of(&["a", "b", "c"]);
        canvas.ensure_positions(&schema);
        canvas.run_auto_layout(&schema, &[join("j1", "a", "c")]);
        assert_eq!(canvas.positions().len(), 3);
    }
}
