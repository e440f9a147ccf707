//! Drag-to-connect join drawing.
//!
//! A drag starts on a column handle, tracks the pointer and a hovered
//! candidate target, and on release proposes a join when the target belongs
//! to a different table. The proposal still goes through a join-type
//! confirmation before anything is added to the data model.

use clarodb_db::TableSchema;

use crate::canvas::geometry::{AnchorId, GeometryRegistry, Point};

/// A proposed join awaiting join-type confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingJoin {
    pub table1: String,
    pub column1: String,
    pub table2: String,
    pub column2: String,
}

#[derive(Debug, Default)]
pub enum JoinDrawing {
    #[default]
    Idle,
    Dragging {
        source: AnchorId,
        pointer: Point,
        candidate: Option<AnchorId>,
    },
}

impl JoinDrawing {
    pub fn is_dragging(&self) -> bool {
        matches!(self, JoinDrawing::Dragging { .. })
    }

    pub fn source(&self) -> Option<&AnchorId> {
        match self {
            JoinDrawing::Idle => None,
            JoinDrawing::Dragging { source, .. } => Some(source),
        }
    }

    pub fn begin(&mut self, source: AnchorId, pointer: Point) {
        *self = JoinDrawing::Dragging {
            source,
            pointer,
            candidate: None,
        };
    }

    pub fn move_to(&mut self, p: Point) {
        if let JoinDrawing::Dragging { pointer, .. } = self {
            *pointer = p;
        }
    }

    /// Track the hovered handle as the candidate target. Handles on the
    /// source's own table never become candidates.
    pub fn hover(&mut self, target: Option<AnchorId>) {
        if let JoinDrawing::Dragging {
            source, candidate, ..
        } = self
        {
            *candidate = target.filter(|t| t.table != source.table);
        }
    }

    /// End the drag. Emits a proposal only when a valid cross-table
    /// candidate was hovered at release time.
    pub fn release(&mut self) -> Option<PendingJoin> {
        let state = std::mem::take(self);
        match state {
            JoinDrawing::Dragging {
                source,
                candidate: Some(target),
                ..
            } if target.table != source.table => Some(PendingJoin {
                table1: source.table,
                column1: source.column,
                table2: target.table,
                column2: target.column,
            }),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        *self = JoinDrawing::Idle;
    }

    /// The transient drawing line for this frame, from the source handle to
    /// the pointer. None while idle, and None for any frame where the
    /// source handle is not in the registry.
    pub fn line(&self, registry: &GeometryRegistry) -> Option<(Point, Point)> {
        match self {
            JoinDrawing::Idle => None,
            JoinDrawing::Dragging {
                source, pointer, ..
            } => {
                let start = registry.anchor_point(source)?;
                Some((start, *pointer))
            }
        }
    }
}

/// Every column of every table other than `source_table`. Highlight-only;
/// the cross-table rule is re-checked at release.
pub fn compatible_targets(schema: &TableSchema, source_table: &str) -> Vec<AnchorId> {
    schema
        .iter()
        .filter(|(table, _)| table.as_str() != source_table)
        .flat_map(|(table, columns)| {
            columns
                .iter()
                .map(|c| AnchorId::new(table.clone(), c.name.clone()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::geometry::Rect;
    use clarodb_db::ColumnSchema;

    fn anchor(table: &str, column: &str) -> AnchorId {
        AnchorId::new(table, column)
    }

    fn drag_from(table: &str, column: &str) -> JoinDrawing {
        let mut drawing = JoinDrawing::default();
        drawing.begin(anchor(table, column), Point::new(0.0, 0.0));
        drawing
    }

    #[test]
    fn test_release_with_cross_table_candidate_proposes_join() {
        let mut drawing = drag_from("orders", "user_id");
        drawing.hover(Some(anchor("users", "id")));
        let pending = drawing.release().unwrap();
        assert_eq!(pending.table1, "orders");
        assert_eq!(pending.column1, "user_id");
        assert_eq!(pending.table2, "users");
        assert_eq!(pending.column2, "id");
        assert!(!drawing.is_dragging());
    }

    #[test]
    fn test_same_table_hover_never_becomes_candidate() {
        let mut drawing = drag_from("orders", "user_id");
        drawing.hover(Some(anchor("orders", "id")));
        assert!(drawing.release().is_none());
    }

    #[test]
    fn test_release_without_candidate_discards_silently() {
        let mut drawing = drag_from("orders", "user_id");
        drawing.hover(Some(anchor("users", "id")));
        drawing.hover(None);
        assert!(drawing.release().is_none());
    }

    #[test]
    fn test_line_tracks_pointer() {
        let mut registry = GeometryRegistry::new();
        registry.record_anchor(anchor("orders", "user_id"), Rect::new(0.0, 10.0, 280.0, 20.0));

        let mut drawing = drag_from("orders", "user_id");
        drawing.move_to(Point::new(400.0, 300.0));
        let (start, end) = drawing.line(&registry).unwrap();
        assert_eq!(start, Point::new(280.0, 20.0));
        assert_eq!(end, Point::new(400.0, 300.0));
    }

    #[test]
    fn test_line_is_noop_when_source_handle_missing() {
        let registry = GeometryRegistry::new();
        let drawing = drag_from("orders", "user_id");
        assert!(drawing.line(&registry).is_none());
    }

    #[test]
    fn test_compatible_targets_exclude_source_table() {
        let mut schema = TableSchema::new();
        let col = |name: &str| ColumnSchema::new(name, "TEXT");
        schema.insert("orders".to_string(), vec![col("id"), col("user_id")]);
        schema.insert("users".to_string(), vec![col("id"), col("name")]);

        let targets = compatible_targets(&schema, "orders");
        assert_eq!(
            targets,
            vec![anchor("users", "id"), anchor("users", "name")]
        );
    }
}
