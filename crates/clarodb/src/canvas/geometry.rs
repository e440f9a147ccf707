//! Canvas-space geometry primitives and the per-frame geometry registry.
//!
//! The canvas lives in an abstract pixel space independent of terminal
//! cells. The renderer records where it actually drew each card and each
//! column handle into a `GeometryRegistry`, and every interaction (hit
//! testing, join lines, the drawing line) resolves positions through the
//! registry instead of recomputing them from the data model.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x < self.x + self.width && p.y >= self.y && p.y < self.y + self.height
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.x < other.x + other.width
            && other.x < self.x + self.width
            && self.y < other.y + other.height
            && other.y < self.y + self.height
    }

    /// Midpoint of the right edge, where join lines attach.
    pub fn right_center(&self) -> Point {
        Point::new(self.x + self.width, self.y + self.height / 2.0)
    }

    pub fn left_center(&self) -> Point {
        Point::new(self.x, self.y + self.height / 2.0)
    }
}

/// Identifies one column handle on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnchorId {
    pub table: String,
    pub column: String,
}

impl AnchorId {
    pub fn new(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for AnchorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Where everything was drawn on the last pass.
///
/// Cleared and rebuilt by the renderer on every draw; lookups between draws
/// see the most recent frame. Cards keep draw order so hit tests can prefer
/// the one drawn last (on top).
#[derive(Debug, Default)]
pub struct GeometryRegistry {
    cards: Vec<(String, Rect)>,
    headers: BTreeMap<String, Rect>,
    anchors: BTreeMap<AnchorId, Rect>,
}

impl GeometryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
        self.headers.clear();
        self.anchors.clear();
    }

    pub fn record_card(&mut self, table: &str, bounds: Rect, header: Rect) {
        self.cards.push((table.to_string(), bounds));
        self.headers.insert(table.to_string(), header);
    }

    pub fn record_anchor(&mut self, anchor: AnchorId, bounds: Rect) {
        self.anchors.insert(anchor, bounds);
    }

    pub fn card(&self, table: &str) -> Option<Rect> {
        self.cards
            .iter()
            .find(|(name, _)| name == table)
            .map(|(_, r)| *r)
    }

    pub fn anchor(&self, anchor: &AnchorId) -> Option<Rect> {
        self.anchors.get(anchor).copied()
    }

    /// Attachment point for a join line at this anchor.
    pub fn anchor_point(&self, anchor: &AnchorId) -> Option<Point> {
        self.anchor(anchor).map(|r| r.right_center())
    }

    /// Topmost card under the pointer.
    pub fn card_at(&self, p: Point) -> Option<&str> {
        self.cards
            .iter()
            .rev()
            .find(|(_, r)| r.contains(p))
            .map(|(name, _)| name.as_str())
    }

    /// Card whose header strip is under the pointer. Header hits start card
    /// drags; anchor hits take precedence and are checked first by callers.
    pub fn header_at(&self, p: Point) -> Option<&str> {
        self.card_at(p)
            .filter(|table| self.headers.get(*table).is_some_and(|h| h.contains(p)))
    }

    /// Anchor handle under the pointer.
    pub fn anchor_at(&self, p: Point) -> Option<&AnchorId> {
        self.anchors
            .iter()
            .find(|(_, r)| r.contains(p))
            .map(|(id, _)| id)
    }
}
