//! Auto-layout for schema cards.
//!
//! Joined tables cluster together: connected components of the join graph
//! are packed left to right as roughly-square sub-grids, wrapping to a new
//! row when a component would run past the canvas width.

use std::collections::{BTreeMap, HashSet, VecDeque};

use clarodb_db::{Join, TableSchema};

use crate::canvas::geometry::Point;

pub const CARD_WIDTH: f64 = 288.0;
pub const CARD_HEIGHT: f64 = 280.0;
pub const CARD_PADDING: f64 = 60.0;

/// Connected components of the join graph, seeded in schema-key order and
/// sorted by descending size (stable, so equal-size components keep their
/// seed order).
pub fn connected_components(schema: &TableSchema, joins: &[Join]) -> Vec<Vec<String>> {
    let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for table in schema.keys() {
        adjacency.entry(table).or_default();
    }
    for join in joins {
        // stale joins may outlive a re-imported table
        if !schema.contains_key(&join.table1) || !schema.contains_key(&join.table2) {
            continue;
        }
        adjacency
            .entry(&join.table1)
            .or_default()
            .push(&join.table2);
        adjacency
            .entry(&join.table2)
            .or_default()
            .push(&join.table1);
    }

    let mut components = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    for seed in schema.keys() {
        if visited.contains(seed.as_str()) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue = VecDeque::from([seed.as_str()]);
        visited.insert(seed);
        while let Some(table) = queue.pop_front() {
            component.push(table.to_string());
            if let Some(neighbors) = adjacency.get(table) {
                for &next in neighbors {
                    if visited.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        components.push(component);
    }

    components.sort_by_key(|c| std::cmp::Reverse(c.len()));
    components
}

fn grid_shape(size: usize) -> (usize, usize) {
    let cols = (size as f64).sqrt().ceil() as usize;
    let rows = size.div_ceil(cols.max(1));
    (cols.max(1), rows)
}

/// Assign a position to every table in the schema.
///
/// Joins referencing tables outside the schema are ignored; the empty schema
/// yields an empty map.
pub fn auto_layout(schema: &TableSchema, joins: &[Join], canvas_width: f64) -> BTreeMap<String, Point> {
    let mut positions = BTreeMap::new();
    let mut cursor_x = CARD_PADDING;
    let mut cursor_y = CARD_PADDING;
    let mut row_height = 0.0_f64;

    for component in connected_components(schema, joins) {
        let (cols, rows) = grid_shape(component.len());
        let footprint_w = cols as f64 * (CARD_WIDTH + CARD_PADDING);
        let footprint_h = rows as f64 * (CARD_HEIGHT + CARD_PADDING);

        if cursor_x > CARD_PADDING && cursor_x + footprint_w > canvas_width {
            cursor_x = CARD_PADDING;
            cursor_y += row_height;
            row_height = 0.0;
        }

        for (idx, table) in component.into_iter().enumerate() {
            let col = idx % cols;
            let row = idx / cols;
            positions.insert(
                table,
                Point::new(
                    cursor_x + col as f64 * (CARD_WIDTH + CARD_PADDING),
                    cursor_y + row as f64 * (CARD_HEIGHT + CARD_PADDING),
                ),
            );
        }

        cursor_x += footprint_w;
        row_height = row_height.max(footprint_h);
    }

    positions
}
