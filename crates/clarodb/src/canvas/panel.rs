//! Resizable results-panel controller.
//!
//! A single divider drag adjusts the panel width, computed as
//! `window_width - pointer_x` and clamped to `[MIN, MAX]`. Moves outside an
//! active drag are ignored, and non-finite arithmetic retains the prior
//! width.

pub const MIN_PANEL_WIDTH: f64 = 400.0;
pub const MAX_PANEL_WIDTH: f64 = 1200.0;
pub const DEFAULT_PANEL_WIDTH: f64 = 600.0;

#[derive(Debug)]
pub struct PanelController {
    width: f64,
    dragging: bool,
}

impl Default for PanelController {
    fn default() -> Self {
        Self {
            width: DEFAULT_PANEL_WIDTH,
            dragging: false,
        }
    }
}

impl PanelController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn is_dragging(&self) -> bool {
        self.dragging
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    pub fn end_drag(&mut self) {
        self.dragging = false;
    }

    /// Apply a pointer move during a drag.
    pub fn pointer_moved(&mut self, window_width: f64, pointer_x: f64) {
        if !self.dragging {
            return;
        }
        let candidate = window_width - pointer_x;
        if !candidate.is_finite() {
            return;
        }
        self.width = candidate.clamp(MIN_PANEL_WIDTH, MAX_PANEL_WIDTH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width_follows_pointer_during_drag() {
        let mut panel = PanelController::new();
        panel.begin_drag();
        panel.pointer_moved(1600.0, 1000.0);
        assert_eq!(panel.width(), 600.0);
    }

    #[test]
    fn test_width_is_clamped() {
        let mut panel = PanelController::new();
        panel.begin_drag();
        panel.pointer_moved(1600.0, 1550.0);
        assert_eq!(panel.width(), MIN_PANEL_WIDTH);
        panel.pointer_moved(1600.0, 0.0);
        assert_eq!(panel.width(), MAX_PANEL_WIDTH);
    }

    #[test]
    fn test_moves_ignored_when_not_dragging() {
        let mut panel = PanelController::new();
        panel.pointer_moved(1600.0, 1000.0);
        assert_eq!(panel.width(), DEFAULT_PANEL_WIDTH);

        panel.begin_drag();
        panel.pointer_moved(1600.0, 1000.0);
        panel.end_drag();
        panel.pointer_moved(1600.0, 1500.0);
        assert_eq!(panel.width(), 600.0);
    }

    #[test]
    fn test_non_finite_pointer_retains_prior_width() {
        let mut panel = PanelController::new();
        panel.begin_drag();
        panel.pointer_moved(1600.0, 1000.0);
        panel.pointer_moved(f64::NAN, 100.0);
        panel.pointer_moved(f64::INFINITY, 100.0);
        assert_eq!(panel.width(), 600.0);
    }
}
