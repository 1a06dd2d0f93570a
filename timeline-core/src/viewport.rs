//! Per-page view state: scroll position, zoom, search query and drag anchor.

use serde::{Deserialize, Serialize};

use crate::coords::CoordinateMapper;
use crate::model::ReleaseDate;
use crate::TimelineConfig;

/// Drag and touch move the canvas twice as far as the pointer.
const DRAG_SPEED: f64 = 2.0;

/// Fixed ordered set of zoom factors, stepped forward with wrap-around.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoomCycle {
    levels: Vec<f64>,
    current: usize,
}

impl ZoomCycle {
    /// Starts at `initial`, or the first level when `initial` is not in the set.
    pub fn new(levels: Vec<f64>, initial: f64) -> Self {
        let current = levels
            .iter()
            .position(|level| *level == initial)
            .unwrap_or(0);
        Self { levels, current }
    }

    pub fn from_config(config: &TimelineConfig) -> Self {
        Self::new(config.zoom_levels.clone(), config.initial_zoom)
    }

    pub fn current(&self) -> f64 {
        self.levels.get(self.current).copied().unwrap_or(1.0)
    }

    pub fn levels(&self) -> &[f64] {
        &self.levels
    }

    /// Moves to the next level and returns it.
    pub fn advance(&mut self) -> f64 {
        if !self.levels.is_empty() {
            self.current = (self.current + 1) % self.levels.len();
        }
        self.current()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
struct DragAnchor {
    pointer_x: f64,
    scroll_left: f64,
}

/// View-model owned by one timeline page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Viewport {
    scroll_left: f64,
    viewport_width: f64,
    content_width: f64,
    zoom: ZoomCycle,
    query: String,
    drag: Option<DragAnchor>,
}

impl Viewport {
    pub fn new(config: &TimelineConfig) -> Self {
        Self {
            scroll_left: 0.0,
            viewport_width: 0.0,
            content_width: 0.0,
            zoom: ZoomCycle::from_config(config),
            query: String::new(),
            drag: None,
        }
    }

    pub fn scroll_left(&self) -> f64 {
        self.scroll_left
    }

    pub fn zoom(&self) -> f64 {
        self.zoom.current()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Records the sizes of the container and the canvas, then re-clamps.
    pub fn resize(&mut self, viewport_width: f64, content_width: f64) {
        self.viewport_width = viewport_width.max(0.0);
        self.content_width = content_width.max(0.0);
        self.scroll_to(self.scroll_left);
    }

    fn max_scroll(&self) -> f64 {
        (self.content_width - self.viewport_width).max(0.0)
    }

    pub fn scroll_to(&mut self, scroll_left: f64) {
        self.scroll_left = scroll_left.clamp(0.0, self.max_scroll());
    }

    /// Mouse wheel: vertical movement scrolls sideways.
    pub fn wheel(&mut self, delta_y: f64) -> bool {
        if delta_y == 0.0 {
            return false;
        }
        self.scroll_to(self.scroll_left + delta_y);
        true
    }

    /// Mouse down or touch start. Presses that land on a marker should not call this.
    pub fn begin_drag(&mut self, pointer_x: f64) {
        self.drag = Some(DragAnchor {
            pointer_x,
            scroll_left: self.scroll_left,
        });
    }

    pub fn drag_to(&mut self, pointer_x: f64) {
        if let Some(anchor) = self.drag {
            let walk = (pointer_x - anchor.pointer_x) * DRAG_SPEED;
            self.scroll_to(anchor.scroll_left - walk);
        }
    }

    /// Mouse up or the pointer leaving the container.
    pub fn end_drag(&mut self) {
        self.drag = None;
    }

    /// Puts canvas `x` in the middle of the container.
    pub fn center_on(&mut self, x: f64) {
        self.scroll_to(x - self.viewport_width / 2.0);
    }

    /// Recentres on `today`, given the canvas origin at the current zoom.
    pub fn jump_to(&mut self, today: ReleaseDate, origin: f64, mapper: &CoordinateMapper) {
        let x = mapper.position_of(today, self.zoom()) - origin;
        self.center_on(x);
    }

    /// Share of the canvas left of the container's centre.
    pub fn center_fraction(&self) -> f64 {
        if self.content_width <= 0.0 {
            return 0.0;
        }
        ((self.scroll_left + self.viewport_width / 2.0) / self.content_width).clamp(0.0, 1.0)
    }

    /// Steps the zoom; the caller relays out and passes the new canvas width so
    /// the same fraction of the timeline stays centred.
    pub fn cycle_zoom(&mut self, content_width_at: impl Fn(f64) -> f64) -> f64 {
        let fraction = self.center_fraction();
        let zoom = self.zoom.advance();
        self.content_width = content_width_at(zoom).max(0.0);
        self.center_on(fraction * self.content_width);
        zoom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::YearRange;

    fn viewport() -> Viewport {
        let mut viewport = Viewport::new(&TimelineConfig::default());
        viewport.resize(1000.0, 12_000.0);
        viewport
    }

    #[test]
    fn zoom_cycles_forward_and_wraps() {
        let mut cycle = ZoomCycle::new(vec![0.1, 0.5, 1.0], 1.0);
        assert_eq!(cycle.current(), 1.0);
        assert_eq!(cycle.advance(), 0.1);
        assert_eq!(cycle.advance(), 0.5);
        assert_eq!(cycle.advance(), 1.0);
    }

    #[test]
    fn wheel_and_drag_scroll_with_clamping() {
        let mut viewport = viewport();
        assert!(viewport.wheel(250.0));
        assert!(!viewport.wheel(0.0));
        assert_eq!(viewport.scroll_left(), 250.0);

        viewport.begin_drag(500.0);
        viewport.drag_to(400.0);
        assert_eq!(viewport.scroll_left(), 450.0);
        viewport.drag_to(900.0);
        assert_eq!(viewport.scroll_left(), 0.0);
        viewport.end_drag();
        viewport.drag_to(0.0);
        assert_eq!(viewport.scroll_left(), 0.0);

        viewport.scroll_to(1e9);
        assert_eq!(viewport.scroll_left(), 11_000.0);
    }

    #[test]
    fn jump_to_today_centres_current_month() {
        let config = TimelineConfig::default();
        let mapper = config.mapper();
        let range = YearRange {
            start_year: 2020,
            end_year: 2029,
        };
        let mut viewport = viewport();
        viewport.jump_to(
            ReleaseDate::new(7, 2024).unwrap(),
            range.origin(&mapper, viewport.zoom()),
            &mapper,
        );
        // July 2024 sits 4.5 years into the canvas.
        assert_eq!(viewport.scroll_left(), 5400.0 - 500.0);
    }

    #[test]
    fn zoom_preserves_relative_position() {
        let mut viewport = viewport();
        viewport.scroll_to(5500.0);
        let before = viewport.center_fraction();

        let zoom = viewport.cycle_zoom(|zoom| 12_000.0 * zoom);
        assert_eq!(zoom, 0.1);
        assert!((viewport.center_fraction() - before).abs() < 1e-9);
        assert!((viewport.scroll_left() - 100.0).abs() < 1e-6);
    }
}
