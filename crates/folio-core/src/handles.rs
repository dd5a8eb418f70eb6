//! Resize handles and the geometry of handle-driven resizing.

use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Handle hit tolerance in device pixels.
pub const HANDLE_HIT_TOLERANCE: f64 = 8.0;

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

/// Edge positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// One of the eight resize handles around an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    Corner(Corner),
    Edge(Edge),
}

impl HandleKind {
    /// All handles, clockwise from the top-left corner.
    pub const ALL: [HandleKind; 8] = [
        HandleKind::Corner(Corner::TopLeft),
        HandleKind::Edge(Edge::Top),
        HandleKind::Corner(Corner::TopRight),
        HandleKind::Edge(Edge::Right),
        HandleKind::Corner(Corner::BottomRight),
        HandleKind::Edge(Edge::Bottom),
        HandleKind::Corner(Corner::BottomLeft),
        HandleKind::Edge(Edge::Left),
    ];

    /// Compass identifier used by host markup (`"nw"`, `"n"`, ...).
    pub fn as_str(self) -> &'static str {
        match self {
            HandleKind::Corner(Corner::TopLeft) => "nw",
            HandleKind::Edge(Edge::Top) => "n",
            HandleKind::Corner(Corner::TopRight) => "ne",
            HandleKind::Edge(Edge::Right) => "e",
            HandleKind::Corner(Corner::BottomRight) => "se",
            HandleKind::Edge(Edge::Bottom) => "s",
            HandleKind::Corner(Corner::BottomLeft) => "sw",
            HandleKind::Edge(Edge::Left) => "w",
        }
    }

    /// Parse a compass identifier.
    pub fn parse(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == tag)
    }

    /// Which sides of the box this handle moves: (left, top, right, bottom).
    fn moves(self) -> (bool, bool, bool, bool) {
        match self {
            HandleKind::Corner(Corner::TopLeft) => (true, true, false, false),
            HandleKind::Corner(Corner::TopRight) => (false, true, true, false),
            HandleKind::Corner(Corner::BottomLeft) => (true, false, false, true),
            HandleKind::Corner(Corner::BottomRight) => (false, false, true, true),
            HandleKind::Edge(Edge::Top) => (false, true, false, false),
            HandleKind::Edge(Edge::Right) => (false, false, true, false),
            HandleKind::Edge(Edge::Bottom) => (false, false, false, true),
            HandleKind::Edge(Edge::Left) => (true, false, false, false),
        }
    }
}

/// A resize handle with its position.
#[derive(Debug, Clone, Copy)]
pub struct Handle {
    /// Position in device coordinates.
    pub position: Point,
    /// Handle type.
    pub kind: HandleKind,
}

impl Handle {
    /// Create a new handle.
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    /// Check if a point hits this handle.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        let dx = point.x - self.position.x;
        let dy = point.y - self.position.y;
        dx * dx + dy * dy <= tolerance * tolerance
    }
}

/// The eight handles of a box.
pub fn get_handles(bounds: Rect) -> Vec<Handle> {
    let center = bounds.center();
    HandleKind::ALL
        .into_iter()
        .map(|kind| {
            let position = match kind {
                HandleKind::Corner(Corner::TopLeft) => Point::new(bounds.x0, bounds.y0),
                HandleKind::Corner(Corner::TopRight) => Point::new(bounds.x1, bounds.y0),
                HandleKind::Corner(Corner::BottomLeft) => Point::new(bounds.x0, bounds.y1),
                HandleKind::Corner(Corner::BottomRight) => Point::new(bounds.x1, bounds.y1),
                HandleKind::Edge(Edge::Top) => Point::new(center.x, bounds.y0),
                HandleKind::Edge(Edge::Right) => Point::new(bounds.x1, center.y),
                HandleKind::Edge(Edge::Bottom) => Point::new(center.x, bounds.y1),
                HandleKind::Edge(Edge::Left) => Point::new(bounds.x0, center.y),
            };
            Handle::new(position, kind)
        })
        .collect()
}

/// Find which handle (if any) is hit at the given point.
pub fn hit_test_handles(bounds: Rect, point: Point, tolerance: f64) -> Option<HandleKind> {
    get_handles(bounds)
        .into_iter()
        .find(|handle| handle.hit_test(point, tolerance))
        .map(|handle| handle.kind)
}

/// Resize `start` by dragging `handle` by `delta`.
///
/// Only the sides the handle owns move; the opposite sides stay fixed, so a
/// corner drag keeps the diagonally opposite corner in place. Width and
/// height never drop below `min_size`: a moving side stops `min_size` away
/// from its fixed counterpart instead of crossing it.
pub fn apply_resize(start: Rect, handle: HandleKind, delta: Vec2, min_size: f64) -> Rect {
    let (left, top, right, bottom) = handle.moves();
    let mut rect = start;

    if left {
        rect.x0 = (start.x0 + delta.x).min(start.x1 - min_size);
    }
    if right {
        rect.x1 = (start.x1 + delta.x).max(start.x0 + min_size);
    }
    if top {
        rect.y0 = (start.y0 + delta.y).min(start.y1 - min_size);
    }
    if bottom {
        rect.y1 = (start.y1 + delta.y).max(start.y0 + min_size);
    }

    rect
}
