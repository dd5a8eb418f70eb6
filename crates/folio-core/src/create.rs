//! Draw-to-create: drag out a rectangle to spawn a custom element.

use crate::item::ItemKind;
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// The kinds of element that can be drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateKind {
    Text,
    Image,
    Video,
}

impl CreateKind {
    /// Item kind of the element this creates.
    pub fn item_kind(self) -> ItemKind {
        match self {
            Self::Text => ItemKind::CustomText,
            Self::Image => ItemKind::CustomImage,
            Self::Video => ItemKind::Video,
        }
    }
}

/// State of the creation tool.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum CreationState {
    /// Not creating anything.
    #[default]
    Idle,
    /// Waiting for the first pointer-down on the canvas.
    Armed(CreateKind),
    /// Rectangle being drawn from `anchor` to `current`.
    Drawing {
        kind: CreateKind,
        anchor: Point,
        current: Point,
    },
}

/// A finished draw: what to create and where.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawResult {
    pub kind: CreateKind,
    pub bounds: Rect,
}

/// The `idle -> creating -> drawing -> idle` state machine.
#[derive(Debug, Clone, Default)]
pub struct CreationTool {
    state: CreationState,
}

impl CreationTool {
    /// Create an idle tool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> CreationState {
        self.state
    }

    /// Arm the tool for `kind`. Replaces any creation in progress.
    pub fn start(&mut self, kind: CreateKind) {
        self.state = CreationState::Armed(kind);
    }

    /// Record the anchor point. Only valid while armed.
    pub fn begin_drawing(&mut self, point: Point) -> bool {
        match self.state {
            CreationState::Armed(kind) => {
                self.state = CreationState::Drawing {
                    kind,
                    anchor: point,
                    current: point,
                };
                true
            }
            _ => false,
        }
    }

    /// Track the live cursor while drawing.
    pub fn update(&mut self, point: Point) {
        if let CreationState::Drawing { current, .. } = &mut self.state {
            *current = point;
        }
    }

    /// The normalized preview rectangle, while drawing.
    pub fn preview_rect(&self) -> Option<Rect> {
        match self.state {
            CreationState::Drawing { anchor, current, .. } => Some(Rect::from_points(anchor, current)),
            _ => None,
        }
    }

    /// Finish drawing and return to idle.
    ///
    /// Returns `None` when not drawing, or when either side of the rectangle
    /// is shorter than `min_size` (treated as the user giving up).
    pub fn finish(&mut self, min_size: f64) -> Option<DrawResult> {
        let CreationState::Drawing { kind, .. } = self.state else {
            return None;
        };
        let bounds = self.preview_rect()?;
        self.state = CreationState::Idle;

        if bounds.width() < min_size || bounds.height() < min_size {
            log::debug!(
                "Discarding {:?} draw below minimum size: {}x{}",
                kind,
                bounds.width(),
                bounds.height()
            );
            return None;
        }
        Some(DrawResult { kind, bounds })
    }

    /// Leave creation mode. A no-op once an anchor has been recorded, so
    /// the pointer leaving the canvas mid-draw does not discard the draw.
    /// Returns whether the tool is now idle.
    pub fn cancel(&mut self) -> bool {
        match self.state {
            CreationState::Drawing { .. } => false,
            _ => {
                self.state = CreationState::Idle;
                true
            }
        }
    }

    /// Kind being authored, if any.
    pub fn kind(&self) -> Option<CreateKind> {
        match self.state {
            CreationState::Idle => None,
            CreationState::Armed(kind) | CreationState::Drawing { kind, .. } => Some(kind),
        }
    }

    /// Whether the tool is armed or drawing.
    pub fn is_active(&self) -> bool {
        self.state != CreationState::Idle
    }

    /// Whether an anchor has been recorded.
    pub fn is_drawing(&self) -> bool {
        matches!(self.state, CreationState::Drawing { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIN: f64 = 10.0;

    #[test]
    fn test_draw_lifecycle() {
        let mut tool = CreationTool::new();
        assert!(!tool.begin_drawing(Point::ZERO));

        tool.start(CreateKind::Text);
        assert_eq!(tool.kind(), Some(CreateKind::Text));
        assert!(tool.begin_drawing(Point::new(50.0, 50.0)));
        tool.update(Point::new(250.0, 130.0));

        let result = tool.finish(MIN).unwrap();
        assert_eq!(result.kind, CreateKind::Text);
        assert_eq!(result.bounds, Rect::new(50.0, 50.0, 250.0, 130.0));
        assert_eq!(tool.state(), CreationState::Idle);
    }

    #[test]
    fn test_draw_normalizes_every_direction() {
        let anchor = Point::new(100.0, 100.0);
        for current in [
            Point::new(40.0, 30.0),
            Point::new(160.0, 30.0),
            Point::new(40.0, 170.0),
            Point::new(160.0, 170.0),
        ] {
            let mut tool = CreationTool::new();
            tool.start(CreateKind::Image);
            tool.begin_drawing(anchor);
            tool.update(current);
            let bounds = tool.finish(MIN).unwrap().bounds;
            assert!(bounds.x0 <= current.x && bounds.y0 <= current.y);
            assert!(bounds.x0 <= anchor.x && bounds.y0 <= anchor.y);
            assert!((bounds.width() - 60.0).abs() < f64::EPSILON);
            assert!((bounds.height() - 70.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn test_tiny_draw_is_discarded() {
        let mut tool = CreationTool::new();
        tool.start(CreateKind::Text);
        tool.begin_drawing(Point::new(10.0, 10.0));
        tool.update(Point::new(12.0, 12.0));
        assert!(tool.finish(MIN).is_none());
        assert!(!tool.is_active());
    }

    #[test]
    fn test_cancel_is_noop_while_drawing() {
        let mut tool = CreationTool::new();
        tool.start(CreateKind::Video);
        tool.begin_drawing(Point::new(10.0, 10.0));
        assert!(!tool.cancel());
        assert!(tool.is_drawing());

        let mut tool = CreationTool::new();
        tool.start(CreateKind::Video);
        assert!(tool.cancel());
        assert!(!tool.is_active());
    }

    #[test]
    fn test_finish_without_drawing() {
        let mut tool = CreationTool::new();
        tool.start(CreateKind::Text);
        assert!(tool.finish(MIN).is_none());
        assert_eq!(tool.kind(), Some(CreateKind::Text));
    }
}
