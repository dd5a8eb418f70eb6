//! Drag and resize state machines.
//!
//! Both engines are `idle -> active -> idle`. While active they own a
//! [`PointerCapture`]: the host keeps a document-level pointer-up listener
//! installed for exactly as long as a capture is live, so an interaction
//! that ends outside the canvas still completes.

use crate::handles::{HandleKind, apply_resize};
use crate::item::ItemId;
use kurbo::{Point, Rect, Vec2};
use std::sync::atomic::{AtomicU64, Ordering};

/// Token for a document-level pointer subscription held by an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerCapture(u64);

impl PointerCapture {
    fn acquire() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw token value, for host bookkeeping.
    pub fn token(self) -> u64 {
        self.0
    }
}

/// State of an active manipulation of a single item.
#[derive(Debug, Clone)]
pub struct ManipulationState {
    /// The item being manipulated.
    pub item_id: ItemId,
    /// Pointer position when the interaction started.
    pub pointer_start: Point,
    /// Latest pointer position.
    pub pointer_current: Point,
    /// Item geometry when the interaction started.
    pub item_start: Rect,
    /// Subscription kept alive for the duration of the interaction.
    pub capture: PointerCapture,
}

impl ManipulationState {
    fn new(item_id: ItemId, pointer_start: Point, item_start: Rect) -> Self {
        Self {
            item_id,
            pointer_start,
            pointer_current: pointer_start,
            item_start,
            capture: PointerCapture::acquire(),
        }
    }

    /// Total pointer movement since the interaction started.
    pub fn delta(&self) -> Vec2 {
        self.pointer_current - self.pointer_start
    }
}

/// Repositions one item as the pointer moves.
#[derive(Debug, Clone, Default)]
pub struct DragEngine {
    state: Option<ManipulationState>,
}

impl DragEngine {
    /// Create an idle engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start dragging `item_id`, whose geometry is `item_bounds`.
    pub fn begin(&mut self, item_id: ItemId, pointer: Point, item_bounds: Rect) -> PointerCapture {
        let state = ManipulationState::new(item_id, pointer, item_bounds);
        let capture = state.capture;
        self.state = Some(state);
        capture
    }

    /// Track the pointer. Returns the item and its new top-left corner.
    pub fn update(&mut self, pointer: Point) -> Option<(&str, Point)> {
        let state = self.state.as_mut()?;
        state.pointer_current = pointer;
        let position = state.item_start.origin() + state.delta();
        Some((state.item_id.as_str(), position))
    }

    /// Finish the drag. Returns the state that was active.
    pub fn end(&mut self) -> Option<ManipulationState> {
        self.state.take()
    }

    /// Whether a drag is in progress.
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// The active drag, if any.
    pub fn state(&self) -> Option<&ManipulationState> {
        self.state.as_ref()
    }
}

/// Active resize: the manipulation plus the handle being dragged.
#[derive(Debug, Clone)]
pub struct ResizeState {
    pub manipulation: ManipulationState,
    pub handle: HandleKind,
}

/// Changes one item's geometry through one of its eight handles.
#[derive(Debug, Clone, Default)]
pub struct ResizeEngine {
    state: Option<ResizeState>,
}

impl ResizeEngine {
    /// Create an idle engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start resizing `item_id` via `handle`.
    pub fn begin(
        &mut self,
        item_id: ItemId,
        handle: HandleKind,
        pointer: Point,
        item_bounds: Rect,
    ) -> PointerCapture {
        let manipulation = ManipulationState::new(item_id, pointer, item_bounds);
        let capture = manipulation.capture;
        self.state = Some(ResizeState {
            manipulation,
            handle,
        });
        capture
    }

    /// Track the pointer. Returns the item and its new bounds.
    pub fn update(&mut self, pointer: Point, min_size: f64) -> Option<(&str, Rect)> {
        let state = self.state.as_mut()?;
        state.manipulation.pointer_current = pointer;
        let bounds = apply_resize(
            state.manipulation.item_start,
            state.handle,
            state.manipulation.delta(),
            min_size,
        );
        Some((state.manipulation.item_id.as_str(), bounds))
    }

    /// Finish the resize. Returns the state that was active.
    pub fn end(&mut self) -> Option<ResizeState> {
        self.state.take()
    }

    /// Whether a resize is in progress.
    pub fn is_active(&self) -> bool {
        self.state.is_some()
    }

    /// The active resize, if any.
    pub fn state(&self) -> Option<&ResizeState> {
        self.state.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handles::Corner;

    #[test]
    fn test_drag_follows_total_delta() {
        let mut drag = DragEngine::new();
        drag.begin("a".to_string(), Point::new(100.0, 100.0), Rect::new(50.0, 50.0, 250.0, 130.0));
        assert!(drag.is_active());

        drag.update(Point::new(110.0, 95.0));
        let (id, position) = drag.update(Point::new(130.0, 90.0)).unwrap();
        assert_eq!(id, "a");
        assert_eq!(position, Point::new(80.0, 40.0));

        assert!(drag.end().is_some());
        assert!(!drag.is_active());
        assert!(drag.update(Point::ZERO).is_none());
    }

    #[test]
    fn test_each_interaction_gets_fresh_capture() {
        let mut drag = DragEngine::new();
        let first = drag.begin("a".to_string(), Point::ZERO, Rect::ZERO);
        drag.end();
        let second = drag.begin("a".to_string(), Point::ZERO, Rect::ZERO);
        assert_ne!(first, second);
        assert_eq!(drag.state().map(|s| s.capture), Some(second));
    }

    #[test]
    fn test_resize_updates_bounds() {
        let mut resize = ResizeEngine::new();
        resize.begin(
            "a".to_string(),
            HandleKind::Corner(Corner::BottomRight),
            Point::new(200.0, 200.0),
            Rect::new(0.0, 0.0, 200.0, 200.0),
        );
        let (_, bounds) = resize.update(Point::new(250.0, 180.0), 20.0).unwrap();
        assert_eq!(bounds, Rect::new(0.0, 0.0, 250.0, 180.0));
        assert!(resize.end().is_some());
        assert!(resize.update(Point::ZERO, 20.0).is_none());
    }
}
