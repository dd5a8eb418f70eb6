//! Pointer and keyboard events consumed by the editor.
//!
//! Positions are device-local: the host has already subtracted the canvas
//! container's on-screen origin.

use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Mouse button identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

/// What the host found under the pointer when it went down.
///
/// Hosts that hit-test their own markup pass the target along; `None` lets
/// the editor hit-test the active layout itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PointerTarget {
    /// Empty canvas.
    Canvas,
    /// The body of an item.
    Item(String),
    /// A resize handle of an item, tagged with its compass identifier.
    Handle { item: String, handle: String },
}

/// Pointer event type for unified mouse/touch handling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PointerEvent {
    Down {
        position: Point,
        button: MouseButton,
        target: Option<PointerTarget>,
    },
    Up {
        position: Point,
        button: MouseButton,
    },
    Move {
        position: Point,
    },
    /// The pointer left the canvas container.
    Leave,
}

impl PointerEvent {
    /// Position carried by the event, if any.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Down { position, .. } | Self::Up { position, .. } | Self::Move { position } => {
                Some(*position)
            }
            Self::Leave => None,
        }
    }
}

/// Keyboard event type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum KeyEvent {
    Pressed(String),
    Released(String),
}

impl KeyEvent {
    /// Whether this is a press of `key`.
    pub fn is_press_of(&self, key: &str) -> bool {
        matches!(self, Self::Pressed(pressed) if pressed == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_position() {
        let down = PointerEvent::Down {
            position: Point::new(1.0, 2.0),
            button: MouseButton::Left,
            target: None,
        };
        assert_eq!(down.position(), Some(Point::new(1.0, 2.0)));
        assert_eq!(PointerEvent::Leave.position(), None);
    }

    #[test]
    fn test_key_press_match() {
        assert!(KeyEvent::Pressed("Escape".to_string()).is_press_of("Escape"));
        assert!(!KeyEvent::Released("Escape".to_string()).is_press_of("Escape"));
    }
}
