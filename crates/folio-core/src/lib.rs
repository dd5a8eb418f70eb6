//! Folio Core Library
//!
//! Platform-agnostic layout engine for the Folio project editor: per-device
//! canvas layouts, the drag/resize/draw interactions that edit them, and the
//! debounced persistence of the result.

pub mod create;
pub mod device;
pub mod editor;
pub mod handles;
pub mod input;
pub mod interaction;
pub mod item;
pub mod layout;
pub mod storage;

pub use create::{CreateKind, CreationState, CreationTool};
pub use device::{DEVICE_PRESETS, DevicePreset, auto_select_device};
pub use editor::{EditorConfig, LayoutEditor};
pub use handles::{Handle, HandleKind};
pub use input::{KeyEvent, MouseButton, PointerEvent, PointerTarget};
pub use interaction::{DragEngine, ManipulationState, PointerCapture, ResizeEngine};
pub use item::{CanvasItem, ItemId, ItemKind, ItemStyle, ItemUpdate};
pub use layout::{DeviceLayout, LayoutDocument, LayoutError, LayoutStore};
pub use storage::{MemoryBackend, Project, ProjectBackend, ProjectPatch, StorageError, StorageResult};
