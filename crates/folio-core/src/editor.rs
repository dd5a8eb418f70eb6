//! The layout editor: the facade a host UI drives.
//!
//! The editor owns the layout store, the selected device, the interaction
//! engines and the persistence adapter. All state transitions happen
//! synchronously inside the host's input handlers; the only asynchronous
//! work is running the [`LayoutWrite`]s the editor hands back.

use crate::create::{CreateKind, CreationState, CreationTool};
use crate::device::{self, DeviceId, DevicePreset};
use crate::handles::{HANDLE_HIT_TOLERANCE, HandleKind, hit_test_handles};
use crate::input::{KeyEvent, MouseButton, PointerEvent, PointerTarget};
use crate::interaction::{DragEngine, PointerCapture, ResizeEngine};
use crate::item::{CanvasItem, ItemId, ItemStyle, ItemUpdate, STRUCTURAL_IDS};
use crate::layout::{DeviceLayout, LayoutDocument, LayoutStore};
use crate::storage::{
    DEFAULT_DEBOUNCE_MS, LayoutPersistence, LayoutWrite, PendingWrite, Project, ProjectBackend,
    StorageError, StorageResult, WriteToken,
};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Tunables of the editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Idle period before a scheduled layout write runs.
    pub debounce_ms: u64,
    /// Smallest width/height a resize can produce.
    pub min_resize_size: f64,
    /// Smallest width/height a drawn rectangle needs to become an item.
    pub min_draw_size: f64,
    /// Canvas content never gets shorter than this.
    pub min_canvas_height: f64,
    /// Space kept below the lowest item.
    pub content_bottom_margin: f64,
    /// How far an item may stick out of the viewport before it is flagged.
    pub edge_tolerance: f64,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            min_resize_size: 20.0,
            min_draw_size: 10.0,
            min_canvas_height: 800.0,
            content_bottom_margin: 100.0,
            edge_tolerance: 0.0,
        }
    }
}

/// Multi-device canvas layout editor.
pub struct LayoutEditor<B: ProjectBackend + ?Sized> {
    config: EditorConfig,
    store: LayoutStore,
    device: &'static DevicePreset,
    edit_mode: bool,
    drag: DragEngine,
    resize: ResizeEngine,
    creation: CreationTool,
    cursor_pos: Point,
    selection: Option<ItemId>,
    persistence: LayoutPersistence<B>,
    /// Project the layout belongs to; structural changes schedule writes to it.
    project_id: Option<String>,
}

impl<B: ProjectBackend + ?Sized> LayoutEditor<B> {
    /// Create an editor writing to `backend`, with the default configuration.
    pub fn new(backend: Arc<B>) -> Self {
        Self::with_config(backend, EditorConfig::default())
    }

    /// Create an editor with a custom configuration.
    pub fn with_config(backend: Arc<B>, config: EditorConfig) -> Self {
        let mut persistence = LayoutPersistence::new(backend);
        persistence.set_interval(Duration::from_millis(config.debounce_ms));

        let mut store = LayoutStore::new();
        let device = DevicePreset::default_preset();
        store.ensure_layout(device);

        Self {
            config,
            store,
            device,
            edit_mode: false,
            drag: DragEngine::new(),
            resize: ResizeEngine::new(),
            creation: CreationTool::new(),
            cursor_pos: Point::ZERO,
            selection: None,
            persistence,
            project_id: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &LayoutStore {
        &self.store
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn cursor_pos(&self) -> Point {
        self.cursor_pos
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    // --- Devices ---

    /// The selected device.
    pub fn device(&self) -> &'static DevicePreset {
        self.device
    }

    /// Select `preset`, seeding its layout if it has none. Any drag or resize
    /// in progress belongs to the previous device and is dropped.
    pub fn select_device(&mut self, preset: &'static DevicePreset) {
        if self.device.id != preset.id {
            self.drag.end();
            self.resize.end();
            self.selection = None;
        }
        self.device = preset;
        self.store.ensure_layout(preset);
    }

    /// Select a preset by id. Returns false for unknown ids.
    pub fn select_device_by_id(&mut self, id: &str) -> bool {
        match DevicePreset::by_id(id) {
            Some(preset) => {
                self.select_device(preset);
                true
            }
            None => {
                log::debug!("Ignoring unknown device {id}");
                false
            }
        }
    }

    /// Whether the user is editing, creating or manipulating an item.
    pub fn is_interacting(&self) -> bool {
        self.edit_mode || self.creation.is_active() || self.drag.is_active() || self.resize.is_active()
    }

    /// Pick the device for a viewport `viewport_width` pixels wide, preferring
    /// devices with a saved layout. Does nothing while interacting. Returns
    /// whether the selection changed.
    pub fn auto_select_device(&mut self, viewport_width: f64) -> bool {
        if self.is_interacting() {
            return false;
        }
        let preset = device::auto_select_device(viewport_width, self.store.saved_devices());
        let changed = preset.id != self.device.id;
        self.select_device(preset);
        changed
    }

    // --- Edit mode ---

    pub fn is_edit_mode(&self) -> bool {
        self.edit_mode
    }

    /// Enter or leave edit mode. Leaving drops every interaction in progress.
    pub fn set_edit_mode(&mut self, edit_mode: bool) {
        self.edit_mode = edit_mode;
        if !edit_mode {
            self.drag.end();
            self.resize.end();
            self.creation = CreationTool::new();
            self.selection = None;
        }
    }

    // --- Layout access ---

    /// Layout of `device_id`. Known presets are seeded with the structural
    /// defaults on first access; unknown ids yield an empty layout.
    pub fn get_device_layout(&mut self, device_id: &str) -> &DeviceLayout {
        match DevicePreset::by_id(device_id) {
            Some(preset) => &*self.store.ensure_layout(preset),
            None => self.store.layout_or_empty(device_id),
        }
    }

    /// Replace a device's layout wholesale. Only presets have layouts;
    /// other ids are ignored and return false.
    pub fn set_device_layout(&mut self, device_id: &str, layout: DeviceLayout) -> bool {
        match DevicePreset::by_id(device_id) {
            Some(preset) => {
                self.store.set_layout(preset.id, layout);
                true
            }
            None => {
                log::debug!("Ignoring layout for unknown device {device_id}");
                false
            }
        }
    }

    /// Items of the selected device, back to front.
    pub fn active_items(&self) -> Vec<&CanvasItem> {
        let mut items: Vec<&CanvasItem> = self.store.layout_or_empty(self.device.id).values().collect();
        items.sort_by(|a, b| (a.style().z_index, &a.id).cmp(&(b.style().z_index, &b.id)));
        items
    }

    /// An item on the selected device.
    pub fn item(&self, id: &str) -> Option<&CanvasItem> {
        self.store.item(self.device.id, id)
    }

    /// Topmost item of the selected device under `point`.
    pub fn item_at(&self, point: Point) -> Option<&CanvasItem> {
        self.active_items()
            .into_iter()
            .rev()
            .find(|item| item.bounds().contains(point))
    }

    // --- Item operations ---

    /// Add an item to the selected device.
    pub fn add_canvas_item(&mut self, item: CanvasItem) {
        self.store
            .ensure_layout(self.device)
            .insert(item.id.clone(), item);
        self.schedule_save();
    }

    /// Apply `update` to an item on the selected device. Unknown ids are
    /// ignored.
    pub fn update_canvas_item(&mut self, id: &str, update: &ItemUpdate) -> bool {
        match self.store.item_mut(self.device.id, id) {
            Some(item) => {
                update.apply(item);
                true
            }
            None => {
                log::debug!("Ignoring update of unknown item {id}");
                false
            }
        }
    }

    /// Remove an item from every device. Structural items are never removed.
    /// Removing an id twice is harmless.
    pub fn remove_canvas_item(&mut self, id: &str) -> bool {
        if STRUCTURAL_IDS.contains(&id) {
            log::debug!("Refusing to remove structural item {id}");
            return false;
        }
        if !self.store.remove_everywhere(id) {
            return false;
        }

        if self.selection.as_deref() == Some(id) {
            self.selection = None;
        }
        if self.drag.state().is_some_and(|s| s.item_id == id) {
            self.drag.end();
        }
        if self.resize.state().is_some_and(|s| s.manipulation.item_id == id) {
            self.resize.end();
        }
        self.schedule_save();
        true
    }

    /// Set the content of a custom element on every device, or only on the
    /// selected device when `device_specific` is set.
    pub fn update_custom_element_content(&mut self, id: &str, content: &str, device_specific: bool) -> bool {
        let updated = if device_specific {
            match self.store.item_mut(self.device.id, id) {
                Some(item) => {
                    item.content = Some(content.to_string());
                    1
                }
                None => 0,
            }
        } else {
            self.store
                .for_each_copy(id, |item| item.content = Some(content.to_string()))
        };

        if updated == 0 {
            log::debug!("Ignoring content update of unknown item {id}");
            return false;
        }
        self.schedule_save();
        true
    }

    // --- Drag ---

    /// Start dragging an item of the selected device. Only in edit mode.
    pub fn start_drag(&mut self, id: &str, pointer: Point) -> Option<PointerCapture> {
        if !self.edit_mode || self.creation.is_active() {
            return None;
        }
        let bounds = self.item(id)?.bounds();
        self.resize.end();
        self.selection = Some(id.to_string());
        Some(self.drag.begin(id.to_string(), pointer, bounds))
    }

    /// Move the dragged item with the pointer.
    pub fn drag_to(&mut self, pointer: Point) -> bool {
        self.cursor_pos = pointer;
        let moved = match self.drag.update(pointer) {
            Some((id, position)) => match self.store.item_mut(self.device.id, id) {
                Some(item) => {
                    item.move_to(position);
                    true
                }
                None => false,
            },
            None => return false,
        };
        if !moved {
            self.drag.end();
        }
        moved
    }

    /// Finish the drag. The position is already live; nothing is written.
    pub fn end_drag(&mut self) -> Option<ItemId> {
        self.drag.end().map(|state| state.item_id)
    }

    // --- Resize ---

    /// Start resizing an item of the selected device via `handle`.
    pub fn start_resize(&mut self, id: &str, handle: HandleKind, pointer: Point) -> Option<PointerCapture> {
        if !self.edit_mode || self.creation.is_active() {
            return None;
        }
        let bounds = self.item(id)?.bounds();
        self.drag.end();
        self.selection = Some(id.to_string());
        Some(self.resize.begin(id.to_string(), handle, pointer, bounds))
    }

    /// Resize the item with the pointer.
    pub fn resize_to(&mut self, pointer: Point) -> bool {
        self.cursor_pos = pointer;
        let resized = match self.resize.update(pointer, self.config.min_resize_size) {
            Some((id, bounds)) => match self.store.item_mut(self.device.id, id) {
                Some(item) => {
                    item.set_bounds(bounds);
                    true
                }
                None => false,
            },
            None => return false,
        };
        if !resized {
            self.resize.end();
        }
        resized
    }

    /// Finish the resize.
    pub fn end_resize(&mut self) -> Option<ItemId> {
        self.resize.end().map(|state| state.manipulation.item_id)
    }

    /// Subscription held by the drag or resize in progress.
    pub fn active_capture(&self) -> Option<PointerCapture> {
        self.drag
            .state()
            .map(|s| s.capture)
            .or_else(|| self.resize.state().map(|s| s.manipulation.capture))
    }

    // --- Draw-to-create ---

    /// Enter creation mode for `kind`.
    pub fn start_element_creation(&mut self, kind: CreateKind) {
        self.drag.end();
        self.resize.end();
        self.selection = None;
        self.creation.start(kind);
    }

    /// Record the anchor of the rectangle. Only while creating.
    pub fn start_drawing(&mut self, point: Point) -> bool {
        self.cursor_pos = point;
        self.creation.begin_drawing(point)
    }

    /// Track the live corner of the rectangle.
    pub fn update_drawing(&mut self, point: Point) {
        self.cursor_pos = point;
        self.creation.update(point);
    }

    /// Finish drawing. A large enough rectangle becomes a new shared item on
    /// every device; its id is returned and it becomes the selection.
    pub fn finalize_drawing(&mut self) -> Option<ItemId> {
        let result = self.creation.finish(self.config.min_draw_size)?;
        let item = CanvasItem::new_custom(result.kind.item_kind(), result.bounds);
        let id = item.id.clone();
        log::debug!("Created {id} at {:?}", result.bounds);

        self.store.insert_shared(item);
        self.selection = Some(id.clone());
        self.schedule_save();
        Some(id)
    }

    /// Leave creation mode. A no-op once drawing has started.
    pub fn cancel_element_creation(&mut self) -> bool {
        self.creation.cancel()
    }

    pub fn creation_state(&self) -> CreationState {
        self.creation.state()
    }

    /// Normalized preview rectangle while drawing.
    pub fn drawing_rect(&self) -> Option<Rect> {
        self.creation.preview_rect()
    }

    // --- Input routing ---

    /// Track the pointer and feed whichever interaction is active.
    pub fn pointer_move(&mut self, point: Point) {
        self.cursor_pos = point;
        if self.creation.is_drawing() {
            self.update_drawing(point);
        } else if self.drag.is_active() {
            self.drag_to(point);
        } else if self.resize.is_active() {
            self.resize_to(point);
        }
    }

    /// Complete whichever interaction is active. Returns the id of an item
    /// created by a finished draw.
    pub fn pointer_up(&mut self, point: Point) -> Option<ItemId> {
        self.pointer_move(point);
        if self.creation.is_drawing() {
            return self.finalize_drawing();
        }
        self.end_drag();
        self.end_resize();
        None
    }

    /// Route a pointer event. Returns the id of an item created by it.
    pub fn handle_pointer_event(&mut self, event: &PointerEvent) -> Option<ItemId> {
        match event {
            PointerEvent::Down {
                position,
                button,
                target,
            } => {
                self.cursor_pos = *position;
                if *button != MouseButton::Left {
                    return None;
                }
                if self.creation.is_active() {
                    self.start_drawing(*position);
                    return None;
                }
                if !self.edit_mode {
                    return None;
                }
                let target = target.clone().unwrap_or_else(|| self.target_at(*position));
                match target {
                    PointerTarget::Handle { item, handle } => match HandleKind::parse(&handle) {
                        Some(kind) => {
                            self.start_resize(&item, kind, *position);
                        }
                        None => log::debug!("Ignoring unknown resize handle {handle}"),
                    },
                    PointerTarget::Item(item) => {
                        self.start_drag(&item, *position);
                    }
                    PointerTarget::Canvas => self.selection = None,
                }
                None
            }
            PointerEvent::Move { position } => {
                self.pointer_move(*position);
                None
            }
            PointerEvent::Up { position, .. } => self.pointer_up(*position),
            PointerEvent::Leave => {
                self.cancel_element_creation();
                None
            }
        }
    }

    /// Handle a key press. Returns whether the key did anything.
    pub fn handle_key(&mut self, event: &KeyEvent) -> bool {
        if event.is_press_of("Escape") {
            return self.creation.is_active() && self.cancel_element_creation();
        }
        if event.is_press_of("Delete") || event.is_press_of("Backspace") {
            if !self.edit_mode {
                return false;
            }
            return match self.selection.clone() {
                Some(id) => self.remove_canvas_item(&id),
                None => false,
            };
        }
        false
    }

    fn target_at(&self, point: Point) -> PointerTarget {
        if let Some(selected) = self.selection.as_deref().and_then(|id| self.item(id)) {
            if let Some(handle) = hit_test_handles(selected.bounds(), point, HANDLE_HIT_TOLERANCE) {
                return PointerTarget::Handle {
                    item: selected.id.clone(),
                    handle: handle.as_str().to_string(),
                };
            }
        }
        match self.item_at(point) {
            Some(item) => PointerTarget::Item(item.id.clone()),
            None => PointerTarget::Canvas,
        }
    }

    // --- Device-specific override ---

    /// Make an item exclusive to the selected device, or share an exclusive
    /// item with every device again.
    ///
    /// Making it exclusive removes it from every other device. Sharing copies
    /// the selected device's geometry and content to all devices. Returns
    /// false when the item is not on the selected device.
    pub fn toggle_device_specific_content(&mut self, id: &str) -> bool {
        let Some(item) = self.store.item_mut(self.device.id, id) else {
            log::debug!("Ignoring toggle of unknown item {id}");
            return false;
        };

        if item.device_specific {
            item.device_specific = false;
            let shared = item.clone();
            self.store.insert_shared(shared);
        } else {
            item.device_specific = true;
            self.store.retain_only_on(id, self.device.id);
        }
        self.schedule_save();
        true
    }

    // --- Overflow and sizing ---

    /// Whether an item sticks out of the selected device's viewport. Always
    /// false outside edit mode.
    pub fn is_item_outside_viewport(&self, id: &str) -> bool {
        if !self.edit_mode {
            return false;
        }
        let Some(item) = self.item(id) else {
            return false;
        };
        let viewport = self.device.bounds().inflate(self.config.edge_tolerance, self.config.edge_tolerance);
        let bounds = item.bounds();
        bounds.x0 < viewport.x0 || bounds.y0 < viewport.y0 || bounds.x1 > viewport.x1 || bounds.y1 > viewport.y1
    }

    /// Height the canvas content needs: the lowest item or the draw in
    /// progress plus a margin, but never less than the configured minimum.
    pub fn canvas_height(&self) -> f64 {
        let margin = self.config.content_bottom_margin;
        let items = self.store.lowest_edge(self.device.id).map(|bottom| bottom + margin);
        let drawing = self.drawing_rect().map(|rect| rect.y1 + margin);
        [items, drawing]
            .into_iter()
            .flatten()
            .fold(self.config.min_canvas_height, f64::max)
    }

    /// Height of the canvas container: the device height, grown to fit content.
    pub fn viewport_height(&self) -> f64 {
        self.device.height.max(self.canvas_height())
    }

    /// Positioning style of an item on the selected device. Unknown ids get
    /// the hidden default.
    pub fn item_style(&self, id: &str) -> ItemStyle {
        self.item(id).map(CanvasItem::style).unwrap_or_default()
    }

    // --- Persistence ---

    /// Replace the store with a serialized layout document.
    ///
    /// Missing or malformed documents fall back to the structural defaults;
    /// this never fails. A loaded document is taken as is: devices it does
    /// not mention are seeded when they are first selected or accessed.
    /// Returns whether a document was loaded.
    pub fn load_canvas_layout(&mut self, json: Option<&str>) -> bool {
        self.drag.end();
        self.resize.end();
        self.selection = None;

        let document = match json.map(LayoutDocument::from_json) {
            Some(Ok(document)) => Some(document),
            Some(Err(e)) => {
                log::warn!("Falling back to default layout: {e}");
                None
            }
            None => {
                log::debug!("No saved layout, using defaults");
                None
            }
        };
        match document {
            Some(document) => {
                self.store = LayoutStore::from_document(document);
                true
            }
            None => {
                self.store = LayoutStore::new();
                self.store.ensure_layout(self.device);
                false
            }
        }
    }

    /// Open a project: bind writes to it and load its layout.
    pub fn load_project(&mut self, project: &Project) -> bool {
        self.persistence.cancel();
        self.project_id = Some(project.id.clone());
        self.load_canvas_layout(project.layout_config.as_deref())
    }

    /// The store as a layout document.
    pub fn serialize_layout(&self) -> Result<String, serde_json::Error> {
        self.store.to_document().to_json()
    }

    /// Schedule a debounced write of the layout to `project_id`.
    pub fn save_canvas_layout(&mut self, project_id: &str) -> WriteToken {
        self.save_canvas_layout_at(project_id, Instant::now())
    }

    /// Schedule a debounced write as of `now`.
    pub fn save_canvas_layout_at(&mut self, project_id: &str, now: Instant) -> WriteToken {
        self.persistence.schedule(project_id, now)
    }

    pub fn pending_save(&self) -> Option<&PendingWrite> {
        self.persistence.pending()
    }

    /// Take the scheduled write once its debounce window has passed. The
    /// layout is serialized now, so the write carries the latest state.
    pub fn poll_save(&mut self, now: Instant) -> Option<LayoutWrite<B>> {
        let pending = self.persistence.take_due(now)?;
        match self.build_write(&pending.project_id) {
            Ok(write) => Some(write),
            Err(e) => {
                log::warn!("Dropping layout write for {}: {e}", pending.project_id);
                None
            }
        }
    }

    /// Write the layout now, superseding any scheduled write. Custom
    /// elements left without content are removed first.
    pub fn save_canvas_layout_immediate(&mut self, project_id: &str) -> StorageResult<LayoutWrite<B>> {
        self.persistence.cancel();

        let pruned = self.store.prune(|item| !item.has_visible_content());
        if !pruned.is_empty() {
            log::debug!("Removed {} empty elements before saving", pruned.len());
            if self.selection.as_ref().is_some_and(|id| pruned.contains(id)) {
                self.selection = None;
            }
        }
        self.build_write(project_id)
    }

    /// Clear all in-memory state and cancel the scheduled write.
    pub fn reset(&mut self) {
        self.persistence.cancel();
        self.store.clear();
        self.drag.end();
        self.resize.end();
        self.creation = CreationTool::new();
        self.selection = None;
        self.cursor_pos = Point::ZERO;
        self.edit_mode = false;
        self.project_id = None;
        self.device = DevicePreset::default_preset();
    }

    /// Tear the editor down. Returns the scheduled write, flushed
    /// regardless of its debounce window, for the host to run.
    pub fn destroy(&mut self) -> Option<LayoutWrite<B>> {
        let write = self.persistence.take_pending().and_then(|pending| {
            match self.build_write(&pending.project_id) {
                Ok(write) => Some(write),
                Err(e) => {
                    log::warn!("Dropping layout write for {}: {e}", pending.project_id);
                    None
                }
            }
        });
        self.reset();
        write
    }

    fn build_write(&mut self, project_id: &str) -> StorageResult<LayoutWrite<B>> {
        let json = self
            .serialize_layout()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let devices: Vec<DeviceId> = self.store.device_ids().map(String::from).collect();
        for device in &devices {
            self.store.mark_saved(device);
        }
        Ok(self.persistence.write(project_id, json))
    }

    fn schedule_save(&mut self) {
        if let Some(project_id) = &self.project_id {
            self.persistence.schedule(project_id, Instant::now());
        }
    }
}
