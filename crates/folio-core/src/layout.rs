//! The per-device layout store and its serialized document form.

use crate::device::{DEVICE_PRESETS, DeviceId, DevicePreset};
use crate::item::{CanvasItem, ItemId, structural_defaults};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::LazyLock;
use thiserror::Error;

/// All items placed on one device, keyed by item id.
pub type DeviceLayout = HashMap<ItemId, CanvasItem>;

static EMPTY_LAYOUT: LazyLock<DeviceLayout> = LazyLock::new(HashMap::new);

/// Errors decoding a layout document.
#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Invalid layout JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid item {item} on device {device}: {reason}")]
    InvalidItem {
        device: DeviceId,
        item: ItemId,
        reason: String,
    },
}

/// Device id -> item id -> item.
///
/// Holds all placement and content state. Geometry is independent per
/// device; a shared item appears under the same id in every device map,
/// a device-specific item in exactly one.
#[derive(Debug, Clone, Default)]
pub struct LayoutStore {
    layouts: HashMap<DeviceId, DeviceLayout>,
    /// Devices whose layout came from, or went into, a saved document.
    saved: HashSet<DeviceId>,
}

impl LayoutStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Layout of `device`, if one exists.
    pub fn layout(&self, device: &str) -> Option<&DeviceLayout> {
        self.layouts.get(device)
    }

    /// Layout of `device`, or an empty map when it has none.
    pub fn layout_or_empty(&self, device: &str) -> &DeviceLayout {
        self.layouts.get(device).unwrap_or(&*EMPTY_LAYOUT)
    }

    /// Layout of `preset`, seeded with the structural defaults on first access.
    ///
    /// Defaults whose id is already exclusive to another device are not
    /// seeded, so a device-specific item stays in exactly one layout.
    pub fn ensure_layout(&mut self, preset: &DevicePreset) -> &mut DeviceLayout {
        if !self.layouts.contains_key(preset.id) {
            log::debug!("Seeding default layout for {}", preset.id);
            let exclusive = self.device_specific_ids();
            let mut layout = structural_defaults(preset);
            layout.retain(|id, _| !exclusive.contains(id));
            self.layouts.insert(preset.id.to_string(), layout);
        }
        self.layouts.entry(preset.id.to_string()).or_default()
    }

    fn device_specific_ids(&self) -> HashSet<ItemId> {
        self.layouts
            .values()
            .flat_map(HashMap::values)
            .filter(|item| item.device_specific)
            .map(|item| item.id.clone())
            .collect()
    }

    /// Replace a device's layout wholesale.
    pub fn set_layout(&mut self, device: impl Into<DeviceId>, mut layout: DeviceLayout) {
        for (id, item) in layout.iter_mut() {
            item.id.clone_from(id);
        }
        self.layouts.insert(device.into(), layout);
    }

    /// Whether `device` has a layout.
    pub fn has_layout(&self, device: &str) -> bool {
        self.layouts.contains_key(device)
    }

    /// Ids of devices that have a layout.
    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.layouts.keys().map(String::as_str)
    }

    /// Get an item on a device.
    pub fn item(&self, device: &str, id: &str) -> Option<&CanvasItem> {
        self.layouts.get(device)?.get(id)
    }

    /// Get a mutable item on a device.
    pub fn item_mut(&mut self, device: &str, id: &str) -> Option<&mut CanvasItem> {
        self.layouts.get_mut(device)?.get_mut(id)
    }

    /// Insert (or replace) an item on one device.
    pub fn insert(&mut self, device: &str, item: CanvasItem) {
        if let Some(layout) = self.layouts.get_mut(device) {
            layout.insert(item.id.clone(), item);
        } else {
            let mut layout = DeviceLayout::new();
            layout.insert(item.id.clone(), item);
            self.layouts.insert(device.to_string(), layout);
        }
    }

    /// Insert `item` into every preset's layout, seeding missing layouts
    /// first so the item is not lost when they are opened later.
    pub fn insert_shared(&mut self, item: CanvasItem) {
        for preset in DEVICE_PRESETS {
            self.ensure_layout(preset)
                .insert(item.id.clone(), item.clone());
        }
    }

    /// Remove `id` from every device. Returns whether anything was removed.
    pub fn remove_everywhere(&mut self, id: &str) -> bool {
        let mut removed = false;
        for layout in self.layouts.values_mut() {
            removed |= layout.remove(id).is_some();
        }
        removed
    }

    /// Remove `id` from every device except `keep`.
    pub fn retain_only_on(&mut self, id: &str, keep: &str) {
        for (device, layout) in self.layouts.iter_mut() {
            if device != keep {
                layout.remove(id);
            }
        }
    }

    /// Devices whose layout contains `id`.
    pub fn devices_containing(&self, id: &str) -> Vec<&str> {
        self.layouts
            .iter()
            .filter(|(_, layout)| layout.contains_key(id))
            .map(|(device, _)| device.as_str())
            .collect()
    }

    /// Visit every copy of `id`, one per device that holds it.
    pub fn for_each_copy(&mut self, id: &str, mut f: impl FnMut(&mut CanvasItem)) -> usize {
        let mut visited = 0;
        for layout in self.layouts.values_mut() {
            if let Some(item) = layout.get_mut(id) {
                f(item);
                visited += 1;
            }
        }
        visited
    }

    /// Remove every item matching `predicate` from every device. Returns the
    /// distinct ids removed.
    pub fn prune(&mut self, mut predicate: impl FnMut(&CanvasItem) -> bool) -> Vec<ItemId> {
        let mut removed = Vec::new();
        for layout in self.layouts.values_mut() {
            layout.retain(|id, item| {
                if predicate(item) {
                    if !removed.contains(id) {
                        removed.push(id.clone());
                    }
                    false
                } else {
                    true
                }
            });
        }
        removed
    }

    /// Lowest bottom edge (`top + height`) among the items of `device`.
    pub fn lowest_edge(&self, device: &str) -> Option<f64> {
        self.layouts
            .get(device)?
            .values()
            .map(|item| item.top + item.height)
            .reduce(f64::max)
    }

    /// Mark `device` as having a saved layout.
    pub fn mark_saved(&mut self, device: &str) {
        self.saved.insert(device.to_string());
    }

    /// Whether `device` has a saved layout.
    pub fn is_saved(&self, device: &str) -> bool {
        self.saved.contains(device)
    }

    /// Devices with a saved layout.
    pub fn saved_devices(&self) -> impl Iterator<Item = &str> {
        self.saved.iter().map(String::as_str)
    }

    /// Number of items across all devices.
    pub fn total_items(&self) -> usize {
        self.layouts.values().map(HashMap::len).sum()
    }

    /// Whether no device has a layout.
    pub fn is_empty(&self) -> bool {
        self.layouts.is_empty()
    }

    /// Drop all layouts and saved markers.
    pub fn clear(&mut self) {
        self.layouts.clear();
        self.saved.clear();
    }

    /// Snapshot the store as a document.
    pub fn to_document(&self) -> LayoutDocument {
        let devices = self
            .layouts
            .iter()
            .map(|(device, layout)| {
                let items = layout
                    .iter()
                    .map(|(id, item)| (id.clone(), item.clone()))
                    .collect();
                (device.clone(), items)
            })
            .collect();
        LayoutDocument { devices }
    }

    /// Build a store from a document. Every device in the document counts
    /// as saved; devices that are not presets are dropped.
    pub fn from_document(document: LayoutDocument) -> Self {
        let mut store = Self::new();
        for (device, items) in document.devices {
            if DevicePreset::by_id(&device).is_none() {
                log::warn!("Dropping layout for unknown device {device}");
                continue;
            }
            store.set_layout(device.clone(), items.into_iter().collect());
            store.mark_saved(&device);
        }
        store
    }
}

/// The transport form of a [`LayoutStore`]: a JSON object keyed by device
/// id whose values are objects keyed by item id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LayoutDocument {
    pub devices: BTreeMap<DeviceId, BTreeMap<ItemId, CanvasItem>>,
}

impl LayoutDocument {
    /// Serialize the document to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize and validate a document.
    pub fn from_json(json: &str) -> Result<Self, LayoutError> {
        let mut document: Self = serde_json::from_str(json)?;
        for (device, items) in document.devices.iter_mut() {
            for (id, item) in items.iter_mut() {
                if item.width < 0.0 || item.height < 0.0 {
                    return Err(LayoutError::InvalidItem {
                        device: device.clone(),
                        item: id.clone(),
                        reason: format!("negative size {}x{}", item.width, item.height),
                    });
                }
                item.id.clone_from(id);
            }
        }
        Ok(document)
    }

    /// Number of device layouts in the document.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Whether the document holds no device layouts.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemKind, TITLE_ID};
    use kurbo::Rect;

    fn text_item(id: &str) -> CanvasItem {
        CanvasItem::new(id, ItemKind::CustomText, Rect::new(10.0, 20.0, 110.0, 70.0))
    }

    #[test]
    fn test_missing_layout_is_empty() {
        let store = LayoutStore::new();
        assert!(store.layout("mobile").is_none());
        assert!(store.layout_or_empty("mobile").is_empty());
    }

    #[test]
    fn test_ensure_layout_seeds_defaults_once() {
        let mut store = LayoutStore::new();
        let mobile = DevicePreset::by_id("mobile").unwrap();
        assert!(store.ensure_layout(mobile).contains_key(TITLE_ID));

        store.ensure_layout(mobile).remove(TITLE_ID);
        assert!(!store.ensure_layout(mobile).contains_key(TITLE_ID));
    }

    #[test]
    fn test_seeding_skips_exclusive_defaults() {
        let mut store = LayoutStore::new();
        let mobile = DevicePreset::by_id("mobile").unwrap();
        if let Some(title) = store.ensure_layout(mobile).get_mut(TITLE_ID) {
            title.device_specific = true;
        }

        let tablet = DevicePreset::by_id("tablet").unwrap();
        let layout = store.ensure_layout(tablet);
        assert!(!layout.contains_key(TITLE_ID));
        assert!(layout.contains_key(crate::item::POSTER_ID));
        assert_eq!(store.devices_containing(TITLE_ID), vec!["mobile"]);
    }

    #[test]
    fn test_insert_shared_reaches_every_preset() {
        let mut store = LayoutStore::new();
        store.insert_shared(text_item("custom-text-a"));
        assert_eq!(store.devices_containing("custom-text-a").len(), DEVICE_PRESETS.len());
    }

    #[test]
    fn test_remove_everywhere_is_idempotent() {
        let mut store = LayoutStore::new();
        store.insert_shared(text_item("custom-text-a"));
        let before = store.total_items();

        assert!(store.remove_everywhere("custom-text-a"));
        let after = store.total_items();
        assert_eq!(after, before - DEVICE_PRESETS.len());

        assert!(!store.remove_everywhere("custom-text-a"));
        assert_eq!(store.total_items(), after);
    }

    #[test]
    fn test_retain_only_on() {
        let mut store = LayoutStore::new();
        store.insert_shared(text_item("custom-text-a"));
        store.retain_only_on("custom-text-a", "mobile");
        assert_eq!(store.devices_containing("custom-text-a"), vec!["mobile"]);
    }

    #[test]
    fn test_prune_reports_distinct_ids() {
        let mut store = LayoutStore::new();
        store.insert_shared(text_item("custom-text-a"));
        store.insert_shared(text_item("custom-text-b"));
        let mut removed = store.prune(|item| item.id == "custom-text-a");
        removed.sort();
        assert_eq!(removed, vec!["custom-text-a".to_string()]);
        assert!(store.devices_containing("custom-text-a").is_empty());
        assert_eq!(store.devices_containing("custom-text-b").len(), DEVICE_PRESETS.len());
    }

    #[test]
    fn test_lowest_edge() {
        let mut store = LayoutStore::new();
        store.insert("tablet", text_item("a"));
        let mut low = text_item("b");
        low.top = 500.0;
        store.insert("tablet", low);
        assert_eq!(store.lowest_edge("tablet"), Some(550.0));
        assert_eq!(store.lowest_edge("mobile"), None);
    }

    #[test]
    fn test_document_round_trip() {
        let mut store = LayoutStore::new();
        store.insert_shared(text_item("custom-text-a"));
        if let Some(item) = store.item_mut("mobile", "custom-text-a") {
            item.content = Some("<p>hi</p>".to_string());
            item.left = -30.0;
        }

        let json = store.to_document().to_json().unwrap();
        let restored = LayoutStore::from_document(LayoutDocument::from_json(&json).unwrap());

        assert_eq!(restored.to_document(), store.to_document());
        let item = restored.item("mobile", "custom-text-a").unwrap();
        assert_eq!(item.id, "custom-text-a");
        assert!((item.left + 30.0).abs() < f64::EPSILON);
        assert!(restored.is_saved("mobile"));
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(LayoutDocument::from_json("not json"), Err(LayoutError::Parse(_))));
        assert!(matches!(LayoutDocument::from_json("[1, 2]"), Err(LayoutError::Parse(_))));
    }

    #[test]
    fn test_from_json_rejects_negative_size() {
        let json = r#"{"mobile":{"x":{"left":0,"top":0,"width":-1,"height":5,"type":"custom-text"}}}"#;
        assert!(matches!(
            LayoutDocument::from_json(json),
            Err(LayoutError::InvalidItem { .. })
        ));
    }

    #[test]
    fn test_unknown_devices_are_dropped() {
        let json = r#"{"watch":{"x":{"left":0,"top":0,"width":1,"height":5,"type":"video"}}}"#;
        let store = LayoutStore::from_document(LayoutDocument::from_json(json).unwrap());
        assert!(store.is_empty());
    }
}
