//! Canvas items: the positioned blocks placed on a device layout.

use crate::device::DevicePreset;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Identifier of a canvas item. Structural items use fixed ids, custom items
/// a generated id prefixed by their type tag.
pub type ItemId = String;

/// Fixed id of the poster image field.
pub const POSTER_ID: &str = "poster";
/// Fixed id of the title field.
pub const TITLE_ID: &str = "title";
/// Fixed id of the description field.
pub const DESCRIPTION_ID: &str = "description";
/// Fixed id of the project video.
pub const VIDEO_ID: &str = "video";

/// Ids of the items every layout is seeded with.
pub const STRUCTURAL_IDS: [&str; 4] = [POSTER_ID, TITLE_ID, DESCRIPTION_ID, VIDEO_ID];

/// Horizontal and vertical gap around seeded structural fields.
const SEED_GUTTER: f64 = 40.0;

/// The kind of block an item holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ItemKind {
    /// A predefined project field (poster, title, description).
    StructuralField,
    /// User-authored rich text.
    CustomText,
    /// User-placed image.
    CustomImage,
    /// Video block (the project video or a drawn placeholder).
    Video,
}

impl ItemKind {
    /// Whether items of this kind carry a `content` value.
    pub fn has_content(self) -> bool {
        matches!(self, Self::CustomText | Self::CustomImage)
    }

    /// Prefix used when generating ids for user-created items.
    pub fn id_prefix(self) -> &'static str {
        match self {
            Self::StructuralField => "field",
            Self::CustomText => "custom-text",
            Self::CustomImage => "custom-image",
            Self::Video => "custom-video",
        }
    }

    /// Stacking layer for absolute positioning. Custom blocks sit above
    /// the structural fields.
    fn layer(self) -> i32 {
        match self {
            Self::StructuralField | Self::Video => 1,
            Self::CustomImage => 2,
            Self::CustomText => 3,
        }
    }
}

/// One placed block on a device layout.
///
/// The id is the key of the item inside its device map and is not part of
/// the serialized record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasItem {
    #[serde(skip)]
    pub id: ItemId,
    /// Distance from the viewport's left edge. May be negative.
    pub left: f64,
    /// Distance from the viewport's top edge. May be negative.
    pub top: f64,
    pub width: f64,
    pub height: f64,
    #[serde(rename = "type")]
    pub kind: ItemKind,
    /// Sanitized rich text or an image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Set when the item lives in exactly one device layout.
    #[serde(
        default,
        rename = "isDeviceSpecific",
        skip_serializing_if = "std::ops::Not::not"
    )]
    pub device_specific: bool,
}

impl CanvasItem {
    /// Create an item covering `bounds`.
    pub fn new(id: impl Into<ItemId>, kind: ItemKind, bounds: Rect) -> Self {
        let bounds = bounds.abs();
        Self {
            id: id.into(),
            left: bounds.x0,
            top: bounds.y0,
            width: bounds.width(),
            height: bounds.height(),
            kind,
            content: kind.has_content().then(String::new),
            device_specific: false,
        }
    }

    /// Create a user item with a freshly generated id.
    pub fn new_custom(kind: ItemKind, bounds: Rect) -> Self {
        Self::new(generate_item_id(kind), kind, bounds)
    }

    /// Top-left corner.
    pub fn position(&self) -> Point {
        Point::new(self.left, self.top)
    }

    /// Bounding box in device pixels.
    pub fn bounds(&self) -> Rect {
        Rect::new(
            self.left,
            self.top,
            self.left + self.width,
            self.top + self.height,
        )
    }

    /// Replace position and size with `bounds`.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.left = bounds.x0;
        self.top = bounds.y0;
        self.width = bounds.width();
        self.height = bounds.height();
    }

    /// Move the item so its top-left corner sits at `position`.
    pub fn move_to(&mut self, position: Point) {
        self.left = position.x;
        self.top = position.y;
    }

    /// Shift the item by `delta`.
    pub fn translate(&mut self, delta: Vec2) {
        self.left += delta.x;
        self.top += delta.y;
    }

    /// Whether this is one of the predefined project fields.
    pub fn is_structural(&self) -> bool {
        STRUCTURAL_IDS.contains(&self.id.as_str())
    }

    /// Whether the item can be deleted by the user.
    pub fn is_removable(&self) -> bool {
        !self.is_structural()
    }

    /// Whether a content-bearing item has anything worth keeping.
    ///
    /// Markup alone (`<p><br></p>`) and non-breaking spaces do not count.
    /// Items without content (structural fields, video) always count as
    /// filled.
    pub fn has_visible_content(&self) -> bool {
        if !self.kind.has_content() {
            return true;
        }
        let Some(content) = self.content.as_deref() else {
            return false;
        };
        match self.kind {
            ItemKind::CustomImage => !content.trim().is_empty(),
            _ => !strip_markup(content).trim().is_empty(),
        }
    }

    /// Absolute-positioning style values for this item.
    pub fn style(&self) -> ItemStyle {
        ItemStyle {
            left: self.left,
            top: self.top,
            width: self.width,
            height: self.height,
            z_index: self.kind.layer(),
            visible: true,
        }
    }
}

/// Absolute-positioning style handed to the renderer.
///
/// The default value (all zero, not visible) is what unknown ids resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStyle {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    pub z_index: i32,
    pub visible: bool,
}

/// A partial geometry/content update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub left: Option<f64>,
    pub top: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
    pub content: Option<String>,
}

impl ItemUpdate {
    /// Update only the position.
    pub fn position(position: Point) -> Self {
        Self {
            left: Some(position.x),
            top: Some(position.y),
            ..Self::default()
        }
    }

    /// Update position and size.
    pub fn bounds(bounds: Rect) -> Self {
        Self {
            left: Some(bounds.x0),
            top: Some(bounds.y0),
            width: Some(bounds.width()),
            height: Some(bounds.height()),
            content: None,
        }
    }

    /// Apply the present fields to `item`.
    pub fn apply(&self, item: &mut CanvasItem) {
        if let Some(left) = self.left {
            item.left = left;
        }
        if let Some(top) = self.top {
            item.top = top;
        }
        if let Some(width) = self.width {
            item.width = width;
        }
        if let Some(height) = self.height {
            item.height = height;
        }
        if let Some(content) = &self.content {
            item.content = Some(content.clone());
        }
    }
}

/// Generate a unique id for a user-created item of `kind`.
pub fn generate_item_id(kind: ItemKind) -> ItemId {
    format!("{}-{}", kind.id_prefix(), Uuid::new_v4().simple())
}

/// The structural fields a fresh layout for `preset` starts with: title,
/// description, poster and video stacked in a single column.
pub fn structural_defaults(preset: &DevicePreset) -> HashMap<ItemId, CanvasItem> {
    let column = (preset.width - 2.0 * SEED_GUTTER).max(0.0);
    let media_height = (column * 9.0 / 16.0).round();

    let mut top = SEED_GUTTER;
    let mut stack = |id: &str, kind: ItemKind, height: f64| {
        let bounds = Rect::new(SEED_GUTTER, top, SEED_GUTTER + column, top + height);
        top += height + SEED_GUTTER;
        (id.to_string(), CanvasItem::new(id, kind, bounds))
    };

    [
        stack(TITLE_ID, ItemKind::StructuralField, 80.0),
        stack(DESCRIPTION_ID, ItemKind::StructuralField, 160.0),
        stack(POSTER_ID, ItemKind::StructuralField, media_height),
        stack(VIDEO_ID, ItemKind::Video, media_height),
    ]
    .into_iter()
    .collect()
}

/// Drop everything between `<` and `>` and decode the whitespace entities
/// rich-text editors leave behind.
fn strip_markup(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    text.replace("&nbsp;", " ").replace('\u{a0}', " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_from_reversed_bounds() {
        let item = CanvasItem::new(
            "custom-text-1",
            ItemKind::CustomText,
            Rect::new(250.0, 130.0, 50.0, 50.0),
        );
        assert!((item.left - 50.0).abs() < f64::EPSILON);
        assert!((item.top - 50.0).abs() < f64::EPSILON);
        assert!((item.width - 200.0).abs() < f64::EPSILON);
        assert!((item.height - 80.0).abs() < f64::EPSILON);
        assert_eq!(item.content.as_deref(), Some(""));
    }

    #[test]
    fn test_generated_ids_carry_type_prefix() {
        let text = generate_item_id(ItemKind::CustomText);
        let image = generate_item_id(ItemKind::CustomImage);
        assert!(text.starts_with("custom-text-"));
        assert!(image.starts_with("custom-image-"));
        assert_ne!(text, generate_item_id(ItemKind::CustomText));
    }

    #[test]
    fn test_structural_defaults_fit_width() {
        let preset = DevicePreset::by_id("mobile").unwrap();
        let defaults = structural_defaults(preset);
        assert_eq!(defaults.len(), STRUCTURAL_IDS.len());
        for item in defaults.values() {
            assert!(item.is_structural());
            assert!(item.bounds().x1 <= preset.width);
            assert!(item.left >= 0.0);
        }
        assert_eq!(defaults[VIDEO_ID].kind, ItemKind::Video);
        assert!(defaults[TITLE_ID].top < defaults[DESCRIPTION_ID].top);
    }

    #[test]
    fn test_visible_content() {
        let mut item = CanvasItem::new_custom(ItemKind::CustomText, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(!item.has_visible_content());

        item.content = Some("<p><br></p>".to_string());
        assert!(!item.has_visible_content());

        item.content = Some("<p>&nbsp;</p>".to_string());
        assert!(!item.has_visible_content());

        item.content = Some("<p>Hello</p>".to_string());
        assert!(item.has_visible_content());

        let video = CanvasItem::new_custom(ItemKind::Video, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(video.content.is_none());
        assert!(video.has_visible_content());
    }

    #[test]
    fn test_item_update_is_partial() {
        let mut item = CanvasItem::new("a", ItemKind::CustomImage, Rect::new(0.0, 0.0, 100.0, 50.0));
        ItemUpdate::position(Point::new(10.0, -5.0)).apply(&mut item);
        assert!((item.left - 10.0).abs() < f64::EPSILON);
        assert!((item.top + 5.0).abs() < f64::EPSILON);
        assert!((item.width - 100.0).abs() < f64::EPSILON);
        assert!((item.height - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_serialized_record_shape() {
        let mut item = CanvasItem::new("custom-text-x", ItemKind::CustomText, Rect::new(1.0, 2.0, 4.0, 6.0));
        item.device_specific = true;
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["type"], "custom-text");
        assert_eq!(value["isDeviceSpecific"], true);
        assert!(value.get("id").is_none());

        let shared = CanvasItem::new("title", ItemKind::StructuralField, Rect::new(0.0, 0.0, 1.0, 1.0));
        let value = serde_json::to_value(&shared).unwrap();
        assert!(value.get("isDeviceSpecific").is_none());
        assert!(value.get("content").is_none());
    }
}
