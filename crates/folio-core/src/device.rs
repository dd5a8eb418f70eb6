//! Device preset registry.
//!
//! Every piece of per-device state is keyed by a preset id. The table is
//! ordered by increasing width; nearest-width selection depends on it.

use kurbo::{Rect, Size};
use serde::Serialize;

/// Identifier of a device preset (`"mobile"`, `"tablet"`, ...).
pub type DeviceId = String;

/// Id of the preset used when nothing else has been selected.
pub const DEFAULT_DEVICE_ID: &str = "desktop";

/// A named viewport size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DevicePreset {
    /// Stable key used in layout documents.
    pub id: &'static str,
    /// Human readable label.
    pub name: &'static str,
    /// Viewport width in pixels.
    pub width: f64,
    /// Viewport height in pixels.
    pub height: f64,
}

/// All presets, narrowest first.
pub const DEVICE_PRESETS: &[DevicePreset] = &[
    DevicePreset {
        id: "mobile",
        name: "Mobile",
        width: 375.0,
        height: 812.0,
    },
    DevicePreset {
        id: "tablet",
        name: "Tablet",
        width: 768.0,
        height: 1024.0,
    },
    DevicePreset {
        id: "desktop",
        name: "Desktop",
        width: 1440.0,
        height: 900.0,
    },
    DevicePreset {
        id: "desktop-wide",
        name: "Desktop Wide",
        width: 2560.0,
        height: 1440.0,
    },
];

/// Upper width bounds of the static fallback table, checked in order.
const WIDTH_FALLBACKS: &[(f64, &str)] = &[
    (414.0, "mobile"),
    (768.0, "tablet"),
    (1920.0, "desktop"),
];

impl DevicePreset {
    /// Look up a preset by id.
    pub fn by_id(id: &str) -> Option<&'static DevicePreset> {
        DEVICE_PRESETS.iter().find(|preset| preset.id == id)
    }

    /// The preset used when no selection has been made.
    pub fn default_preset() -> &'static DevicePreset {
        Self::by_id(DEFAULT_DEVICE_ID).unwrap_or(&DEVICE_PRESETS[0])
    }

    /// Pick a preset from the static width-range table.
    pub fn for_viewport_width(width: f64) -> &'static DevicePreset {
        let id = WIDTH_FALLBACKS
            .iter()
            .find(|(max, _)| width <= *max)
            .map(|(_, id)| *id)
            .unwrap_or("desktop-wide");
        Self::by_id(id).unwrap_or_else(Self::default_preset)
    }

    /// Viewport size.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Viewport rectangle with its origin at the top-left corner.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Choose the preset to show an end user whose viewport is `viewport_width`
/// pixels wide.
///
/// Presets that have a saved layout win, nearest width first (ties go to the
/// narrower preset). Without any saved layout the static width table decides.
pub fn auto_select_device<'a, I>(viewport_width: f64, saved: I) -> &'static DevicePreset
where
    I: IntoIterator<Item = &'a str>,
{
    let saved: Vec<&str> = saved.into_iter().collect();
    DEVICE_PRESETS
        .iter()
        .filter(|preset| saved.contains(&preset.id))
        .fold(None::<&'static DevicePreset>, |best, preset| match best {
            Some(current)
                if (current.width - viewport_width).abs()
                    <= (preset.width - viewport_width).abs() =>
            {
                Some(current)
            }
            _ => Some(preset),
        })
        .unwrap_or_else(|| DevicePreset::for_viewport_width(viewport_width))
}
