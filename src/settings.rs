//! Serializable editor settings.
//!
//! [`EditorSettings`] captures everything about an editor that is
//! configuration rather than content: the grid, the sketch darkness, the pinch
//! noise threshold and the canvas background. Layers are never part of it.
//!
//! # Example
//!
//! ```
//! use gridsketch::{EditorSettings, GridSettings, SerializableGridLayout};
//!
//! let settings = EditorSettings::new().with_grid(GridSettings {
//!     color: "#0000ff".into(),
//!     opacity: 0.5,
//!     layout: SerializableGridLayout::Divisions { rows: 3, cols: 3 },
//! });
//!
//! let json = settings.to_json().unwrap();
//! let restored = EditorSettings::from_json(&json).unwrap();
//! assert_eq!(restored.grid.opacity, 0.5);
//! ```

use palette::{Srgb, Srgba, WithAlpha};
use serde::{Deserialize, Serialize};

use crate::compositor::DEFAULT_BACKGROUND;
use crate::engine::DEFAULT_PINCH_NOISE_THRESHOLD;
use crate::error::Result;
use crate::filter::DEFAULT_DARKNESS;
use crate::geometry::GRID_CELL_PX;
use crate::grid::{
    DEFAULT_GRID_COLOR, DEFAULT_GRID_OPACITY, GridConfig, GridLayout, format_hex_color,
    parse_hex_color,
};

// ============================================================================
// Grid Settings
// ============================================================================

/// Serializable version of [`GridLayout`].
///
/// ```json
/// { "kind": "cells", "size": 32 }
/// { "kind": "divisions", "rows": 48, "cols": 33 }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SerializableGridLayout {
    Cells { size: u32 },
    Divisions { rows: u32, cols: u32 },
}

impl Default for SerializableGridLayout {
    fn default() -> Self {
        Self::Cells { size: GRID_CELL_PX }
    }
}

impl From<GridLayout> for SerializableGridLayout {
    fn from(layout: GridLayout) -> Self {
        match layout {
            GridLayout::Cells { size } => Self::Cells { size },
            GridLayout::Divisions { rows, cols } => Self::Divisions { rows, cols },
        }
    }
}

impl From<SerializableGridLayout> for GridLayout {
    fn from(layout: SerializableGridLayout) -> Self {
        match layout {
            SerializableGridLayout::Cells { size } => Self::Cells { size },
            SerializableGridLayout::Divisions { rows, cols } => Self::Divisions { rows, cols },
        }
    }
}

/// Serializable grid settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct GridSettings {
    /// Line colour as `#rrggbb`.
    pub color: String,

    /// Line opacity (0.0-1.0).
    pub opacity: f32,

    pub layout: SerializableGridLayout,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            color: format_hex_color(DEFAULT_GRID_COLOR),
            opacity: DEFAULT_GRID_OPACITY,
            layout: SerializableGridLayout::default(),
        }
    }
}

impl GridSettings {
    /// Validates the settings into a [`GridConfig`].
    pub fn to_config(&self) -> Result<GridConfig> {
        GridConfig::from_hex(self.layout.into(), &self.color, self.opacity)
    }
}

impl From<&GridConfig> for GridSettings {
    fn from(config: &GridConfig) -> Self {
        Self {
            color: config.color_hex(),
            opacity: config.opacity(),
            layout: config.layout().into(),
        }
    }
}

/// Serializable sketch filter settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct SketchSettings {
    /// Ink darkness (0.0-1.0).
    pub darkness: f32,
}

impl Default for SketchSettings {
    fn default() -> Self {
        Self {
            darkness: DEFAULT_DARKNESS,
        }
    }
}

// ============================================================================
// EditorSettings
// ============================================================================

/// All editor settings in a JSON-friendly shape.
///
/// Missing fields fall back to their defaults, so `{}` is a valid document.
///
/// # JSON Format
///
/// ```json
/// {
///   "grid": { "color": "#ff0000", "opacity": 0.8, "layout": { "kind": "cells", "size": 32 } },
///   "sketch": { "darkness": 0.5 },
///   "pinchNoiseThreshold": 5.0,
///   "background": "#ffffff"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct EditorSettings {
    pub grid: GridSettings,

    pub sketch: SketchSettings,

    /// Pinch distance changes at or below this many pixels are ignored.
    pub pinch_noise_threshold: f32,

    /// Canvas background as `#rrggbb`.
    pub background: String,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            grid: GridSettings::default(),
            sketch: SketchSettings::default(),
            pinch_noise_threshold: DEFAULT_PINCH_NOISE_THRESHOLD,
            background: format_hex_color(DEFAULT_BACKGROUND.color),
        }
    }
}

impl EditorSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_grid(mut self, grid: GridSettings) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_sketch(mut self, sketch: SketchSettings) -> Self {
        self.sketch = sketch;
        self
    }

    pub fn with_background(mut self, background: impl Into<String>) -> Self {
        self.background = background.into();
        self
    }

    /// Parses the background into an opaque colour.
    pub fn background_color(&self) -> Result<Srgba<u8>> {
        let color: Srgb<u8> = parse_hex_color(&self.background)?;
        Ok(color.with_alpha(255))
    }

    /// Serializes the settings to a JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Serializes the settings to a pretty-printed JSON string.
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Deserializes settings from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn empty_settings_deserialize_to_defaults() {
        let settings = EditorSettings::from_json("{}").unwrap();
        assert_eq!(settings, EditorSettings::default());
        assert_eq!(settings.grid.color, "#ff0000");
        assert_eq!(settings.grid.layout, SerializableGridLayout::Cells { size: 32 });
        assert_eq!(settings.background, "#ffffff");
    }

    #[test]
    fn settings_json_format() {
        let json = EditorSettings::new().to_json_pretty().unwrap();
        assert!(json.contains("\"pinchNoiseThreshold\""));
        assert!(json.contains("\"kind\": \"cells\""));
        assert!(json.contains("\"darkness\""));
    }

    #[test]
    fn division_layout_roundtrip() {
        let settings = EditorSettings::new().with_grid(GridSettings {
            color: "#00ff00".into(),
            opacity: 0.25,
            layout: GridLayout::LARGE_GRID.into(),
        });
        let json = settings.to_json().unwrap();
        assert!(json.contains("\"divisions\""));

        let restored = EditorSettings::from_json(&json).unwrap();
        let config = restored.grid.to_config().unwrap();
        assert_eq!(config.layout(), GridLayout::Divisions { rows: 48, cols: 33 });
        assert_eq!(config.color_hex(), "#00ff00");
    }

    #[test]
    fn partial_grid_settings_keep_other_defaults() {
        let settings = EditorSettings::from_json(r#"{ "grid": { "opacity": 0.3 } }"#).unwrap();
        assert_eq!(settings.grid.opacity, 0.3);
        assert_eq!(settings.grid.color, "#ff0000");
        assert_eq!(settings.sketch.darkness, DEFAULT_DARKNESS);
    }

    #[test]
    fn invalid_json_is_a_settings_error() {
        let err = EditorSettings::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::Settings(_)));
    }

    #[test]
    fn invalid_grid_settings_are_rejected() {
        let bad_color = GridSettings {
            color: "red-ish".into(),
            ..GridSettings::default()
        };
        assert!(matches!(bad_color.to_config(), Err(Error::InvalidColor { .. })));

        let bad_layout = GridSettings {
            layout: SerializableGridLayout::Divisions { rows: 0, cols: 3 },
            ..GridSettings::default()
        };
        assert!(matches!(bad_layout.to_config(), Err(Error::InvalidGrid { .. })));

        let odd_cells = EditorSettings::from_json(r#"{ "grid": { "layout": { "kind": "cells", "size": 20 } } }"#)
            .unwrap();
        assert!(matches!(odd_cells.grid.to_config(), Err(Error::InvalidGrid { .. })));
    }

    #[test]
    fn background_parses_as_opaque() {
        let settings = EditorSettings::new().with_background("#102030");
        let color = settings.background_color().unwrap();
        assert_eq!((color.red, color.green, color.blue, color.alpha), (16, 32, 48, 255));
    }

    #[test]
    fn grid_config_converts_to_settings() {
        let config = GridConfig::default();
        let settings = GridSettings::from(&config);
        assert_eq!(settings, GridSettings::default());
    }
}
