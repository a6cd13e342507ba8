//! Reference grid configuration and rendering.
//!
//! The grid is a pure function of the surface size, the layout, the colour and
//! the opacity. [`grid_lines`] computes line coordinates; [`draw_grid`] strokes
//! them onto a rasterizer surface.

use palette::Srgb;
use resvg::tiny_skia::{Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::{Error, Result};
use crate::geometry::GRID_CELL_PX;

/// Stroke width of every grid line.
pub const GRID_LINE_WIDTH: f32 = 2.0;

/// Default grid colour (`#ff0000`).
pub const DEFAULT_GRID_COLOR: Srgb<u8> = Srgb::new(255, 0, 0);

/// Default grid opacity.
pub const DEFAULT_GRID_OPACITY: f32 = 0.8;

/// Largest row or column count accepted for a division grid.
pub const MAX_DIVISIONS: u32 = 100;

// ============================================================================
// GridLayout
// ============================================================================

/// How grid lines are spaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridLayout {
    /// Lines every `size` pixels, starting at 0 and including the last
    /// multiple that fits on the surface. Documents only accept
    /// [`GRID_CELL_PX`].
    Cells { size: u32 },
    /// The surface split into `rows × cols` equal cells; interior lines only.
    Divisions { rows: u32, cols: u32 },
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::Cells { size: GRID_CELL_PX }
    }
}

impl GridLayout {
    /// 3×3 preset.
    pub const NINE_GRID: Self = Self::Divisions { rows: 3, cols: 3 };

    /// 48×33 preset.
    pub const LARGE_GRID: Self = Self::Divisions { rows: 48, cols: 33 };

    /// Checks the layout against the supported ranges.
    pub fn validate(&self) -> Result<()> {
        match *self {
            Self::Cells { size } if size != GRID_CELL_PX => Err(Error::InvalidGrid {
                reason: format!("cell size must be {GRID_CELL_PX}px, got {size}"),
            }),
            Self::Divisions { rows, cols } if rows == 0 || cols == 0 => Err(Error::InvalidGrid {
                reason: "rows and columns must be greater than 0".into(),
            }),
            Self::Divisions { rows, cols } if rows > MAX_DIVISIONS || cols > MAX_DIVISIONS => {
                Err(Error::InvalidGrid {
                    reason: format!("rows and columns cannot exceed {MAX_DIVISIONS}"),
                })
            }
            _ => Ok(()),
        }
    }
}

// ============================================================================
// GridConfig
// ============================================================================

/// Grid settings stored on a document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    layout: GridLayout,
    color: Srgb<u8>,
    opacity: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            layout: GridLayout::default(),
            color: DEFAULT_GRID_COLOR,
            opacity: DEFAULT_GRID_OPACITY,
        }
    }
}

impl GridConfig {
    /// Creates a grid config. The opacity is clamped to 0.0-1.0.
    pub fn new(layout: GridLayout, color: Srgb<u8>, opacity: f32) -> Result<Self> {
        layout.validate()?;
        Ok(Self {
            layout,
            color,
            opacity: clamp_opacity(opacity),
        })
    }

    /// Creates a grid config from a `#rrggbb` colour string.
    pub fn from_hex(layout: GridLayout, color: &str, opacity: f32) -> Result<Self> {
        Self::new(layout, parse_hex_color(color)?, opacity)
    }

    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    pub fn color(&self) -> Srgb<u8> {
        self.color
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Cell size used for snapping layer geometry.
    ///
    /// Division grids are a visual aid only; snapping keeps the fixed cell.
    pub fn snap_cell(&self) -> u32 {
        match self.layout {
            GridLayout::Cells { size } => size,
            GridLayout::Divisions { .. } => GRID_CELL_PX,
        }
    }

    /// Colour as straight RGBA8 with the opacity folded into alpha.
    pub fn rgba(&self) -> [u8; 4] {
        [
            self.color.red,
            self.color.green,
            self.color.blue,
            (self.opacity * 255.0).round() as u8,
        ]
    }

    /// The colour as `#rrggbb`.
    pub fn color_hex(&self) -> String {
        format_hex_color(self.color)
    }
}

fn clamp_opacity(opacity: f32) -> f32 {
    if opacity.is_nan() { 0.0 } else { opacity.clamp(0.0, 1.0) }
}

// ============================================================================
// Colour helpers
// ============================================================================

/// Parses `#rrggbb` (or `#rgb`) into an sRGB colour.
pub fn parse_hex_color(value: &str) -> Result<Srgb<u8>> {
    value.trim().parse::<Srgb<u8>>().map_err(|e| Error::InvalidColor {
        value: value.to_string(),
        reason: e.to_string(),
    })
}

/// Formats an sRGB colour as lowercase `#rrggbb`.
pub fn format_hex_color(color: Srgb<u8>) -> String {
    format!("#{:02x}{:02x}{:02x}", color.red, color.green, color.blue)
}

// ============================================================================
// Line computation and drawing
// ============================================================================

/// Coordinates of the vertical (x) and horizontal (y) grid lines.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GridLines {
    pub vertical: Vec<f32>,
    pub horizontal: Vec<f32>,
}

/// Computes grid line coordinates for a `width × height` surface.
pub fn grid_lines(width: u32, height: u32, layout: GridLayout) -> GridLines {
    match layout {
        GridLayout::Cells { size } => GridLines {
            vertical: cell_lines(width, size),
            horizontal: cell_lines(height, size),
        },
        GridLayout::Divisions { rows, cols } => GridLines {
            vertical: division_lines(width, cols),
            horizontal: division_lines(height, rows),
        },
    }
}

fn cell_lines(extent: u32, size: u32) -> Vec<f32> {
    if size == 0 {
        return Vec::new();
    }
    (0..=extent / size).map(|k| (k * size) as f32).collect()
}

fn division_lines(extent: u32, parts: u32) -> Vec<f32> {
    let step = extent as f32 / parts.max(1) as f32;
    (1..parts).map(|i| step * i as f32).collect()
}

/// Strokes the grid for `config` over the whole of `pixmap`.
pub fn draw_grid(pixmap: &mut Pixmap, config: &GridConfig) {
    let (width, height) = (pixmap.width(), pixmap.height());
    let lines = grid_lines(width, height, config.layout);
    let (w, h) = (width as f32, height as f32);

    let mut pb = PathBuilder::new();
    for &x in &lines.vertical {
        pb.move_to(x, 0.0);
        pb.line_to(x, h);
    }
    for &y in &lines.horizontal {
        pb.move_to(0.0, y);
        pb.line_to(w, y);
    }
    let Some(path) = pb.finish() else {
        return;
    };

    let [r, g, b, a] = config.rgba();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    let stroke = Stroke {
        width: GRID_LINE_WIDTH,
        ..Stroke::default()
    };
    pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{CANVAS_HEIGHT, CANVAS_WIDTH};
    use resvg::tiny_skia::Color;

    #[test]
    fn cell_grid_lines_are_multiples_of_cell() {
        let lines = grid_lines(CANVAS_WIDTH, CANVAS_HEIGHT, GridLayout::default());
        assert_eq!(lines.vertical.len(), (CANVAS_WIDTH / 32 + 1) as usize);
        assert_eq!(lines.vertical.len(), 33);
        assert_eq!(lines.horizontal.len(), (CANVAS_HEIGHT / 32 + 1) as usize);
        for v in lines.vertical.iter().chain(&lines.horizontal) {
            assert_eq!(v % 32.0, 0.0);
        }
        assert_eq!(*lines.vertical.last().unwrap(), 1024.0);
        assert_eq!(*lines.horizontal.last().unwrap(), 1472.0);
    }

    #[test]
    fn cell_grid_includes_far_edge_when_divisible() {
        let lines = grid_lines(64, 64, GridLayout::Cells { size: 32 });
        assert_eq!(lines.vertical, vec![0.0, 32.0, 64.0]);
    }

    #[test]
    fn division_grid_has_interior_lines_only() {
        let lines = grid_lines(300, 90, GridLayout::NINE_GRID);
        assert_eq!(lines.vertical, vec![100.0, 200.0]);
        assert_eq!(lines.horizontal, vec![30.0, 60.0]);

        let single = grid_lines(300, 90, GridLayout::Divisions { rows: 1, cols: 1 });
        assert!(single.vertical.is_empty());
        assert!(single.horizontal.is_empty());
    }

    #[test]
    fn layout_validation() {
        assert!(GridLayout::LARGE_GRID.validate().is_ok());
        assert!(GridLayout::default().validate().is_ok());
        assert!(GridLayout::Cells { size: 0 }.validate().is_err());
        assert!(GridLayout::Cells { size: 16 }.validate().is_err());
        assert!(GridLayout::Divisions { rows: 0, cols: 3 }.validate().is_err());
        assert!(GridLayout::Divisions { rows: 3, cols: 101 }.validate().is_err());
    }

    #[test]
    fn default_config_matches_canvas_contract() {
        let config = GridConfig::default();
        assert_eq!(config.snap_cell(), 32);
        assert_eq!(config.color_hex(), "#ff0000");
        assert_eq!(config.rgba(), [255, 0, 0, 204]);
    }

    #[test]
    fn hex_colors_parse_and_format() {
        let color = parse_hex_color("#00ff80").unwrap();
        assert_eq!((color.red, color.green, color.blue), (0, 255, 128));
        assert_eq!(format_hex_color(color), "#00ff80");
        assert!(matches!(parse_hex_color("#zzzzzz"), Err(Error::InvalidColor { .. })));
    }

    #[test]
    fn opacity_is_clamped() {
        let config = GridConfig::new(GridLayout::default(), DEFAULT_GRID_COLOR, 3.0).unwrap();
        assert_eq!(config.opacity(), 1.0);
    }

    #[test]
    fn division_grid_still_snaps_to_cells() {
        let config = GridConfig::new(GridLayout::NINE_GRID, DEFAULT_GRID_COLOR, 0.5).unwrap();
        assert_eq!(config.snap_cell(), GRID_CELL_PX);
    }

    #[test]
    fn draw_grid_tints_line_pixels_only() {
        let mut pixmap = Pixmap::new(96, 96).unwrap();
        pixmap.fill(Color::WHITE);
        draw_grid(&mut pixmap, &GridConfig::default());

        // A 2px line centred on x = 32 covers columns 31 and 32.
        let on_line = pixmap.pixel(32, 10).unwrap();
        assert!(on_line.red() >= 250);
        assert!(on_line.green() < 100, "line pixel should be red-tinted");

        let off_line = pixmap.pixel(16, 16).unwrap();
        assert_eq!(
            (off_line.red(), off_line.green(), off_line.blue()),
            (255, 255, 255)
        );
    }
}
