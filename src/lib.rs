//! gridsketch: a grid-aligned image composition engine.
//!
//! Decoded images are placed as layers on a fixed 1051×1500 canvas, moved and
//! resized with pointer or pinch gestures that always land on a 32px grid, and
//! rendered with a reference grid on top. Any layer can be turned into a
//! pencil sketch, which is added as a new layer.
//!
//! # Example
//!
//! ```
//! use gridsketch::{Editor, PixelBuffer, Point, InputEvent, ZOrder};
//!
//! let mut editor = Editor::new();
//! editor.add_buffer(PixelBuffer::filled(200, 200, [0, 128, 255, 255]), "photo");
//! editor.add_buffer(PixelBuffer::filled(100, 100, [255, 0, 0, 255]), "stamp");
//!
//! // Send the stamp behind the photo; it stays selected at its new index.
//! let index = editor.reorder(0, ZOrder::ToBack).unwrap();
//! assert_eq!(index, 1);
//!
//! // Derive a sketch of the selected layer.
//! let sketch = editor.apply_sketch_to_selected();
//! assert_eq!(sketch, Some(0));
//!
//! // Drag the sketch two cells down.
//! editor.handle_event(InputEvent::PointerDown(Point::new(60.0, 60.0))).unwrap();
//! editor.handle_event(InputEvent::PointerMove(Point::new(60.0, 124.0))).unwrap();
//! editor.handle_event(InputEvent::PointerUp).unwrap();
//!
//! let png = editor.export_png().unwrap();
//! # assert!(!png.is_empty());
//! ```
//!
//! # Settings
//!
//! Grid, sketch and gesture settings round-trip through JSON with
//! [`EditorSettings`] and the [`Configurable`] trait:
//!
//! ```
//! use gridsketch::{Configurable, Editor, EditorSettings};
//!
//! let mut editor = Editor::new();
//! let settings = EditorSettings::from_json(r##"{ "grid": { "color": "#0000ff" } }"##).unwrap();
//! editor.apply_settings(&settings).unwrap();
//!
//! let json = editor.export_settings().to_json().unwrap();
//! assert!(json.contains("#0000ff"));
//! ```

mod buffer;
mod compositor;
mod document;
mod editor;
mod engine;
mod error;
mod filter;
mod geometry;
mod grid;
mod settings;

pub use buffer::{PixelBuffer, decode, encode_png};
pub use compositor::{
    Compositor, DEFAULT_BACKGROUND, HANDLE_SIZE, HitResult, Surface, handle_rect, hit_test,
    render_document,
};
pub use document::{Document, INITIAL_SCALE, Layer, PLACEMENT_CYCLE, ZOrder};
pub use editor::{Configurable, Editor};
pub use engine::{
    AnchorGeometry, DEFAULT_PINCH_NOISE_THRESHOLD, EngineConfig, EngineState, InputEvent,
    TransformEngine,
};
pub use error::{Error, Result};
pub use filter::{DEFAULT_DARKNESS, PixelFilter, SketchFilter, sketch};
pub use geometry::{
    CANVAS_HEIGHT, CANVAS_SIZE, CANVAS_WIDTH, Corner, GRID_CELL_PX, MAX_SCALE, MIN_SCALE, Point,
    Rect, SizePx, clamp_scale, clamp_snap, quantize_delta, snap,
};
pub use grid::{
    DEFAULT_GRID_COLOR, DEFAULT_GRID_OPACITY, GRID_LINE_WIDTH, GridConfig, GridLayout, GridLines,
    MAX_DIVISIONS, format_hex_color, grid_lines, parse_hex_color,
};
pub use settings::{EditorSettings, GridSettings, SerializableGridLayout, SketchSettings};
