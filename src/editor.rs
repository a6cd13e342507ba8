//! The editing session: one document with its gesture engine and compositor.

use std::cmp::Ordering;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::buffer::{PixelBuffer, decode, encode_png};
use crate::compositor::{Compositor, Surface};
use crate::document::{Document, Layer, ZOrder};
use crate::engine::{EngineConfig, InputEvent, TransformEngine};
use crate::error::{Error, Result};
use crate::filter::{PixelFilter, SketchFilter};
use crate::geometry::{CANVAS_HEIGHT, CANVAS_WIDTH, Point};
use crate::grid::{GridConfig, GridLayout, format_hex_color};
use crate::settings::{EditorSettings, GridSettings, SketchSettings};

// ============================================================================
// Configurable Trait
// ============================================================================

/// Types that can be configured from [`EditorSettings`].
pub trait Configurable {
    /// Applies the settings. Nothing changes if any of them is invalid.
    fn apply_settings(&mut self, settings: &EditorSettings) -> Result<()>;

    /// Exports the current settings.
    fn export_settings(&self) -> EditorSettings;
}

// ============================================================================
// Editor
// ============================================================================

/// An editing session.
///
/// `Editor` wires the pieces together: decoded files become layers, input
/// events drive the [`TransformEngine`], filters derive new layers, and the
/// [`Compositor`] produces the on-screen and exported surfaces.
///
/// # Example
///
/// ```
/// use gridsketch::{Editor, InputEvent, Point, PixelBuffer};
///
/// let mut editor = Editor::new();
/// editor.add_buffer(PixelBuffer::filled(100, 100, [255, 0, 0, 255]), "red");
///
/// // Click the layer, drag it one cell right, release.
/// editor.handle_event(InputEvent::PointerDown(Point::new(10.0, 10.0))).unwrap();
/// editor.handle_event(InputEvent::PointerMove(Point::new(42.0, 10.0))).unwrap();
/// editor.handle_event(InputEvent::PointerUp).unwrap();
/// assert_eq!(editor.document().layers()[0].position, Point::new(32.0, 0.0));
///
/// let png = editor.export_png().unwrap();
/// assert_eq!(editor.export_file_name(), "grid-32px.png");
/// # assert!(!png.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct Editor {
    document: Document,
    engine: TransformEngine,
    compositor: Compositor,
    sketch: SketchFilter,
}

impl Editor {
    /// Creates an editor with an empty document and default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an editor configured from `settings`.
    pub fn with_settings(settings: &EditorSettings) -> Result<Self> {
        let mut editor = Self::new();
        editor.apply_settings(settings)?;
        Ok(editor)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Direct access for operations without an editor shortcut, such as
    /// renaming a layer.
    ///
    /// Changing layer indices through this bypasses gesture tracking; call
    /// [`TransformEngine::cancel`] via [`Editor::cancel_gesture`] first.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn engine(&self) -> &TransformEngine {
        &self.engine
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn sketch_darkness(&self) -> f32 {
        self.sketch.darkness
    }

    /// Sets the darkness used by [`Editor::apply_sketch_to_selected`].
    pub fn set_sketch_darkness(&mut self, darkness: f32) {
        self.sketch = SketchFilter::new(darkness);
    }

    // ------------------------------------------------------------------------
    // Layers
    // ------------------------------------------------------------------------

    /// Decodes a file and places it as the new top layer.
    ///
    /// Files that are not images or fail to decode are skipped with a warning
    /// and leave the document untouched.
    pub fn add_image(&mut self, bytes: &[u8], mime: &str, name: &str) -> Option<usize> {
        match decode(bytes, mime) {
            Ok(buffer) => Some(self.add_buffer(buffer, name)),
            Err(err) => {
                warn!(name, mime, error = %err, "skipping file");
                None
            }
        }
    }

    /// Places an already decoded buffer as the new top layer.
    pub fn add_buffer(&mut self, buffer: PixelBuffer, name: &str) -> usize {
        let inserted = self.document.insert_layer(buffer, name);
        self.engine.remap_layer(|i| Some(i + 1));
        inserted
    }

    /// Removes a layer. A gesture on that layer is cancelled.
    pub fn remove_layer(&mut self, index: usize) -> Result<Layer> {
        let removed = self.document.remove_layer(index)?;
        self.engine.remap_layer(|i| match i.cmp(&index) {
            Ordering::Less => Some(i),
            Ordering::Equal => None,
            Ordering::Greater => Some(i - 1),
        });
        Ok(removed)
    }

    pub fn reorder(&mut self, index: usize, order: ZOrder) -> Result<usize> {
        let target = self.document.reorder(index, order)?;
        self.engine.remap_layer(|i| Some(moved_index(i, index, target)));
        Ok(target)
    }

    pub fn select(&mut self, index: Option<usize>) -> Result<()> {
        self.document.set_selection(index)
    }

    /// Runs `filter` over layer `index` and inserts the result as a new,
    /// selected top layer with the same position and scale.
    ///
    /// The source layer is not modified. Returns the new layer's index (0).
    pub fn apply_filter(&mut self, index: usize, filter: &dyn PixelFilter) -> Result<usize> {
        let source = self
            .document
            .layer(index)
            .cloned()
            .ok_or(Error::LayerOutOfRange {
                index,
                len: self.document.len(),
            })?;

        let derived = Layer::new(
            filter.apply(source.source()),
            format!("{}{}", source.label, filter.label_suffix()),
            source.position,
            source.scale(),
        );
        let inserted = self.document.insert_placed(derived);
        self.engine.remap_layer(|i| Some(i + 1));
        self.document.set_selection(Some(inserted))?;
        debug!(from = index, label = %source.label, "derived layer");
        Ok(inserted)
    }

    /// Sketches the selected layer into a new top layer.
    ///
    /// Returns `None` without touching the document when nothing is selected.
    pub fn apply_sketch_to_selected(&mut self) -> Option<usize> {
        let index = self.document.selected()?;
        let filter = self.sketch;
        self.apply_filter(index, &filter).ok()
    }

    // ------------------------------------------------------------------------
    // Input
    // ------------------------------------------------------------------------

    /// Abandons the gesture in progress, if any.
    pub fn cancel_gesture(&mut self) {
        self.engine.cancel();
    }

    /// Feeds one canvas-space input event to the gesture engine.
    pub fn handle_event(&mut self, event: InputEvent) -> Result<()> {
        self.engine.handle_event(&mut self.document, event)
    }

    /// Maps a point on a `display_size` on-screen canvas to canvas pixels.
    ///
    /// A degenerate display size leaves the point unchanged.
    pub fn to_canvas_point(&self, display_point: Point, display_size: (f32, f32)) -> Point {
        let (width, height) = display_size;
        if width <= 0.0 || height <= 0.0 {
            return display_point;
        }
        Point::new(
            display_point.x * CANVAS_WIDTH as f32 / width,
            display_point.y * CANVAS_HEIGHT as f32 / height,
        )
    }

    // ------------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------------

    /// Renders the on-screen view, including the selection decoration.
    pub fn render(&mut self) -> Result<Arc<Surface>> {
        self.compositor.render(&self.document)
    }

    /// Renders the export view.
    pub fn export_surface(&mut self) -> Result<Arc<Surface>> {
        self.compositor.render_export(&self.document)
    }

    /// Renders the export view and encodes it as PNG.
    pub fn export_png(&mut self) -> Result<Vec<u8>> {
        let surface = self.export_surface()?;
        encode_png(&surface)
    }

    /// Suggested file name for the exported PNG.
    pub fn export_file_name(&self) -> String {
        match self.document.grid().layout() {
            GridLayout::Cells { size } => format!("grid-{size}px.png"),
            GridLayout::Divisions { rows, cols } => format!("grid-{rows}x{cols}.png"),
        }
    }

    /// Replaces the grid configuration.
    pub fn set_grid(&mut self, grid: GridConfig) {
        self.document.set_grid_config(grid);
    }
}

/// Where index `i` ends up after the layer at `from` is moved to `to`.
fn moved_index(i: usize, from: usize, to: usize) -> usize {
    if i == from {
        return to;
    }
    let after_removal = if i > from { i - 1 } else { i };
    if after_removal >= to { after_removal + 1 } else { after_removal }
}

impl Configurable for Editor {
    fn apply_settings(&mut self, settings: &EditorSettings) -> Result<()> {
        let grid = settings.grid.to_config()?;
        let background = settings.background_color()?;

        self.document.set_grid_config(grid);
        self.compositor.set_background(background);
        self.set_sketch_darkness(settings.sketch.darkness);
        self.engine.set_config(EngineConfig {
            pinch_noise_threshold: settings.pinch_noise_threshold.max(0.0),
        });
        debug!(?settings, "applied settings");
        Ok(())
    }

    fn export_settings(&self) -> EditorSettings {
        EditorSettings {
            grid: GridSettings::from(self.document.grid()),
            sketch: SketchSettings {
                darkness: self.sketch.darkness,
            },
            pinch_noise_threshold: self.engine.config().pinch_noise_threshold,
            background: format_hex_color(self.compositor.background().color),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
