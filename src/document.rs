//! The layered document: an ordered stack of placed images plus grid settings.
//!
//! Layer order encodes z-order: index 0 is the topmost layer (drawn last) and
//! new layers are inserted there. Layers hold shared [`PixelBuffer`]s, so
//! cloning a document is a cheap snapshot that can be rendered while the
//! original keeps being edited.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use crate::buffer::PixelBuffer;
use crate::error::{Error, Result};
use crate::geometry::{
    CANVAS_SIZE, GRID_CELL_PX, Point, Rect, SizePx, clamp_scale, clamp_snap,
};
use crate::grid::GridConfig;

/// Scale given to newly placed images.
pub const INITIAL_SCALE: f32 = 0.5;

/// Number of insertions after which the placement offset wraps back to zero.
pub const PLACEMENT_CYCLE: usize = 10;

// Revisions are drawn from one process-wide counter so two documents only
// share a revision when one is an unmodified clone of the other.
static NEXT_REVISION: AtomicU64 = AtomicU64::new(1);

fn next_revision() -> u64 {
    NEXT_REVISION.fetch_add(1, Ordering::Relaxed)
}

// ============================================================================
// Layer
// ============================================================================

/// One placed image.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    source: PixelBuffer,
    /// Top-left corner in canvas coordinates.
    pub position: Point,
    scale: f32,
    /// Display name only.
    pub label: String,
}

impl Layer {
    /// Creates a layer at `position` with a clamped `scale`.
    pub fn new(source: PixelBuffer, label: impl Into<String>, position: Point, scale: f32) -> Self {
        Self {
            source,
            position,
            scale: clamp_scale(scale),
            label: label.into(),
        }
    }

    pub fn source(&self) -> &PixelBuffer {
        &self.source
    }

    pub fn natural_width(&self) -> u32 {
        self.source.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.source.height()
    }

    /// Uniform scale, always within `[MIN_SCALE, MAX_SCALE]`.
    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn rendered_width(&self) -> f32 {
        self.natural_width() as f32 * self.scale
    }

    pub fn rendered_height(&self) -> f32 {
        self.natural_height() as f32 * self.scale
    }

    /// The layer's rendered bounding box in canvas coordinates.
    pub fn bounds(&self) -> Rect {
        Rect::from_origin(self.position, self.rendered_width(), self.rendered_height())
    }

    /// Rendered size at a hypothetical scale (clamped like a stored one).
    pub fn size_at(&self, scale: f32) -> (f32, f32) {
        let scale = clamp_scale(scale);
        (
            self.natural_width() as f32 * scale,
            self.natural_height() as f32 * scale,
        )
    }
}

// ============================================================================
// Document
// ============================================================================

/// Where [`Document::reorder`] moves a layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZOrder {
    /// Index 0, drawn on top of everything.
    ToFront,
    /// Last index, drawn beneath everything.
    ToBack,
}

/// Ordered layer stack, selection and grid configuration.
#[derive(Debug, Clone)]
pub struct Document {
    layers: Vec<Layer>,
    selected: Option<usize>,
    grid: GridConfig,
    revision: u64,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document with the default grid.
    pub fn new() -> Self {
        Self::with_grid(GridConfig::default())
    }

    pub fn with_grid(grid: GridConfig) -> Self {
        Self {
            layers: Vec::new(),
            selected: None,
            grid,
            revision: next_revision(),
        }
    }

    /// Fixed canvas size every layer and the grid are defined in.
    pub fn canvas_size(&self) -> SizePx {
        CANVAS_SIZE
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer(&self, index: usize) -> Option<&Layer> {
        self.layers.get(index)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// The currently selected layer, if any.
    pub fn selected_layer(&self) -> Option<&Layer> {
        self.selected.and_then(|i| self.layers.get(i))
    }

    pub fn grid(&self) -> &GridConfig {
        &self.grid
    }

    /// Changes on every mutation. Documents with equal revisions render identically.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn touch(&mut self) {
        self.revision = next_revision();
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index < self.layers.len() {
            Ok(())
        } else {
            Err(Error::LayerOutOfRange {
                index,
                len: self.layers.len(),
            })
        }
    }

    /// Offset for the next placed image; cycles every [`PLACEMENT_CYCLE`] layers.
    pub fn next_placement(&self) -> Point {
        let step = (self.layers.len() % PLACEMENT_CYCLE) as f32 * GRID_CELL_PX as f32;
        Point::new(step, step)
    }

    /// Places a decoded image as the new top layer and returns its index (0).
    pub fn insert_layer(&mut self, source: PixelBuffer, name: impl Into<String>) -> usize {
        let position = self.next_placement();
        self.insert_placed(Layer::new(source, name, position, INITIAL_SCALE))
    }

    /// Inserts an already positioned layer on top of the stack.
    pub fn insert_placed(&mut self, layer: Layer) -> usize {
        debug!(label = %layer.label, x = layer.position.x, y = layer.position.y, "insert layer");
        self.layers.insert(0, layer);
        if let Some(selected) = self.selected.as_mut() {
            *selected += 1;
        }
        self.touch();
        0
    }

    /// Removes a layer permanently, returning it.
    ///
    /// The selection is cleared if it pointed at the removed layer and shifted
    /// down if it pointed below it.
    pub fn remove_layer(&mut self, index: usize) -> Result<Layer> {
        self.check_index(index)?;
        let layer = self.layers.remove(index);
        self.selected = match self.selected {
            Some(s) if s == index => None,
            Some(s) if s > index => Some(s - 1),
            other => other,
        };
        debug!(index, label = %layer.label, "remove layer");
        self.touch();
        Ok(layer)
    }

    /// Moves a layer to the front or back and selects it at its new index.
    ///
    /// Returns the new index. A layer already at the target end is left alone.
    pub fn reorder(&mut self, index: usize, order: ZOrder) -> Result<usize> {
        self.check_index(index)?;
        let target = match order {
            ZOrder::ToFront => 0,
            ZOrder::ToBack => self.layers.len() - 1,
        };
        if index == target {
            return Ok(index);
        }

        let layer = self.layers.remove(index);
        self.layers.insert(target, layer);
        self.selected = Some(target);
        debug!(from = index, to = target, "reorder layer");
        self.touch();
        Ok(target)
    }

    /// Selects a layer, or clears the selection with `None`.
    pub fn set_selection(&mut self, index: Option<usize>) -> Result<()> {
        if let Some(i) = index {
            self.check_index(i)?;
        }
        if self.selected != index {
            self.selected = index;
            self.touch();
        }
        Ok(())
    }

    /// Stores new geometry for a layer. The scale is clamped, never rejected.
    pub fn set_layer_geometry(&mut self, index: usize, position: Point, scale: f32) -> Result<()> {
        self.check_index(index)?;
        let layer = &mut self.layers[index];
        let scale = clamp_scale(scale);
        if layer.position != position || layer.scale != scale {
            layer.position = position;
            layer.scale = scale;
            self.touch();
        }
        Ok(())
    }

    /// Clamps a layer's rendered box into the canvas and snaps it to the grid.
    ///
    /// Called when a gesture is released.
    pub fn commit_layer(&mut self, index: usize) -> Result<()> {
        self.check_index(index)?;
        let layer = &self.layers[index];
        let cell = self.grid.snap_cell() as f32;
        let canvas = self.canvas_size();
        let position = Point::new(
            clamp_snap(layer.position.x, layer.rendered_width(), canvas.width as f32, cell),
            clamp_snap(layer.position.y, layer.rendered_height(), canvas.height as f32, cell),
        );
        let scale = layer.scale;
        self.set_layer_geometry(index, position, scale)
    }

    /// Replaces the grid configuration.
    pub fn set_grid_config(&mut self, grid: GridConfig) {
        if self.grid != grid {
            self.grid = grid;
            self.touch();
        }
    }

    /// Renames a layer.
    pub fn set_label(&mut self, index: usize, label: impl Into<String>) -> Result<()> {
        self.check_index(index)?;
        self.layers[index].label = label.into();
        self.touch();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{MAX_SCALE, MIN_SCALE};

    fn solid(rgba: [u8; 4]) -> PixelBuffer {
        PixelBuffer::filled(100, 100, rgba)
    }

    fn labels(doc: &Document) -> Vec<&str> {
        doc.layers().iter().map(|l| l.label.as_str()).collect()
    }

    #[test]
    fn insert_goes_on_top_with_initial_scale() {
        let mut doc = Document::new();
        assert_eq!(doc.insert_layer(solid([255, 0, 0, 255]), "a"), 0);
        let layer = doc.layer(0).unwrap();
        assert_eq!(layer.scale(), INITIAL_SCALE);
        assert_eq!(layer.position, Point::ORIGIN);
        assert_eq!(layer.rendered_width(), 50.0);
        assert_eq!(layer.rendered_height(), 50.0);

        doc.insert_layer(solid([0, 255, 0, 255]), "b");
        assert_eq!(labels(&doc), ["b", "a"]);
    }

    #[test]
    fn placement_offset_cycles_every_ten() {
        let mut doc = Document::new();
        for i in 0..11 {
            doc.insert_layer(solid([0, 0, 0, 255]), format!("l{i}"));
        }
        assert_eq!(doc.layer(0).unwrap().position, Point::ORIGIN);
        assert_eq!(doc.layer(1).unwrap().position, Point::new(288.0, 288.0));
        assert_eq!(doc.layer(9).unwrap().position, Point::new(32.0, 32.0));
    }

    #[test]
    fn insert_keeps_selected_layer_identity() {
        let mut doc = Document::new();
        doc.insert_layer(solid([0, 0, 0, 255]), "a");
        doc.set_selection(Some(0)).unwrap();
        doc.insert_layer(solid([0, 0, 0, 255]), "b");
        assert_eq!(doc.selected_layer().unwrap().label, "a");
    }

    #[test]
    fn remove_clears_or_shifts_selection() {
        let mut doc = Document::new();
        for name in ["c", "b", "a"] {
            doc.insert_layer(solid([0, 0, 0, 255]), name);
        }
        doc.set_selection(Some(2)).unwrap();
        doc.remove_layer(0).unwrap();
        assert_eq!(doc.selected(), Some(1));
        assert_eq!(doc.selected_layer().unwrap().label, "c");

        doc.remove_layer(1).unwrap();
        assert_eq!(doc.selected(), None);
        assert_eq!(labels(&doc), ["b"]);
    }

    #[test]
    fn remove_out_of_range_is_an_error() {
        let mut doc = Document::new();
        let err = doc.remove_layer(0).unwrap_err();
        assert!(matches!(err, Error::LayerOutOfRange { index: 0, len: 0 }));
    }

    #[test]
    fn reorder_to_front_and_back() {
        let mut doc = Document::new();
        for name in ["c", "b", "a"] {
            doc.insert_layer(solid([0, 0, 0, 255]), name);
        }
        assert_eq!(labels(&doc), ["a", "b", "c"]);

        assert_eq!(doc.reorder(2, ZOrder::ToFront).unwrap(), 0);
        assert_eq!(labels(&doc), ["c", "a", "b"]);
        assert_eq!(doc.selected(), Some(0));

        assert_eq!(doc.reorder(0, ZOrder::ToBack).unwrap(), 2);
        assert_eq!(labels(&doc), ["a", "b", "c"]);
        assert_eq!(doc.selected(), Some(2));
    }

    #[test]
    fn reorder_at_target_end_is_noop() {
        let mut doc = Document::new();
        doc.insert_layer(solid([0, 0, 0, 255]), "b");
        doc.insert_layer(solid([0, 0, 0, 255]), "a");
        let revision = doc.revision();
        assert_eq!(doc.reorder(0, ZOrder::ToFront).unwrap(), 0);
        assert_eq!(doc.revision(), revision);
        assert_eq!(doc.selected(), None);
    }

    #[test]
    fn geometry_scale_is_clamped() {
        let mut doc = Document::new();
        doc.insert_layer(solid([0, 0, 0, 255]), "a");
        doc.set_layer_geometry(0, Point::ORIGIN, 40.0).unwrap();
        assert_eq!(doc.layer(0).unwrap().scale(), MAX_SCALE);
        doc.set_layer_geometry(0, Point::ORIGIN, 0.0).unwrap();
        assert_eq!(doc.layer(0).unwrap().scale(), MIN_SCALE);
    }

    #[test]
    fn commit_clamps_and_snaps() {
        let mut doc = Document::new();
        doc.insert_layer(solid([0, 0, 0, 255]), "a");
        doc.set_layer_geometry(0, Point::new(1040.0, -20.0), 0.5).unwrap();
        doc.commit_layer(0).unwrap();
        let bounds = doc.layer(0).unwrap().bounds();
        assert_eq!(bounds.x, 992.0);
        assert_eq!(bounds.y, 0.0);
        assert!(bounds.right() <= 1051.0);
    }

    #[test]
    fn snapshots_are_independent() {
        let mut doc = Document::new();
        doc.insert_layer(solid([0, 0, 0, 255]), "a");
        let snapshot = doc.clone();
        doc.set_layer_geometry(0, Point::new(64.0, 64.0), 1.0).unwrap();
        assert_eq!(snapshot.layer(0).unwrap().position, Point::ORIGIN);
        assert!(snapshot.layer(0).unwrap().source().ptr_eq(doc.layer(0).unwrap().source()));
        assert_ne!(snapshot.revision(), doc.revision());
    }
}
