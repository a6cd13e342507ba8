//! Document rendering and hit-testing.
//!
//! [`Compositor`] draws every layer of a [`Document`] onto a fixed-size
//! surface, bottom-most first, then the selection decoration and finally the
//! grid. The last surface is cached per document revision and shared through
//! an [`Arc`], so re-rendering an unchanged document neither redraws nor
//! copies pixels.
//!
//! [`hit_test`] answers "what is under this point": a handle of the selected
//! layer first, then the topmost layer body.

use std::sync::Arc;

use image::{Rgba, RgbaImage};
use palette::Srgba;
use resvg::tiny_skia::{
    Color, ColorU8, FilterQuality, IntSize, Paint, PathBuilder, Pixmap, PixmapPaint, Rect as SkRect,
    Stroke, StrokeDash, Transform,
};
use tracing::debug;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::geometry::{Corner, Point, Rect};
use crate::grid::draw_grid;

/// A rendered canvas.
pub type Surface = RgbaImage;

/// Side length of a resize handle square.
pub const HANDLE_SIZE: f32 = 10.0;

/// Selection outline dash pattern: 5px on, 5px off.
pub const SELECTION_DASH: [f32; 2] = [5.0, 5.0];

const SELECTION_STROKE_WIDTH: f32 = 2.0;
const SELECTION_COLOR: [u8; 4] = [0, 120, 255, 255];

/// Default canvas background (opaque white).
pub const DEFAULT_BACKGROUND: Srgba<u8> = Srgba::new(255, 255, 255, 255);

// ============================================================================
// Hit testing
// ============================================================================

/// Result of [`hit_test`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HitResult {
    /// Layer under the point, if any.
    pub layer: Option<usize>,
    /// Handle under the point. Only the selected layer exposes handles.
    pub handle: Option<Corner>,
}

impl HitResult {
    pub const NONE: Self = Self {
        layer: None,
        handle: None,
    };
}

/// The 10×10 handle square centred on `corner` of `bounds`.
pub fn handle_rect(bounds: &Rect, corner: Corner) -> Rect {
    Rect::centered_on(bounds.corner(corner), HANDLE_SIZE, HANDLE_SIZE)
}

/// Finds the handle or layer under `point`.
///
/// Handles of the selected layer win over any layer body; otherwise the
/// topmost layer (lowest index) whose rendered box contains the point wins.
pub fn hit_test(doc: &Document, point: Point) -> HitResult {
    if let Some((index, layer)) = doc.selected().zip(doc.selected_layer()) {
        let bounds = layer.bounds();
        if let Some(corner) = Corner::ALL
            .into_iter()
            .find(|&c| handle_rect(&bounds, c).contains(point))
        {
            return HitResult {
                layer: Some(index),
                handle: Some(corner),
            };
        }
    }

    doc.layers()
        .iter()
        .position(|layer| layer.bounds().contains(point))
        .map(|index| HitResult {
            layer: Some(index),
            handle: None,
        })
        .unwrap_or(HitResult::NONE)
}

// ============================================================================
// Rendering
// ============================================================================

/// Renders `doc` without caching.
///
/// `decorated` adds the selection outline and handles; exports leave it off.
pub fn render_document(doc: &Document, background: Srgba<u8>, decorated: bool) -> Result<Surface> {
    let size = doc.canvas_size();
    let mut pixmap = Pixmap::new(size.width, size.height).ok_or(Error::Surface {
        width: size.width,
        height: size.height,
    })?;
    pixmap.fill(Color::from_rgba8(
        background.red,
        background.green,
        background.blue,
        background.alpha,
    ));

    let paint = PixmapPaint {
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };

    // Last element is the bottom of the stack.
    for layer in doc.layers().iter().rev() {
        let Some(source) = layer.source().pixmap() else {
            continue;
        };
        let scale = layer.scale();
        let transform =
            Transform::from_row(scale, 0.0, 0.0, scale, layer.position.x, layer.position.y);
        pixmap.draw_pixmap(0, 0, source.as_ref(), &paint, transform, None);
    }

    if decorated {
        if let Some(layer) = doc.selected_layer() {
            draw_selection(&mut pixmap, &layer.bounds());
        }
    }

    draw_grid(&mut pixmap, doc.grid());

    Ok(pixmap_to_rgba_image(&pixmap))
}

fn draw_selection(pixmap: &mut Pixmap, bounds: &Rect) {
    let [r, g, b, a] = SELECTION_COLOR;
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;

    if let Some(rect) = SkRect::from_xywh(bounds.x, bounds.y, bounds.width, bounds.height) {
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width: SELECTION_STROKE_WIDTH,
            dash: StrokeDash::new(SELECTION_DASH.to_vec(), 0.0),
            ..Stroke::default()
        };
        pixmap.stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    for corner in Corner::ALL {
        let handle = handle_rect(bounds, corner);
        if let Some(rect) = SkRect::from_xywh(handle.x, handle.y, handle.width, handle.height) {
            pixmap.fill_rect(rect, &paint, Transform::identity(), None);
        }
    }
}

// ============================================================================
// Compositor
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CacheKey {
    revision: u64,
    decorated: bool,
}

/// Renders documents and keeps the last surface for reuse.
#[derive(Debug)]
pub struct Compositor {
    background: Srgba<u8>,
    cache: Option<(CacheKey, Arc<Surface>)>,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(DEFAULT_BACKGROUND)
    }
}

impl Compositor {
    pub fn new(background: Srgba<u8>) -> Self {
        Self {
            background,
            cache: None,
        }
    }

    pub fn background(&self) -> Srgba<u8> {
        self.background
    }

    /// Changes the background colour and drops the cached surface.
    pub fn set_background(&mut self, background: Srgba<u8>) {
        if self.background != background {
            self.background = background;
            self.cache = None;
        }
    }

    /// Renders the on-screen view: layers, selection decoration and grid.
    pub fn render(&mut self, doc: &Document) -> Result<Arc<Surface>> {
        self.render_cached(doc, true)
    }

    /// Renders the export view: layers and grid, no selection decoration.
    pub fn render_export(&mut self, doc: &Document) -> Result<Arc<Surface>> {
        self.render_cached(doc, false)
    }

    fn render_cached(&mut self, doc: &Document, decorated: bool) -> Result<Arc<Surface>> {
        let key = CacheKey {
            revision: doc.revision(),
            decorated,
        };
        if let Some((cached_key, surface)) = &self.cache {
            if *cached_key == key {
                return Ok(Arc::clone(surface));
            }
        }

        debug!(revision = key.revision, decorated, layers = doc.len(), "render document");
        let surface = Arc::new(render_document(doc, self.background, decorated)?);
        self.cache = Some((key, Arc::clone(&surface)));
        Ok(surface)
    }

    /// Drops the cached surface.
    pub fn clear_cache(&mut self) {
        self.cache = None;
    }

    /// See [`hit_test`].
    pub fn hit_test(&self, doc: &Document, point: Point) -> HitResult {
        hit_test(doc, point)
    }
}

// ============================================================================
// Pixmap conversion
// ============================================================================

/// Converts a straight-alpha RGBA image into a premultiplied pixmap.
///
/// Returns `None` for zero-sized images.
pub(crate) fn rgba_image_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let size = IntSize::from_wh(image.width(), image.height())?;
    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
        let [r, g, b, a] = pixel.0;
        let premultiplied = ColorU8::from_rgba(r, g, b, a).premultiply();
        data.extend_from_slice(&[
            premultiplied.red(),
            premultiplied.green(),
            premultiplied.blue(),
            premultiplied.alpha(),
        ]);
    }
    Pixmap::from_vec(data, size)
}

/// Converts a tiny_skia Pixmap to an image::RgbaImage.
fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let width = pixmap.width();
    let height = pixmap.height();
    let mut img = RgbaImage::new(width, height);

    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        // tiny_skia stores premultiplied alpha
        let (r, g, b, a) = unpremultiply(src.red(), src.green(), src.blue(), src.alpha());
        *dst = Rgba([r, g, b, a]);
    }

    img
}

/// Unpremultiplies a premultiplied alpha pixel.
fn unpremultiply(r: u8, g: u8, b: u8, a: u8) -> (u8, u8, u8, u8) {
    if a == 0 {
        (0, 0, 0, 0)
    } else {
        let a_f = a as f32 / 255.0;
        (
            (r as f32 / a_f).round().min(255.0) as u8,
            (g as f32 / a_f).round().min(255.0) as u8,
            (b as f32 / a_f).round().min(255.0) as u8,
            a,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::PixelBuffer;
    use crate::document::ZOrder;
    use crate::geometry::{CANVAS_HEIGHT, CANVAS_WIDTH};

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn stacked(colors: &[(&str, [u8; 4])], at: Point) -> Document {
        let mut doc = Document::new();
        // Insert bottom-most first so the slice reads top-to-bottom.
        for (name, rgba) in colors.iter().rev() {
            doc.insert_layer(PixelBuffer::filled(100, 100, *rgba), *name);
            doc.set_layer_geometry(0, at, 1.0).unwrap();
        }
        doc
    }

    #[test]
    fn render_has_canvas_size() {
        let surface = render_document(&Document::new(), DEFAULT_BACKGROUND, false).unwrap();
        assert_eq!(surface.dimensions(), (CANVAS_WIDTH, CANVAS_HEIGHT));
        // Inside a grid cell the background shows through.
        assert_eq!(surface.get_pixel(16, 16).0, [255, 255, 255, 255]);
    }

    #[test]
    fn layer_is_drawn_scaled_at_position() {
        let mut doc = Document::new();
        doc.insert_layer(PixelBuffer::filled(100, 100, BLUE), "blue");
        doc.set_layer_geometry(0, Point::new(64.0, 64.0), 0.5).unwrap();
        let surface = render_document(&doc, DEFAULT_BACKGROUND, false).unwrap();

        assert_eq!(surface.get_pixel(80, 80).0, BLUE);
        assert_eq!(surface.get_pixel(120, 120).0, [255, 255, 255, 255]);
    }

    #[test]
    fn first_layer_is_drawn_on_top() {
        let doc = stacked(&[("a", RED), ("b", GREEN), ("c", BLUE)], Point::new(64.0, 64.0));
        let surface = render_document(&doc, DEFAULT_BACKGROUND, false).unwrap();
        assert_eq!(surface.get_pixel(110, 110).0, RED);
    }

    #[test]
    fn reorder_to_front_changes_visible_layer() {
        let mut doc = stacked(&[("a", RED), ("b", GREEN), ("c", BLUE)], Point::new(64.0, 64.0));
        doc.reorder(2, ZOrder::ToFront).unwrap();
        let labels: Vec<_> = doc.layers().iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, ["c", "a", "b"]);

        let surface = render_document(&doc, DEFAULT_BACKGROUND, false).unwrap();
        assert_eq!(surface.get_pixel(110, 110).0, BLUE);

        doc.reorder(0, ZOrder::ToBack).unwrap();
        let surface = render_document(&doc, DEFAULT_BACKGROUND, false).unwrap();
        assert_eq!(surface.get_pixel(110, 110).0, RED);
    }

    #[test]
    fn selection_decoration_only_on_screen() {
        let mut doc = stacked(&[("a", GREEN)], Point::new(64.0, 64.0));
        doc.set_selection(Some(0)).unwrap();

        let screen = render_document(&doc, DEFAULT_BACKGROUND, true).unwrap();
        let export = render_document(&doc, DEFAULT_BACKGROUND, false).unwrap();

        // Handle centred on the top-left corner (64, 64) reaches into (60..69).
        assert_eq!(screen.get_pixel(61, 66).0, SELECTION_COLOR);
        assert_eq!(export.get_pixel(61, 66).0, [255, 255, 255, 255]);
    }

    #[test]
    fn hit_test_prefers_topmost_layer() {
        let doc = stacked(&[("a", RED), ("b", GREEN)], Point::new(64.0, 64.0));
        let hit = hit_test(&doc, Point::new(100.0, 100.0));
        assert_eq!(hit, HitResult { layer: Some(0), handle: None });
    }

    #[test]
    fn hit_test_finds_lower_layer_outside_top_one() {
        let mut doc = stacked(&[("a", RED), ("b", GREEN)], Point::new(64.0, 64.0));
        doc.set_layer_geometry(1, Point::new(320.0, 320.0), 1.0).unwrap();
        let hit = hit_test(&doc, Point::new(350.0, 350.0));
        assert_eq!(hit.layer, Some(1));
    }

    #[test]
    fn hit_test_handles_only_for_selected_layer() {
        let mut doc = stacked(&[("a", RED)], Point::new(64.0, 64.0));
        let corner = Point::new(164.0 + 4.0, 164.0 + 4.0);

        // Unselected: the point just outside the box hits nothing.
        assert_eq!(hit_test(&doc, corner), HitResult::NONE);

        doc.set_selection(Some(0)).unwrap();
        let hit = hit_test(&doc, corner);
        assert_eq!(hit.layer, Some(0));
        assert_eq!(hit.handle, Some(Corner::BottomRight));
    }

    #[test]
    fn selected_handle_beats_layer_above() {
        let mut doc = stacked(&[("top", RED), ("under", GREEN)], Point::new(64.0, 64.0));
        doc.set_selection(Some(1)).unwrap();
        let hit = hit_test(&doc, Point::new(64.0, 64.0));
        assert_eq!(hit.layer, Some(1));
        assert_eq!(hit.handle, Some(Corner::TopLeft));
    }

    #[test]
    fn hit_test_outside_everything() {
        let doc = stacked(&[("a", RED)], Point::new(64.0, 64.0));
        assert_eq!(hit_test(&doc, Point::new(-10.0, 5000.0)), HitResult::NONE);
    }

    #[test]
    fn compositor_reuses_cached_surface() {
        let mut doc = stacked(&[("a", RED)], Point::new(64.0, 64.0));
        let mut compositor = Compositor::default();
        let first = compositor.render(&doc).unwrap();
        let second = compositor.render(&doc).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let export = compositor.render_export(&doc).unwrap();
        assert!(!Arc::ptr_eq(&first, &export));

        doc.set_layer_geometry(0, Point::new(320.0, 320.0), 1.0).unwrap();
        let moved = compositor.render(&doc).unwrap();
        assert_eq!(moved.get_pixel(110, 110).0, [255, 255, 255, 255]);
        assert_eq!(moved.get_pixel(350, 350).0, RED);
    }

    #[test]
    fn pixmap_roundtrip_preserves_opaque_pixels() {
        let image = RgbaImage::from_pixel(3, 3, Rgba([12, 34, 56, 255]));
        let pixmap = rgba_image_to_pixmap(&image).unwrap();
        assert_eq!(pixmap_to_rgba_image(&pixmap), image);
    }
}
