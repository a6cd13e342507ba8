//! Pointer and gesture handling for layer placement.
//!
//! [`TransformEngine`] is a small state machine that turns pointer and
//! two-contact gesture events into layer geometry updates on a [`Document`]:
//!
//! ```text
//!            down on body            down on handle           two contacts
//!   Idle ───────────────▶ Dragging   Idle ─────────▶ Resizing   Idle ───▶ Pinching
//!     ▲                        │                         │                   │
//!     └──────────── release ───┴─────────────────────────┴───────────────────┘
//! ```
//!
//! Every update is quantized to the grid and clamped to the canvas, so each
//! intermediate document state is already valid and release only has to
//! commit the final position.

use tracing::debug;

use crate::compositor::hit_test;
use crate::document::Document;
use crate::error::Result;
use crate::geometry::{Corner, Point, Rect, clamp_scale, clamp_snap, quantize_delta};

/// Default distance change (in canvas pixels) a pinch must exceed before it
/// rescales the layer.
pub const DEFAULT_PINCH_NOISE_THRESHOLD: f32 = 5.0;

/// Tunables for [`TransformEngine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Pinch distance changes at or below this are treated as jitter.
    pub pinch_noise_threshold: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pinch_noise_threshold: DEFAULT_PINCH_NOISE_THRESHOLD,
        }
    }
}

/// Geometry of a layer captured when a resize starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnchorGeometry {
    pub position: Point,
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

/// Current gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum EngineState {
    #[default]
    Idle,
    Dragging {
        layer: usize,
        /// Pointer position the next quantized delta is measured from.
        anchor: Point,
    },
    Resizing {
        layer: usize,
        corner: Corner,
        pointer_start: Point,
        anchor: AnchorGeometry,
    },
    Pinching {
        layer: usize,
        initial_distance: f32,
        last_distance: f32,
        initial_scale: f32,
        /// Midpoint of the two contacts when the gesture started.
        center: Point,
    },
}

impl EngineState {
    /// Layer the active gesture operates on.
    pub fn active_layer(&self) -> Option<usize> {
        match *self {
            EngineState::Idle => None,
            EngineState::Dragging { layer, .. }
            | EngineState::Resizing { layer, .. }
            | EngineState::Pinching { layer, .. } => Some(layer),
        }
    }

    fn set_active_layer(&mut self, index: usize) {
        match self {
            EngineState::Idle => {}
            EngineState::Dragging { layer, .. }
            | EngineState::Resizing { layer, .. }
            | EngineState::Pinching { layer, .. } => *layer = index,
        }
    }
}

/// Input delivered to the engine, in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerDown(Point),
    PointerMove(Point),
    PointerUp,
    TouchStart(Point, Point),
    TouchMove(Point, Point),
    TouchEnd,
}

// ============================================================================
// Corner resize rules
// ============================================================================

impl Corner {
    /// Pointer displacement projected onto the directions in which dragging
    /// this corner grows the box.
    fn growth(self, dx: f32, dy: f32) -> (f32, f32) {
        match self {
            Corner::BottomRight => (dx, dy),
            Corner::TopLeft => (-dx, -dy),
            Corner::TopRight => (dx, -dy),
            Corner::BottomLeft => (-dx, dy),
        }
    }

    /// Origin of a `width × height` box that keeps this handle's opposite
    /// corner where it was in `anchor`.
    fn resized_origin(self, anchor: &AnchorGeometry, width: f32, height: f32) -> Point {
        let right = anchor.position.x + anchor.width;
        let bottom = anchor.position.y + anchor.height;
        match self {
            Corner::BottomRight => anchor.position,
            Corner::TopLeft => Point::new(right - width, bottom - height),
            Corner::TopRight => Point::new(anchor.position.x, bottom - height),
            Corner::BottomLeft => Point::new(right - width, anchor.position.y),
        }
    }
}

// ============================================================================
// TransformEngine
// ============================================================================

/// Turns input events into grid-snapped layer geometry.
#[derive(Debug, Clone, Default)]
pub struct TransformEngine {
    state: EngineState,
    config: EngineConfig,
}

impl TransformEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: EngineState::Idle,
            config,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// Drops the active gesture without committing it.
    pub fn cancel(&mut self) {
        if self.state != EngineState::Idle {
            debug!(state = ?self.state, "gesture cancelled");
            self.state = EngineState::Idle;
        }
    }

    /// Follows the active layer through a change of layer indices.
    ///
    /// `map` takes the old index and returns the new one, or `None` when the
    /// layer is gone, which cancels the gesture.
    pub fn remap_layer(&mut self, map: impl FnOnce(usize) -> Option<usize>) {
        let Some(old) = self.state.active_layer() else {
            return;
        };
        match map(old) {
            Some(new) => self.state.set_active_layer(new),
            None => self.cancel(),
        }
    }

    /// Dispatches one input event.
    pub fn handle_event(&mut self, doc: &mut Document, event: InputEvent) -> Result<()> {
        match event {
            InputEvent::PointerDown(p) => self.pointer_down(doc, p),
            InputEvent::PointerMove(p) => self.pointer_move(doc, p),
            InputEvent::PointerUp | InputEvent::TouchEnd => self.release(doc),
            InputEvent::TouchStart(a, b) => self.touch_start(doc, a, b),
            InputEvent::TouchMove(a, b) => self.touch_move(doc, a, b),
        }
    }

    /// Starts a drag or resize, or clears the selection on empty space.
    pub fn pointer_down(&mut self, doc: &mut Document, point: Point) -> Result<()> {
        let hit = hit_test(doc, point);
        self.state = match (hit.layer, hit.handle) {
            (Some(layer), Some(corner)) => {
                let current = doc.layer(layer).map(|l| AnchorGeometry {
                    position: l.position,
                    width: l.rendered_width(),
                    height: l.rendered_height(),
                    scale: l.scale(),
                });
                match current {
                    Some(anchor) => EngineState::Resizing {
                        layer,
                        corner,
                        pointer_start: point,
                        anchor,
                    },
                    None => EngineState::Idle,
                }
            }
            (Some(layer), None) => {
                doc.set_selection(Some(layer))?;
                EngineState::Dragging {
                    layer,
                    anchor: point,
                }
            }
            (None, _) => {
                doc.set_selection(None)?;
                EngineState::Idle
            }
        };
        debug!(state = ?self.state, x = point.x, y = point.y, "pointer down");
        Ok(())
    }

    /// Advances the active drag or resize.
    pub fn pointer_move(&mut self, doc: &mut Document, point: Point) -> Result<()> {
        match self.state {
            EngineState::Dragging { layer, anchor } => self.drag(doc, layer, anchor, point),
            EngineState::Resizing {
                layer,
                corner,
                pointer_start,
                anchor,
            } => self.resize(doc, layer, corner, pointer_start, &anchor, point),
            EngineState::Idle | EngineState::Pinching { .. } => Ok(()),
        }
    }

    /// Ends any gesture, committing the active layer's geometry.
    pub fn release(&mut self, doc: &mut Document) -> Result<()> {
        let active = self.state.active_layer();
        self.state = EngineState::Idle;
        if let Some(layer) = active {
            if layer < doc.len() {
                doc.commit_layer(layer)?;
            }
            debug!(layer, "gesture released");
        }
        Ok(())
    }

    /// Starts a pinch on the selected layer. Without a selection nothing happens.
    pub fn touch_start(&mut self, doc: &mut Document, a: Point, b: Point) -> Result<()> {
        let Some((layer, current)) = doc.selected().zip(doc.selected_layer()) else {
            return Ok(());
        };
        let distance = a.distance(b);
        self.state = EngineState::Pinching {
            layer,
            initial_distance: distance,
            last_distance: distance,
            initial_scale: current.scale(),
            center: a.midpoint(b),
        };
        debug!(layer, distance, "pinch start");
        Ok(())
    }

    /// Advances an active pinch.
    pub fn touch_move(&mut self, doc: &mut Document, a: Point, b: Point) -> Result<()> {
        let EngineState::Pinching {
            layer,
            initial_distance,
            last_distance,
            initial_scale,
            center,
        } = self.state
        else {
            return Ok(());
        };

        let distance = a.distance(b);
        if (distance - last_distance).abs() <= self.config.pinch_noise_threshold {
            return Ok(());
        }
        if initial_distance <= f32::EPSILON {
            return Ok(());
        }
        let Some(current) = doc.layer(layer) else {
            self.state = EngineState::Idle;
            return Ok(());
        };

        let scale = clamp_scale(initial_scale * (distance / initial_distance));
        let (width, height) = current.size_at(scale);
        let centered = Rect::centered_on(center, width, height);
        let position = self.fit(doc, centered.origin(), width, height);
        doc.set_layer_geometry(layer, position, scale)?;

        self.state = EngineState::Pinching {
            layer,
            initial_distance,
            last_distance: distance,
            initial_scale,
            center,
        };
        Ok(())
    }

    fn drag(&mut self, doc: &mut Document, layer: usize, anchor: Point, point: Point) -> Result<()> {
        let cell = doc.grid().snap_cell() as f32;
        let dx = quantize_delta(point.x - anchor.x, cell);
        let dy = quantize_delta(point.y - anchor.y, cell);
        if dx == 0.0 && dy == 0.0 {
            return Ok(());
        }
        let Some(current) = doc.layer(layer) else {
            self.state = EngineState::Idle;
            return Ok(());
        };

        let (width, height) = (current.rendered_width(), current.rendered_height());
        let scale = current.scale();
        let position = self.fit(doc, current.position.offset(dx, dy), width, height);
        doc.set_layer_geometry(layer, position, scale)?;

        // Only the quantized part is consumed; the sub-cell residue carries over.
        self.state = EngineState::Dragging {
            layer,
            anchor: anchor.offset(dx, dy),
        };
        Ok(())
    }

    fn resize(
        &mut self,
        doc: &mut Document,
        layer: usize,
        corner: Corner,
        pointer_start: Point,
        anchor: &AnchorGeometry,
        point: Point,
    ) -> Result<()> {
        let Some(current) = doc.layer(layer) else {
            self.state = EngineState::Idle;
            return Ok(());
        };
        if anchor.width <= 0.0 || anchor.height <= 0.0 {
            return Ok(());
        }

        let (gx, gy) = corner.growth(point.x - pointer_start.x, point.y - pointer_start.y);
        let factor = (1.0 + gx / anchor.width).max(1.0 + gy / anchor.height);
        let scale = clamp_scale(anchor.scale * factor);
        let (width, height) = current.size_at(scale);
        let origin = corner.resized_origin(anchor, width, height);
        let position = self.fit(doc, origin, width, height);
        doc.set_layer_geometry(layer, position, scale)
    }

    /// Clamps a box origin into the canvas and snaps it to the grid.
    fn fit(&self, doc: &Document, origin: Point, width: f32, height: f32) -> Point {
        let cell = doc.grid().snap_cell() as f32;
        let canvas = doc.canvas_size();
        Point::new(
            clamp_snap(origin.x, width, canvas.width as f32, cell),
            clamp_snap(origin.y, height, canvas.height as f32, cell),
        )
    }
}
