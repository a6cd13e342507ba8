//! Canvas coordinate model.
//!
//! All layer and grid geometry lives in a fixed 1051×1500 logical space,
//! independent of how large the canvas is shown on screen. Positions are
//! quantized to the grid cell size and clamped to the canvas bounds by the
//! helpers in this module.

/// Logical canvas width in pixels.
pub const CANVAS_WIDTH: u32 = 1051;

/// Logical canvas height in pixels.
pub const CANVAS_HEIGHT: u32 = 1500;

/// Fixed logical canvas size.
pub const CANVAS_SIZE: SizePx = SizePx::new(CANVAS_WIDTH, CANVAS_HEIGHT);

/// Grid cell size used for snapping.
pub const GRID_CELL_PX: u32 = 32;

/// Smallest stored layer scale.
pub const MIN_SCALE: f32 = 0.1;

/// Largest stored layer scale.
pub const MAX_SCALE: f32 = 5.0;

/// A point in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ORIGIN: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns this point moved by `(dx, dy)`.
    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Euclidean distance to `other`.
    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Point halfway between `self` and `other`.
    pub fn midpoint(self, other: Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// One of the four corners of a rectangle.
///
/// Resize handles are keyed by the corner they sit on; the opposite corner is
/// the one that stays fixed while the handle is dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    /// All corners, in the order handles are hit-tested.
    pub const ALL: [Corner; 4] = [
        Corner::TopLeft,
        Corner::TopRight,
        Corner::BottomLeft,
        Corner::BottomRight,
    ];

    /// The diagonally opposite corner.
    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// An axis-aligned rectangle in canvas coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// X offset of the left edge
    pub x: f32,
    /// Y offset of the top edge
    pub y: f32,
    /// Width of the rectangle
    pub width: f32,
    /// Height of the rectangle
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a rectangle with its top-left corner at `origin`.
    pub fn from_origin(origin: Point, width: f32, height: f32) -> Self {
        Self::new(origin.x, origin.y, width, height)
    }

    /// Creates a rectangle of the given size centred on `center`.
    pub fn centered_on(center: Point, width: f32, height: f32) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    /// Returns the right edge coordinate (x + width).
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Returns the bottom edge coordinate (y + height).
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Position of one of the rectangle's corners.
    pub fn corner(&self, corner: Corner) -> Point {
        match corner {
            Corner::TopLeft => Point::new(self.x, self.y),
            Corner::TopRight => Point::new(self.right(), self.y),
            Corner::BottomLeft => Point::new(self.x, self.bottom()),
            Corner::BottomRight => Point::new(self.right(), self.bottom()),
        }
    }

    /// Returns true if `point` lies inside the rectangle (edges included).
    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }
}

// ============================================================================
// Grid quantization
// ============================================================================

/// Rounds a coordinate to the nearest multiple of `cell`.
pub fn snap(value: f32, cell: f32) -> f32 {
    (value / cell).round() * cell
}

/// Quantizes a pointer delta to whole cell increments (round to nearest).
///
/// A delta smaller than half a cell quantizes to zero, so the layer only moves
/// once the pointer has travelled far enough.
pub fn quantize_delta(delta: f32, cell: f32) -> f32 {
    snap(delta, cell)
}

/// Clamps an origin so a span of `extent` fits inside `[0, limit]`, then
/// snaps it to the grid without leaving that range.
///
/// When `extent` exceeds `limit` the origin is pinned to zero: the far edge
/// overflows, the origin never goes negative.
pub fn clamp_snap(origin: f32, extent: f32, limit: f32, cell: f32) -> f32 {
    let max_origin = (limit - extent).max(0.0);
    let clamped = origin.clamp(0.0, max_origin);
    let snapped = snap(clamped, cell);
    if snapped > max_origin {
        ((max_origin / cell).floor() * cell).max(0.0)
    } else {
        snapped.max(0.0)
    }
}

/// Clamps a layer scale into `[MIN_SCALE, MAX_SCALE]`.
pub fn clamp_scale(scale: f32) -> f32 {
    if scale.is_nan() {
        return MIN_SCALE;
    }
    scale.clamp(MIN_SCALE, MAX_SCALE)
}
