//! Immutable pixel buffers and the decode/encode collaborators.
//!
//! A [`PixelBuffer`] is the unit of exchange between decoding, filtering and
//! rendering. It is reference counted: cloning shares the pixels, and nothing
//! ever writes to them after construction, so any number of document
//! snapshots can point at the same source image.

use std::io::Cursor;
use std::sync::{Arc, OnceLock};

use image::{ImageFormat, RgbaImage};
use resvg::tiny_skia::Pixmap;

use crate::compositor::rgba_image_to_pixmap;
use crate::error::{Error, Result};

// ============================================================================
// PixelBuffer
// ============================================================================

struct BufferInner {
    image: RgbaImage,
    // Premultiplied copy for the rasterizer, built on first render.
    pixmap: OnceLock<Option<Pixmap>>,
}

/// A shared, read-only RGBA8 raster.
#[derive(Clone)]
pub struct PixelBuffer {
    inner: Arc<BufferInner>,
}

impl PixelBuffer {
    /// Wraps an RGBA image. The image is frozen from here on.
    pub fn new(image: RgbaImage) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                image,
                pixmap: OnceLock::new(),
            }),
        }
    }

    /// Builds a buffer from raw RGBA bytes.
    ///
    /// Returns `None` if `data` is not exactly `width * height * 4` bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Option<Self> {
        RgbaImage::from_raw(width, height, data).map(Self::new)
    }

    /// Creates a buffer filled with a single colour.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        Self::new(RgbaImage::from_pixel(width, height, image::Rgba(rgba)))
    }

    pub fn width(&self) -> u32 {
        self.inner.image.width()
    }

    pub fn height(&self) -> u32 {
        self.inner.image.height()
    }

    /// Borrow the underlying image.
    pub fn image(&self) -> &RgbaImage {
        &self.inner.image
    }

    /// RGBA sample at `(x, y)`. Panics when out of bounds, like [`RgbaImage::get_pixel`].
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.inner.image.get_pixel(x, y).0
    }

    /// Returns true if both buffers share the same pixel storage.
    pub fn ptr_eq(&self, other: &PixelBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Premultiplied rasterizer copy, or `None` for zero-sized images.
    pub(crate) fn pixmap(&self) -> Option<&Pixmap> {
        self.inner
            .pixmap
            .get_or_init(|| rgba_image_to_pixmap(&self.inner.image))
            .as_ref()
    }
}

impl std::fmt::Debug for PixelBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PixelBuffer")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

impl PartialEq for PixelBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || self.inner.image == other.inner.image
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

// ============================================================================
// Decode / Encode
// ============================================================================

/// Decodes file bytes into a pixel buffer.
///
/// Inputs whose MIME type is not `image/*` are rejected before any decoding is
/// attempted.
pub fn decode(bytes: &[u8], mime: &str) -> Result<PixelBuffer> {
    if !mime.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(Error::UnsupportedMime {
            mime: mime.to_string(),
        });
    }

    let image = image::load_from_memory(bytes)
        .map_err(Error::Decode)?
        .to_rgba8();
    Ok(PixelBuffer::new(image))
}

/// Encodes a composed surface as PNG bytes.
pub fn encode_png(surface: &RgbaImage) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    surface
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .map_err(Error::Encode)?;
    Ok(bytes)
}
