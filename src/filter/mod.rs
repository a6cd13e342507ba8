//! Pixel filters that derive a new raster from an existing one.
//!
//! Filters never touch their input. The editor uses a filter's output as the
//! source of a new layer, labelled with the original name plus
//! [`PixelFilter::label_suffix`].

pub mod sketch;

pub use sketch::{DEFAULT_DARKNESS, SketchFilter, sketch};

use crate::buffer::PixelBuffer;

/// A pure buffer-to-buffer transform.
///
/// Implementations must be deterministic: the same input always produces
/// byte-identical output with the same dimensions.
pub trait PixelFilter {
    /// Produces the filtered raster.
    fn apply(&self, source: &PixelBuffer) -> PixelBuffer;

    /// Appended to the source layer's label to name the derived layer.
    fn label_suffix(&self) -> &str;
}
