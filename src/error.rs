//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Result alias for gridsketch operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while decoding, editing, or exporting a composition.
#[derive(Debug, Error)]
pub enum Error {
    /// The candidate file does not declare an `image/*` MIME type.
    #[error("unsupported MIME type `{mime}`: only image/* inputs are decoded")]
    UnsupportedMime { mime: String },

    /// The bytes could not be decoded into a raster.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The composed surface could not be encoded.
    #[error("failed to encode surface: {0}")]
    Encode(#[source] image::ImageError),

    /// A layer index does not refer to an existing layer.
    #[error("layer index {index} out of range (document has {len} layers)")]
    LayerOutOfRange { index: usize, len: usize },

    /// A colour string is not a `#rrggbb` / `#rgb` hex code.
    #[error("invalid colour `{value}`: {reason}")]
    InvalidColor { value: String, reason: String },

    /// A grid layout is outside the supported range.
    #[error("invalid grid layout: {reason}")]
    InvalidGrid { reason: String },

    /// Settings JSON could not be read or written.
    #[error("settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// Reading an input or writing an output file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A drawing surface could not be allocated.
    #[error("cannot allocate a {width}x{height} surface")]
    Surface { width: u32, height: u32 },
}
