//! Edge-detected pencil sketch.
//!
//! Grayscale, 3×3 mean blur, Sobel gradient, then a non-linear ink mapping.
//! Each pass is row-parallel over a shared read-only field, so the output does
//! not depend on scheduling.

use image::RgbaImage;
use rayon::prelude::*;
use tracing::debug;

use super::PixelFilter;
use crate::buffer::PixelBuffer;

/// Darkness used when none is configured.
pub const DEFAULT_DARKNESS: f32 = 0.5;

/// Values below this are pushed further towards black.
const SHADOW_CUTOFF: f64 = 180.0;

// ============================================================================
// SketchFilter
// ============================================================================

/// Sketch filter with a darkness in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SketchFilter {
    pub darkness: f32,
}

impl SketchFilter {
    /// Creates a filter. Darkness is clamped to `0.0..=1.0`.
    pub fn new(darkness: f32) -> Self {
        Self {
            darkness: clamp_darkness(darkness),
        }
    }
}

impl Default for SketchFilter {
    fn default() -> Self {
        Self::new(DEFAULT_DARKNESS)
    }
}

impl PixelFilter for SketchFilter {
    fn apply(&self, source: &PixelBuffer) -> PixelBuffer {
        sketch(source, self.darkness)
    }

    fn label_suffix(&self) -> &str {
        " (sketch)"
    }
}

pub(crate) fn clamp_darkness(darkness: f32) -> f32 {
    if darkness.is_nan() { 0.0 } else { darkness.clamp(0.0, 1.0) }
}

// ============================================================================
// Passes
// ============================================================================

/// Renders a sketch of `source`.
///
/// The one-pixel border keeps the source's RGBA; every interior pixel becomes
/// opaque gray.
pub fn sketch(source: &PixelBuffer, darkness: f32) -> PixelBuffer {
    let darkness = clamp_darkness(darkness);
    let input = source.image();
    let (width, height) = input.dimensions();
    let mut output = input.clone();

    if width < 3 || height < 3 {
        return PixelBuffer::new(output);
    }

    let gray = grayscale(input);
    let blurred = box_blur(&gray, width as usize, height as usize);
    ink(&mut output, &blurred, widen_darkness(darkness));

    debug!(width, height, darkness, "sketch rendered");
    PixelBuffer::new(output)
}

fn grayscale(image: &RgbaImage) -> Vec<u8> {
    let width = image.width() as usize;
    let mut gray = vec![0u8; width * image.height() as usize];
    gray.par_chunks_mut(width)
        .zip(image.par_chunks(width * 4))
        .for_each(|(row, pixels)| {
            for (g, px) in row.iter_mut().zip(pixels.chunks_exact(4)) {
                let luma = 0.299 * px[0] as f64 + 0.587 * px[1] as f64 + 0.114 * px[2] as f64;
                *g = luma.round() as u8;
            }
        });
    gray
}

/// Rounded mean over the in-bounds part of each 3×3 neighbourhood.
fn box_blur(gray: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut blurred = vec![0u8; gray.len()];
    blurred
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let rows = y.saturating_sub(1)..=(y + 1).min(height - 1);
            for (x, out) in row.iter_mut().enumerate() {
                let cols = x.saturating_sub(1)..=(x + 1).min(width - 1);
                let mut sum = 0u32;
                let mut count = 0u32;
                for ny in rows.clone() {
                    for nx in cols.clone() {
                        sum += gray[ny * width + nx] as u32;
                        count += 1;
                    }
                }
                *out = (sum as f64 / count as f64).round() as u8;
            }
        });
    blurred
}

/// Sobel gradient plus ink mapping, written over the interior of `output`.
fn ink(output: &mut RgbaImage, blurred: &[u8], darkness: f64) {
    let width = output.width() as usize;
    let height = output.height() as usize;
    let at = |x: usize, y: usize| blurred[y * width + x] as f64;

    output
        .par_chunks_mut(width * 4)
        .enumerate()
        .filter(|(y, _)| *y > 0 && *y < height - 1)
        .for_each(|(y, row)| {
            for x in 1..width - 1 {
                let (nw, n, ne) = (at(x - 1, y - 1), at(x, y - 1), at(x + 1, y - 1));
                let (w, e) = (at(x - 1, y), at(x + 1, y));
                let (sw, s, se) = (at(x - 1, y + 1), at(x, y + 1), at(x + 1, y + 1));

                let gx = -nw - 2.0 * w - sw + ne + 2.0 * e + se;
                let gy = -nw - 2.0 * n - ne + sw + 2.0 * s + se;
                let value = to_channel(ink_value((gx * gx + gy * gy).sqrt(), darkness));

                row[x * 4..x * 4 + 4].copy_from_slice(&[value, value, value, 255]);
            }
        });
}

/// Widens the darkness to `f64` at six decimal places, so a setting such as
/// `0.3` becomes the nearest `f64` to 0.3 rather than to the `f32` value.
fn widen_darkness(darkness: f32) -> f64 {
    (darkness as f64 * 1e6).round() / 1e6
}

/// Stores a channel value the way a clamped byte array does: ties go to even.
fn to_channel(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round_ties_even() as u8
}

fn ink_value(magnitude: f64, darkness: f64) -> f64 {
    let intensity = ((magnitude / 1.5).powf(0.6) * (2.0 + 2.0 * darkness)).min(255.0);
    let value = (255.0 - intensity * (1.5 + darkness)).max(0.0);
    if value < SHADOW_CUTOFF {
        value * (0.5 - 0.3 * darkness)
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Left half black, right half white.
    fn step_edge(width: u32, height: u32) -> PixelBuffer {
        let image = RgbaImage::from_fn(width, height, |x, _| {
            if x < width / 2 {
                image::Rgba([0, 0, 0, 255])
            } else {
                image::Rgba([255, 255, 255, 255])
            }
        });
        PixelBuffer::new(image)
    }

    #[test]
    fn uniform_image_sketches_to_white_interior() {
        let source = PixelBuffer::filled(100, 100, [255, 0, 0, 255]);
        let result = sketch(&source, 0.5);
        assert_eq!((result.width(), result.height()), (100, 100));
        for y in 1..99 {
            for x in 1..99 {
                assert_eq!(result.pixel(x, y), [255, 255, 255, 255], "pixel ({x}, {y})");
            }
        }
    }

    #[test]
    fn border_keeps_source_pixels() {
        let source = PixelBuffer::filled(10, 8, [12, 34, 56, 78]);
        let result = sketch(&source, 1.0);
        for x in 0..10 {
            assert_eq!(result.pixel(x, 0), [12, 34, 56, 78]);
            assert_eq!(result.pixel(x, 7), [12, 34, 56, 78]);
        }
        for y in 0..8 {
            assert_eq!(result.pixel(0, y), [12, 34, 56, 78]);
            assert_eq!(result.pixel(9, y), [12, 34, 56, 78]);
        }
        assert_eq!(result.pixel(4, 4)[3], 255);
    }

    #[test]
    fn sketch_is_deterministic_and_leaves_input_alone() {
        let source = step_edge(40, 30);
        let before = source.image().clone();
        let first = sketch(&source, 0.3);
        let second = sketch(&source, 0.3);
        assert_eq!(first.image().as_raw(), second.image().as_raw());
        assert_eq!(source.image(), &before);
    }

    #[test]
    fn edges_are_inked() {
        let result = sketch(&step_edge(20, 10), 0.5);
        let [edge, ..] = result.pixel(10, 5);
        let [flat, ..] = result.pixel(3, 5);
        assert!(edge < 100, "edge pixel should be dark, got {edge}");
        assert_eq!(flat, 255);
    }

    #[test]
    fn darkness_never_lightens() {
        let source = step_edge(20, 10);
        let light = sketch(&source, 0.0);
        let dark = sketch(&source, 1.0);
        for x in 1..19 {
            assert!(dark.pixel(x, 5)[0] <= light.pixel(x, 5)[0], "column {x}");
        }
    }

    #[test]
    fn darkness_is_clamped() {
        let source = step_edge(20, 10);
        assert_eq!(sketch(&source, 7.0), sketch(&source, 1.0));
        assert_eq!(SketchFilter::new(-2.0).darkness, 0.0);
    }

    #[test]
    fn tiny_images_are_copied() {
        let source = PixelBuffer::filled(2, 5, [9, 9, 9, 9]);
        let result = sketch(&source, 0.5);
        assert_eq!(result, source);
        assert!(!result.ptr_eq(&source));
    }

    #[test]
    fn blur_ignores_out_of_bounds_neighbours() {
        // Corner mean is over 4 samples: (0 + 10 + 20 + 30) / 4 = 15.
        let gray = [0, 10, 20, 30];
        assert_eq!(box_blur(&gray, 2, 2), vec![15, 15, 15, 15]);
    }

    #[test]
    fn grayscale_is_computed_in_double_precision() {
        // 0.587 * 36 + 0.114 * 12 sits just below 22.5 in f64.
        let image = RgbaImage::from_pixel(1, 1, image::Rgba([0, 36, 12, 255]));
        assert_eq!(grayscale(&image), vec![22]);
    }

    #[test]
    fn channel_store_rounds_ties_to_even() {
        assert_eq!(to_channel(2.5), 2);
        assert_eq!(to_channel(3.5), 4);
        assert_eq!(to_channel(67.50000265511383), 68);
        assert_eq!(to_channel(-4.0), 0);
        assert_eq!(to_channel(300.0), 255);
    }

    #[test]
    fn darkness_widens_to_decimal_value() {
        assert_eq!(widen_darkness(0.3), 0.3);
        assert_eq!(widen_darkness(0.5), 0.5);
    }

    #[test]
    fn ink_curve_endpoints() {
        assert_eq!(ink_value(0.0, 0.5), 255.0);
        assert_eq!(ink_value(10_000.0, 0.0), 0.0);
    }

    #[test]
    fn filter_trait_labels_derived_layer() {
        let filter = SketchFilter::default();
        assert_eq!(filter.darkness, DEFAULT_DARKNESS);
        assert_eq!(filter.label_suffix(), " (sketch)");
        let out = filter.apply(&PixelBuffer::filled(5, 5, [0, 0, 0, 255]));
        assert_eq!(out.pixel(2, 2), [255, 255, 255, 255]);
    }
}
