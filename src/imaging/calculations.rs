//! Pure calculation functions for composition geometry.
//!
//! All functions here are pure and testable without any I/O or images.
//!
//! Rounding: output dimensions round to the nearest integer. The source
//! rectangle is snapped to the pixel grid by rounding both of its edges, so
//! adjacent crops never overlap or leave a gap.

use super::compositor::{CompositeError, Dimensions};
use super::geometry::{CropRegion, CropUnit};
use super::params::{ResizeScale, SourceRect};

/// Largest surface edge the compositor will allocate.
pub const MAX_SURFACE_SIDE: u32 = 16_384;
/// Largest surface area (pixels) the compositor will allocate.
pub const MAX_SURFACE_AREA: u64 = 268_435_456;

/// Ratio of natural to displayed size on each axis.
///
/// # Examples
/// ```
/// # use folio_media::imaging::{Dimensions, calculations::scale_factors};
/// // A 4000x3000 photo shown at 800x600 → every displayed pixel is 5 source pixels
/// assert_eq!(
///     scale_factors(Dimensions::new(4000, 3000), Dimensions::new(800, 600)),
///     (5.0, 5.0)
/// );
/// ```
pub fn scale_factors(natural: Dimensions, displayed: Dimensions) -> (f64, f64) {
    let displayed_w = displayed.width.max(1) as f64;
    let displayed_h = displayed.height.max(1) as f64;
    (
        natural.width as f64 / displayed_w,
        natural.height as f64 / displayed_h,
    )
}

/// Map an optional crop into natural-pixel space.
///
/// Without a crop the full image is the source. Percent crops map directly
/// onto the natural size (`pct / 100 × natural`); pixel crops are relative to
/// the displayed size and go through [`scale_factors`].
pub fn source_rect(
    natural: Dimensions,
    displayed: Dimensions,
    crop: Option<&CropRegion>,
) -> SourceRect {
    let Some(crop) = crop else {
        return SourceRect::full(natural);
    };
    match crop.unit {
        CropUnit::Percent => {
            let (w, h) = (natural.width as f64, natural.height as f64);
            SourceRect {
                x: crop.x / 100.0 * w,
                y: crop.y / 100.0 * h,
                width: crop.width / 100.0 * w,
                height: crop.height / 100.0 * h,
            }
        }
        CropUnit::Pixel => {
            let (scale_x, scale_y) = scale_factors(natural, displayed);
            SourceRect {
                x: crop.x * scale_x,
                y: crop.y * scale_y,
                width: crop.width * scale_x,
                height: crop.height * scale_y,
            }
        }
    }
}

/// Output raster size: source size × scale, rounded to nearest.
pub fn output_dimensions(source: &SourceRect, scale: ResizeScale) -> Dimensions {
    let factor = scale.factor();
    Dimensions {
        width: (source.width * factor).round().max(0.0) as u32,
        height: (source.height * factor).round().max(0.0) as u32,
    }
}

/// Integer pixel rectangle `(x, y, width, height)` inside the natural image.
///
/// Edges are rounded then clamped to the image; the result is at least one
/// pixel on each axis whenever the image itself is non-empty.
pub fn pixel_rect(source: &SourceRect, natural: Dimensions) -> (u32, u32, u32, u32) {
    let clamp_x = |v: f64| v.round().clamp(0.0, natural.width as f64) as u32;
    let clamp_y = |v: f64| v.round().clamp(0.0, natural.height as f64) as u32;

    let x0 = clamp_x(source.x).min(natural.width.saturating_sub(1));
    let y0 = clamp_y(source.y).min(natural.height.saturating_sub(1));
    let x1 = clamp_x(source.x + source.width).max(x0 + 1);
    let y1 = clamp_y(source.y + source.height).max(y0 + 1);

    (x0, y0, x1 - x0, y1 - y0)
}

/// Whether a surface of this size can be allocated.
pub fn surface_fits(output: Dimensions) -> bool {
    !output.is_empty()
        && output.width <= MAX_SURFACE_SIDE
        && output.height <= MAX_SURFACE_SIDE
        && output.width as u64 * output.height as u64 <= MAX_SURFACE_AREA
}

/// Everything the compositor derives before touching pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutputPlan {
    pub source: SourceRect,
    /// `source` snapped to whole pixels: `(x, y, width, height)`.
    pub pixels: (u32, u32, u32, u32),
    pub output: Dimensions,
}

/// Plan a composition, or report that no surface can be produced.
pub fn plan_output(
    natural: Dimensions,
    displayed: Dimensions,
    crop: Option<&CropRegion>,
    scale: ResizeScale,
) -> Result<OutputPlan, CompositeError> {
    let source = source_rect(natural, displayed, crop);
    let output = output_dimensions(&source, scale);
    if natural.is_empty() || !surface_fits(output) {
        return Err(CompositeError::SurfaceUnavailable {
            width: output.width,
            height: output.height,
        });
    }
    Ok(OutputPlan {
        source,
        pixels: pixel_rect(&source, natural),
        output,
    })
}
