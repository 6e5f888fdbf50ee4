//! Pure Rust compositor built on the `image` crate.
//!
//! ## Crate mapping
//!
//! | Step | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, TIFF, WebP, GIF, BMP) | `image::ImageReader` with format sniffing |
//! | Crop | `DynamicImage::crop_imm` on the snapped source rectangle |
//! | Resize | `image::imageops::resize` with `Lanczos3` filter |
//! | Filter | [`FilterExpression::apply_rgb`], rows in parallel via `rayon` |
//! | Encode → JPEG | `image::codecs::jpeg::JpegEncoder` at the requested quality |
//!
//! The filter is part of the draw: it is configured before any pixel lands
//! on the output surface and applies to every drawn pixel, never as a
//! separate pass over an already-encoded result.

use super::calculations::{OutputPlan, plan_output};
use super::compositor::{CompositeError, Compositor, Dimensions, EncodedImage};
use super::filters::FilterExpression;
use super::params::{Quality, RenderParams};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader, RgbImage};
use rayon::prelude::*;
use std::io::Cursor;

/// Formats the library accepts as sources.
const SOURCE_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Tiff,
    ImageFormat::WebP,
    ImageFormat::Gif,
    ImageFormat::Bmp,
];

/// Identify the image format of `bytes` by its signature.
///
/// Returns `None` for non-images and for formats with no decoder compiled in.
pub fn sniff_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes)
        .ok()
        .filter(|fmt| SOURCE_FORMATS.contains(fmt) && fmt.reading_enabled())
}

/// Read natural dimensions from the image header without a full decode.
pub fn identify(bytes: &[u8]) -> Result<Dimensions, CompositeError> {
    let (width, height) = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompositeError::Decode(e.to_string()))?
        .into_dimensions()
        .map_err(|e| CompositeError::Decode(e.to_string()))?;
    Ok(Dimensions { width, height })
}

/// Compositor backed by the `image` crate.
///
/// See the [module docs](self) for the crate-to-step mapping.
pub struct RasterCompositor;

impl RasterCompositor {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RasterCompositor {
    fn default() -> Self {
        Self::new()
    }
}

/// Draw the planned source rectangle onto a fresh surface with `paint` active.
fn draw(source: &DynamicImage, plan: &OutputPlan, paint: &FilterExpression) -> RgbImage {
    let (x, y, width, height) = plan.pixels;
    let region = source.crop_imm(x, y, width, height).to_rgb8();

    let mut surface = if (width, height) == (plan.output.width, plan.output.height) {
        region
    } else {
        image::imageops::resize(
            &region,
            plan.output.width,
            plan.output.height,
            FilterType::Lanczos3,
        )
    };

    if !paint.is_identity() {
        let row_len = plan.output.width as usize * 3;
        surface.par_chunks_mut(row_len).for_each(|row| {
            for px in row.chunks_exact_mut(3) {
                let out = paint.apply_rgb([px[0], px[1], px[2]]);
                px.copy_from_slice(&out);
            }
        });
    }

    surface
}

/// Encode a surface as baseline JPEG.
fn encode_jpeg(surface: RgbImage, quality: Quality) -> Result<EncodedImage, CompositeError> {
    let dimensions = Dimensions::new(surface.width(), surface.height());
    let mut bytes = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut bytes, quality.value() as u8);
    DynamicImage::ImageRgb8(surface)
        .write_with_encoder(encoder)
        .map_err(|e| CompositeError::Encode(e.to_string()))?;
    Ok(EncodedImage {
        bytes,
        dimensions,
        content_type: "image/jpeg",
        extension: "jpg",
    })
}

impl Compositor for RasterCompositor {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CompositeError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| CompositeError::Decode(e.to_string()))?
            .decode()
            .map_err(|e| CompositeError::Decode(e.to_string()))
    }

    fn render(
        &self,
        source: &DynamicImage,
        params: &RenderParams,
    ) -> Result<EncodedImage, CompositeError> {
        let natural = Dimensions::new(source.width(), source.height());
        let plan = plan_output(natural, params.displayed, params.crop.as_ref(), params.scale)?;
        log::debug!(
            "compositing {}x{} → {}x{} (source {:?}, filter {})",
            natural.width,
            natural.height,
            plan.output.width,
            plan.output.height,
            plan.pixels,
            params.filter
        );
        let surface = draw(source, &plan, &params.filter);
        encode_jpeg(surface, params.quality)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::filters::{FilterChannel, FilterSettings};
    use crate::imaging::geometry::CropRegion;
    use crate::imaging::params::ResizeScale;
    use image::{GenericImageView, ImageEncoder};

    /// Encode a gradient JPEG of the given size in memory.
    fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut bytes = Vec::new();
        JpegEncoder::new(&mut bytes)
            .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
            .unwrap();
        bytes
    }

    fn params(displayed: Dimensions) -> RenderParams {
        RenderParams {
            displayed,
            crop: None,
            scale: ResizeScale::default(),
            filter: FilterExpression::identity(),
            quality: Quality::default(),
        }
    }

    #[test]
    fn sniff_recognizes_jpeg_and_rejects_text() {
        assert_eq!(sniff_format(&test_jpeg(4, 4)), Some(ImageFormat::Jpeg));
        assert_eq!(sniff_format(b"definitely not an image"), None);
    }

    #[test]
    fn identify_reads_header() {
        let dims = identify(&test_jpeg(200, 150)).unwrap();
        assert_eq!(dims, Dimensions::new(200, 150));
    }

    #[test]
    fn identify_garbage_errors() {
        assert!(matches!(identify(b"nope"), Err(CompositeError::Decode(_))));
    }

    #[test]
    fn render_without_edits_keeps_natural_size() {
        let compositor = RasterCompositor::new();
        let source = compositor.decode(&test_jpeg(120, 80)).unwrap();
        let out = compositor
            .render(&source, &params(Dimensions::new(60, 40)))
            .unwrap();

        assert_eq!(out.dimensions, Dimensions::new(120, 80));
        assert_eq!(out.content_type, "image/jpeg");
        assert_eq!(identify(&out.bytes).unwrap(), Dimensions::new(120, 80));
    }

    #[test]
    fn render_crops_then_scales() {
        let compositor = RasterCompositor::new();
        let source = compositor.decode(&test_jpeg(400, 300)).unwrap();
        let out = compositor
            .render(
                &source,
                &RenderParams {
                    crop: Some(CropRegion::percent(25.0, 0.0, 50.0, 50.0)),
                    scale: ResizeScale::new(50),
                    ..params(Dimensions::new(200, 150))
                },
            )
            .unwrap();

        // 50% x 50% of 400x300 = 200x150, halved → 100x75
        assert_eq!(out.dimensions, Dimensions::new(100, 75));
        let decoded = compositor.decode(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (100, 75));
    }

    #[test]
    fn render_applies_filter_to_drawn_pixels() {
        let compositor = RasterCompositor::new();
        let source = compositor.decode(&test_jpeg(32, 32)).unwrap();
        let dark = FilterSettings::default().with(FilterChannel::Brightness, 0);
        let out = compositor
            .render(
                &source,
                &RenderParams {
                    filter: dark.expression(),
                    ..params(Dimensions::new(32, 32))
                },
            )
            .unwrap();

        let decoded = compositor.decode(&out.bytes).unwrap().to_rgb8();
        // JPEG is lossy; a black surface stays within a couple of levels of 0
        assert!(decoded.pixels().all(|p| p.0.iter().all(|&c| c <= 4)));
    }

    #[test]
    fn render_unavailable_for_empty_surface() {
        let compositor = RasterCompositor::new();
        let source = DynamicImage::new_rgb8(10, 10);
        let result = compositor.render(
            &source,
            &RenderParams {
                crop: Some(CropRegion::percent(0.0, 0.0, 1.0, 1.0)),
                scale: ResizeScale::new(10),
                ..params(Dimensions::new(10, 10))
            },
        );
        assert!(matches!(
            result,
            Err(CompositeError::SurfaceUnavailable { .. })
        ));
    }

    #[test]
    fn decode_garbage_errors() {
        let compositor = RasterCompositor::new();
        assert!(matches!(
            compositor.decode(b"\x00\x01\x02"),
            Err(CompositeError::Decode(_))
        ));
    }
}
