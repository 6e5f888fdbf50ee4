//! Compositor trait and shared types.
//!
//! The [`Compositor`] trait defines the two operations the library needs from
//! a rasterizer: read a source's natural size, and render an edit (crop →
//! resize → filter → encode) into a new encoded buffer.
//!
//! The production implementation is
//! [`RasterCompositor`](super::raster::RasterCompositor), built on the
//! `image` crate.

use super::params::RenderParams;
use image::DynamicImage;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CompositeError {
    /// No output surface could be produced (zero-sized or too large).
    #[error("Processing unavailable: cannot allocate a {width}x{height} surface")]
    SurfaceUnavailable { width: u32, height: u32 },
    #[error("Failed to decode image: {0}")]
    Decode(String),
    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// Pixel size of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Result of a composition: encoded bytes plus the raster size they hold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub dimensions: Dimensions,
    /// MIME type of `bytes`.
    pub content_type: &'static str,
    /// File extension matching `content_type`, without the dot.
    pub extension: &'static str,
}

/// Trait for image compositors.
///
/// Rendering is synchronous: once invoked, a composition runs to completion
/// against the parameters it was handed, so a later edit can never tear a
/// render that is already underway.
pub trait Compositor {
    /// Decode an encoded image into pixels.
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, CompositeError>;

    /// Render `source` according to `params` and encode the result.
    fn render(
        &self,
        source: &DynamicImage,
        params: &RenderParams,
    ) -> Result<EncodedImage, CompositeError>;
}
