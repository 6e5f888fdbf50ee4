//! Parameter types for image operations.
//!
//! These structs describe *what* to render, not *how*. They are the interface
//! between the [`library`](crate::library) controller (which owns the edit
//! state) and the [`compositor`](super::compositor) (which does the pixel
//! work). This separation allows swapping compositors (e.g. for testing with
//! a mock) without changing controller logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`ResizeScale`]: Uniform post-crop scale in percent (10–100, default 100). Clamped on construction.
//! - [`SourceRect`]: A rectangle in natural-pixel space of the source image.
//! - [`RenderParams`]: Full specification for one composition.

use super::compositor::Dimensions;
use super::filters::FilterExpression;
use super::geometry::CropRegion;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    /// Edited images are always encoded at 0.9.
    fn default() -> Self {
        Self(90)
    }
}

/// Uniform resize applied to both axes after cropping, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeScale(u32);

impl ResizeScale {
    pub const MIN: u32 = 10;
    pub const MAX: u32 = 100;

    pub fn new(percent: u32) -> Self {
        Self(percent.clamp(Self::MIN, Self::MAX))
    }

    pub fn percent(self) -> u32 {
        self.0
    }

    pub fn factor(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_identity(self) -> bool {
        self.0 == 100
    }
}

impl Default for ResizeScale {
    fn default() -> Self {
        Self(100)
    }
}

/// Rectangle in the source image's natural pixel space.
///
/// Coordinates stay fractional until the compositor snaps them to the pixel
/// grid, so output dimensions are computed from the exact mapped size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl SourceRect {
    pub fn full(natural: Dimensions) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: natural.width as f64,
            height: natural.height as f64,
        }
    }
}

/// Everything the compositor needs besides the decoded source pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    /// Size the source is currently displayed at. Crop regions are relative
    /// to this, not to the natural size.
    pub displayed: Dimensions,
    /// Active crop, or `None` to use the full image.
    pub crop: Option<CropRegion>,
    pub scale: ResizeScale,
    pub filter: FilterExpression,
    pub quality: Quality,
}
