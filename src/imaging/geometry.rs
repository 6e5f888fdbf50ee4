//! Crop geometry in displayed-image space.
//!
//! All crop math happens in percent of the *displayed* image so it stays
//! independent of the source resolution. Mapping into natural pixels only
//! happens at composition time (see [`calculations`](super::calculations)).
//!
//! The aspect-constrained crop follows the usual two-step recipe: size a crop
//! of the requested width at the target ratio, shrink it until it fits inside
//! the media, then center it.

use super::compositor::Dimensions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Working ratio used for the initial crop when no preset is pinned.
pub const FREE_WORKING_RATIO: AspectRatio = AspectRatio {
    width: 16,
    height: 9,
};

/// Share of the displayed width the initial crop covers.
pub const INITIAL_CROP_PERCENT: f64 = 90.0;

/// Share of the displayed width a crop covers after a preset is chosen.
pub const PRESET_CROP_PERCENT: f64 = 80.0;

const EPSILON: f64 = 1e-9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("Crop width and height must be positive")]
    EmptyRegion,
    #[error("Crop origin must not be negative")]
    NegativeOrigin,
    #[error("Crop extends past the image edge")]
    OutOfBounds,
    #[error("Invalid aspect ratio: {0}")]
    InvalidAspect(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropUnit {
    Percent,
    Pixel,
}

/// A crop rectangle relative to the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub unit: CropUnit,
}

impl CropRegion {
    pub fn percent(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            unit: CropUnit::Percent,
        }
    }

    pub fn pixel(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            unit: CropUnit::Pixel,
        }
    }

    /// Check the region's invariants against the displayed size.
    pub fn validate(&self, displayed: Dimensions) -> Result<(), GeometryError> {
        if !(self.width > 0.0 && self.height > 0.0) {
            return Err(GeometryError::EmptyRegion);
        }
        if self.x < 0.0 || self.y < 0.0 {
            return Err(GeometryError::NegativeOrigin);
        }
        let (max_x, max_y) = match self.unit {
            CropUnit::Percent => (100.0, 100.0),
            CropUnit::Pixel => (displayed.width as f64, displayed.height as f64),
        };
        if self.x + self.width > max_x + EPSILON || self.y + self.height > max_y + EPSILON {
            return Err(GeometryError::OutOfBounds);
        }
        Ok(())
    }

    /// Express the region in percent of the displayed size.
    pub fn to_percent(self, displayed: Dimensions) -> Self {
        match self.unit {
            CropUnit::Percent => self,
            CropUnit::Pixel => {
                let (w, h) = (displayed.width as f64, displayed.height as f64);
                Self::percent(
                    self.x / w * 100.0,
                    self.y / h * 100.0,
                    self.width / w * 100.0,
                    self.height / h * 100.0,
                )
            }
        }
    }

    /// Express the region in displayed pixels.
    pub fn to_pixel(self, displayed: Dimensions) -> Self {
        match self.unit {
            CropUnit::Pixel => self,
            CropUnit::Percent => {
                let (w, h) = (displayed.width as f64, displayed.height as f64);
                Self::pixel(
                    self.x * w / 100.0,
                    self.y * h / 100.0,
                    self.width * w / 100.0,
                    self.height * h / 100.0,
                )
            }
        }
    }
}

/// A width:height ratio constraining the crop shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectRatio {
    pub width: u32,
    pub height: u32,
}

impl AspectRatio {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn value(self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl FromStr for AspectRatio {
    type Err = GeometryError;

    /// Parse `"W:H"`, e.g. `"16:9"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GeometryError::InvalidAspect(s.to_string());
        let (w, h) = s.split_once(':').ok_or_else(invalid)?;
        let width: u32 = w.trim().parse().map_err(|_| invalid())?;
        let height: u32 = h.trim().parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

/// Presets offered while cropping. `None` is "Free" (unconstrained).
pub const ASPECT_PRESETS: &[(&str, Option<AspectRatio>)] = &[
    ("Free", None),
    ("16:9", Some(AspectRatio::new(16, 9))),
    ("4:3", Some(AspectRatio::new(4, 3))),
    ("1:1", Some(AspectRatio::new(1, 1))),
    ("3:4", Some(AspectRatio::new(3, 4))),
    ("9:16", Some(AspectRatio::new(9, 16))),
    ("2:1", Some(AspectRatio::new(2, 1))),
    ("21:9", Some(AspectRatio::new(21, 9))),
];

/// Size a percent crop of `width_percent` at `aspect`, shrunk to fit the media.
///
/// The returned crop sits at the origin; pair with [`center_crop`].
pub fn make_aspect_crop(width_percent: f64, aspect: AspectRatio, media: Dimensions) -> CropRegion {
    let (media_w, media_h) = (media.width as f64, media.height as f64);
    let ratio = aspect.value();

    let mut px_width = width_percent / 100.0 * media_w;
    let mut px_height = px_width / ratio;

    if px_height > media_h {
        px_height = media_h;
        px_width = px_height * ratio;
    }
    if px_width > media_w {
        px_width = media_w;
        px_height = px_width / ratio;
    }

    CropRegion::percent(
        0.0,
        0.0,
        px_width / media_w * 100.0,
        px_height / media_h * 100.0,
    )
}

/// Center a percent crop within the media.
pub fn center_crop(crop: CropRegion) -> CropRegion {
    CropRegion::percent(
        (100.0 - crop.width) / 2.0,
        (100.0 - crop.height) / 2.0,
        crop.width,
        crop.height,
    )
}

/// Crop shown when crop mode is entered.
///
/// Uses the pinned ratio, or 16:9 when free, at 90% of the displayed width.
pub fn initial_crop(aspect: Option<AspectRatio>, displayed: Dimensions) -> CropRegion {
    let ratio = aspect.unwrap_or(FREE_WORKING_RATIO);
    center_crop(make_aspect_crop(INITIAL_CROP_PERCENT, ratio, displayed))
}

/// Crop recomputed when a preset is chosen: centered, 80% of the displayed width.
pub fn recenter(aspect: AspectRatio, displayed: Dimensions) -> CropRegion {
    center_crop(make_aspect_crop(PRESET_CROP_PERCENT, aspect, displayed))
}
