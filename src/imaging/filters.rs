//! Brightness / contrast / saturation adjustments.
//!
//! [`FilterSettings`] holds the three slider values. [`FilterExpression`] is
//! the single composed form of those values, and the only thing either
//! consumer sees: the live preview renders [`FilterExpression::to_css`], the
//! compositor applies [`FilterExpression::apply_rgb`]. Both come from the
//! same struct, so what the user previews is what gets saved.
//!
//! Pixel math follows the CSS Filter Effects definitions, applied in
//! expression order with each step clamped to `[0, 1]`:
//!
//! | Function | Transfer |
//! |---|---|
//! | `brightness(b)` | `C * b` |
//! | `contrast(c)` | `(C - 0.5) * c + 0.5` |
//! | `saturate(s)` | luminance-preserving 3×3 matrix |

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Neutral value of every channel.
pub const IDENTITY: u32 = 100;
/// Upper bound of every channel.
pub const MAX_VALUE: u32 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterChannel {
    Brightness,
    Contrast,
    Saturation,
}

impl FilterChannel {
    pub const ALL: [FilterChannel; 3] = [Self::Brightness, Self::Contrast, Self::Saturation];

    pub fn label(self) -> &'static str {
        match self {
            Self::Brightness => "brightness",
            Self::Contrast => "contrast",
            Self::Saturation => "saturation",
        }
    }
}

impl fmt::Display for FilterChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "brightness" => Ok(Self::Brightness),
            "contrast" => Ok(Self::Contrast),
            "saturation" | "saturate" => Ok(Self::Saturation),
            other => Err(format!("unknown filter channel: {other}")),
        }
    }
}

/// Three independent percentages, 100 = unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSettings {
    pub brightness: u32,
    pub contrast: u32,
    pub saturation: u32,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            brightness: IDENTITY,
            contrast: IDENTITY,
            saturation: IDENTITY,
        }
    }
}

impl FilterSettings {
    pub fn get(&self, channel: FilterChannel) -> u32 {
        match channel {
            FilterChannel::Brightness => self.brightness,
            FilterChannel::Contrast => self.contrast,
            FilterChannel::Saturation => self.saturation,
        }
    }

    /// Return a copy with one channel replaced (clamped to `0..=200`).
    pub fn with(self, channel: FilterChannel, value: u32) -> Self {
        let value = value.min(MAX_VALUE);
        match channel {
            FilterChannel::Brightness => Self {
                brightness: value,
                ..self
            },
            FilterChannel::Contrast => Self {
                contrast: value,
                ..self
            },
            FilterChannel::Saturation => Self {
                saturation: value,
                ..self
            },
        }
    }

    pub fn reset() -> Self {
        Self::default()
    }

    /// True when any channel differs from 100.
    pub fn has_changes(&self) -> bool {
        *self != Self::default()
    }

    pub fn expression(&self) -> FilterExpression {
        FilterExpression::new(*self)
    }

    /// Shorthand for `self.expression().to_css()`.
    pub fn css_filter_expression(&self) -> String {
        self.expression().to_css()
    }
}

/// Composed, ready-to-apply form of [`FilterSettings`].
///
/// Brightness and contrast are per-channel transfer functions, so they are
/// folded into one 256-entry lookup table; saturation mixes channels and is
/// applied as a matrix afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterExpression {
    settings: FilterSettings,
    lut: Option<Box<[u8; 256]>>,
    saturation: Option<[[f32; 3]; 3]>,
}

impl FilterExpression {
    pub fn new(settings: FilterSettings) -> Self {
        let brightness = settings.brightness as f32 / 100.0;
        let contrast = settings.contrast as f32 / 100.0;

        let lut = (settings.brightness != IDENTITY || settings.contrast != IDENTITY).then(|| {
            let mut table = Box::new([0u8; 256]);
            for (i, slot) in table.iter_mut().enumerate() {
                let c = i as f32 / 255.0;
                let c = (c * brightness).clamp(0.0, 1.0);
                let c = ((c - 0.5) * contrast + 0.5).clamp(0.0, 1.0);
                *slot = (c * 255.0).round() as u8;
            }
            table
        });

        let saturation = (settings.saturation != IDENTITY)
            .then(|| saturation_matrix(settings.saturation as f32 / 100.0));

        Self {
            settings,
            lut,
            saturation,
        }
    }

    pub fn identity() -> Self {
        Self::new(FilterSettings::default())
    }

    pub fn settings(&self) -> FilterSettings {
        self.settings
    }

    pub fn is_identity(&self) -> bool {
        self.lut.is_none() && self.saturation.is_none()
    }

    /// CSS `filter` value for the live preview.
    pub fn to_css(&self) -> String {
        format!(
            "brightness({}%) contrast({}%) saturate({}%)",
            self.settings.brightness, self.settings.contrast, self.settings.saturation
        )
    }

    /// Apply the expression to one RGB pixel.
    #[inline]
    pub fn apply_rgb(&self, rgb: [u8; 3]) -> [u8; 3] {
        let rgb = match &self.lut {
            Some(lut) => [lut[rgb[0] as usize], lut[rgb[1] as usize], lut[rgb[2] as usize]],
            None => rgb,
        };
        match &self.saturation {
            Some(m) => {
                let [r, g, b] = rgb.map(|c| c as f32);
                let mix = |row: &[f32; 3]| {
                    (row[0] * r + row[1] * g + row[2] * b).round().clamp(0.0, 255.0) as u8
                };
                [mix(&m[0]), mix(&m[1]), mix(&m[2])]
            }
            None => rgb,
        }
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_css())
    }
}

fn saturation_matrix(s: f32) -> [[f32; 3]; 3] {
    [
        [0.213 + 0.787 * s, 0.715 - 0.715 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 + 0.285 * s, 0.072 - 0.072 * s],
        [0.213 - 0.213 * s, 0.715 - 0.715 * s, 0.072 + 0.928 * s],
    ]
}
