//! Image transform pipeline: crop → resize → filter → encode.
//!
//! | Step | Where |
//! |---|---|
//! | **Crop geometry** | [`geometry`]: aspect presets, initial and recentered crops |
//! | **Filters** | [`filters`]: brightness / contrast / saturation, one shared expression |
//! | **Mapping & sizing** | [`calculations`]: display → natural pixels, output size, surface limits |
//! | **Render → JPEG** | [`RasterCompositor`]: `image` crate, Lanczos3, quality 90 |
//!
//! The module is split into:
//! - **Calculations / geometry / filters**: Pure functions (unit testable)
//! - **Parameters**: Data structures describing one render
//! - **Compositor**: [`Compositor`] trait + [`RasterCompositor`]

pub mod calculations;
pub mod compositor;
pub mod filters;
pub mod geometry;
mod params;
pub mod raster;

pub use compositor::{CompositeError, Compositor, Dimensions, EncodedImage};
pub use filters::{FilterChannel, FilterExpression, FilterSettings};
pub use geometry::{ASPECT_PRESETS, AspectRatio, CropRegion, CropUnit, GeometryError};
pub use params::{Quality, RenderParams, ResizeScale, SourceRect};
pub use raster::RasterCompositor;
