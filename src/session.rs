//! Preview session state and its transitions.
//!
//! A [`PreviewSession`] holds everything that exists only while one item is
//! open: crop, aspect, resize scale, filters, the reported display size and
//! the loaded metadata. It is created when a preview opens and dropped when
//! it closes; nothing in it outlives the session.
//!
//! All edits go through [`reduce`], which takes the current session and an
//! [`EditAction`] and returns the next session. The geometry and filter
//! functions it calls are pure, so the same input always yields the same
//! state.

use crate::imaging::geometry::{self, AspectRatio, CropRegion, GeometryError};
use crate::imaging::{Dimensions, FilterChannel, FilterSettings, Quality, RenderParams, ResizeScale};
use crate::metadata::ImageMetadata;
use crate::types::MediaItem;
use std::fmt;
use thiserror::Error;

/// Identifies one preview session. Never reused within a controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Image size is not known yet")]
    SizeUnknown,
    #[error("Crop mode is not active")]
    NotCropping,
    #[error("Display size must be positive")]
    EmptyDisplay,
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// A user edit, applied by [`reduce`].
#[derive(Debug, Clone, PartialEq)]
pub enum EditAction {
    ToggleCrop,
    /// Pin a ratio (`Some`) or go back to free cropping (`None`).
    SetAspect(Option<AspectRatio>),
    /// Replace the crop with an interactively adjusted one.
    AdjustCrop(CropRegion),
    SetResizeScale(u32),
    SetFilter(FilterChannel, u32),
    ResetFilters,
    /// The size the preview is rendered at.
    SetDisplaySize(Dimensions),
    MetadataLoaded(Option<ImageMetadata>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewSession {
    pub id: SessionId,
    pub item: MediaItem,
    pub metadata: Option<ImageMetadata>,
    pub displayed: Option<Dimensions>,
    pub cropping: bool,
    pub aspect: Option<AspectRatio>,
    /// Present exactly while `cropping`.
    pub crop: Option<CropRegion>,
    pub scale: ResizeScale,
    pub filters: FilterSettings,
}

impl PreviewSession {
    /// A fresh session with every tool at its default.
    pub fn open(id: SessionId, item: MediaItem) -> Self {
        Self {
            id,
            item,
            metadata: None,
            displayed: None,
            cropping: false,
            aspect: None,
            crop: None,
            scale: ResizeScale::default(),
            filters: FilterSettings::default(),
        }
    }

    /// Size crop regions are relative to: the reported display size, else
    /// the natural size from metadata.
    pub fn display_size(&self) -> Option<Dimensions> {
        self.displayed
            .or_else(|| self.metadata.as_ref().map(ImageMetadata::dimensions))
    }

    /// Crop mode active, resize below 100%, or any filter off 100.
    pub fn is_edited(&self) -> bool {
        self.cropping || !self.scale.is_identity() || self.filters.has_changes()
    }

    /// Snapshot of the current edits as compositor input.
    ///
    /// `natural` stands in for the display size when none is known, which
    /// maps crop regions one-to-one onto source pixels.
    pub fn render_params(&self, natural: Dimensions) -> RenderParams {
        RenderParams {
            displayed: self.display_size().unwrap_or(natural),
            crop: if self.cropping { self.crop } else { None },
            scale: self.scale,
            filter: self.filters.expression(),
            quality: Quality::default(),
        }
    }
}

/// Apply one edit, returning the next session.
pub fn reduce(session: &PreviewSession, action: EditAction) -> Result<PreviewSession, EditError> {
    let mut next = session.clone();
    match action {
        EditAction::ToggleCrop => {
            if next.cropping {
                next.cropping = false;
                next.crop = None;
            } else {
                let displayed = next.display_size().ok_or(EditError::SizeUnknown)?;
                next.cropping = true;
                next.crop = Some(geometry::initial_crop(next.aspect, displayed));
            }
        }
        EditAction::SetAspect(aspect) => {
            next.aspect = aspect;
            // Unpinning keeps whatever the user last dragged.
            if let (Some(ratio), true) = (aspect, next.cropping) {
                let displayed = next.display_size().ok_or(EditError::SizeUnknown)?;
                next.crop = Some(geometry::recenter(ratio, displayed));
            }
        }
        EditAction::AdjustCrop(region) => {
            if !next.cropping {
                return Err(EditError::NotCropping);
            }
            let displayed = next.display_size().ok_or(EditError::SizeUnknown)?;
            region.validate(displayed)?;
            next.crop = Some(region);
        }
        EditAction::SetResizeScale(percent) => next.scale = ResizeScale::new(percent),
        EditAction::SetFilter(channel, value) => next.filters = next.filters.with(channel, value),
        EditAction::ResetFilters => next.filters = FilterSettings::reset(),
        EditAction::SetDisplaySize(size) => {
            if size.is_empty() {
                return Err(EditError::EmptyDisplay);
            }
            next.displayed = Some(size);
        }
        EditAction::MetadataLoaded(metadata) => next.metadata = metadata,
    }
    Ok(next)
}
