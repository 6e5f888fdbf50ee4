//! Image metadata shown alongside a preview.
//!
//! Two independent lookups, each with its own failure policy:
//!
//! ## Natural dimensions
//!
//! Read by fetching the resource and decoding just its header
//! ([`raster::identify`]). A fetch or decode failure means the metadata is
//! unavailable: the preview still renders from the URL, it simply shows no
//! dimensions.
//!
//! ## File size
//!
//! Only attempted for URLs the object store serves (see
//! [`ObjectStore::path_for_url`]). The object's directory is listed with
//! the file name as search term and the exact name is matched. Any failure
//! (listing error, no match, no size reported) leaves the size unknown; it is
//! an enrichment and never blocks the dimensions.
//!
//! ## Display format
//!
//! [`format_file_size`] uses 1024-based units:
//!
//! | Bytes | Display |
//! |---|---|
//! | `512` | `512 B` |
//! | `2048` | `2.0 KB` |
//! | `3_407_872` | `3.25 MB` |

use crate::imaging::{CompositeError, Dimensions, raster};
use crate::naming;
use crate::storage::{ObjectStore, ResourceFetcher, StorageError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("could not fetch image: {0}")]
    Fetch(#[from] StorageError),
    #[error("could not read image: {0}")]
    Decode(#[from] CompositeError),
}

/// Derived, read-only view of a previewed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    /// Human-readable byte size, when it could be determined.
    pub file_size: Option<String>,
}

impl ImageMetadata {
    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.width, self.height)
    }
}

/// Reads metadata for URLs, borrowing the fetcher and object store it needs.
pub struct MetadataProbe<'a, F, O> {
    fetcher: &'a F,
    objects: &'a O,
}

impl<'a, F: ResourceFetcher, O: ObjectStore> MetadataProbe<'a, F, O> {
    pub fn new(fetcher: &'a F, objects: &'a O) -> Self {
        Self { fetcher, objects }
    }

    /// Natural pixel size of the image at `url`.
    pub async fn dimensions(&self, url: &str) -> Result<Dimensions, ProbeError> {
        let bytes = self.fetcher.fetch(url).await?;
        Ok(raster::identify(&bytes)?)
    }

    /// Byte size of a managed object, or `None`.
    pub async fn file_size(&self, url: &str) -> Option<u64> {
        let path = self.objects.path_for_url(url)?;
        let (dir, file_name) = naming::split_object_path(&path);
        match self.objects.list(dir, file_name).await {
            Ok(listing) => listing
                .into_iter()
                .find(|object| object.name == file_name)
                .and_then(|object| object.size),
            Err(e) => {
                log::debug!("size lookup for {path} failed: {e}");
                None
            }
        }
    }

    /// Dimensions plus best-effort size. `None` when the dimensions cannot
    /// be read.
    pub async fn probe(&self, url: &str) -> Option<ImageMetadata> {
        let dimensions = match self.dimensions(url).await {
            Ok(d) => d,
            Err(e) => {
                log::info!("metadata unavailable for {url}: {e}");
                return None;
            }
        };
        let file_size = self.file_size(url).await.map(format_file_size);
        Some(ImageMetadata {
            width: dimensions.width,
            height: dimensions.height,
            file_size,
        })
    }
}

/// Format a byte count for display.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;
    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    }
}
