//! The media library controller.
//!
//! Owns every piece of transient state (the cached item list, search,
//! selection, the open preview session and the notice queue) and drives the
//! other components in response to caller actions.
//!
//! ```text
//! Browsing ──open_preview──▶ Preview ──save──▶ Saving ──ok──▶ Browsing
//!    ▲                        │  ▲  │                └─err──▶ Preview
//!    └──────close_preview─────┘  │  └──download──▶ Downloading ──▶ Preview
//!                                └── edits (crop, aspect, scale, filters)
//! ```
//!
//! ## Failure policy
//!
//! Every fallible operation returns a [`LibraryError`] and also queues an
//! error [`Notice`]. A failure never leaves the controller in `Saving` or
//! `Downloading`: it falls back to the state the action started from.
//!
//! ## Late results
//!
//! Metadata is loaded in two steps. [`LibraryController::open_preview`]
//! hands out a [`MetadataTicket`] naming the session; the caller probes with
//! [`LibraryController::load_metadata`] whenever it likes and hands the
//! result back to [`LibraryController::apply_metadata`]. A result whose
//! session is no longer the open one is dropped.
//!
//! ## Cache
//!
//! The item list is a cache. It is reloaded after every mutation and never
//! patched from events. A failed reload after a successful mutation is
//! reported as its own notice; the mutation still counts as done.

use crate::gateway::{BulkDeleteReport, GatewayError, PersistenceGateway};
use crate::imaging::{
    AspectRatio, CompositeError, Compositor, CropRegion, Dimensions, EncodedImage, FilterChannel,
};
use crate::metadata::{ImageMetadata, MetadataProbe};
use crate::naming;
use crate::session::{EditAction, EditError, PreviewSession, SessionId, reduce};
use crate::storage::{IdentityProvider, ObjectStore, RecordStore, ResourceFetcher, StorageError};
use crate::types::{MediaId, MediaItem, matches_search};
use image::DynamicImage;
use std::collections::{BTreeSet, VecDeque};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    /// Bad input; nothing was attempted.
    #[error("{0}")]
    Validation(String),
    #[error("You must be logged in")]
    NotAuthenticated,
    /// Storage, network or database failure.
    #[error("{0}")]
    ExternalIo(String),
    /// The compositor could not produce an output.
    #[error("Failed to process image: {0}")]
    ProcessingUnavailable(String),
    #[error("No image is open")]
    NoPreview,
}

impl From<GatewayError> for LibraryError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::NotAuthenticated => LibraryError::NotAuthenticated,
            GatewayError::Validation(msg) => LibraryError::Validation(msg),
            GatewayError::Storage(e) => LibraryError::ExternalIo(e.to_string()),
        }
    }
}

impl From<StorageError> for LibraryError {
    fn from(e: StorageError) -> Self {
        LibraryError::ExternalIo(e.to_string())
    }
}

impl From<CompositeError> for LibraryError {
    fn from(e: CompositeError) -> Self {
        match e {
            CompositeError::Decode(msg) => LibraryError::ExternalIo(msg),
            other => LibraryError::ProcessingUnavailable(other.to_string()),
        }
    }
}

impl From<EditError> for LibraryError {
    fn from(e: EditError) -> Self {
        LibraryError::Validation(e.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Browsing,
    Preview,
    Saving,
    Downloading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A transient user-facing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Per-file outcome of [`LibraryController::upload_files`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadReport {
    pub uploaded: Vec<MediaItem>,
    /// `(file name, reason)` for every file that was not stored.
    pub skipped: Vec<(String, String)>,
}

/// Names the session a metadata lookup belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataTicket {
    pub session: SessionId,
    pub url: String,
}

/// A finished metadata lookup, waiting to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataUpdate {
    pub session: SessionId,
    pub metadata: Option<ImageMetadata>,
}

/// A rendered edit delivered to the caller instead of being stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedImage {
    pub file_name: String,
    pub image: EncodedImage,
}

pub struct LibraryController<I, O, R, F, C> {
    gateway: PersistenceGateway<I, O, R>,
    fetcher: F,
    compositor: C,
    items: Vec<MediaItem>,
    search: String,
    selecting: bool,
    selected: BTreeSet<MediaId>,
    phase: Phase,
    preview: Option<PreviewSession>,
    /// Decoded pixels of the open item, keyed by session.
    source: Option<(SessionId, DynamicImage)>,
    next_session: u64,
    notices: VecDeque<Notice>,
}

impl<I, O, R, F, C> LibraryController<I, O, R, F, C>
where
    I: IdentityProvider,
    O: ObjectStore,
    R: RecordStore,
    F: ResourceFetcher,
    C: Compositor,
{
    pub fn new(gateway: PersistenceGateway<I, O, R>, fetcher: F, compositor: C) -> Self {
        Self {
            gateway,
            fetcher,
            compositor,
            items: Vec::new(),
            search: String::new(),
            selecting: false,
            selected: BTreeSet::new(),
            phase: Phase::Browsing,
            preview: None,
            source: None,
            next_session: 1,
            notices: VecDeque::new(),
        }
    }

    pub fn gateway(&self) -> &PersistenceGateway<I, O, R> {
        &self.gateway
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn compositor(&self) -> &C {
        &self.compositor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn preview(&self) -> Option<&PreviewSession> {
        self.preview.as_ref()
    }

    pub fn items(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn item(&self, id: &MediaId) -> Option<&MediaItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    /// Drain queued notices, oldest first.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    fn notify(&mut self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => log::info!("{}", notice.message),
            NoticeLevel::Error => log::warn!("{}", notice.message),
        }
        self.notices.push_back(notice);
    }

    /// Queue an error notice for `err` and return it.
    fn fail<T>(&mut self, context: &str, err: LibraryError) -> Result<T, LibraryError> {
        self.notify(Notice::error(format!("{context}: {err}")));
        Err(err)
    }

    /// Reload after a mutation that already succeeded. A failure is
    /// queued as a notice by `reload` and does not undo the mutation.
    async fn refresh(&mut self) {
        if let Err(e) = self.reload().await {
            log::debug!("list stays stale after mutation: {e}");
        }
    }

    // =========================================================================
    // Listing, search, selection
    // =========================================================================

    /// Replace the cached item list from the backend.
    pub async fn reload(&mut self) -> Result<(), LibraryError> {
        match self.gateway.list().await {
            Ok(items) => {
                self.items = items;
                let known: BTreeSet<&MediaId> = self.items.iter().map(|i| &i.id).collect();
                self.selected.retain(|id| known.contains(id));
                Ok(())
            }
            Err(e) => self.fail("Failed to load media", e.into()),
        }
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, query: &str) {
        self.search = query.to_string();
    }

    /// Cached items whose name matches the search, newest first.
    pub fn visible_items(&self) -> Vec<&MediaItem> {
        self.items
            .iter()
            .filter(|item| matches_search(item, &self.search))
            .collect()
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    pub fn selected(&self) -> &BTreeSet<MediaId> {
        &self.selected
    }

    /// Add or remove one item; an emptied selection leaves selection mode.
    pub fn toggle_select(&mut self, id: &MediaId) {
        if !self.selected.remove(id) {
            self.selected.insert(id.clone());
            self.selecting = true;
        }
        if self.selected.is_empty() {
            self.selecting = false;
        }
    }

    /// Select every visible item, or clear the selection if every visible
    /// item already is.
    pub fn toggle_select_all(&mut self) {
        let visible: BTreeSet<MediaId> = self.visible_items().into_iter().map(|i| i.id.clone()).collect();
        if visible.is_subset(&self.selected) {
            self.cancel_selection();
        } else {
            self.selected = visible;
            self.selecting = true;
        }
    }

    pub fn cancel_selection(&mut self) {
        self.selected.clear();
        self.selecting = false;
    }

    // =========================================================================
    // Adding items
    // =========================================================================

    /// Upload files one by one. Invalid or failing files are skipped with a
    /// notice; the rest are stored.
    pub async fn upload_files(
        &mut self,
        files: Vec<(String, Vec<u8>)>,
    ) -> Result<UploadReport, LibraryError> {
        if let Err(e) = self.gateway.owner().await {
            return self.fail("Cannot upload images", e.into());
        }

        let mut report = UploadReport::default();
        for (name, bytes) in files {
            match self.gateway.upload_file(&name, &bytes).await {
                Ok(item) => {
                    self.notify(Notice::success(format!("{name} uploaded successfully")));
                    report.uploaded.push(item);
                }
                Err(e) => {
                    let err = LibraryError::from(e);
                    self.notify(Notice::error(format!("Failed to upload {name}: {err}")));
                    report.skipped.push((name, err.to_string()));
                }
            }
        }

        self.refresh().await;
        Ok(report)
    }

    /// Register an external image URL.
    pub async fn add_by_url(&mut self, url: &str) -> Result<MediaItem, LibraryError> {
        match self.gateway.register_url(url).await {
            Ok(item) => {
                self.notify(Notice::success("Image added to library"));
                self.refresh().await;
                Ok(item)
            }
            Err(e) => self.fail("Failed to add image", e.into()),
        }
    }

    // =========================================================================
    // Deleting items
    // =========================================================================

    pub async fn delete(&mut self, id: &MediaId) -> Result<(), LibraryError> {
        let Some(item) = self.item(id).cloned() else {
            return self.fail(
                "Failed to delete image",
                LibraryError::Validation(format!("unknown media id {id}")),
            );
        };
        if let Err(e) = self.gateway.remove(&item).await {
            return self.fail("Failed to delete image", e.into());
        }

        self.notify(Notice::success("Image removed from library"));
        self.selected.remove(&item.id);
        if self.selected.is_empty() {
            self.selecting = false;
        }
        if self.preview.as_ref().is_some_and(|p| p.item.id == item.id) {
            self.close_preview();
        }
        self.refresh().await;
        Ok(())
    }

    /// Delete several items. Individual failures are counted, never fatal.
    pub async fn bulk_delete(&mut self, ids: &[MediaId]) -> Result<BulkDeleteReport, LibraryError> {
        let wanted: BTreeSet<&MediaId> = ids.iter().collect();
        let items: Vec<MediaItem> = self
            .items
            .iter()
            .filter(|item| wanted.contains(&item.id))
            .cloned()
            .collect();
        if items.is_empty() {
            return Ok(BulkDeleteReport::default());
        }

        let report = match self.gateway.bulk_remove(&items).await {
            Ok(report) => report,
            Err(e) => return self.fail("Failed to delete images", e.into()),
        };

        let plural = if report.deleted == 1 { "" } else { "s" };
        self.notify(Notice::success(format!("{} image{plural} deleted", report.deleted)));
        for (id, reason) in &report.failed {
            self.notify(Notice::error(format!("Failed to delete {id}: {reason}")));
        }

        if self
            .preview
            .as_ref()
            .is_some_and(|p| wanted.contains(&p.item.id))
        {
            self.close_preview();
        }
        self.cancel_selection();
        self.refresh().await;
        Ok(report)
    }

    pub async fn delete_selected(&mut self) -> Result<BulkDeleteReport, LibraryError> {
        let ids: Vec<MediaId> = self.selected.iter().cloned().collect();
        self.bulk_delete(&ids).await
    }

    // =========================================================================
    // Preview session
    // =========================================================================

    /// Open `id` for preview, closing any open one.
    pub fn open_preview(&mut self, id: &MediaId) -> Result<MetadataTicket, LibraryError> {
        let Some(item) = self.item(id).cloned() else {
            return Err(LibraryError::Validation(format!("unknown media id {id}")));
        };
        self.close_preview();

        let session = SessionId(self.next_session);
        self.next_session += 1;
        let ticket = MetadataTicket {
            session,
            url: item.url.clone(),
        };
        log::debug!("opened preview {session} for {}", item.id);
        self.preview = Some(PreviewSession::open(session, item));
        self.phase = Phase::Preview;
        Ok(ticket)
    }

    /// Discard the session and every edit in it.
    pub fn close_preview(&mut self) {
        if let Some(session) = self.preview.take() {
            log::debug!("closed preview {}", session.id);
        }
        self.source = None;
        self.phase = Phase::Browsing;
    }

    fn metadata_probe(&self) -> MetadataProbe<'_, F, O> {
        MetadataProbe::new(&self.fetcher, self.gateway.objects())
    }

    /// Probe the image a ticket names. Does not touch controller state.
    pub async fn load_metadata(&self, ticket: &MetadataTicket) -> MetadataUpdate {
        MetadataUpdate {
            session: ticket.session,
            metadata: self.metadata_probe().probe(&ticket.url).await,
        }
    }

    /// Apply a metadata result if its session is still open. Returns
    /// whether it was applied.
    pub fn apply_metadata(&mut self, update: MetadataUpdate) -> bool {
        let current = match &self.preview {
            Some(session) if session.id == update.session => session,
            _ => {
                log::warn!("Discarding metadata for stale preview {}", update.session);
                return false;
            }
        };
        match reduce(current, EditAction::MetadataLoaded(update.metadata)) {
            Ok(next) => {
                self.preview = Some(next);
                true
            }
            Err(_) => false,
        }
    }

    /// Open a preview and load its metadata right away.
    pub async fn open_and_probe(&mut self, id: &MediaId) -> Result<(), LibraryError> {
        let ticket = self.open_preview(id)?;
        let update = self.load_metadata(&ticket).await;
        self.apply_metadata(update);
        Ok(())
    }

    /// Apply one edit to the open session.
    pub fn edit(&mut self, action: EditAction) -> Result<(), LibraryError> {
        let session = self.preview.as_ref().ok_or(LibraryError::NoPreview)?;
        self.preview = Some(reduce(session, action)?);
        Ok(())
    }

    pub fn toggle_crop(&mut self) -> Result<(), LibraryError> {
        self.edit(EditAction::ToggleCrop)
    }

    pub fn set_aspect(&mut self, aspect: Option<AspectRatio>) -> Result<(), LibraryError> {
        self.edit(EditAction::SetAspect(aspect))
    }

    pub fn adjust_crop(&mut self, region: CropRegion) -> Result<(), LibraryError> {
        self.edit(EditAction::AdjustCrop(region))
    }

    pub fn set_resize_scale(&mut self, percent: u32) -> Result<(), LibraryError> {
        self.edit(EditAction::SetResizeScale(percent))
    }

    pub fn set_filter(&mut self, channel: FilterChannel, value: u32) -> Result<(), LibraryError> {
        self.edit(EditAction::SetFilter(channel, value))
    }

    pub fn reset_filters(&mut self) -> Result<(), LibraryError> {
        self.edit(EditAction::ResetFilters)
    }

    pub fn set_display_size(&mut self, width: u32, height: u32) -> Result<(), LibraryError> {
        self.edit(EditAction::SetDisplaySize(Dimensions::new(width, height)))
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Render the open session's current edits.
    ///
    /// The edit state is snapshotted before the source is loaded, so the
    /// output reflects exactly the state at the moment of the call.
    async fn render_current(&mut self) -> Result<(EncodedImage, String), LibraryError> {
        let session = self.preview.clone().ok_or(LibraryError::NoPreview)?;

        let cached = matches!(&self.source, Some((id, _)) if *id == session.id);
        if !cached {
            let bytes = self.fetcher.fetch(&session.item.url).await?;
            let decoded = self.compositor.decode(&bytes)?;
            self.source = Some((session.id, decoded));
        }
        let Some((_, source)) = &self.source else {
            return Err(LibraryError::NoPreview);
        };

        let natural = Dimensions::new(source.width(), source.height());
        let params = session.render_params(natural);
        let encoded = self.compositor.render(source, &params)?;
        Ok((encoded, naming::derived_name(&session.item.name)))
    }

    /// Render the edits and store them as a new item. The original item is
    /// never modified.
    pub async fn save(&mut self) -> Result<MediaItem, LibraryError> {
        if self.preview.is_none() {
            return Err(LibraryError::NoPreview);
        }
        self.phase = Phase::Saving;

        let result = match self.render_current().await {
            Ok((encoded, name)) => self
                .gateway
                .upload(&encoded, &name)
                .await
                .map_err(LibraryError::from),
            Err(e) => Err(e),
        };

        match result {
            Ok(item) => {
                self.notify(Notice::success("Edited image saved to library"));
                self.close_preview();
                self.refresh().await;
                Ok(item)
            }
            Err(e) => {
                self.phase = Phase::Preview;
                self.fail("Failed to save", e)
            }
        }
    }

    /// Render the edits for the caller to keep locally. Backend state is
    /// untouched and the preview stays open.
    pub async fn download(&mut self) -> Result<DownloadedImage, LibraryError> {
        if self.preview.is_none() {
            return Err(LibraryError::NoPreview);
        }
        self.phase = Phase::Downloading;
        let result = self.render_current().await;
        self.phase = Phase::Preview;

        match result {
            Ok((image, file_name)) => {
                self.notify(Notice::success("Image downloaded"));
                Ok(DownloadedImage { file_name, image })
            }
            Err(e) => self.fail("Failed to download", e),
        }
    }
}
