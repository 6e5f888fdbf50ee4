//! The only component that mutates the backend.
//!
//! Every operation resolves the owner first and refuses to run without one.
//!
//! ## Upload
//!
//! 1. Store the bytes at `{owner}/{millis}-{suffix}.{ext}`.
//! 2. Insert a row pointing at the object's public URL.
//!
//! If step 2 fails the just-stored object is removed once, best effort. A
//! failed removal is logged and the object stays orphaned.
//!
//! ## Remove
//!
//! The storage object is deleted first, but only best effort and only when
//! the URL is one the object store serves and its path lies under the
//! signed-in owner's prefix. The row delete that follows is what makes the item gone, so
//! it runs whatever the storage outcome was.
//!
//! ## Rows
//!
//! Rows come back loosely typed and are normalized here into
//! [`MediaItem`]. Malformed rows are logged and dropped.

use crate::imaging::{EncodedImage, raster};
use crate::naming;
use crate::storage::{
    IdentityProvider, MediaQuery, ObjectStore, RecordStore, SortOrder, StorageError,
};
use crate::types::{MediaId, MediaItem, NewMediaRecord, OwnerId, name_from_url};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Not signed in")]
    NotAuthenticated,
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Outcome of a bulk delete. Never all-or-nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkDeleteReport {
    pub requested: usize,
    pub deleted: usize,
    /// Items whose row could not be deleted, with the reason.
    pub failed: Vec<(MediaId, String)>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.deleted == self.requested
    }
}

pub struct PersistenceGateway<I, O, R> {
    identity: I,
    objects: O,
    records: R,
    max_upload_bytes: u64,
}

impl<I, O, R> PersistenceGateway<I, O, R>
where
    I: IdentityProvider,
    O: ObjectStore,
    R: RecordStore,
{
    pub fn new(identity: I, objects: O, records: R, max_upload_bytes: u64) -> Self {
        Self {
            identity,
            objects,
            records,
            max_upload_bytes,
        }
    }

    pub fn objects(&self) -> &O {
        &self.objects
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// The signed-in owner, or [`GatewayError::NotAuthenticated`].
    pub async fn owner(&self) -> Result<OwnerId, GatewayError> {
        self.identity
            .current_owner()
            .await
            .ok_or(GatewayError::NotAuthenticated)
    }

    /// The owner's items, newest first. Empty when nobody is signed in.
    pub async fn list(&self) -> Result<Vec<MediaItem>, GatewayError> {
        let Some(owner) = self.identity.current_owner().await else {
            return Ok(Vec::new());
        };
        let rows = self
            .records
            .query(&MediaQuery {
                owner: Some(owner),
                order: SortOrder::NewestFirst,
            })
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| match MediaItem::try_from(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    log::warn!("Skipping malformed media row: {e}");
                    None
                }
            })
            .collect())
    }

    /// Store an encoded edit as a new item named `name`.
    pub async fn upload(&self, image: &EncodedImage, name: &str) -> Result<MediaItem, GatewayError> {
        self.store(&image.bytes, image.content_type, image.extension, name)
            .await
    }

    /// Validate and store a user-supplied file.
    ///
    /// The file must be a recognized image format and no larger than the
    /// configured upload limit.
    pub async fn upload_file(&self, name: &str, bytes: &[u8]) -> Result<MediaItem, GatewayError> {
        let format = raster::sniff_format(bytes)
            .ok_or_else(|| GatewayError::Validation(format!("{name} is not an image")))?;
        if bytes.len() as u64 > self.max_upload_bytes {
            return Err(GatewayError::Validation(format!(
                "{name} is too large ({} bytes, limit {})",
                bytes.len(),
                self.max_upload_bytes
            )));
        }
        let extension = format.extensions_str().first().copied().unwrap_or("bin");
        self.store(bytes, format.to_mime_type(), extension, name)
            .await
    }

    async fn store(
        &self,
        bytes: &[u8],
        content_type: &str,
        extension: &str,
        name: &str,
    ) -> Result<MediaItem, GatewayError> {
        let owner = self.owner().await?;
        let path = naming::object_path(
            &owner,
            chrono::Utc::now().timestamp_millis(),
            &naming::fresh_suffix(bytes),
            extension,
        );

        let object = self.objects.put(&path, bytes, content_type).await?;
        let url = self.objects.public_url(&object);

        let row = match self
            .records
            .insert(NewMediaRecord {
                user_id: owner,
                url,
                name: name.to_string(),
            })
            .await
        {
            Ok(row) => row,
            Err(e) => {
                if let Err(cleanup) = self.objects.remove(&path).await {
                    log::warn!("Orphaned object {path} after failed insert: {cleanup}");
                }
                return Err(e.into());
            }
        };

        MediaItem::try_from(row)
            .map_err(|e| StorageError::Rejected(format!("store returned a bad row: {e}")).into())
    }

    /// Register an external URL without storing anything.
    pub async fn register_url(&self, url: &str) -> Result<MediaItem, GatewayError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(GatewayError::Validation("Please enter a URL".to_string()));
        }
        let owner = self.owner().await?;
        let row = self
            .records
            .insert(NewMediaRecord {
                user_id: owner,
                url: url.to_string(),
                name: name_from_url(url),
            })
            .await?;
        MediaItem::try_from(row)
            .map_err(|e| StorageError::Rejected(format!("store returned a bad row: {e}")).into())
    }

    /// Delete an item: storage object best effort, then the row.
    pub async fn remove(&self, item: &MediaItem) -> Result<(), GatewayError> {
        let owner = self.owner().await?;
        self.remove_owned(&owner, item).await
    }

    async fn remove_owned(&self, owner: &OwnerId, item: &MediaItem) -> Result<(), GatewayError> {
        match self.objects.path_for_url(&item.url) {
            Some(path) if naming::is_owned_path(&path, owner) => {
                if let Err(e) = self.objects.remove(&path).await {
                    log::warn!("Could not delete stored object {path} for {}: {e}", item.id);
                }
            }
            Some(path) => {
                log::warn!("Not deleting {path} for {}: outside {owner}'s storage", item.id);
            }
            None => {}
        }
        self.records.delete(&item.id).await?;
        log::debug!("deleted media {}", item.id);
        Ok(())
    }

    /// Delete each item in turn. One failure never stops the rest.
    pub async fn bulk_remove(&self, items: &[MediaItem]) -> Result<BulkDeleteReport, GatewayError> {
        let owner = self.owner().await?;
        let mut report = BulkDeleteReport {
            requested: items.len(),
            ..BulkDeleteReport::default()
        };
        for item in items {
            match self.remove_owned(&owner, item).await {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    log::warn!("Failed to delete {}: {e}", item.id);
                    report.failed.push((item.id.clone(), e.to_string()));
                }
            }
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StaticIdentity;
    use crate::test_helpers::*;
    use crate::types::{EXTERNAL_IMAGE_NAME, RawMediaRow};

    type TestGateway = PersistenceGateway<StaticIdentity, MemoryObjectStore, MemoryRecordStore>;

    fn gateway() -> TestGateway {
        PersistenceGateway::new(
            StaticIdentity::from_config("u1"),
            MemoryObjectStore::new(),
            MemoryRecordStore::new(),
            1024 * 1024,
        )
    }

    fn signed_out() -> TestGateway {
        PersistenceGateway::new(
            StaticIdentity::signed_out(),
            MemoryObjectStore::new(),
            MemoryRecordStore::new(),
            1024 * 1024,
        )
    }

    fn managed(id: &str, path: &str) -> MediaItem {
        MediaItem {
            id: MediaId::from(id),
            url: format!("{TEST_PUBLIC_BASE}{path}"),
            name: path.to_string(),
            created_at: chrono::Utc::now(),
        }
    }

    // =========================================================================
    // Upload
    // =========================================================================

    #[tokio::test]
    async fn upload_stores_under_owner_and_registers_row() {
        let gw = gateway();
        let item = gw.upload_file("cat.png", &test_png(4, 4)).await.unwrap();

        let paths = gw.objects().paths();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].starts_with("u1/"));
        assert!(paths[0].ends_with(".png"));
        assert_eq!(item.url, format!("{TEST_PUBLIC_BASE}{}", paths[0]));
        assert_eq!(item.name, "cat.png");
        assert_eq!(gw.records().ids(), vec![item.id.0.clone()]);
    }

    #[tokio::test]
    async fn identical_uploads_get_distinct_paths() {
        let gw = gateway();
        let bytes = test_jpeg(4, 4);
        let a = gw.upload_file("a.jpg", &bytes).await.unwrap();
        let b = gw.upload_file("a.jpg", &bytes).await.unwrap();
        assert_ne!(a.url, b.url);
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn upload_rejects_non_images_and_oversize() {
        let gw = gateway();
        assert!(matches!(
            gw.upload_file("notes.txt", b"hello").await,
            Err(GatewayError::Validation(_))
        ));

        let small = PersistenceGateway::new(
            StaticIdentity::from_config("u1"),
            MemoryObjectStore::new(),
            MemoryRecordStore::new(),
            10,
        );
        assert!(matches!(
            small.upload_file("big.png", &test_png(16, 16)).await,
            Err(GatewayError::Validation(_))
        ));
        assert!(small.objects().paths().is_empty());
    }

    #[tokio::test]
    async fn upload_requires_owner() {
        let gw = signed_out();
        assert!(matches!(
            gw.upload_file("a.png", &test_png(2, 2)).await,
            Err(GatewayError::NotAuthenticated)
        ));
        assert!(gw.objects().paths().is_empty());
    }

    #[tokio::test]
    async fn failed_insert_removes_uploaded_object() {
        let gw = gateway();
        gw.records().fail_inserts();
        let result = gw.upload_file("a.png", &test_png(2, 2)).await;
        assert!(matches!(result, Err(GatewayError::Storage(_))));
        assert!(gw.objects().paths().is_empty());
    }

    #[tokio::test]
    async fn failed_put_registers_nothing() {
        let gw = gateway();
        gw.objects().fail_puts();
        assert!(gw.upload_file("a.png", &test_png(2, 2)).await.is_err());
        assert!(gw.records().ids().is_empty());
    }

    // =========================================================================
    // Register URL
    // =========================================================================

    #[tokio::test]
    async fn register_url_names_from_last_segment() {
        let gw = gateway();
        let item = gw
            .register_url("  https://elsewhere.test/pics/cat.png ")
            .await
            .unwrap();
        assert_eq!(item.name, "cat.png");
        assert_eq!(item.url, "https://elsewhere.test/pics/cat.png");

        let bare = gw.register_url("https://elsewhere.test/").await.unwrap();
        assert_eq!(bare.name, EXTERNAL_IMAGE_NAME);
        assert!(gw.objects().paths().is_empty());
    }

    #[tokio::test]
    async fn empty_url_is_validation_even_when_signed_out() {
        let gw = signed_out();
        assert!(matches!(
            gw.register_url("   ").await,
            Err(GatewayError::Validation(_))
        ));
    }

    // =========================================================================
    // List
    // =========================================================================

    #[tokio::test]
    async fn list_drops_malformed_rows() {
        let gw = gateway();
        gw.records()
            .seed("1", "u1", "https://x.test/a.jpg", "a.jpg", "2026-01-01T00:00:00Z");
        gw.records().seed_raw(RawMediaRow {
            id: Some(serde_json::json!("2")),
            user_id: Some("u1".into()),
            url: None,
            ..RawMediaRow::default()
        });
        gw.records()
            .seed("3", "other", "https://x.test/b.jpg", "b.jpg", "2026-01-02T00:00:00Z");

        let items = gw.list().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, MediaId::from("1"));
    }

    #[tokio::test]
    async fn list_without_owner_is_empty() {
        let gw = signed_out();
        gw.records()
            .seed("1", "u1", "https://x.test/a.jpg", "a.jpg", "2026-01-01T00:00:00Z");
        assert!(gw.list().await.unwrap().is_empty());
    }

    // =========================================================================
    // Remove
    // =========================================================================

    #[tokio::test]
    async fn remove_deletes_object_and_row() {
        let gw = gateway();
        let item = gw.upload_file("a.png", &test_png(2, 2)).await.unwrap();
        gw.remove(&item).await.unwrap();
        assert!(gw.objects().paths().is_empty());
        assert!(gw.records().ids().is_empty());
    }

    #[tokio::test]
    async fn remove_deletes_row_even_if_object_delete_fails() {
        let gw = gateway();
        gw.objects().insert("u1/1-a.jpg", b"x");
        gw.objects().fail_remove_of("u1/1-a.jpg");
        gw.records().seed(
            "1",
            "u1",
            &format!("{TEST_PUBLIC_BASE}u1/1-a.jpg"),
            "a.jpg",
            "2026-01-01T00:00:00Z",
        );

        gw.remove(&managed("1", "u1/1-a.jpg")).await.unwrap();
        assert!(gw.records().ids().is_empty());
        assert!(gw.objects().contains("u1/1-a.jpg"));
    }

    #[tokio::test]
    async fn remove_external_url_leaves_storage_alone() {
        let gw = gateway();
        gw.objects().insert("u1/keep.jpg", b"x");
        let item = gw.register_url("https://elsewhere.test/keep.jpg").await.unwrap();
        gw.remove(&item).await.unwrap();
        assert!(gw.objects().contains("u1/keep.jpg"));
    }

    #[tokio::test]
    async fn lookalike_bucket_url_never_reaches_storage() {
        let gw = gateway();
        gw.objects().insert("u2/victim.jpg", b"x");
        let item = gw
            .register_url("https://elsewhere.test/blog-images/u2/victim.jpg")
            .await
            .unwrap();
        gw.remove(&item).await.unwrap();
        assert!(gw.objects().contains("u2/victim.jpg"));
        assert!(gw.records().ids().is_empty());
    }

    #[tokio::test]
    async fn managed_url_of_another_owner_is_not_deleted() {
        let gw = gateway();
        gw.objects().insert("u2/victim.jpg", b"x");
        gw.objects().insert("u1/mine.jpg", b"x");
        let foreign = gw
            .register_url(&format!("{TEST_PUBLIC_BASE}u2/victim.jpg"))
            .await
            .unwrap();
        let sneaky = gw
            .register_url(&format!("{TEST_PUBLIC_BASE}u1/../u2/victim.jpg"))
            .await
            .unwrap();

        gw.remove(&foreign).await.unwrap();
        gw.remove(&sneaky).await.unwrap();
        assert!(gw.objects().contains("u2/victim.jpg"));
        assert!(gw.objects().contains("u1/mine.jpg"));
        assert!(gw.records().ids().is_empty());
    }

    #[tokio::test]
    async fn bulk_remove_stays_inside_owner_prefix() {
        let gw = gateway();
        gw.objects().insert("u1/a.jpg", b"x");
        gw.objects().insert("u2/b.jpg", b"x");
        let own = gw
            .register_url(&format!("{TEST_PUBLIC_BASE}u1/a.jpg"))
            .await
            .unwrap();
        let foreign = gw
            .register_url(&format!("{TEST_PUBLIC_BASE}u2/b.jpg"))
            .await
            .unwrap();
        let lookalike = gw
            .register_url("https://elsewhere.test/blog-images/u2/b.jpg")
            .await
            .unwrap();

        let report = gw.bulk_remove(&[own, foreign, lookalike]).await.unwrap();
        assert!(report.is_complete());
        assert!(!gw.objects().contains("u1/a.jpg"));
        assert!(gw.objects().contains("u2/b.jpg"));
    }

    #[tokio::test]
    async fn remove_requires_owner() {
        let gw = signed_out();
        assert!(matches!(
            gw.remove(&managed("1", "u1/a.jpg")).await,
            Err(GatewayError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn bulk_remove_continues_past_failures() {
        let gw = gateway();
        let items: Vec<MediaItem> = (1..=4)
            .map(|i| {
                let path = format!("u1/{i}.jpg");
                gw.objects().insert(&path, b"x");
                gw.records().seed(
                    &i.to_string(),
                    "u1",
                    &format!("{TEST_PUBLIC_BASE}{path}"),
                    "x",
                    "2026-01-01T00:00:00Z",
                );
                managed(&i.to_string(), &path)
            })
            .collect();
        gw.objects().fail_remove_of("u1/2.jpg");
        gw.records().fail_delete_of("3");

        let report = gw.bulk_remove(&items).await.unwrap();
        assert_eq!(report.requested, 4);
        assert_eq!(report.deleted, 3);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, MediaId::from("3"));
        assert!(!report.is_complete());
        assert_eq!(gw.records().ids(), vec!["3".to_string()]);
    }
}
