//! Shared test utilities: in-memory storage backends and image fixtures.
//!
//! The fakes implement the storage traits over `Mutex`-guarded maps and can
//! be told to fail specific calls, so gateway and controller tests can
//! exercise the error paths without touching disk or network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let objects = MemoryObjectStore::new();
//! let records = MemoryRecordStore::new();
//! records.seed("1", "u", "https://cdn.test/blog-images/u/a.jpg", "a.jpg", "2026-01-01T00:00:00Z");
//! objects.fail_remove_of("u/a.jpg");
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::io::Cursor;
use std::sync::Mutex;

use crate::naming;
use crate::storage::{
    MediaQuery, ObjectRef, ObjectStore, RecordStore, ResourceFetcher, SortOrder, StorageError,
    StoredObject,
};
use crate::types::{MediaId, NewMediaRecord, RawMediaRow};

/// Public base every [`MemoryObjectStore`] URL starts with.
pub const TEST_PUBLIC_BASE: &str = "https://cdn.test/blog-images/";

// =========================================================================
// Image fixtures
// =========================================================================

/// A solid-colour JPEG of the given size.
pub fn test_jpeg(width: u32, height: u32) -> Vec<u8> {
    encode_fixture(width, height, image::ImageFormat::Jpeg)
}

/// A solid-colour PNG of the given size.
pub fn test_png(width: u32, height: u32) -> Vec<u8> {
    encode_fixture(width, height, image::ImageFormat::Png)
}

fn encode_fixture(width: u32, height: u32, format: image::ImageFormat) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([180, 120, 60]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, format)
        .unwrap();
    buf.into_inner()
}

// =========================================================================
// Object store
// =========================================================================

#[derive(Default)]
pub struct MemoryObjectStore {
    pub objects: Mutex<BTreeMap<String, Vec<u8>>>,
    fail_put: Mutex<bool>,
    fail_remove: Mutex<HashSet<String>>,
    fail_list: Mutex<bool>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `put` fail.
    pub fn fail_puts(&self) {
        *self.fail_put.lock().unwrap() = true;
    }

    /// Make `remove(path)` fail.
    pub fn fail_remove_of(&self, path: &str) {
        self.fail_remove.lock().unwrap().insert(path.to_string());
    }

    pub fn fail_lists(&self) {
        *self.fail_list.lock().unwrap() = true;
    }

    pub fn insert(&self, path: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(path.to_string(), bytes.to_vec());
    }

    pub fn paths(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.objects.lock().unwrap().contains_key(path)
    }
}

impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        _content_type: &str,
    ) -> Result<ObjectRef, StorageError> {
        if *self.fail_put.lock().unwrap() {
            return Err(StorageError::Http("injected put failure".into()));
        }
        let mut objects = self.objects.lock().unwrap();
        if objects.contains_key(path) {
            return Err(StorageError::Rejected(format!("object already exists: {path}")));
        }
        objects.insert(path.to_string(), bytes.to_vec());
        Ok(ObjectRef {
            path: path.to_string(),
        })
    }

    fn public_url(&self, object: &ObjectRef) -> String {
        format!("{TEST_PUBLIC_BASE}{}", object.path)
    }

    fn path_for_url(&self, url: &str) -> Option<String> {
        naming::path_under_base(url, TEST_PUBLIC_BASE)
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        if self.fail_remove.lock().unwrap().contains(path) {
            return Err(StorageError::Http(format!("injected remove failure: {path}")));
        }
        match self.objects.lock().unwrap().remove(path) {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound(path.to_string())),
        }
    }

    async fn list(&self, dir: &str, search: &str) -> Result<Vec<StoredObject>, StorageError> {
        if *self.fail_list.lock().unwrap() {
            return Err(StorageError::Http("injected list failure".into()));
        }
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };
        Ok(self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(path, bytes)| {
                let name = path.strip_prefix(&prefix)?;
                (!name.contains('/') && name.contains(search)).then(|| StoredObject {
                    name: name.to_string(),
                    size: Some(bytes.len() as u64),
                })
            })
            .collect())
    }
}

// =========================================================================
// Record store
// =========================================================================

pub struct MemoryRecordStore {
    pub rows: Mutex<Vec<RawMediaRow>>,
    next_id: Mutex<u64>,
    fail_insert: Mutex<bool>,
    fail_delete: Mutex<HashSet<String>>,
    fail_query: Mutex<bool>,
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            next_id: Mutex::new(100),
            fail_insert: Mutex::new(false),
            fail_delete: Mutex::new(HashSet::new()),
            fail_query: Mutex::new(false),
        }
    }
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a well-formed row.
    pub fn seed(&self, id: &str, owner: &str, url: &str, name: &str, created_at: &str) {
        self.seed_raw(RawMediaRow {
            id: Some(serde_json::Value::String(id.into())),
            user_id: Some(owner.into()),
            url: Some(url.into()),
            name: Some(name.into()),
            created_at: Some(created_at.into()),
        });
    }

    /// Add a row exactly as given, malformed or not.
    pub fn seed_raw(&self, row: RawMediaRow) {
        self.rows.lock().unwrap().push(row);
    }

    pub fn fail_inserts(&self) {
        *self.fail_insert.lock().unwrap() = true;
    }

    pub fn fail_delete_of(&self, id: &str) {
        self.fail_delete.lock().unwrap().insert(id.to_string());
    }

    pub fn fail_queries(&self) {
        *self.fail_query.lock().unwrap() = true;
    }

    pub fn ids(&self) -> Vec<String> {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .filter_map(|r| r.id.as_ref().and_then(|v| v.as_str()).map(str::to_string))
            .collect()
    }
}

impl RecordStore for MemoryRecordStore {
    async fn insert(&self, record: NewMediaRecord) -> Result<RawMediaRow, StorageError> {
        if *self.fail_insert.lock().unwrap() {
            return Err(StorageError::Http("injected insert failure".into()));
        }
        let mut next_id = self.next_id.lock().unwrap();
        let row = RawMediaRow {
            id: Some(serde_json::Value::String(next_id.to_string())),
            user_id: Some(record.user_id.0),
            url: Some(record.url),
            name: Some(record.name),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        };
        *next_id += 1;
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn delete(&self, id: &MediaId) -> Result<(), StorageError> {
        if self.fail_delete.lock().unwrap().contains(&id.0) {
            return Err(StorageError::Http(format!("injected delete failure: {id}")));
        }
        self.rows
            .lock()
            .unwrap()
            .retain(|r| r.id.as_ref().and_then(|v| v.as_str()) != Some(id.0.as_str()));
        Ok(())
    }

    async fn query(&self, query: &MediaQuery) -> Result<Vec<RawMediaRow>, StorageError> {
        if *self.fail_query.lock().unwrap() {
            return Err(StorageError::Http("injected query failure".into()));
        }
        let mut rows: Vec<RawMediaRow> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| match &query.owner {
                Some(owner) => r.user_id.as_deref() == Some(owner.0.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        // RFC 3339 UTC strings order lexically.
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        if query.order == SortOrder::NewestFirst {
            rows.reverse();
        }
        Ok(rows)
    }
}

// =========================================================================
// Fetcher
// =========================================================================

/// Serves registered URLs from memory; anything else is `NotFound`.
#[derive(Default)]
pub struct MemoryFetcher {
    resources: Mutex<HashMap<String, Vec<u8>>>,
    fetched: Mutex<Vec<String>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, bytes: Vec<u8>) {
        self.resources.lock().unwrap().insert(url.to_string(), bytes);
    }

    /// URLs fetched so far, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.lock().unwrap().clone()
    }
}

impl ResourceFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError> {
        self.fetched.lock().unwrap().push(url.to_string());
        self.resources
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(url.to_string()))
    }
}
