//! External collaborators: identity, object storage, the media table, and
//! URL fetching.
//!
//! Each collaborator is a trait so the gateway and controller are
//! backend-agnostic. The local implementations keep everything on disk:
//!
//! | Trait | Local implementation |
//! |---|---|
//! | [`IdentityProvider`] | [`StaticIdentity`], owner from config / CLI |
//! | [`ObjectStore`] | [`FsObjectStore`], one directory per bucket |
//! | [`RecordStore`] | [`JsonRecordStore`], media table in a JSON file |
//! | [`ResourceFetcher`] | [`DefaultFetcher`], `file://` and `http(s)://` |
//!
//! All calls are `async` and are driven on a single-threaded runtime; none
//! of the traits require `Send`.
#![allow(async_fn_in_trait)]

mod fetch;
mod fs;
mod identity;
mod records;

pub use fetch::DefaultFetcher;
pub use fs::FsObjectStore;
pub use identity::StaticIdentity;
pub use records::JsonRecordStore;

use crate::types::{MediaId, NewMediaRecord, OwnerId, RawMediaRow};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Rejected: {0}")]
    Rejected(String),
}

impl From<reqwest::Error> for StorageError {
    fn from(e: reqwest::Error) -> Self {
        StorageError::Http(e.to_string())
    }
}

/// Handle to a stored object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    pub path: String,
}

/// One entry of an object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub name: String,
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
}

/// Filter and order for [`RecordStore::query`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MediaQuery {
    /// Restrict to rows owned by this principal.
    pub owner: Option<OwnerId>,
    pub order: SortOrder,
}

pub trait IdentityProvider {
    /// The signed-in owner, if any.
    async fn current_owner(&self) -> Option<OwnerId>;
}

pub trait ObjectStore {
    /// Store `bytes` at `path`. Fails if the path is invalid or taken.
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<ObjectRef, StorageError>;

    /// Public URL under which `object` is served.
    fn public_url(&self, object: &ObjectRef) -> String;

    /// Object path behind a URL this store serves, or `None` for any other
    /// URL. Inverse of [`ObjectStore::public_url`].
    fn path_for_url(&self, url: &str) -> Option<String>;

    async fn remove(&self, path: &str) -> Result<(), StorageError>;

    /// Objects directly inside `dir` whose name contains `search`.
    async fn list(&self, dir: &str, search: &str) -> Result<Vec<StoredObject>, StorageError>;
}

pub trait RecordStore {
    /// Insert a row; the store assigns `id` and `created_at` and returns the row.
    async fn insert(&self, record: NewMediaRecord) -> Result<RawMediaRow, StorageError>;

    async fn delete(&self, id: &MediaId) -> Result<(), StorageError>;

    async fn query(&self, query: &MediaQuery) -> Result<Vec<RawMediaRow>, StorageError>;
}

pub trait ResourceFetcher {
    /// Read the bytes behind `url`.
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, StorageError>;
}
