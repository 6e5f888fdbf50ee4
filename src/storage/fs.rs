//! Object storage on the local filesystem.
//!
//! ```text
//! <root>/<bucket>/
//! └── user-7/
//!     ├── 1767225600000-3f9a1c0e.jpg
//!     └── 1767225612345-b01d44a9.png
//! ```
//!
//! Public URLs are `<public_base><path>`; with no configured base they are
//! `file://` URLs pointing into the bucket directory.

use crate::naming;
use super::{ObjectRef, ObjectStore, StorageError, StoredObject};
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

pub struct FsObjectStore {
    bucket_dir: PathBuf,
    public_base: String,
}

impl FsObjectStore {
    /// Store objects under `bucket_dir`, served from `public_base`.
    ///
    /// An empty `public_base` serves from `file://<bucket_dir>/`.
    pub fn new(bucket_dir: impl Into<PathBuf>, public_base: &str) -> Self {
        let bucket_dir = bucket_dir.into();
        let mut public_base = if public_base.trim().is_empty() {
            format!("file://{}", absolute(&bucket_dir).display())
        } else {
            public_base.trim().to_string()
        };
        if !public_base.ends_with('/') {
            public_base.push('/');
        }
        Self {
            bucket_dir,
            public_base,
        }
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    /// Resolve an object path inside the bucket, refusing anything that
    /// could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path);
        let safe = !path.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::Rejected(format!("invalid object path: {path}")));
        }
        Ok(self.bucket_dir.join(relative))
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

impl ObjectStore for FsObjectStore {
    async fn put(
        &self,
        path: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<ObjectRef, StorageError> {
        let target = self.resolve(path)?;
        if tokio::fs::try_exists(&target).await? {
            return Err(StorageError::Rejected(format!("object already exists: {path}")));
        }
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;
        log::debug!("stored {} ({} bytes, {})", path, bytes.len(), content_type);
        Ok(ObjectRef {
            path: path.to_string(),
        })
    }

    fn public_url(&self, object: &ObjectRef) -> String {
        format!("{}{}", self.public_base, object.path)
    }

    fn path_for_url(&self, url: &str) -> Option<String> {
        naming::path_under_base(url, &self.public_base)
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list(&self, dir: &str, search: &str) -> Result<Vec<StoredObject>, StorageError> {
        let root = if dir.is_empty() {
            self.bucket_dir.clone()
        } else {
            self.resolve(dir)?
        };
        let search = search.to_string();

        tokio::task::spawn_blocking(move || -> Result<Vec<StoredObject>, StorageError> {
            if !root.is_dir() {
                return Ok(Vec::new());
            }
            let mut objects = Vec::new();
            for entry in WalkDir::new(&root).min_depth(1).max_depth(1).sort_by_file_name() {
                let entry = entry.map_err(io::Error::from)?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let name = entry.file_name().to_string_lossy().to_string();
                if !name.contains(&search) {
                    continue;
                }
                let size = entry.metadata().ok().map(|m| m.len());
                objects.push(StoredObject { name, size });
            }
            Ok(objects)
        })
        .await
        .map_err(|e| StorageError::Io(io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_list_remove_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path().join("blog-images"), "https://cdn.test/blog-images");

        let obj = store.put("u1/100-aa.jpg", b"12345", "image/jpeg").await.unwrap();
        store.put("u1/200-bb.jpg", b"1", "image/jpeg").await.unwrap();
        assert_eq!(
            store.public_url(&obj),
            "https://cdn.test/blog-images/u1/100-aa.jpg"
        );

        let listed = store.list("u1", "100-aa").await.unwrap();
        assert_eq!(
            listed,
            vec![StoredObject {
                name: "100-aa.jpg".into(),
                size: Some(5)
            }]
        );

        store.remove("u1/100-aa.jpg").await.unwrap();
        assert_eq!(store.list("u1", "").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn put_refuses_to_overwrite() {
        let tmp = TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path(), "");
        store.put("a/1.jpg", b"x", "image/jpeg").await.unwrap();
        let again = store.put("a/1.jpg", b"y", "image/jpeg").await;
        assert!(matches!(again, Err(StorageError::Rejected(_))));
    }

    #[tokio::test]
    async fn rejects_escaping_paths() {
        let tmp = TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path(), "");
        for bad in ["../x.jpg", "/etc/passwd", "", "a/../../b"] {
            assert!(
                matches!(store.put(bad, b"x", "image/jpeg").await, Err(StorageError::Rejected(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn remove_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path(), "");
        assert!(matches!(
            store.remove("nope.jpg").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn default_public_base_is_file_url() {
        let tmp = TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path(), "");
        let url = store.public_url(&ObjectRef {
            path: "u/1.jpg".into(),
        });
        assert!(url.starts_with("file://"));
        assert!(url.ends_with("/u/1.jpg"));
    }

    #[test]
    fn path_for_url_only_accepts_own_base() {
        let tmp = TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path(), "https://cdn.test/blog-images");
        assert_eq!(
            store.path_for_url("https://cdn.test/blog-images/u1/100-aa.jpg").as_deref(),
            Some("u1/100-aa.jpg")
        );
        assert_eq!(
            store.path_for_url("https://elsewhere.test/blog-images/u1/100-aa.jpg"),
            None
        );

        let local = FsObjectStore::new(tmp.path(), "");
        let url = local.public_url(&ObjectRef {
            path: "u/1.jpg".into(),
        });
        assert_eq!(local.path_for_url(&url).as_deref(), Some("u/1.jpg"));
    }

    #[tokio::test]
    async fn listing_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = FsObjectStore::new(tmp.path(), "");
        assert!(store.list("ghost", "").await.unwrap().is_empty());
    }
}
