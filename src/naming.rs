//! Object paths and display names.
//!
//! ## Object paths
//!
//! Every stored object lives under its owner's prefix with a collision-resistant
//! file name: upload time in milliseconds plus a short hash suffix.
//!
//! - `user-7/1767225600000-3f9a1c0e.jpg`
//!
//! ## Derived names
//!
//! Edits are saved as new items named after their source with the last
//! extension replaced by `-edited.jpg`:
//! - `Sunset.png` → `Sunset-edited.jpg`
//! - `photo.final.webp` → `photo.final-edited.jpg`
//! - `README` → `README-edited.jpg`
//!
//! ## Managed URLs
//!
//! A URL belongs to managed storage only when it starts with the object
//! store's public base; the rest of the URL is the object path. Other URLs
//! (added by link) are never touched in storage, even when they happen to
//! look like a bucket path.
//!
//! An object path belongs to an owner when its first segment is the owner id
//! and no segment is `.` or `..`.

use crate::types::OwnerId;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

static SUFFIX_NONCE: AtomicU64 = AtomicU64::new(0);

/// Length of the hex suffix appended after the timestamp.
const SUFFIX_LEN: usize = 8;

/// Hex suffix derived from `content` and a `nonce`.
pub fn suffix_for(content: &[u8], nonce: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(nonce.to_le_bytes());
    hasher.update(content);
    let digest = format!("{:x}", hasher.finalize());
    digest[..SUFFIX_LEN].to_string()
}

/// Suffix that differs between any two calls in this process.
///
/// Mixes the wall clock's nanoseconds with a process-wide counter, so two
/// uploads of identical bytes in the same millisecond still get distinct names.
pub fn fresh_suffix(content: &[u8]) -> String {
    let nanos = chrono::Utc::now().timestamp_subsec_nanos() as u64;
    let counter = SUFFIX_NONCE.fetch_add(1, Ordering::Relaxed);
    suffix_for(content, nanos ^ counter.rotate_left(32))
}

/// `{owner}/{millis}-{suffix}.{ext}`
pub fn object_path(owner: &OwnerId, millis: i64, suffix: &str, extension: &str) -> String {
    format!("{}/{}-{}.{}", owner, millis, suffix, extension)
}

/// Strip the last extension, if any (`a.b.c` → `a.b`, `name` → `name`).
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}

/// Name for an edited copy of `name`.
pub fn derived_name(name: &str) -> String {
    format!("{}-edited.jpg", strip_extension(name))
}

/// Object path of `url` when it is served from `public_base`, or `None`.
pub fn path_under_base(url: &str, public_base: &str) -> Option<String> {
    let rest = url.strip_prefix(public_base)?;
    let path = rest.split(['?', '#']).next().unwrap_or_default();
    (!path.is_empty()).then(|| path.to_string())
}

/// Whether `path` lies inside `owner`'s namespace.
pub fn is_owned_path(path: &str, owner: &OwnerId) -> bool {
    let mut segments = path.split('/');
    segments.next() == Some(owner.0.as_str())
        && segments.all(|s| !s.is_empty() && s != "." && s != "..")
        && path.len() > owner.0.len() + 1
}

/// Split an object path into `(directory, file_name)`.
pub fn split_object_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(slash) => (&path[..slash], &path[slash + 1..]),
        None => ("", path),
    }
}
