//! Media library records.
//!
//! Rows come back from the record store loosely typed ([`RawMediaRow`]: every
//! field optional, ids as strings or numbers). They are normalized into the
//! strict [`MediaItem`] at the gateway boundary; a row that cannot be
//! normalized is rejected there and never reaches the controller.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Fallback display name for rows whose URL has no usable last segment.
pub const EXTERNAL_IMAGE_NAME: &str = "External Image";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(pub String);

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Authenticated principal that owns uploads and rows.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(pub String);

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A persisted library entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: MediaId,
    pub url: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Row to insert; the record store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMediaRecord {
    pub user_id: OwnerId,
    pub url: String,
    pub name: String,
}

/// A row as stored, before validation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMediaRow {
    #[serde(default)]
    pub id: Option<serde_json::Value>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RowError {
    #[error("row has no usable id")]
    MissingId,
    #[error("row {0} has no url")]
    MissingUrl(String),
    #[error("row {0} has an invalid created_at: {1}")]
    BadTimestamp(String, String),
}

impl TryFrom<RawMediaRow> for MediaItem {
    type Error = RowError;

    fn try_from(row: RawMediaRow) -> Result<Self, Self::Error> {
        let id = match row.id {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s,
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => return Err(RowError::MissingId),
        };

        let url = row
            .url
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| RowError::MissingUrl(id.clone()))?;

        let created_at = match row.created_at {
            Some(ts) => DateTime::parse_from_rfc3339(&ts)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| RowError::BadTimestamp(id.clone(), e.to_string()))?,
            None => return Err(RowError::BadTimestamp(id, "missing".to_string())),
        };

        let name = row
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| name_from_url(&url));

        Ok(MediaItem {
            id: MediaId(id),
            url,
            name,
            created_at,
        })
    }
}

/// Display name for a URL: its last path segment, or [`EXTERNAL_IMAGE_NAME`].
pub fn name_from_url(url: &str) -> String {
    url.rsplit('/')
        .next()
        .map(|seg| seg.split(['?', '#']).next().unwrap_or(seg))
        .filter(|seg| !seg.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| EXTERNAL_IMAGE_NAME.to_string())
}

/// Case-insensitive substring match on the item name.
pub fn matches_search(item: &MediaItem, query: &str) -> bool {
    let query = query.trim();
    query.is_empty() || item.name.to_lowercase().contains(&query.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: serde_json::Value) -> RawMediaRow {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn normalizes_complete_row() {
        let item = MediaItem::try_from(row(json!({
            "id": "a1",
            "url": "https://cdn.test/blog-images/u/1.jpg",
            "name": "sunset.jpg",
            "created_at": "2026-03-01T10:00:00Z",
            "user_id": "u"
        })))
        .unwrap();
        assert_eq!(item.id, MediaId::from("a1"));
        assert_eq!(item.name, "sunset.jpg");
        assert_eq!(item.created_at.to_rfc3339(), "2026-03-01T10:00:00+00:00");
    }

    #[test]
    fn numeric_ids_become_strings() {
        let item = MediaItem::try_from(row(json!({
            "id": 42,
            "url": "https://x/y.png",
            "created_at": "2026-03-01T10:00:00+02:00"
        })))
        .unwrap();
        assert_eq!(item.id.0, "42");
        assert_eq!(item.name, "y.png");
    }

    #[test]
    fn rejects_rows_without_id_or_url() {
        assert_eq!(
            MediaItem::try_from(row(json!({"url": "https://x/y.png"}))),
            Err(RowError::MissingId)
        );
        assert_eq!(
            MediaItem::try_from(row(json!({"id": "7", "url": "  ", "created_at": "2026-01-01T00:00:00Z"}))),
            Err(RowError::MissingUrl("7".into()))
        );
    }

    #[test]
    fn rejects_bad_timestamp() {
        let result = MediaItem::try_from(row(json!({
            "id": "7",
            "url": "https://x/y.png",
            "created_at": "yesterday"
        })));
        assert!(matches!(result, Err(RowError::BadTimestamp(id, _)) if id == "7"));
    }

    #[test]
    fn name_from_url_fallbacks() {
        assert_eq!(name_from_url("https://a.test/pics/cat.png?w=2"), "cat.png");
        assert_eq!(name_from_url("https://a.test/pics/"), EXTERNAL_IMAGE_NAME);
    }

    #[test]
    fn search_is_case_insensitive_substring() {
        let item = MediaItem {
            id: MediaId::from("1"),
            url: "u".into(),
            name: "Sunset-Beach.JPG".into(),
            created_at: Utc::now(),
        };
        assert!(matches_search(&item, "beach"));
        assert!(matches_search(&item, "SUNSET"));
        assert!(matches_search(&item, ""));
        assert!(!matches_search(&item, "forest"));
    }
}
