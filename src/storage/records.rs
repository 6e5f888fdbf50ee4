//! The media table as a JSON file.
//!
//! ```json
//! { "next_id": 3, "rows": [ { "id": "1", "user_id": "u", "url": "…", "name": "…", "created_at": "…" } ] }
//! ```
//!
//! Rows are stored as [`RawMediaRow`] so that hand-edited or older files
//! load without failing the whole table; validation happens at the gateway.
//! A missing file is an empty table.

use super::{MediaQuery, RecordStore, SortOrder, StorageError};
use crate::types::{MediaId, NewMediaRecord, RawMediaRow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Table {
    #[serde(default = "first_id")]
    next_id: u64,
    #[serde(default)]
    rows: Vec<RawMediaRow>,
}

fn first_id() -> u64 {
    1
}

pub struct JsonRecordStore {
    path: PathBuf,
}

impl JsonRecordStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Table, StorageError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let mut table: Table = serde_json::from_str(&content)?;
                table.next_id = table.next_id.max(1);
                Ok(table)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Table {
                next_id: first_id(),
                rows: Vec::new(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, table: &Table) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(table)?;
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}

fn row_id(row: &RawMediaRow) -> Option<String> {
    match row.id.as_ref()? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn row_time(row: &RawMediaRow) -> Option<DateTime<Utc>> {
    row.created_at
        .as_deref()
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

impl RecordStore for JsonRecordStore {
    async fn insert(&self, record: NewMediaRecord) -> Result<RawMediaRow, StorageError> {
        let mut table = self.load().await?;
        let row = RawMediaRow {
            id: Some(serde_json::Value::String(table.next_id.to_string())),
            user_id: Some(record.user_id.0),
            url: Some(record.url),
            name: Some(record.name),
            created_at: Some(Utc::now().to_rfc3339()),
        };
        table.next_id += 1;
        table.rows.push(row.clone());
        self.save(&table).await?;
        Ok(row)
    }

    async fn delete(&self, id: &MediaId) -> Result<(), StorageError> {
        let mut table = self.load().await?;
        let before = table.rows.len();
        table
            .rows
            .retain(|row| row_id(row).as_deref() != Some(id.0.as_str()));
        if table.rows.len() == before {
            log::debug!("delete of unknown row {id} is a no-op");
            return Ok(());
        }
        self.save(&table).await
    }

    async fn query(&self, query: &MediaQuery) -> Result<Vec<RawMediaRow>, StorageError> {
        let table = self.load().await?;
        let mut rows: Vec<RawMediaRow> = table
            .rows
            .into_iter()
            .filter(|row| match &query.owner {
                Some(owner) => row.user_id.as_deref() == Some(owner.0.as_str()),
                None => true,
            })
            .collect();

        // Unparseable timestamps sort as oldest; the gateway drops them anyway.
        rows.sort_by_key(row_time);
        if query.order == SortOrder::NewestFirst {
            rows.reverse();
        }
        Ok(rows)
    }
}
