//! Attachment metadata model.

use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::Result;

/// Metadata of one attachment. The bytes live in external blob storage
/// under `storage_key`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Unique identifier.
    pub id: String,
    /// The message the attachment arrived with.
    pub email_id: String,
    /// Original file name.
    pub filename: String,
    /// MIME type.
    pub content_type: String,
    /// Size in bytes.
    pub size: i64,
    /// Key of the blob in external storage.
    pub storage_key: String,
    /// Seconds since the Unix epoch.
    pub created_at: i64,
}

/// Columns read by [`attachment_from_row`].
pub(super) const ATTACHMENT_COLUMNS: &str =
    "id, email_id, filename, content_type, size, storage_key, created_at";

pub(super) fn attachment_from_row(row: &SqliteRow) -> Result<Attachment> {
    Ok(Attachment {
        id: row.try_get("id")?,
        email_id: row.try_get("email_id")?,
        filename: row.try_get("filename")?,
        content_type: row.try_get("content_type")?,
        size: row.try_get("size")?,
        storage_key: row.try_get("storage_key")?,
        created_at: row.try_get("created_at")?,
    })
}
