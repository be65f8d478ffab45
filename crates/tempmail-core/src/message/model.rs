//! Message data models and their row mapping.

use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::Result;

/// A received email as listed in an inbox (no bodies).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    /// Unique, URL-safe identifier. Not time-ordered.
    pub id: String,
    /// Envelope sender.
    pub from_address: String,
    /// Recipient address (normalized).
    pub to_address: String,
    /// Subject line, if any.
    pub subject: Option<String>,
    /// Seconds since the Unix epoch.
    pub received_at: i64,
    /// When retention removes the message, in seconds since the Unix epoch.
    pub expires_at: Option<i64>,
    /// Whether attachment metadata exists for the message.
    pub has_attachments: bool,
    /// Number of attachments.
    pub attachment_count: i64,
}

/// A received email with its bodies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Unique, URL-safe identifier. Not time-ordered.
    pub id: String,
    /// Envelope sender.
    pub from_address: String,
    /// Recipient address (normalized).
    pub to_address: String,
    /// Subject line, if any.
    pub subject: Option<String>,
    /// Seconds since the Unix epoch.
    pub received_at: i64,
    /// When retention removes the message, in seconds since the Unix epoch.
    pub expires_at: Option<i64>,
    /// HTML body.
    pub html_content: Option<String>,
    /// Plain text body.
    pub text_content: Option<String>,
    /// Whether attachment metadata exists for the message.
    pub has_attachments: bool,
    /// Number of attachments.
    pub attachment_count: i64,
}

/// Columns read by [`summary_from_row`].
pub(super) const SUMMARY_COLUMNS: &str = "id, from_address, to_address, subject, received_at, \
     expires_at, has_attachments, attachment_count";

/// Columns read by [`message_from_row`].
pub(super) const MESSAGE_COLUMNS: &str = "id, from_address, to_address, subject, received_at, \
     expires_at, html_content, text_content, has_attachments, attachment_count";

/// Map an `emails` row to a summary.
pub(super) fn summary_from_row(row: &SqliteRow) -> Result<MessageSummary> {
    Ok(MessageSummary {
        id: row.try_get("id")?,
        from_address: row.try_get("from_address")?,
        to_address: row.try_get("to_address")?,
        subject: row.try_get("subject")?,
        received_at: row.try_get("received_at")?,
        expires_at: row.try_get("expires_at")?,
        has_attachments: row.try_get::<i64, _>("has_attachments")? != 0,
        attachment_count: row.try_get("attachment_count")?,
    })
}

/// Map an `emails` row to a full message.
pub(super) fn message_from_row(row: &SqliteRow) -> Result<Message> {
    Ok(Message {
        id: row.try_get("id")?,
        from_address: row.try_get("from_address")?,
        to_address: row.try_get("to_address")?,
        subject: row.try_get("subject")?,
        received_at: row.try_get("received_at")?,
        expires_at: row.try_get("expires_at")?,
        html_content: row.try_get("html_content")?,
        text_content: row.try_get("text_content")?,
        has_attachments: row.try_get::<i64, _>("has_attachments")? != 0,
        attachment_count: row.try_get("attachment_count")?,
    })
}
