//! Attachment metadata repository.

use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};
use tracing::debug;

use super::model::{ATTACHMENT_COLUMNS, Attachment, attachment_from_row};
use crate::{Database, Result};

/// Repository for attachment metadata.
///
/// Inserts and deletes keep the parent message's `has_attachments` and
/// `attachment_count` in step with the stored rows.
#[derive(Debug, Clone)]
pub struct AttachmentRepository {
    pool: SqlitePool,
}

impl AttachmentRepository {
    /// Create a repository over an open database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Store attachment metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent message does not exist or the database
    /// query fails.
    pub async fn insert(&self, attachment: &Attachment) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r"
            INSERT INTO attachments
                (id, email_id, filename, content_type, size, storage_key, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ",
        )
        .bind(&attachment.id)
        .bind(&attachment.email_id)
        .bind(&attachment.filename)
        .bind(&attachment.content_type)
        .bind(attachment.size)
        .bind(&attachment.storage_key)
        .bind(attachment.created_at)
        .execute(&mut *tx)
        .await?;

        refresh_counts(&mut tx, &attachment.email_id).await?;
        tx.commit().await?;

        debug!(
            "Stored attachment {} for message {}",
            attachment.id, attachment.email_id
        );
        Ok(())
    }

    /// Attachments of a message, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_message(&self, email_id: &str) -> Result<Vec<Attachment>> {
        let rows = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE email_id = ? ORDER BY created_at ASC, id ASC"
        ))
        .bind(email_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(attachment_from_row).collect()
    }

    /// Get attachment metadata by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &str) -> Result<Option<Attachment>> {
        let row = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(attachment_from_row).transpose()
    }

    /// Delete attachment metadata and refresh the parent's counts.
    ///
    /// Returns the removed record, or `None` if no such attachment exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: &str) -> Result<Option<Attachment>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(&format!(
            "SELECT {ATTACHMENT_COLUMNS} FROM attachments WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(attachment) = row.as_ref().map(attachment_from_row).transpose()? else {
            return Ok(None);
        };

        sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        refresh_counts(&mut tx, &attachment.email_id).await?;
        tx.commit().await?;

        debug!("Deleted attachment {id}");
        Ok(Some(attachment))
    }
}

/// Recompute a message's attachment flag and count from the stored rows.
async fn refresh_counts(tx: &mut Transaction<'_, Sqlite>, email_id: &str) -> Result<()> {
    sqlx::query(
        r"
        UPDATE emails
        SET attachment_count = (SELECT COUNT(*) FROM attachments WHERE email_id = emails.id),
            has_attachments = EXISTS (SELECT 1 FROM attachments WHERE email_id = emails.id)
        WHERE id = ?
        ",
    )
    .bind(email_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}
