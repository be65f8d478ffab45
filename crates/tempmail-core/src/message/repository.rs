//! Message storage repository.

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use super::cursor::{Page, PageCursor};
use super::model::{
    MESSAGE_COLUMNS, Message, MessageSummary, SUMMARY_COLUMNS, message_from_row, summary_from_row,
};
use crate::{Database, EmailAddress, Error, Result};

/// Largest page a listing may request unless configured otherwise.
pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

/// Repository for received messages.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
    max_page_size: u32,
}

impl MessageRepository {
    /// Create a repository over an open database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
        }
    }

    /// Override the largest accepted page size.
    #[must_use]
    pub const fn with_max_page_size(mut self, max_page_size: u32) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// The largest accepted page size.
    #[must_use]
    pub const fn max_page_size(&self) -> u32 {
        self.max_page_size
    }

    /// Store a message.
    ///
    /// The message starts without attachments; `has_attachments` and
    /// `attachment_count` are only ever derived from stored attachment rows.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails (including a duplicate id).
    pub async fn insert(&self, message: &Message) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO emails
                (id, from_address, to_address, subject, received_at, expires_at,
                 html_content, text_content, has_attachments, attachment_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0)
            ",
        )
        .bind(&message.id)
        .bind(&message.from_address)
        .bind(&message.to_address)
        .bind(&message.subject)
        .bind(message.received_at)
        .bind(message.expires_at)
        .bind(&message.html_content)
        .bind(&message.text_content)
        .execute(&self.pool)
        .await?;

        debug!("Stored message {} for {}", message.id, message.to_address);
        Ok(())
    }

    /// List one page of a recipient's messages, newest first.
    ///
    /// `cursor` is a token from a previous page's `next_cursor`; `None`
    /// starts at the most recent message. One extra row is fetched to learn
    /// whether another page follows without a second round trip.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `page_size` is not within
    /// `1..=max_page_size`, [`Error::InvalidCursor`] if the cursor cannot be
    /// decoded, or a database error if the query fails.
    pub async fn list_page(
        &self,
        recipient: &EmailAddress,
        page_size: i64,
        cursor: Option<&str>,
    ) -> Result<Page<MessageSummary>> {
        let page_size = self.validate_page_size(page_size)?;
        let boundary = cursor.map(PageCursor::decode).transpose()?;
        let fetch_limit = i64::try_from(page_size + 1).unwrap_or(i64::MAX);

        let sql = if boundary.is_some() {
            format!(
                r"
                SELECT {SUMMARY_COLUMNS}
                FROM emails
                WHERE to_address = ?
                  AND (received_at < ? OR (received_at = ? AND id < ?))
                ORDER BY received_at DESC, id DESC
                LIMIT ?
                "
            )
        } else {
            format!(
                r"
                SELECT {SUMMARY_COLUMNS}
                FROM emails
                WHERE to_address = ?
                ORDER BY received_at DESC, id DESC
                LIMIT ?
                "
            )
        };

        let mut query = sqlx::query(&sql).bind(recipient.as_str());
        if let Some(after) = &boundary {
            query = query
                .bind(after.received_at)
                .bind(after.received_at)
                .bind(after.id.as_str());
        }
        let rows = query.bind(fetch_limit).fetch_all(&self.pool).await?;

        let mut items = rows
            .iter()
            .map(summary_from_row)
            .collect::<Result<Vec<_>>>()?;

        let next_cursor = if items.len() > page_size {
            items.truncate(page_size);
            items.last().map(|last| PageCursor::from(last).encode())
        } else {
            None
        };

        Ok(Page { items, next_cursor })
    }

    fn validate_page_size(&self, page_size: i64) -> Result<usize> {
        if page_size < 1 || page_size > i64::from(self.max_page_size) {
            return Err(Error::invalid_argument(format!(
                "page size must be between 1 and {}, got {page_size}",
                self.max_page_size
            )));
        }
        usize::try_from(page_size).map_err(|_| Error::invalid_argument("page size out of range"))
    }

    /// Get a message by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &str) -> Result<Option<Message>> {
        let row = sqlx::query(&format!("SELECT {MESSAGE_COLUMNS} FROM emails WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(message_from_row).transpose()
    }

    /// Look up which address a message was delivered to.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recipient_of(&self, id: &str) -> Result<Option<EmailAddress>> {
        let recipient: Option<(String,)> =
            sqlx::query_as("SELECT to_address FROM emails WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(recipient.map(|(address,)| EmailAddress::from_stored(address)))
    }

    /// Delete a message. Returns true if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM emails WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        debug!("Deleted message {id}: {} row(s)", result.rows_affected());
        Ok(result.rows_affected() > 0)
    }

    /// Delete every message for a recipient. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_for_recipient(&self, recipient: &EmailAddress) -> Result<u64> {
        let result = sqlx::query("DELETE FROM emails WHERE to_address = ?")
            .bind(recipient.as_str())
            .execute(&self.pool)
            .await?;

        debug!(
            "Deleted {} message(s) for {recipient}",
            result.rows_affected()
        );
        Ok(result.rows_affected())
    }

    /// Delete messages whose retention has elapsed at `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn purge_expired(&self, now: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM emails WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    fn message(id: &str, to: &str, received_at: i64) -> Message {
        Message {
            id: id.to_string(),
            from_address: "sender@example.com".to_string(),
            to_address: to.to_string(),
            subject: Some(format!("Message {id}")),
            received_at,
            expires_at: Some(received_at + 60),
            html_content: Some("<p>Hello</p>".to_string()),
            text_content: Some("Hello".to_string()),
            has_attachments: false,
            attachment_count: 0,
        }
    }

    async fn repo() -> MessageRepository {
        MessageRepository::new(&Database::in_memory().await.unwrap())
    }

    fn user() -> EmailAddress {
        EmailAddress::parse("user@omailg.com").unwrap()
    }

    fn ids(page: &Page<MessageSummary>) -> Vec<String> {
        page.items.iter().map(|m| m.id.clone()).collect()
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let stored = message("m1", "user@omailg.com", 10);
        repo.insert(&stored).await.unwrap();

        let fetched = repo.get("m1").await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert!(repo.get("missing").await.unwrap().is_none());
        assert_eq!(repo.recipient_of("m1").await.unwrap(), Some(user()));
    }

    #[tokio::test]
    async fn test_duplicate_id_is_storage_error() {
        let repo = repo().await;
        repo.insert(&message("m1", "user@omailg.com", 10))
            .await
            .unwrap();
        let err = repo
            .insert(&message("m1", "user@omailg.com", 11))
            .await
            .unwrap_err();
        assert!(err.is_storage());
    }

    #[tokio::test]
    async fn test_pages_of_ten_ten_five() {
        let repo = repo().await;
        for i in 1..=25 {
            repo.insert(&message(&format!("{i:02}"), "user@omailg.com", i))
                .await
                .unwrap();
        }

        let first = repo.list_page(&user(), 10, None).await.unwrap();
        let second = repo
            .list_page(&user(), 10, first.next_cursor.as_deref())
            .await
            .unwrap();
        let third = repo
            .list_page(&user(), 10, second.next_cursor.as_deref())
            .await
            .unwrap();

        let expected = |range: std::ops::RangeInclusive<i64>| -> Vec<String> {
            range.rev().map(|i| format!("{i:02}")).collect()
        };
        assert_eq!(ids(&first), expected(16..=25));
        assert_eq!(ids(&second), expected(6..=15));
        assert_eq!(ids(&third), expected(1..=5));
        assert!(first.has_next());
        assert!(second.has_next());
        assert!(!third.has_next());
    }

    #[tokio::test]
    async fn test_ties_break_by_id_descending() {
        let repo = repo().await;
        repo.insert(&message("a", "user@omailg.com", 100))
            .await
            .unwrap();
        repo.insert(&message("b", "user@omailg.com", 100))
            .await
            .unwrap();

        let page = repo.list_page(&user(), 10, None).await.unwrap();
        assert_eq!(ids(&page), vec!["b", "a"]);

        // The tie must also hold across a page boundary.
        let first = repo.list_page(&user(), 1, None).await.unwrap();
        let second = repo
            .list_page(&user(), 1, first.next_cursor.as_deref())
            .await
            .unwrap();
        assert_eq!(ids(&first), vec!["b"]);
        assert_eq!(ids(&second), vec!["a"]);
        assert!(!second.has_next());
    }

    #[tokio::test]
    async fn test_exact_multiple_has_no_trailing_cursor() {
        let repo = repo().await;
        for i in 1..=4 {
            repo.insert(&message(&format!("m{i}"), "user@omailg.com", i))
                .await
                .unwrap();
        }

        let first = repo.list_page(&user(), 2, None).await.unwrap();
        let second = repo
            .list_page(&user(), 2, first.next_cursor.as_deref())
            .await
            .unwrap();
        assert_eq!(second.items.len(), 2);
        assert!(!second.has_next());
    }

    #[tokio::test]
    async fn test_next_cursor_names_last_kept_row() {
        let repo = repo().await;
        for i in 1..=3 {
            repo.insert(&message(&format!("m{i}"), "user@omailg.com", i))
                .await
                .unwrap();
        }

        let page = repo.list_page(&user(), 2, None).await.unwrap();
        let cursor = PageCursor::decode(page.next_cursor.as_deref().unwrap()).unwrap();
        assert_eq!(cursor, PageCursor::new(2, "m2"));
    }

    #[tokio::test]
    async fn test_listing_is_scoped_to_recipient() {
        let repo = repo().await;
        repo.insert(&message("mine", "user@omailg.com", 1))
            .await
            .unwrap();
        repo.insert(&message("theirs", "other@omailg.com", 2))
            .await
            .unwrap();

        let page = repo.list_page(&user(), 10, None).await.unwrap();
        assert_eq!(ids(&page), vec!["mine"]);
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let repo = repo().await;
        let page = repo.list_page(&user(), 10, None).await.unwrap();
        assert_eq!(page, Page::empty());
    }

    #[tokio::test]
    async fn test_same_cursor_is_idempotent() {
        let repo = repo().await;
        for i in 1..=7 {
            repo.insert(&message(&format!("m{i}"), "user@omailg.com", i % 3))
                .await
                .unwrap();
        }

        let first = repo.list_page(&user(), 3, None).await.unwrap();
        let cursor = first.next_cursor.as_deref();
        let again = repo.list_page(&user(), 3, cursor).await.unwrap();
        let once_more = repo.list_page(&user(), 3, cursor).await.unwrap();
        assert_eq!(again, once_more);
    }

    #[tokio::test]
    async fn test_newer_rows_do_not_shift_pages() {
        let repo = repo().await;
        for i in 1..=4 {
            repo.insert(&message(&format!("m{i}"), "user@omailg.com", i))
                .await
                .unwrap();
        }

        let first = repo.list_page(&user(), 2, None).await.unwrap();
        repo.insert(&message("late", "user@omailg.com", 100))
            .await
            .unwrap();
        let second = repo
            .list_page(&user(), 2, first.next_cursor.as_deref())
            .await
            .unwrap();
        assert_eq!(ids(&second), vec!["m2", "m1"]);
    }

    #[tokio::test]
    async fn test_cursor_past_every_row_is_empty() {
        let repo = repo().await;
        repo.insert(&message("m1", "user@omailg.com", 50))
            .await
            .unwrap();

        let cursor = PageCursor::new(0, "zzz").encode();
        let page = repo.list_page(&user(), 10, Some(&cursor)).await.unwrap();
        assert_eq!(page, Page::empty());
    }

    #[tokio::test]
    async fn test_invalid_page_size() {
        let repo = repo().await.with_max_page_size(100);
        for size in [0, -1, 101] {
            assert!(matches!(
                repo.list_page(&user(), size, None).await,
                Err(Error::InvalidArgument(_))
            ));
        }
        assert!(repo.list_page(&user(), 100, None).await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_cursor_is_rejected() {
        let repo = repo().await;
        repo.insert(&message("m1", "user@omailg.com", 1))
            .await
            .unwrap();

        let result = repo.list_page(&user(), 10, Some("%%%garbage")).await;
        assert!(matches!(result, Err(Error::InvalidCursor(_))));
    }

    #[tokio::test]
    async fn test_delete_operations() {
        let repo = repo().await;
        repo.insert(&message("m1", "user@omailg.com", 1))
            .await
            .unwrap();
        repo.insert(&message("m2", "user@omailg.com", 2))
            .await
            .unwrap();
        repo.insert(&message("m3", "other@omailg.com", 3))
            .await
            .unwrap();

        assert!(repo.delete("m1").await.unwrap());
        assert!(!repo.delete("m1").await.unwrap());
        let page = repo.list_page(&user(), 10, None).await.unwrap();
        assert_eq!(ids(&page), vec!["m2"]);

        assert_eq!(repo.delete_for_recipient(&user()).await.unwrap(), 1);
        assert_eq!(repo.list_page(&user(), 10, None).await.unwrap(), Page::empty());
        assert!(repo.get("m3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_retention() {
        let repo = repo().await;
        // expires_at = received_at + 60
        repo.insert(&message("old", "user@omailg.com", 0))
            .await
            .unwrap();
        repo.insert(&message("new", "user@omailg.com", 100))
            .await
            .unwrap();
        let mut keep = message("keep", "user@omailg.com", 0);
        keep.expires_at = None;
        repo.insert(&keep).await.unwrap();

        assert_eq!(repo.purge_expired(59).await.unwrap(), 0);
        assert_eq!(repo.purge_expired(60).await.unwrap(), 1);
        assert!(repo.get("old").await.unwrap().is_none());
        assert!(repo.get("keep").await.unwrap().is_some());
        assert!(repo.get("new").await.unwrap().is_some());
    }

    fn collect_all(rows: &[(i64, String)], page_size: i64) -> Vec<MessageSummary> {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        runtime.block_on(async {
            let repo = repo().await;
            for (received_at, id) in rows {
                repo.insert(&message(id, "user@omailg.com", *received_at))
                    .await
                    .unwrap();
            }

            let mut seen = Vec::new();
            let mut cursor: Option<String> = None;
            loop {
                let page = repo
                    .list_page(&user(), page_size, cursor.as_deref())
                    .await
                    .unwrap();
                assert!(page.items.len() <= page_size as usize);
                seen.extend(page.items);
                match page.next_cursor {
                    Some(next) => cursor = Some(next),
                    None => break,
                }
            }
            seen
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_pagination_covers_everything_once_in_order(
            entries in proptest::collection::hash_map("[a-z0-9]{1,8}", 0i64..20, 0..40),
            page_size in 1i64..8,
        ) {
            let rows: Vec<(i64, String)> =
                entries.into_iter().map(|(id, ts)| (ts, id)).collect();
            let seen = collect_all(&rows, page_size);

            prop_assert_eq!(seen.len(), rows.len());
            let unique: HashSet<&str> = seen.iter().map(|m| m.id.as_str()).collect();
            prop_assert_eq!(unique.len(), rows.len());
            for pair in seen.windows(2) {
                let newer = (pair[0].received_at, pair[0].id.as_str());
                let older = (pair[1].received_at, pair[1].id.as_str());
                prop_assert!(newer > older);
            }
        }
    }
}
