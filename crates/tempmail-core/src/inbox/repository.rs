//! Inbox lock storage repository.

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use super::model::{INBOX_COLUMNS, InboxLock, InboxStatus, UnlockOutcome, inbox_from_row};
use crate::api_key::ApiKeyId;
use crate::{Database, EmailAddress, Result};

/// Repository for per-address lock records.
///
/// Every mutation is a single statement; the store's row atomicity is the
/// only concurrency control.
#[derive(Debug, Clone)]
pub struct InboxLockRepository {
    pool: SqlitePool,
}

impl InboxLockRepository {
    /// Create a repository over an open database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Lock status of an address. An address with no row is unlocked.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails. The error is never
    /// replaced by [`InboxStatus::default`] here.
    pub async fn status(&self, address: &EmailAddress) -> Result<InboxStatus> {
        let row: Option<(i64, Option<String>)> =
            sqlx::query_as("SELECT is_locked, password_hash FROM inboxes WHERE address = ?")
                .bind(address.as_str())
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map_or_else(InboxStatus::default, |(is_locked, password_hash)| {
            InboxStatus {
                locked: is_locked != 0,
                is_private: password_hash.is_some(),
            }
        }))
    }

    /// The full lock record of an address, if one was ever written.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn details(&self, address: &EmailAddress) -> Result<Option<InboxLock>> {
        let row = sqlx::query(&format!(
            "SELECT {INBOX_COLUMNS} FROM inboxes WHERE address = ?"
        ))
        .bind(address.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(inbox_from_row).transpose()
    }

    /// Lock an address, or re-lock it under a new password and owner.
    ///
    /// Re-locking does not require the previous owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn lock(
        &self,
        address: &EmailAddress,
        password_hash: &str,
        owner: &ApiKeyId,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO inboxes (address, password_hash, owner_api_key_id, is_locked, created_at)
            VALUES (?, ?, ?, 1, ?)
            ON CONFLICT(address) DO UPDATE SET
                password_hash = excluded.password_hash,
                owner_api_key_id = excluded.owner_api_key_id,
                is_locked = 1
            ",
        )
        .bind(address.as_str())
        .bind(password_hash)
        .bind(owner.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!("Locked inbox {address} for {owner}");
        Ok(())
    }

    /// Release the lock on an address if `requesting` owns it.
    ///
    /// Nothing is written unless the outcome is [`UnlockOutcome::Unlocked`].
    /// The ownership check and the update are separate statements; an unlock
    /// racing a re-lock may release the newer lock.
    ///
    /// # Errors
    ///
    /// Returns an error if either database query fails.
    pub async fn unlock(
        &self,
        address: &EmailAddress,
        requesting: &ApiKeyId,
    ) -> Result<UnlockOutcome> {
        let Some(lock) = self.details(address).await? else {
            return Ok(UnlockOutcome::NotLocked);
        };
        if !lock.is_locked {
            return Ok(UnlockOutcome::NotLocked);
        }
        if !lock.is_owned_by(requesting) {
            debug!("Refusing to unlock {address}: {requesting} is not the owner");
            return Ok(UnlockOutcome::NotOwner);
        }

        sqlx::query(
            r"
            UPDATE inboxes
            SET password_hash = NULL, owner_api_key_id = NULL, is_locked = 0
            WHERE address = ?
            ",
        )
        .bind(address.as_str())
        .execute(&self.pool)
        .await?;

        debug!("Unlocked inbox {address}");
        Ok(UnlockOutcome::Unlocked)
    }
}
