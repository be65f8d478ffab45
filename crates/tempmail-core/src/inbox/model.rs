//! Inbox lock data models.

use serde::Serialize;
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::api_key::ApiKeyId;
use crate::{EmailAddress, Result};

/// A stored `inboxes` row.
///
/// `is_locked` is true exactly when both the password hash and the owner
/// are present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxLock {
    /// The locked address.
    pub address: EmailAddress,
    /// SHA-256 hex digest of the inbox password.
    pub password_hash: Option<String>,
    /// The API key that placed the lock.
    pub owner: Option<ApiKeyId>,
    /// Whether the inbox is currently locked.
    pub is_locked: bool,
    /// When the row was first written, seconds since the Unix epoch.
    pub created_at: i64,
}

impl InboxLock {
    /// Returns true if `requesting` placed the current lock.
    #[must_use]
    pub fn is_owned_by(&self, requesting: &ApiKeyId) -> bool {
        self.owner.as_ref() == Some(requesting)
    }
}

/// Public lock status of an inbox.
///
/// The default (`locked: false, isPrivate: false`) describes an inbox that
/// was never locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InboxStatus {
    /// Whether the inbox is locked.
    pub locked: bool,
    /// Whether a password is stored for the inbox.
    pub is_private: bool,
}

/// Result of an unlock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlockOutcome {
    /// The lock was released.
    Unlocked,
    /// There was no lock to release.
    NotLocked,
    /// The lock belongs to another API key; nothing changed.
    NotOwner,
}

/// Decision of the [`InboxGate`](super::InboxGate) for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// The inbox is not locked.
    Open,
    /// The inbox is locked and the supplied password matches.
    Granted,
    /// The inbox is locked and no password was supplied.
    PasswordRequired,
    /// The inbox is locked and the supplied password is wrong.
    PasswordRejected,
}

impl Access {
    /// Returns true if the request may proceed.
    #[must_use]
    pub const fn is_allowed(self) -> bool {
        matches!(self, Self::Open | Self::Granted)
    }
}

/// Columns read by [`inbox_from_row`].
pub(super) const INBOX_COLUMNS: &str =
    "address, password_hash, owner_api_key_id, is_locked, created_at";

/// Map an `inboxes` row.
pub(super) fn inbox_from_row(row: &SqliteRow) -> Result<InboxLock> {
    let owner: Option<String> = row.try_get("owner_api_key_id")?;
    Ok(InboxLock {
        address: EmailAddress::from_stored(row.try_get("address")?),
        password_hash: row.try_get("password_hash")?,
        owner: owner.map(ApiKeyId),
        is_locked: row.try_get::<i64, _>("is_locked")? != 0,
        created_at: row.try_get("created_at")?,
    })
}
