//! API key data models.

use serde::{Deserialize, Serialize};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::Result;

/// Longest accepted key name.
pub const MAX_NAME_LENGTH: usize = 100;

/// Longest accepted lifetime of a key, in days.
pub const MAX_EXPIRY_DAYS: i64 = 365;

/// Identifier of an API key; the credential id that owns inbox locks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKeyId(pub String);

impl ApiKeyId {
    /// Create a new API key ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ApiKeyId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Public view of an API key. The hash never leaves the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiKey {
    /// Unique identifier (`ak_…`).
    pub id: ApiKeyId,
    /// Friendly name.
    pub name: Option<String>,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: i64,
    /// Last successful authentication.
    pub last_used_at: Option<i64>,
    /// Expiry time; `None` never expires.
    pub expires_at: Option<i64>,
    /// False once revoked.
    pub is_active: bool,
}

impl ApiKey {
    /// Returns true if the key has expired at `now`.
    ///
    /// A key stops working at the second its expiry names, the same
    /// boundary message retention uses.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// A freshly issued key together with its secret.
///
/// The secret is only available at issue time.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedApiKey {
    /// The stored record.
    #[serde(flatten)]
    pub api_key: ApiKey,
    /// The plaintext secret (`tm_…`).
    #[serde(rename = "key")]
    pub secret: String,
}

/// Columns read by [`api_key_from_row`].
pub(super) const API_KEY_COLUMNS: &str =
    "id, name, created_at, last_used_at, expires_at, is_active";

/// Map an `api_keys` row to the public view.
pub(super) fn api_key_from_row(row: &SqliteRow) -> Result<ApiKey> {
    Ok(ApiKey {
        id: ApiKeyId(row.try_get("id")?),
        name: row.try_get("name")?,
        created_at: row.try_get("created_at")?,
        last_used_at: row.try_get("last_used_at")?,
        expires_at: row.try_get("expires_at")?,
        is_active: row.try_get::<i64, _>("is_active")? != 0,
    })
}
