//! API key storage repository.

use sqlx::sqlite::SqlitePool;
use tracing::debug;

use super::model::{
    API_KEY_COLUMNS, ApiKey, ApiKeyId, IssuedApiKey, MAX_EXPIRY_DAYS, MAX_NAME_LENGTH,
    api_key_from_row,
};
use crate::secret::{generate_api_key, generate_api_key_id, hash_secret};
use crate::{Database, Error, Result};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Repository for API keys.
#[derive(Debug, Clone)]
pub struct ApiKeyRepository {
    pool: SqlitePool,
}

impl ApiKeyRepository {
    /// Create a repository over an open database.
    #[must_use]
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }

    /// Issue a new key. Only its hash is stored.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if the name is longer than 100
    /// characters or `expires_in_days` is outside `1..=365`, or a database
    /// error if the insert fails.
    pub async fn issue(
        &self,
        name: Option<&str>,
        expires_in_days: Option<i64>,
        now: i64,
    ) -> Result<IssuedApiKey> {
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        if name.is_some_and(|n| n.chars().count() > MAX_NAME_LENGTH) {
            return Err(Error::invalid_argument(format!(
                "name must be at most {MAX_NAME_LENGTH} characters"
            )));
        }
        if expires_in_days.is_some_and(|days| !(1..=MAX_EXPIRY_DAYS).contains(&days)) {
            return Err(Error::invalid_argument(format!(
                "expires_in_days must be between 1 and {MAX_EXPIRY_DAYS}"
            )));
        }

        let secret = generate_api_key();
        let api_key = ApiKey {
            id: ApiKeyId(generate_api_key_id()),
            name: name.map(ToString::to_string),
            created_at: now,
            last_used_at: None,
            expires_at: expires_in_days.map(|days| now + days * SECONDS_PER_DAY),
            is_active: true,
        };

        sqlx::query(
            r"
            INSERT INTO api_keys (id, key_hash, name, created_at, expires_at, is_active)
            VALUES (?, ?, ?, ?, ?, 1)
            ",
        )
        .bind(api_key.id.as_str())
        .bind(hash_secret(&secret))
        .bind(&api_key.name)
        .bind(api_key.created_at)
        .bind(api_key.expires_at)
        .execute(&self.pool)
        .await?;

        debug!("Issued API key {}", api_key.id);
        Ok(IssuedApiKey { api_key, secret })
    }

    /// List every key, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<ApiKey>> {
        let rows = sqlx::query(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(api_key_from_row).collect()
    }

    /// Get a key by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn get(&self, id: &ApiKeyId) -> Result<Option<ApiKey>> {
        let row = sqlx::query(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE id = ?"
        ))
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(api_key_from_row).transpose()
    }

    /// Find the active key matching a plaintext secret.
    ///
    /// Expiry is not checked here; see [`ApiKey::is_expired_at`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_active_by_secret(&self, secret: &str) -> Result<Option<ApiKey>> {
        let row = sqlx::query(&format!(
            "SELECT {API_KEY_COLUMNS} FROM api_keys WHERE key_hash = ? AND is_active = 1"
        ))
        .bind(hash_secret(secret))
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(api_key_from_row).transpose()
    }

    /// Record a successful authentication.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn touch(&self, id: &ApiKeyId, now: i64) -> Result<()> {
        sqlx::query("UPDATE api_keys SET last_used_at = ? WHERE id = ?")
            .bind(now)
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Deactivate a key. Returns false if no such key exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn revoke(&self, id: &ApiKeyId) -> Result<bool> {
        let result = sqlx::query("UPDATE api_keys SET is_active = 0 WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        debug!("Revoked API key {id}");
        Ok(result.rows_affected() > 0)
    }

    /// Delete a key. Returns false if no such key exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, id: &ApiKeyId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM api_keys WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete keys that have expired at `now`.
    ///
    /// Uses the boundary of [`ApiKey::is_expired_at`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete_expired(&self, now: i64) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM api_keys WHERE expires_at IS NOT NULL AND expires_at <= ?")
                .bind(now)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn repo() -> ApiKeyRepository {
        ApiKeyRepository::new(&Database::in_memory().await.unwrap())
    }

    #[tokio::test]
    async fn test_issue_and_authenticate() {
        let repo = repo().await;
        let issued = repo.issue(Some("ci"), None, 1_000).await.unwrap();
        assert!(issued.secret.starts_with("tm_"));
        assert_eq!(issued.api_key.name.as_deref(), Some("ci"));
        assert!(issued.api_key.is_active);

        let found = repo
            .find_active_by_secret(&issued.secret)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found, issued.api_key);
        assert!(
            repo.find_active_by_secret("tm_wrong")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_issue_validation() {
        let repo = repo().await;
        let long_name = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(
            repo.issue(Some(&long_name), None, 0).await,
            Err(Error::InvalidArgument(_))
        ));
        for days in [0, -1, MAX_EXPIRY_DAYS + 1] {
            assert!(matches!(
                repo.issue(None, Some(days), 0).await,
                Err(Error::InvalidArgument(_))
            ));
        }

        let issued = repo.issue(Some("  "), Some(30), 0).await.unwrap();
        assert_eq!(issued.api_key.name, None);
        assert_eq!(issued.api_key.expires_at, Some(30 * SECONDS_PER_DAY));
    }

    #[tokio::test]
    async fn test_revoke_hides_key_from_authentication() {
        let repo = repo().await;
        let issued = repo.issue(None, None, 0).await.unwrap();

        assert!(repo.revoke(&issued.api_key.id).await.unwrap());
        assert!(
            repo.find_active_by_secret(&issued.secret)
                .await
                .unwrap()
                .is_none()
        );
        let stored = repo.get(&issued.api_key.id).await.unwrap().unwrap();
        assert!(!stored.is_active);
        assert!(!repo.revoke(&ApiKeyId::new("ak_missing")).await.unwrap());
    }

    #[tokio::test]
    async fn test_touch_list_and_delete() {
        let repo = repo().await;
        let older = repo.issue(Some("old"), None, 10).await.unwrap();
        let newer = repo.issue(Some("new"), None, 20).await.unwrap();

        repo.touch(&older.api_key.id, 99).await.unwrap();
        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newer.api_key.id);
        assert_eq!(listed[1].last_used_at, Some(99));

        assert!(repo.delete(&older.api_key.id).await.unwrap());
        assert!(!repo.delete(&older.api_key.id).await.unwrap());
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_expired() {
        let repo = repo().await;
        let expiring = repo.issue(None, Some(1), 0).await.unwrap();
        let forever = repo.issue(None, None, 0).await.unwrap();

        assert_eq!(repo.delete_expired(SECONDS_PER_DAY - 1).await.unwrap(), 0);
        let still_listed = repo.get(&expiring.api_key.id).await.unwrap().unwrap();
        assert!(still_listed.is_expired_at(SECONDS_PER_DAY));

        assert_eq!(repo.delete_expired(SECONDS_PER_DAY).await.unwrap(), 1);
        assert!(repo.get(&expiring.api_key.id).await.unwrap().is_none());
        assert!(repo.get(&forever.api_key.id).await.unwrap().is_some());
    }
}
