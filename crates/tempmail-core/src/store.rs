//! Database bootstrap shared by every repository.

use std::time::Duration;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::Result;

/// Statements creating the schema. Each one is idempotent.
const SCHEMA: &[&str] = &[
    r"
    CREATE TABLE IF NOT EXISTS emails (
        id TEXT PRIMARY KEY,
        from_address TEXT NOT NULL,
        to_address TEXT NOT NULL,
        subject TEXT,
        received_at INTEGER NOT NULL,
        expires_at INTEGER,
        html_content TEXT,
        text_content TEXT,
        has_attachments INTEGER NOT NULL DEFAULT 0,
        attachment_count INTEGER NOT NULL DEFAULT 0
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_emails_recipient_order
    ON emails(to_address, received_at DESC, id DESC)
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_emails_expires_at ON emails(expires_at)
    ",
    r"
    CREATE TABLE IF NOT EXISTS inboxes (
        address TEXT PRIMARY KEY,
        password_hash TEXT,
        owner_api_key_id TEXT,
        is_locked INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL
    )
    ",
    r"
    CREATE TABLE IF NOT EXISTS attachments (
        id TEXT PRIMARY KEY,
        email_id TEXT NOT NULL REFERENCES emails(id) ON DELETE CASCADE,
        filename TEXT NOT NULL,
        content_type TEXT NOT NULL,
        size INTEGER NOT NULL,
        storage_key TEXT NOT NULL,
        created_at INTEGER NOT NULL
    )
    ",
    r"
    CREATE INDEX IF NOT EXISTS idx_attachments_email ON attachments(email_id, created_at)
    ",
    r"
    CREATE TABLE IF NOT EXISTS api_keys (
        id TEXT PRIMARY KEY,
        key_hash TEXT NOT NULL UNIQUE,
        name TEXT,
        created_at INTEGER NOT NULL,
        last_used_at INTEGER,
        expires_at INTEGER,
        is_active INTEGER NOT NULL DEFAULT 1
    )
    ",
];

/// Handle to the relational store.
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (or create) the database at the given path.
    ///
    /// Creates the tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn open(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.initialize().await?;
        debug!("Opened database at {database_path}");
        Ok(db)
    }

    /// Create an in-memory database for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        // A second connection would see a different, empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await?;

        let db = Self { pool };
        db.initialize().await?;
        Ok(db)
    }

    /// Initialize database schema.
    async fn initialize(&self) -> Result<()> {
        // sqlx turns on `foreign_keys` for every connection, so deleting an
        // email cascades to its attachment rows.
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        Ok(())
    }

    /// Round-trip a trivial statement to check the store is reachable.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// The underlying pool.
    #[must_use]
    pub const fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
