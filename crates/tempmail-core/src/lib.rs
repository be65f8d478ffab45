//! # tempmail-core
//!
//! Core storage and access rules for the `tempmail` disposable email service.
//!
//! This crate provides:
//! - Local storage (`SQLite`) for messages, attachment metadata, inbox locks
//!   and API keys
//! - **Cursor pagination** - stable, newest-first message listings
//! - **Inbox locking** - password-protected inboxes owned by one API key
//! - API key issuing and secret hashing
//! - Inbound mail acceptance and retention
//!
//! ## Example
//!
//! ```ignore
//! use tempmail_core::{Database, EmailAddress, MessageRepository};
//!
//! let db = Database::open("tempmail.db").await?;
//! let messages = MessageRepository::new(&db);
//! let inbox = EmailAddress::parse("box@omailg.com")?;
//!
//! let first = messages.list_page(&inbox, 10, None).await?;
//! let second = messages
//!     .list_page(&inbox, 10, first.next_cursor.as_deref())
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
pub mod api_key;
pub mod attachment;
mod error;
pub mod inbox;
pub mod ingest;
pub mod message;
pub mod secret;
mod store;

pub use address::{Domain, DomainConfig, EmailAddress};
pub use api_key::{ApiKey, ApiKeyId, ApiKeyRepository, IssuedApiKey};
pub use attachment::{Attachment, AttachmentRepository};
pub use error::{Error, Result};
pub use inbox::{Access, InboxGate, InboxLock, InboxLockRepository, InboxStatus, UnlockOutcome};
pub use ingest::{IncomingMail, Mailroom};
pub use message::{Message, MessageRepository, MessageSummary, Page, PageCursor};
pub use store::Database;

/// Current time in seconds since the Unix epoch.
#[must_use]
pub fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
