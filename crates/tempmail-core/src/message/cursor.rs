//! Opaque continuation tokens for message listings.
//!
//! A token is the standard base64 encoding of `"<received_at>#<id>"` taken
//! from the last row of a page. The format is stable across deployments
//! because clients hold on to tokens between requests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;

use super::model::MessageSummary;
use crate::{Error, Result};

/// Separator between the timestamp and the identifier.
const SEPARATOR: char = '#';

/// A resume point in the `(received_at DESC, id DESC)` ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageCursor {
    /// Timestamp of the last row already returned.
    pub received_at: i64,
    /// Identifier of the last row already returned.
    pub id: String,
}

impl PageCursor {
    /// Creates a cursor pointing at the given sort key.
    #[must_use]
    pub fn new(received_at: i64, id: impl Into<String>) -> Self {
        Self {
            received_at,
            id: id.into(),
        }
    }

    /// Encode into the opaque token handed to clients.
    #[must_use]
    pub fn encode(&self) -> String {
        STANDARD.encode(format!("{}{SEPARATOR}{}", self.received_at, self.id))
    }

    /// Decode a client-supplied token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidCursor`] if the token is not base64, not UTF-8,
    /// lacks the separator, carries a non-integer timestamp or an empty id.
    pub fn decode(token: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(token.trim())
            .map_err(|e| Error::InvalidCursor(format!("not base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| Error::InvalidCursor("not UTF-8".to_string()))?;

        let (received_at, id) = text
            .split_once(SEPARATOR)
            .ok_or_else(|| Error::InvalidCursor("missing separator".to_string()))?;

        let received_at = received_at
            .parse::<i64>()
            .map_err(|_| Error::InvalidCursor(format!("bad timestamp: {received_at:?}")))?;
        if id.is_empty() {
            return Err(Error::InvalidCursor("empty identifier".to_string()));
        }

        Ok(Self::new(received_at, id))
    }
}

impl From<&MessageSummary> for PageCursor {
    fn from(message: &MessageSummary) -> Self {
        Self::new(message.received_at, message.id.clone())
    }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// At most `page_size` items, newest first.
    pub items: Vec<T>,
    /// Token for the following page; `None` at the end of the listing.
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// An empty, final page.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            items: Vec::new(),
            next_cursor: None,
        }
    }

    /// Returns true if another page follows.
    #[must_use]
    pub const fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }
}
