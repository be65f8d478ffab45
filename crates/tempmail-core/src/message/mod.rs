//! Received messages and cursor-based listing.
//!
//! Listings are ordered newest first by `(received_at, id)`. Each page of a
//! listing carries an opaque cursor naming the last row it returned; passing
//! that cursor back resumes strictly after that row.

mod cursor;
mod model;
mod repository;

pub use cursor::{Page, PageCursor};
pub use model::{Message, MessageSummary};
pub use repository::{DEFAULT_MAX_PAGE_SIZE, MessageRepository};
