//! Inbox locking.
//!
//! An address is either unlocked (no row, or a cleared row) or locked by
//! exactly one API key under a hashed password. Any key may lock or re-lock;
//! only the current owner may unlock. While locked, reads and deletes of the
//! inbox go through the [`InboxGate`].

mod gate;
mod model;
mod repository;

pub use gate::InboxGate;
pub use model::{Access, InboxLock, InboxStatus, UnlockOutcome};
pub use repository::InboxLockRepository;
