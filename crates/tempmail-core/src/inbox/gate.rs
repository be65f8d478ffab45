//! Password gate in front of locked inboxes.

use tracing::debug;

use super::model::Access;
use super::repository::InboxLockRepository;
use crate::secret::verify_secret;
use crate::{EmailAddress, Result};

/// Decides whether a request may read or delete an inbox's messages.
#[derive(Debug, Clone)]
pub struct InboxGate {
    locks: InboxLockRepository,
}

impl InboxGate {
    /// Create a gate backed by the given lock repository.
    #[must_use]
    pub const fn new(locks: InboxLockRepository) -> Self {
        Self { locks }
    }

    /// Check a request against the lock state of `address`.
    ///
    /// `supplied_password` is the plaintext the client presented, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock record cannot be read. A failed lookup
    /// never yields [`Access::Open`].
    pub async fn check(
        &self,
        address: &EmailAddress,
        supplied_password: Option<&str>,
    ) -> Result<Access> {
        let Some(lock) = self.locks.details(address).await? else {
            return Ok(Access::Open);
        };
        let Some(stored_hash) = lock.password_hash.filter(|_| lock.is_locked) else {
            return Ok(Access::Open);
        };

        let access = match supplied_password {
            None => Access::PasswordRequired,
            Some(password) if verify_secret(password, &stored_hash) => Access::Granted,
            Some(_) => Access::PasswordRejected,
        };
        debug!("Gate for {address}: {access:?}");
        Ok(access)
    }
}
