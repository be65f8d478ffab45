//! Request authentication and the inbox password gate.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tempmail_core::secret::secure_compare;
use tempmail_core::{Access, ApiKeyId, EmailAddress};
use tracing::{debug, error, warn};

use super::ApiError;
use crate::AppState;

/// Header carrying an API key secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the master key.
pub const MASTER_KEY_HEADER: &str = "x-master-key";

/// Header carrying the password of a locked inbox.
pub const INBOX_PASSWORD_HEADER: &str = "x-inbox-password";

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
}

/// The API key that authenticated the request.
///
/// Its id is the credential that owns inbox locks.
#[derive(Debug, Clone)]
pub struct ApiKeyAuth(pub ApiKeyId);

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let Some(secret) = header(parts, API_KEY_HEADER) else {
            return Err(ApiError::unauthorized("Missing X-API-Key header"));
        };

        let api_key = match state.api_keys.find_active_by_secret(secret).await {
            Ok(Some(api_key)) => api_key,
            Ok(None) => return Err(ApiError::unauthorized("Invalid API key")),
            Err(e) => {
                error!("Failed to validate API key: {e}");
                return Err(ApiError::Internal("Failed to validate API key".to_string()));
            }
        };

        let now = tempmail_core::now();
        if api_key.is_expired_at(now) {
            debug!("Rejecting expired API key {}", api_key.id);
            return Err(ApiError::unauthorized("API key has expired"));
        }

        // Recording use is best effort; a failed touch never rejects the request.
        if let Err(e) = state.api_keys.touch(&api_key.id, now).await {
            warn!("Failed to record use of API key {}: {e}", api_key.id);
        }

        Ok(Self(api_key.id))
    }
}

/// Proof that the request carried the configured master key.
#[derive(Debug, Clone, Copy)]
pub struct MasterKey;

impl FromRequestParts<AppState> for MasterKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, ApiError> {
        let Some(supplied) = header(parts, MASTER_KEY_HEADER) else {
            return Err(ApiError::unauthorized("Missing X-Master-Key header"));
        };
        let Some(expected) = state.master_key.as_deref() else {
            return Err(ApiError::Internal("Master key not configured".to_string()));
        };
        if !secure_compare(supplied, expected) {
            return Err(ApiError::unauthorized("Invalid master key"));
        }
        Ok(Self)
    }
}

/// The plaintext inbox password the client supplied, if any.
#[derive(Debug, Clone, Default)]
pub struct InboxPassword(pub Option<String>);

impl<S: Send + Sync> FromRequestParts<S> for InboxPassword {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Infallible> {
        Ok(Self(
            header(parts, INBOX_PASSWORD_HEADER).map(ToString::to_string),
        ))
    }
}

impl InboxPassword {
    /// Let the request through only if `address` is unlocked or the supplied
    /// password matches.
    ///
    /// # Errors
    ///
    /// Returns 401 when the password is missing or wrong, and 500 when the
    /// lock state cannot be read.
    pub async fn admit(&self, state: &AppState, address: &EmailAddress) -> Result<(), ApiError> {
        match state.gate.check(address, self.0.as_deref()).await? {
            Access::Open | Access::Granted => Ok(()),
            Access::PasswordRequired => Err(ApiError::unauthorized(
                "This inbox is locked. Please provide x-inbox-password header.",
            )),
            Access::PasswordRejected => Err(ApiError::unauthorized("Invalid inbox password")),
        }
    }

    /// [`admit`](Self::admit) for the inbox a message was delivered to.
    ///
    /// # Errors
    ///
    /// Returns 404 when the message does not exist, otherwise as
    /// [`admit`](Self::admit).
    pub async fn admit_message(&self, state: &AppState, email_id: &str) -> Result<(), ApiError> {
        let recipient = state
            .messages
            .recipient_of(email_id)
            .await?
            .ok_or_else(|| ApiError::not_found("Email not found"))?;
        self.admit(state, &recipient).await
    }
}
