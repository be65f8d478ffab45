//! Single messages by id, and inbox locking by address.

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use serde::Deserialize;
use tempmail_core::secret::hash_secret;
use tempmail_core::{InboxStatus, Message, UnlockOutcome};
use tracing::info;

use super::auth::{ApiKeyAuth, InboxPassword};
use super::{ApiError, Envelope, Notice, ok, served_address};
use crate::AppState;

/// Shortest accepted inbox password.
pub const MIN_PASSWORD_LENGTH: usize = 8;

#[derive(Debug, Deserialize)]
pub(super) struct LockRequest {
    password: String,
}

pub(super) async fn get_email(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    password: InboxPassword,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Message>>, ApiError> {
    let Path(email_id) = path?;
    password.admit_message(&state, &email_id).await?;

    let message = state
        .messages
        .get(&email_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Email not found"))?;
    Ok(ok(message))
}

pub(super) async fn delete_email(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    password: InboxPassword,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Notice>>, ApiError> {
    let Path(email_id) = path?;
    password.admit_message(&state, &email_id).await?;

    if !state.messages.delete(&email_id).await? {
        return Err(ApiError::not_found("Email not found"));
    }
    Ok(ok(Notice {
        message: "Email deleted successfully",
    }))
}

pub(super) async fn lock_inbox(
    State(state): State<AppState>,
    ApiKeyAuth(owner): ApiKeyAuth,
    path: Result<Path<String>, PathRejection>,
    body: Result<Json<LockRequest>, JsonRejection>,
) -> Result<Json<Envelope<Notice>>, ApiError> {
    let Path(raw) = path?;
    let Json(request) = body?;
    let address = served_address(&state, &raw)?;
    if request.password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    state
        .locks
        .lock(
            &address,
            &hash_secret(&request.password),
            &owner,
            tempmail_core::now(),
        )
        .await?;

    info!("Inbox {address} locked by {owner}");
    Ok(ok(Notice {
        message: "Inbox locked successfully",
    }))
}

pub(super) async fn unlock_inbox(
    State(state): State<AppState>,
    ApiKeyAuth(requesting): ApiKeyAuth,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Notice>>, ApiError> {
    let Path(raw) = path?;
    let address = served_address(&state, &raw)?;

    match state.locks.unlock(&address, &requesting).await? {
        UnlockOutcome::Unlocked => {
            info!("Inbox {address} unlocked by {requesting}");
            Ok(ok(Notice {
                message: "Inbox unlocked successfully",
            }))
        }
        UnlockOutcome::NotLocked => Err(ApiError::not_found("Inbox is not locked")),
        UnlockOutcome::NotOwner => Err(ApiError::unauthorized(
            "Only the API key that locked this inbox can unlock it",
        )),
    }
}

pub(super) async fn inbox_status(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<InboxStatus>>, ApiError> {
    let Path(raw) = path?;
    let address = served_address(&state, &raw)?;
    Ok(ok(state.locks.status(&address).await?))
}
