//! Attachment metadata, gated by the owning inbox.

use axum::Json;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use tempmail_core::Attachment;

use super::auth::{ApiKeyAuth, InboxPassword};
use super::{ApiError, Envelope, Notice, ok};
use crate::AppState;

/// Look up an attachment and apply the gate of the inbox it belongs to.
async fn admitted_attachment(
    state: &AppState,
    password: &InboxPassword,
    attachment_id: &str,
) -> Result<Attachment, ApiError> {
    let attachment = state
        .attachments
        .get(attachment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attachment not found"))?;
    password.admit_message(state, &attachment.email_id).await?;
    Ok(attachment)
}

pub(super) async fn list_attachments(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    password: InboxPassword,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Vec<Attachment>>>, ApiError> {
    let Path(email_id) = path?;
    password.admit_message(&state, &email_id).await?;
    Ok(ok(state.attachments.list_for_message(&email_id).await?))
}

pub(super) async fn get_attachment(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    password: InboxPassword,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Attachment>>, ApiError> {
    let Path(attachment_id) = path?;
    let attachment = admitted_attachment(&state, &password, &attachment_id).await?;
    Ok(ok(attachment))
}

pub(super) async fn delete_attachment(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    password: InboxPassword,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Notice>>, ApiError> {
    let Path(attachment_id) = path?;
    admitted_attachment(&state, &password, &attachment_id).await?;

    state
        .attachments
        .delete(&attachment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Attachment not found"))?;
    Ok(ok(Notice {
        message: "Attachment deleted successfully",
    }))
}
