//! Inbox listings by address.

use axum::Json;
use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use tempmail_core::{InboxStatus, MessageSummary, Page};
use tracing::warn;

use super::auth::{ApiKeyAuth, InboxPassword};
use super::{ApiError, Envelope, ok, served_address};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct ListQuery {
    limit: Option<i64>,
    cursor: Option<String>,
}

/// One page of an inbox together with its lock status.
#[derive(Debug, Serialize)]
pub(super) struct InboxListing {
    #[serde(flatten)]
    page: Page<MessageSummary>,
    #[serde(flatten)]
    status: InboxStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct Deleted {
    deleted_count: u64,
}

pub(super) async fn list_emails(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    password: InboxPassword,
    path: Result<Path<String>, PathRejection>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> Result<Json<Envelope<InboxListing>>, ApiError> {
    let Path(raw) = path?;
    let Query(query) = query?;
    let address = served_address(&state, &raw)?;
    password.admit(&state, &address).await?;

    let limit = query.limit.unwrap_or_else(|| i64::from(state.default_page_size));
    let page = state
        .messages
        .list_page(&address, limit, query.cursor.as_deref())
        .await?;

    // The listing itself succeeded; a failed status read only loses the flags.
    let status = state.locks.status(&address).await.unwrap_or_else(|e| {
        warn!("Failed to read lock status of {address}: {e}");
        InboxStatus::default()
    });

    Ok(ok(InboxListing { page, status }))
}

pub(super) async fn delete_emails(
    State(state): State<AppState>,
    _auth: ApiKeyAuth,
    password: InboxPassword,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Deleted>>, ApiError> {
    let Path(raw) = path?;
    let address = served_address(&state, &raw)?;
    password.admit(&state, &address).await?;

    let deleted_count = state.messages.delete_for_recipient(&address).await?;
    Ok(ok(Deleted { deleted_count }))
}
