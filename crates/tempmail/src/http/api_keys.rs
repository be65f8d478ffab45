//! API key management, behind the master key.

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::response::Response;
use serde::Deserialize;
use tempmail_core::{ApiKey, ApiKeyId};
use tracing::info;

use super::auth::MasterKey;
use super::{ApiError, Envelope, Notice, created, ok};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub(super) struct CreateApiKey {
    name: Option<String>,
    expires_in_days: Option<i64>,
}

pub(super) async fn create_api_key(
    State(state): State<AppState>,
    _master: MasterKey,
    body: Bytes,
) -> Result<Response, ApiError> {
    // An empty body issues an unnamed key that never expires.
    let request: CreateApiKey = if body.iter().all(u8::is_ascii_whitespace) {
        CreateApiKey::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("Invalid request body: {e}")))?
    };

    let issued = state
        .api_keys
        .issue(
            request.name.as_deref(),
            request.expires_in_days,
            tempmail_core::now(),
        )
        .await?;

    info!("Issued API key {}", issued.api_key.id);
    Ok(created(issued))
}

pub(super) async fn list_api_keys(
    State(state): State<AppState>,
    _master: MasterKey,
) -> Result<Json<Envelope<Vec<ApiKey>>>, ApiError> {
    Ok(ok(state.api_keys.list().await?))
}

pub(super) async fn get_api_key(
    State(state): State<AppState>,
    _master: MasterKey,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<ApiKey>>, ApiError> {
    let Path(key_id) = path?;
    let api_key = state
        .api_keys
        .get(&ApiKeyId::new(key_id))
        .await?
        .ok_or_else(|| ApiError::not_found("API key not found"))?;
    Ok(ok(api_key))
}

pub(super) async fn delete_api_key(
    State(state): State<AppState>,
    _master: MasterKey,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<Notice>>, ApiError> {
    let Path(key_id) = path?;
    let key_id = ApiKeyId::new(key_id);
    if !state.api_keys.delete(&key_id).await? {
        return Err(ApiError::not_found("API key not found"));
    }

    info!("Deleted API key {key_id}");
    Ok(ok(Notice {
        message: "API key deleted successfully",
    }))
}

pub(super) async fn revoke_api_key(
    State(state): State<AppState>,
    _master: MasterKey,
    path: Result<Path<String>, PathRejection>,
) -> Result<Json<Envelope<ApiKey>>, ApiError> {
    let Path(key_id) = path?;
    let key_id = ApiKeyId::new(key_id);
    if !state.api_keys.revoke(&key_id).await? {
        return Err(ApiError::not_found("API key not found"));
    }

    let api_key = state
        .api_keys
        .get(&key_id)
        .await?
        .ok_or_else(|| ApiError::not_found("API key not found"))?;
    info!("Revoked API key {key_id}");
    Ok(ok(api_key))
}
