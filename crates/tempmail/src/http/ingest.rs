//! Inbound mail delivery, behind the master key.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::response::Response;
use tempmail_core::IncomingMail;

use super::auth::MasterKey;
use super::{ApiError, created};
use crate::AppState;

pub(super) async fn ingest(
    State(state): State<AppState>,
    _master: MasterKey,
    body: Result<Json<IncomingMail>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(mail) = body?;
    let message = state.mailroom.receive(mail, tempmail_core::now()).await?;
    Ok(created(message))
}
