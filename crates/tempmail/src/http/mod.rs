//! REST API.
//!
//! Every response body is an envelope: `{"success": true, "result": ...}` on
//! success, `{"success": false, "error": "..."}` otherwise.

mod api_keys;
mod attachments;
pub mod auth;
mod emails;
mod error;
mod health;
mod inbox;
mod ingest;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use serde::Serialize;
use tempmail_core::{EmailAddress, Error};

pub use error::ApiError;

use crate::AppState;

/// Successful response body.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    /// Always true.
    pub success: bool,
    /// The payload.
    pub result: T,
}

/// Wrap a payload in a 200 envelope.
pub fn ok<T: Serialize>(result: T) -> Json<Envelope<T>> {
    Json(Envelope {
        success: true,
        result,
    })
}

/// Wrap a payload in a 201 envelope.
pub fn created<T: Serialize>(result: T) -> Response {
    (StatusCode::CREATED, ok(result)).into_response()
}

/// A `{"message": ...}` payload for operations with nothing else to return.
#[derive(Debug, Serialize)]
pub struct Notice {
    /// Human-readable outcome.
    pub message: &'static str,
}

/// Parse a path address and reject domains this deployment does not serve.
fn served_address(state: &AppState, raw: &str) -> Result<EmailAddress, ApiError> {
    let address = EmailAddress::parse(raw)?;
    if !state.domains.supports(&address) {
        return Err(Error::UnsupportedDomain(address.domain().to_string()).into());
    }
    Ok(address)
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/domains", get(health::domains))
        .route(
            "/emails/{address}",
            get(emails::list_emails).delete(emails::delete_emails),
        )
        .route(
            "/inbox/{target}",
            get(inbox::get_email).delete(inbox::delete_email),
        )
        .route("/inbox/{target}/lock", post(inbox::lock_inbox))
        .route("/inbox/{target}/unlock", post(inbox::unlock_inbox))
        .route("/inbox/{target}/status", get(inbox::inbox_status))
        .route(
            "/attachments/email/{email_id}",
            get(attachments::list_attachments),
        )
        .route(
            "/attachments/{attachment_id}",
            get(attachments::get_attachment).delete(attachments::delete_attachment),
        )
        .route(
            "/api-keys",
            get(api_keys::list_api_keys).post(api_keys::create_api_key),
        )
        .route(
            "/api-keys/{key_id}",
            get(api_keys::get_api_key).delete(api_keys::delete_api_key),
        )
        .route("/api-keys/{key_id}/revoke", post(api_keys::revoke_api_key))
        .route("/ingest", post(ingest::ingest))
        .fallback(not_found)
        .with_state(state)
}

async fn not_found() -> ApiError {
    ApiError::not_found("Not found")
}
