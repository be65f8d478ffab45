//! # tempmail
//!
//! REST API server for the `tempmail` disposable email service.
//!
//! The server exposes cursor-paginated inbox listings, password-locked
//! inboxes, attachment metadata and API key management over HTTP, backed by
//! [`tempmail_core`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod config;
pub mod http;
pub mod retention;
mod state;

use std::future::Future;

use tokio::net::TcpListener;
use tracing::info;

pub use config::{Settings, SettingsError};
pub use http::{ApiError, router};
pub use state::AppState;

/// Serve the API on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if accepting connections fails.
pub async fn serve(
    listener: TcpListener,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!("Listening on http://{addr}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
