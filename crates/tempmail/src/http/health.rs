//! Unauthenticated service information.

use std::time::Instant;

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use tracing::error;

use super::{Envelope, ok};
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub(super) enum ServiceStatus {
    Ok,
    Degraded,
    Error,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ServiceHealth {
    status: ServiceStatus,
    latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct Services {
    database: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub(super) struct Health {
    status: ServiceStatus,
    /// Milliseconds since the Unix epoch.
    timestamp: i64,
    services: Services,
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Envelope<Health>> {
    let start = Instant::now();
    let probe = state.db.ping().await;
    let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let database = match probe {
        Ok(()) => ServiceHealth {
            status: ServiceStatus::Ok,
            latency_ms,
            error: None,
        },
        Err(e) => {
            error!("Health check database probe failed: {e}");
            ServiceHealth {
                status: ServiceStatus::Error,
                latency_ms,
                error: Some(e.to_string()),
            }
        }
    };

    let status = if database.status == ServiceStatus::Ok {
        ServiceStatus::Ok
    } else {
        ServiceStatus::Degraded
    };

    ok(Health {
        status,
        timestamp: chrono::Utc::now().timestamp_millis(),
        services: Services { database },
    })
}

#[derive(Debug, Serialize)]
pub(super) struct DomainStats {
    public: usize,
    temp: usize,
    private: usize,
}

#[derive(Debug, Serialize)]
pub(super) struct Domains {
    public: Vec<String>,
    temp: Vec<String>,
    stats: DomainStats,
}

pub(super) async fn domains(State(state): State<AppState>) -> Json<Envelope<Domains>> {
    let public: Vec<String> = state.domains.names().map(ToString::to_string).collect();
    ok(Domains {
        stats: DomainStats {
            public: public.len(),
            temp: 0,
            private: 0,
        },
        public,
        temp: Vec::new(),
    })
}
