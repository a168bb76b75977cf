use std::time::SystemTime;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/live", get(live))
        .route("/ready", get(ready))
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    database: &'static str,
    timestamp: String,
}

#[derive(Serialize)]
struct LivenessResponse {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ReadinessResponse {
    status: &'static str,
    timestamp: String,
    started_at: String,
    uptime: u64,
    database: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    database_latency_ms: Option<u64>,
    topics: Option<usize>,
}

enum DbCheckStatus {
    Connected { latency_ms: u64 },
    Disconnected,
    InMemory,
}

impl DbCheckStatus {
    fn label(&self) -> &'static str {
        match self {
            DbCheckStatus::Connected { .. } => "connected",
            DbCheckStatus::Disconnected => "disconnected",
            DbCheckStatus::InMemory => "in-memory",
        }
    }
}

async fn root(State(state): State<AppState>) -> Response {
    let db_status = database_check(&state).await;
    let ok = !matches!(db_status, DbCheckStatus::Disconnected);

    let response = HealthResponse {
        status: if ok { "ok" } else { "degraded" },
        database: db_status.label(),
        timestamp: now_iso(),
    };

    let status_code = if ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn live(State(state): State<AppState>) -> Response {
    Json(LivenessResponse {
        status: "healthy",
        timestamp: now_iso(),
        uptime: state.uptime_seconds(),
    })
    .into_response()
}

async fn ready(State(state): State<AppState>) -> Response {
    let db_status = database_check(&state).await;
    let topics = match state.catalog().list_topics().await {
        Ok(topics) => Some(topics.len()),
        Err(err) => {
            tracing::warn!(error = %err, "readiness catalog probe failed");
            None
        }
    };

    let healthy = !matches!(db_status, DbCheckStatus::Disconnected) && topics.is_some();
    let database_latency_ms = match db_status {
        DbCheckStatus::Connected { latency_ms } => Some(latency_ms),
        _ => None,
    };

    let response = ReadinessResponse {
        status: if healthy { "healthy" } else { "unhealthy" },
        timestamp: now_iso(),
        started_at: system_time_iso(state.started_at_system()),
        uptime: state.uptime_seconds(),
        database: db_status.label(),
        database_latency_ms,
        topics,
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status_code, Json(response)).into_response()
}

async fn database_check(state: &AppState) -> DbCheckStatus {
    let Some(proxy) = state.db_proxy() else {
        return DbCheckStatus::InMemory;
    };

    match proxy.check_health().await {
        Ok(latency) => DbCheckStatus::Connected {
            latency_ms: latency.as_millis() as u64,
        },
        Err(reason) => {
            tracing::warn!(reason = %reason, "database health check failed");
            DbCheckStatus::Disconnected
        }
    }
}

fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn system_time_iso(value: SystemTime) -> String {
    DateTime::<Utc>::from(value).to_rfc3339_opts(SecondsFormat::Millis, true)
}
