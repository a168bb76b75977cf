mod exam_results;
mod health;
mod recommendations;
mod topics;
mod user_topics;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use serde::de::DeserializeOwned;

use crate::auth::{AuthError, AuthUser};
use crate::response::{json_error, AppError};
use crate::services::ServiceError;
use crate::state::AppState;

const MAX_BODY_BYTES: usize = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest("/api/exam-results", exam_results::router())
        .nest("/api/user-topics", user_topics::router())
        .nest("/api/recommendations", recommendations::router())
        .nest("/api/topics", topics::router())
        .fallback(fallback_handler)
        .with_state(state)
}

async fn fallback_handler() -> Response {
    json_error(StatusCode::NOT_FOUND, "NOT_FOUND", "Route not found").into_response()
}

pub(crate) fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    crate::auth::authenticate(headers, state.jwt_secret()).map_err(|err| match err {
        AuthError::MissingToken => AppError::unauthorized("Authentication token missing"),
        AuthError::InvalidToken => AppError::unauthorized("Invalid or expired token"),
        AuthError::MissingSecret => {
            tracing::error!("JWT_SECRET is not configured, rejecting authenticated request");
            json_error(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Authentication is not configured",
            )
        }
    })
}

/// Authenticates the request and decodes its JSON body. An empty body decodes
/// as `{}` so that missing fields surface as validation errors.
pub(crate) async fn split_json<T: DeserializeOwned>(
    state: &AppState,
    req: Request<Body>,
) -> Result<(AuthUser, T), Response> {
    let (parts, body) = req.into_parts();
    let user = require_user(state, &parts.headers).map_err(IntoResponse::into_response)?;

    let body_bytes = axum::body::to_bytes(body, MAX_BODY_BYTES).await.map_err(|_| {
        json_error(StatusCode::BAD_REQUEST, "BODY_TOO_LARGE", "Request body too large").into_response()
    })?;

    let raw: &[u8] = if body_bytes.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        &body_bytes
    };
    let payload = serde_json::from_slice(raw).map_err(|_| {
        AppError::validation("Request body must be a JSON object", Vec::new()).into_response()
    })?;

    Ok((user, payload))
}

pub(crate) fn handle_service_error(err: ServiceError) -> Response {
    AppError::from(err).into_response()
}
