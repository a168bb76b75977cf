use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::response::success;
use crate::routes::{handle_service_error, require_user};
use crate::services::ServiceError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_topics))
        .route("/:name/prerequisites", get(prerequisites))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrerequisitesResponse {
    topic_name: String,
    prerequisites: Vec<String>,
}

async fn list_topics(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(err) = require_user(&state, &headers) {
        return err.into_response();
    }

    match state.catalog().list_topics().await {
        Ok(topics) => success(StatusCode::OK, topics),
        Err(err) => handle_service_error(ServiceError::Persistence(err)),
    }
}

/// Unknown topics report no prerequisites rather than 404.
async fn prerequisites(
    State(state): State<AppState>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(err) = require_user(&state, &headers) {
        return err.into_response();
    }

    let topic_name = name.trim().to_string();
    let prerequisites = state
        .recommender()
        .graph()
        .prerequisites_of(&topic_name)
        .to_vec();

    success(
        StatusCode::OK,
        PrerequisitesResponse {
            topic_name,
            prerequisites,
        },
    )
}
