use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use crate::response::success;
use crate::routes::{handle_service_error, require_user, split_json};
use crate::services::user_topics::{self, RawProgressUpdate};
use crate::services::ServiceError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_progress))
        .route("/select", post(select))
        .route("/start", post(start))
        .route("/:topic_name/progress", patch(update_progress))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelectRequest {
    #[serde(default)]
    topic_names: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartRequest {
    #[serde(default)]
    topic_name: Option<Value>,
}

async fn select(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (user, payload) = match split_json::<SelectRequest>(&state, req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    let names = match user_topics::parse_topic_names(payload.topic_names.as_ref()) {
        Ok(names) => names,
        Err(err) => return handle_service_error(err),
    };

    match user_topics::select_topics(state.progress(), state.catalog(), &user.user_id, &names).await {
        Ok(rows) => success(StatusCode::CREATED, rows),
        Err(err) => handle_service_error(err),
    }
}

async fn start(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (user, payload) = match split_json::<StartRequest>(&state, req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    let Some(topic_name) = payload.topic_name.as_ref().and_then(Value::as_str) else {
        return handle_service_error(ServiceError::invalid_fields(
            "topicName is required",
            vec!["topicName".to_string()],
        ));
    };

    match user_topics::start_topic(state.progress(), state.catalog(), &user.user_id, topic_name).await {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            success(status, outcome.user_topic)
        }
        Err(err) => handle_service_error(err),
    }
}

async fn list_progress(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match require_user(&state, &headers) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match user_topics::get_user_progress(state.progress(), &user.user_id).await {
        Ok(rows) => success(StatusCode::OK, rows),
        Err(err) => handle_service_error(err),
    }
}

async fn update_progress(
    State(state): State<AppState>,
    Path(topic_name): Path<String>,
    req: Request<Body>,
) -> Response {
    let (user, payload) = match split_json::<RawProgressUpdate>(&state, req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    let update = match payload.validate() {
        Ok(value) => value,
        Err(err) => return handle_service_error(err),
    };

    match user_topics::update_topic_progress(
        state.progress(),
        state.catalog(),
        &user.user_id,
        topic_name.trim(),
        update,
    )
    .await
    {
        Ok(row) => success(StatusCode::OK, row),
        Err(err) => handle_service_error(err),
    }
}
