use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;

use crate::response::success;
use crate::routes::{handle_service_error, require_user, split_json};
use crate::services::exam_results::{self, RawExamSubmission};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(submit))
        .route("/update", post(update))
        .route("/user", get(list_for_user))
        .route("/topic/:topic_name", get(list_for_topic))
}

async fn submit(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (user, payload) = match split_json::<RawExamSubmission>(&state, req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    let submission = match payload.validate() {
        Ok(value) => value,
        Err(err) => return handle_service_error(err),
    };

    match exam_results::submit_exam(state.progress(), state.catalog(), &user.user_id, submission)
        .await
    {
        Ok(outcome) => success(StatusCode::CREATED, outcome),
        Err(err) => handle_service_error(err),
    }
}

async fn update(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (user, payload) = match split_json::<RawExamSubmission>(&state, req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    let submission = match payload.validate() {
        Ok(value) => value,
        Err(err) => return handle_service_error(err),
    };

    match exam_results::update_exam(state.progress(), state.catalog(), &user.user_id, submission)
        .await
    {
        Ok(outcome) => success(StatusCode::OK, outcome),
        Err(err) => handle_service_error(err),
    }
}

async fn list_for_user(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match require_user(&state, &headers) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match exam_results::list_user_exam_results(state.progress(), &user.user_id).await {
        Ok(results) => success(StatusCode::OK, results),
        Err(err) => handle_service_error(err),
    }
}

async fn list_for_topic(
    State(state): State<AppState>,
    Path(topic_name): Path<String>,
    headers: HeaderMap,
) -> Response {
    if let Err(err) = require_user(&state, &headers) {
        return err.into_response();
    }

    match exam_results::list_topic_exam_results(state.progress(), topic_name.trim()).await {
        Ok(results) => success(StatusCode::OK, results),
        Err(err) => handle_service_error(err),
    }
}
