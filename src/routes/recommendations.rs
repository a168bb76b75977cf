use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use serde::Deserialize;
use serde_json::Value;

use crate::response::success;
use crate::routes::{handle_service_error, require_user, split_json};
use crate::services::recommendation::parse_known_topics;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(recommend).get(recommend_for_user))
        .route("/refresh", post(recommend))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecommendRequest {
    #[serde(default)]
    known_topics: Option<Value>,
}

async fn recommend(State(state): State<AppState>, req: Request<Body>) -> Response {
    let (user, payload) = match split_json::<RecommendRequest>(&state, req).await {
        Ok(value) => value,
        Err(res) => return res,
    };

    let known = match parse_known_topics(payload.known_topics.as_ref()) {
        Ok(known) => known,
        Err(err) => return handle_service_error(err),
    };

    match state
        .recommender()
        .recommend(state.progress(), state.catalog(), &user.user_id, &known)
        .await
    {
        Ok(recommendations) => success(StatusCode::OK, recommendations),
        Err(err) => handle_service_error(err),
    }
}

async fn recommend_for_user(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let user = match require_user(&state, &headers) {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    match state
        .recommender()
        .recommend_for_user(state.progress(), state.catalog(), &user.user_id)
        .await
    {
        Ok(recommendations) => success(StatusCode::OK, recommendations),
        Err(err) => handle_service_error(err),
    }
}
