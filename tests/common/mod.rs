#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use dsa_pathway_backend::config::Config;
use dsa_pathway_backend::db::memory::MemoryStore;
use dsa_pathway_backend::seed::default_catalog;
use dsa_pathway_backend::services::prerequisites::PrerequisiteGraph;
use dsa_pathway_backend::services::recommendation::Recommender;

pub const TEST_SECRET: &str = "integration-test-secret";

pub fn seeded_store() -> Arc<MemoryStore> {
    let graph = PrerequisiteGraph::dsa_default();
    Arc::new(MemoryStore::with_topics(default_catalog(&graph)))
}

pub fn recommender() -> Recommender {
    Recommender::new(Arc::new(PrerequisiteGraph::dsa_default()), "Arrays")
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
}

pub fn create_test_app() -> TestApp {
    let config = Config {
        jwt_secret: Some(TEST_SECRET.to_string()),
        ..Config::default()
    };
    let store = seeded_store();
    let state = dsa_pathway_backend::memory_state(
        &config,
        PrerequisiteGraph::dsa_default(),
        store.clone(),
    );

    TestApp {
        router: dsa_pathway_backend::app(state),
        store,
    }
}

pub fn token_for(email: &str) -> String {
    dsa_pathway_backend::auth::sign_jwt(&json!({ "email": email, "id": 1 }), TEST_SECRET).unwrap()
}

impl TestApp {
    pub async fn send(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&value).unwrap())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, Some(token), Some(body)).await
    }
}

pub fn exam_body(topic: &str, score: f64) -> Value {
    json!({
        "topicName": topic,
        "score": score,
        "totalQuestions": 10,
        "correctAnswers": (score / 10.0).round(),
        "timeTaken": 300
    })
}
