pub mod auth;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod repository;
pub mod response;
pub mod routes;
pub mod seed;
pub mod services;
pub mod state;

use std::sync::Arc;

use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::config::{DbConfig, DbConfigError};
use crate::db::memory::MemoryStore;
use crate::db::migrate::MigrationError;
use crate::db::operations::{PgProgressRepository, PgTopicCatalog};
use crate::db::{DatabaseProxy, DbInitError};
use crate::repository::{ProgressRepository, StoreError, TopicCatalog};
use crate::services::prerequisites::{GraphLoadError, PrerequisiteGraph};
use crate::services::recommendation::Recommender;
use crate::state::AppState;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Graph(#[from] GraphLoadError),
    #[error(transparent)]
    DbConfig(#[from] DbConfigError),
    #[error(transparent)]
    Db(#[from] DbInitError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("catalog seeding failed: {0}")]
    Seed(#[source] StoreError),
}

pub fn app(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app(config: &Config) -> Result<axum::Router, StartupError> {
    let state = build_state(config).await?;
    Ok(app(state))
}

pub fn load_graph(config: &Config) -> Result<PrerequisiteGraph, GraphLoadError> {
    let graph = match &config.prerequisite_graph_path {
        Some(path) => {
            let graph = PrerequisiteGraph::from_json_file(path)?;
            tracing::info!(path = %path.display(), topics = graph.len(), "loaded prerequisite graph");
            graph
        }
        None => PrerequisiteGraph::dsa_default(),
    };

    if let Some(cycle) = graph.find_cycle() {
        tracing::warn!(
            cycle = %cycle.join(" -> "),
            "prerequisite graph has a cycle, topics on it are never unlocked"
        );
    }
    let dangling = graph.dangling_prerequisites();
    if !dangling.is_empty() {
        tracing::debug!(?dangling, "prerequisites without their own graph entry");
    }

    Ok(graph)
}

/// State backed by a process-local store.
pub fn memory_state(config: &Config, graph: PrerequisiteGraph, store: Arc<MemoryStore>) -> AppState {
    let recommender = Recommender::new(Arc::new(graph), config.cold_start_topic.clone());
    let progress: Arc<dyn ProgressRepository> = store.clone();
    let catalog: Arc<dyn TopicCatalog> = store;
    AppState::new(None, progress, catalog, recommender, config.jwt_secret.clone())
}

pub async fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let graph = load_graph(config)?;

    let (db_proxy, progress, catalog): (
        Option<Arc<DatabaseProxy>>,
        Arc<dyn ProgressRepository>,
        Arc<dyn TopicCatalog>,
    ) = match DbConfig::from_env_optional()? {
        Some(db_config) => {
            let proxy = DatabaseProxy::connect(db_config).await?;
            db::migrate::run_migrations(proxy.pool()).await?;
            let progress: Arc<dyn ProgressRepository> =
                Arc::new(PgProgressRepository::new(Arc::clone(&proxy)));
            let catalog: Arc<dyn TopicCatalog> = Arc::new(PgTopicCatalog::new(Arc::clone(&proxy)));
            (Some(proxy), progress, catalog)
        }
        None => {
            tracing::warn!("DATABASE_URL not set, progress is kept in memory only");
            let store = Arc::new(MemoryStore::new());
            let progress: Arc<dyn ProgressRepository> = store.clone();
            let catalog: Arc<dyn TopicCatalog> = store;
            (None, progress, catalog)
        }
    };

    if config.seed_topics {
        seed::seed_topics(catalog.as_ref(), &graph)
            .await
            .map_err(StartupError::Seed)?;
    }

    if config.jwt_secret.is_none() {
        tracing::warn!("JWT_SECRET not set, authenticated routes will reject every request");
    }

    let recommender = Recommender::new(Arc::new(graph), config.cold_start_topic.clone());
    Ok(AppState::new(
        db_proxy,
        progress,
        catalog,
        recommender,
        config.jwt_secret.clone(),
    ))
}
