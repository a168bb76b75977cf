use std::sync::Arc;
use std::time::{Instant, SystemTime};

use crate::db::DatabaseProxy;
use crate::repository::{ProgressRepository, TopicCatalog};
use crate::services::recommendation::Recommender;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    started_at_system: SystemTime,
    db_proxy: Option<Arc<DatabaseProxy>>,
    progress: Arc<dyn ProgressRepository>,
    catalog: Arc<dyn TopicCatalog>,
    recommender: Arc<Recommender>,
    jwt_secret: Option<Arc<str>>,
}

impl AppState {
    pub fn new(
        db_proxy: Option<Arc<DatabaseProxy>>,
        progress: Arc<dyn ProgressRepository>,
        catalog: Arc<dyn TopicCatalog>,
        recommender: Recommender,
        jwt_secret: Option<String>,
    ) -> Self {
        Self {
            started_at: Instant::now(),
            started_at_system: SystemTime::now(),
            db_proxy,
            progress,
            catalog,
            recommender: Arc::new(recommender),
            jwt_secret: jwt_secret.map(Arc::from),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn started_at_system(&self) -> SystemTime {
        self.started_at_system
    }

    pub fn db_proxy(&self) -> Option<Arc<DatabaseProxy>> {
        self.db_proxy.clone()
    }

    pub fn progress(&self) -> &dyn ProgressRepository {
        self.progress.as_ref()
    }

    pub fn catalog(&self) -> &dyn TopicCatalog {
        self.catalog.as_ref()
    }

    pub fn recommender(&self) -> &Recommender {
        &self.recommender
    }

    pub fn jwt_secret(&self) -> Option<&str> {
        self.jwt_secret.as_deref()
    }
}
