use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;

use crate::models::{normalize_topic_name, ProgressStatus, Recommendation, Topic, UserTopicProgress};
use crate::repository::{ProgressRepository, StoreError, TopicCatalog};
use crate::services::prerequisites::PrerequisiteGraph;
use crate::services::ServiceError;

const BASE_CONFIDENCE: f64 = 0.8;
const EXPERIENCED_CONFIDENCE: f64 = 0.9;
const VETERAN_CONFIDENCE: f64 = 0.95;
const EXPERIENCED_COMPLETED: usize = 5;
const VETERAN_COMPLETED: usize = 10;
const OVERLOAD_IN_PROGRESS: usize = 3;
const OVERLOAD_PENALTY: f64 = 0.8;

const COLD_START_CONFIDENCE: f64 = 1.0;

/// Confidence attached to every recommendation in one response, derived from
/// how many topics the user has finished and how many are still open.
pub fn personalized_confidence(progress: &[UserTopicProgress]) -> f64 {
    let completed = progress
        .iter()
        .filter(|p| p.status == ProgressStatus::Completed)
        .count();
    let in_progress = progress
        .iter()
        .filter(|p| p.status == ProgressStatus::InProgress)
        .count();

    let mut confidence = BASE_CONFIDENCE;
    if completed > EXPERIENCED_COMPLETED {
        confidence = EXPERIENCED_CONFIDENCE;
    }
    if completed > VETERAN_COMPLETED {
        confidence = VETERAN_CONFIDENCE;
    }
    if in_progress > OVERLOAD_IN_PROGRESS {
        confidence *= OVERLOAD_PENALTY;
    }
    confidence
}

/// Validates the `knownTopics` field of a request body.
pub fn parse_known_topics(value: Option<&Value>) -> Result<Vec<String>, ServiceError> {
    let Some(Value::Array(items)) = value else {
        return Err(ServiceError::invalid_fields(
            "Known topics array is required",
            vec!["knownTopics".to_string()],
        ));
    };

    items
        .iter()
        .map(|item| {
            item.as_str().map(|s| s.trim().to_string()).ok_or_else(|| {
                ServiceError::invalid_fields(
                    "Known topics must be strings",
                    vec!["knownTopics".to_string()],
                )
            })
        })
        .collect()
}

fn to_recommendation(topic: Topic, reason: String, confidence: f64) -> Recommendation {
    Recommendation {
        estimated_difficulty: topic.difficulty.estimated_difficulty(),
        priority: topic.difficulty.priority(),
        topic_name: topic.name,
        description: topic.description,
        difficulty: topic.difficulty,
        estimated_time: topic.estimated_time,
        total_problems: topic.total_problems,
        prerequisites: topic.prerequisites,
        reason,
        confidence,
        prereqs_met: true,
    }
}

#[derive(Debug, Clone)]
pub struct Recommender {
    graph: Arc<PrerequisiteGraph>,
    cold_start_topic: String,
}

impl Recommender {
    pub fn new(graph: Arc<PrerequisiteGraph>, cold_start_topic: impl Into<String>) -> Self {
        Self {
            graph,
            cold_start_topic: cold_start_topic.into(),
        }
    }

    pub fn graph(&self) -> &PrerequisiteGraph {
        &self.graph
    }

    pub fn next_topics(&self, known_topics: &[String]) -> Vec<String> {
        let known: HashSet<String> = known_topics.iter().cloned().collect();
        self.graph.next_topics(&known)
    }

    /// Ranked recommendations for a caller-supplied known-topic list. Any
    /// store failure aborts the whole request.
    pub async fn recommend(
        &self,
        progress: &dyn ProgressRepository,
        catalog: &dyn TopicCatalog,
        user_id: &str,
        known_topics: &[String],
    ) -> Result<Vec<Recommendation>, ServiceError> {
        let user_progress = progress
            .list_progress(user_id)
            .await
            .map_err(ServiceError::RecommendationUnavailable)?;
        self.rank(catalog, user_id, known_topics, &user_progress)
            .await
            .map_err(ServiceError::RecommendationUnavailable)
    }

    /// Same as [`Recommender::recommend`] with the known topics taken from the
    /// user's completed and mastered rows.
    pub async fn recommend_for_user(
        &self,
        progress: &dyn ProgressRepository,
        catalog: &dyn TopicCatalog,
        user_id: &str,
    ) -> Result<Vec<Recommendation>, ServiceError> {
        let user_progress = progress
            .list_progress(user_id)
            .await
            .map_err(ServiceError::RecommendationUnavailable)?;
        let mut known_topics: Vec<String> = user_progress
            .iter()
            .filter(|p| p.status.is_known())
            .map(|p| p.topic_name.clone())
            .collect();
        known_topics.sort();

        self.rank(catalog, user_id, &known_topics, &user_progress)
            .await
            .map_err(ServiceError::RecommendationUnavailable)
    }

    async fn rank(
        &self,
        catalog: &dyn TopicCatalog,
        user_id: &str,
        known_topics: &[String],
        user_progress: &[UserTopicProgress],
    ) -> Result<Vec<Recommendation>, StoreError> {
        if known_topics.is_empty() {
            return self.cold_start(catalog, user_id, user_progress).await;
        }

        let frontier = self.next_topics(known_topics);
        let started: HashSet<String> = user_progress
            .iter()
            .map(|p| normalize_topic_name(&p.topic_name))
            .collect();
        let available: Vec<String> = frontier
            .into_iter()
            .filter(|topic| !started.contains(&normalize_topic_name(topic)))
            .collect();

        let topics = catalog.find_topics(&available).await?;
        if topics.len() < available.len() {
            tracing::debug!(
                user_id = %user_id,
                requested = available.len(),
                found = topics.len(),
                "some unlocked topics are missing from the catalog"
            );
        }

        let confidence = personalized_confidence(user_progress);
        let reason = format!("Based on your completion of {}", known_topics.join(", "));

        let mut recommendations: Vec<Recommendation> = topics
            .into_iter()
            .map(|topic| to_recommendation(topic, reason.clone(), confidence))
            .collect();
        recommendations.sort_by_key(|r| r.difficulty.weight());

        tracing::debug!(
            user_id = %user_id,
            known = known_topics.len(),
            count = recommendations.len(),
            confidence,
            "recommendations generated"
        );
        Ok(recommendations)
    }

    /// With nothing known yet the only suggestion is the entry topic, unless
    /// the user already has a row for it.
    async fn cold_start(
        &self,
        catalog: &dyn TopicCatalog,
        user_id: &str,
        user_progress: &[UserTopicProgress],
    ) -> Result<Vec<Recommendation>, StoreError> {
        let wanted = normalize_topic_name(&self.cold_start_topic);
        let already_started = user_progress
            .iter()
            .any(|p| normalize_topic_name(&p.topic_name) == wanted);
        if already_started {
            tracing::debug!(user_id = %user_id, "cold-start topic already started");
            return Ok(Vec::new());
        }

        let Some(topic) = catalog.resolve_topic(&self.cold_start_topic).await? else {
            tracing::debug!(topic = %self.cold_start_topic, "cold-start topic missing from catalog");
            return Ok(Vec::new());
        };

        let reason = format!("Start your DSA journey with {}!", topic.name);
        Ok(vec![to_recommendation(topic, reason, COLD_START_CONFIDENCE)])
    }
}
