use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    ConditionalRecord, ExamAttempt, ExamResultRecord, ProgressStatus, ProgressWrite, Topic,
    TopicStatus, UserTopicProgress,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Per-(user, topic) progress rows and the append-only exam log.
///
/// Implementations must keep `(user_id, topic_name)` unique in the progress
/// table and must perform each `record_*` call atomically: the exam row and
/// the progress row are written together or not at all.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn list_progress(&self, user_id: &str) -> Result<Vec<UserTopicProgress>, StoreError>;

    async fn find_progress(
        &self,
        user_id: &str,
        topic_name: &str,
    ) -> Result<Option<UserTopicProgress>, StoreError>;

    /// Creates a row with the given status unless the pair already has one.
    /// Returns `None` when a row existed.
    async fn insert_progress_if_absent(
        &self,
        user_id: &str,
        topic_name: &str,
        status: ProgressStatus,
    ) -> Result<Option<UserTopicProgress>, StoreError>;

    async fn upsert_progress(
        &self,
        user_id: &str,
        topic_name: &str,
        write: ProgressWrite,
    ) -> Result<UserTopicProgress, StoreError>;

    /// Appends the attempt and overwrites the progress row.
    async fn record_attempt(
        &self,
        attempt: ExamAttempt,
        write: ProgressWrite,
    ) -> Result<(ExamResultRecord, UserTopicProgress), StoreError>;

    /// Appends the attempt and overwrites the progress row only when there is
    /// no earlier attempt for the pair or the most recent one scored strictly
    /// lower. The read and the writes form one critical section per pair.
    async fn record_attempt_if_higher(
        &self,
        attempt: ExamAttempt,
        write: ProgressWrite,
    ) -> Result<ConditionalRecord, StoreError>;

    /// Newest first.
    async fn list_exam_results_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ExamResultRecord>, StoreError>;

    /// Newest first.
    async fn list_exam_results_for_topic(
        &self,
        topic_name: &str,
    ) -> Result<Vec<ExamResultRecord>, StoreError>;
}

/// Read access to topic metadata plus the denormalized topic-wide status.
#[async_trait]
pub trait TopicCatalog: Send + Sync {
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError>;

    /// Case- and surrounding-whitespace-insensitive match.
    async fn resolve_topic(&self, name: &str) -> Result<Option<Topic>, StoreError>;

    /// Returns the topics in the order of `names`, silently skipping names
    /// missing from the catalog.
    async fn find_topics(&self, names: &[String]) -> Result<Vec<Topic>, StoreError>;

    /// Returns `false` when no topic with that name exists.
    async fn set_topic_status(&self, name: &str, status: TopicStatus) -> Result<bool, StoreError>;

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StoreError>;
}
