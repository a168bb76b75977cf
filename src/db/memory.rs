use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::{
    normalize_topic_name, ConditionalRecord, ExamAttempt, ExamResultRecord, ProgressStatus,
    ProgressWrite, Topic, TopicStatus, UserTopicProgress,
};
use crate::repository::{ProgressRepository, StoreError, TopicCatalog};

#[derive(Default)]
struct Tables {
    /// Keyed by (user_id, topic_name).
    progress: HashMap<(String, String), UserTopicProgress>,
    /// Append order; the last element wins ties on `completed_at`.
    exam_results: Vec<ExamResultRecord>,
    topics: Vec<Topic>,
}

/// Process-local store used when no database is configured.
///
/// Every operation holds a single lock for its whole duration, which makes the
/// conditional exam write atomic per (user, topic) pair.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    progress_unavailable: AtomicBool,
    catalog_unavailable: AtomicBool,
    topic_status_unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topics(topics: Vec<Topic>) -> Self {
        let store = Self::new();
        store.tables.lock().topics = topics;
        store
    }

    pub fn set_progress_unavailable(&self, value: bool) {
        self.progress_unavailable.store(value, Ordering::Relaxed);
    }

    pub fn set_catalog_unavailable(&self, value: bool) {
        self.catalog_unavailable.store(value, Ordering::Relaxed);
    }

    /// Fails only the topic-wide status writes.
    pub fn set_topic_status_unavailable(&self, value: bool) {
        self.topic_status_unavailable.store(value, Ordering::Relaxed);
    }

    fn check_progress(&self) -> Result<(), StoreError> {
        if self.progress_unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("progress store offline".to_string()));
        }
        Ok(())
    }

    fn check_catalog(&self) -> Result<(), StoreError> {
        if self.catalog_unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("topic catalog offline".to_string()));
        }
        Ok(())
    }
}

impl Tables {
    fn upsert(&mut self, user_id: &str, topic_name: &str, write: ProgressWrite) -> UserTopicProgress {
        let now = Utc::now();
        let key = (user_id.to_string(), topic_name.to_string());
        let row = self
            .progress
            .entry(key)
            .and_modify(|row| {
                row.status = write.status;
                row.progress = write.progress;
                row.last_accessed = write.last_accessed;
                row.updated_at = now;
            })
            .or_insert_with(|| UserTopicProgress {
                id: Uuid::new_v4().to_string(),
                user_id: user_id.to_string(),
                topic_name: topic_name.to_string(),
                status: write.status,
                progress: write.progress,
                last_accessed: write.last_accessed,
                created_at: now,
                updated_at: now,
            });
        row.clone()
    }

    fn append(&mut self, attempt: ExamAttempt) -> ExamResultRecord {
        let record = attempt.into_record(Uuid::new_v4().to_string());
        self.exam_results.push(record.clone());
        record
    }

    fn latest(&self, user_id: &str, topic_name: &str) -> Option<&ExamResultRecord> {
        self.exam_results
            .iter()
            .filter(|r| r.user_id == user_id && r.topic_name == topic_name)
            .max_by_key(|r| r.completed_at)
    }

    fn newest_first<F>(&self, predicate: F) -> Vec<ExamResultRecord>
    where
        F: Fn(&ExamResultRecord) -> bool,
    {
        let mut records: Vec<ExamResultRecord> = self
            .exam_results
            .iter()
            .rev()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        records
    }
}

#[async_trait]
impl ProgressRepository for MemoryStore {
    async fn list_progress(&self, user_id: &str) -> Result<Vec<UserTopicProgress>, StoreError> {
        self.check_progress()?;
        let tables = self.tables.lock();
        let mut rows: Vec<UserTopicProgress> = tables
            .progress
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.topic_name.cmp(&b.topic_name)));
        Ok(rows)
    }

    async fn find_progress(
        &self,
        user_id: &str,
        topic_name: &str,
    ) -> Result<Option<UserTopicProgress>, StoreError> {
        self.check_progress()?;
        let tables = self.tables.lock();
        Ok(tables
            .progress
            .get(&(user_id.to_string(), topic_name.to_string()))
            .cloned())
    }

    async fn insert_progress_if_absent(
        &self,
        user_id: &str,
        topic_name: &str,
        status: ProgressStatus,
    ) -> Result<Option<UserTopicProgress>, StoreError> {
        self.check_progress()?;
        let mut tables = self.tables.lock();
        let key = (user_id.to_string(), topic_name.to_string());
        if tables.progress.contains_key(&key) {
            return Ok(None);
        }
        let now = Utc::now();
        let write = ProgressWrite {
            status,
            progress: 0,
            last_accessed: now,
        };
        Ok(Some(tables.upsert(user_id, topic_name, write)))
    }

    async fn upsert_progress(
        &self,
        user_id: &str,
        topic_name: &str,
        write: ProgressWrite,
    ) -> Result<UserTopicProgress, StoreError> {
        self.check_progress()?;
        Ok(self.tables.lock().upsert(user_id, topic_name, write))
    }

    async fn record_attempt(
        &self,
        attempt: ExamAttempt,
        write: ProgressWrite,
    ) -> Result<(ExamResultRecord, UserTopicProgress), StoreError> {
        self.check_progress()?;
        let mut tables = self.tables.lock();
        let user_id = attempt.user_id.clone();
        let topic_name = attempt.topic_name.clone();
        let record = tables.append(attempt);
        let row = tables.upsert(&user_id, &topic_name, write);
        Ok((record, row))
    }

    async fn record_attempt_if_higher(
        &self,
        attempt: ExamAttempt,
        write: ProgressWrite,
    ) -> Result<ConditionalRecord, StoreError> {
        self.check_progress()?;
        let mut tables = self.tables.lock();
        if let Some(existing) = tables.latest(&attempt.user_id, &attempt.topic_name) {
            if existing.score >= attempt.score {
                return Ok(ConditionalRecord::Kept {
                    existing_score: existing.score,
                });
            }
        }

        let user_id = attempt.user_id.clone();
        let topic_name = attempt.topic_name.clone();
        let exam_result = tables.append(attempt);
        let progress = tables.upsert(&user_id, &topic_name, write);
        Ok(ConditionalRecord::Recorded {
            exam_result,
            progress,
        })
    }

    async fn list_exam_results_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ExamResultRecord>, StoreError> {
        self.check_progress()?;
        Ok(self.tables.lock().newest_first(|r| r.user_id == user_id))
    }

    async fn list_exam_results_for_topic(
        &self,
        topic_name: &str,
    ) -> Result<Vec<ExamResultRecord>, StoreError> {
        self.check_progress()?;
        Ok(self.tables.lock().newest_first(|r| r.topic_name == topic_name))
    }
}

#[async_trait]
impl TopicCatalog for MemoryStore {
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError> {
        self.check_catalog()?;
        Ok(self.tables.lock().topics.clone())
    }

    async fn resolve_topic(&self, name: &str) -> Result<Option<Topic>, StoreError> {
        self.check_catalog()?;
        let wanted = normalize_topic_name(name);
        Ok(self
            .tables
            .lock()
            .topics
            .iter()
            .find(|t| normalize_topic_name(&t.name) == wanted)
            .cloned())
    }

    async fn find_topics(&self, names: &[String]) -> Result<Vec<Topic>, StoreError> {
        self.check_catalog()?;
        let tables = self.tables.lock();
        Ok(names
            .iter()
            .filter_map(|name| tables.topics.iter().find(|t| &t.name == name).cloned())
            .collect())
    }

    async fn set_topic_status(&self, name: &str, status: TopicStatus) -> Result<bool, StoreError> {
        self.check_catalog()?;
        if self.topic_status_unavailable.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("topic status write rejected".to_string()));
        }
        let mut tables = self.tables.lock();
        match tables.topics.iter_mut().find(|t| t.name == name) {
            Some(topic) => {
                topic.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        self.check_catalog()?;
        let mut tables = self.tables.lock();
        match tables.topics.iter_mut().find(|t| t.name == topic.name) {
            Some(existing) => {
                let status = existing.status;
                let progress = existing.progress;
                *existing = Topic {
                    status,
                    progress,
                    ..topic.clone()
                };
            }
            None => tables.topics.push(topic.clone()),
        }
        Ok(())
    }
}
