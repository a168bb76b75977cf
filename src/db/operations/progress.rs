use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgExecutor, Row};
use uuid::Uuid;

use crate::db::operations::to_utc;
use crate::db::DatabaseProxy;
use crate::models::{
    ConditionalRecord, ExamAttempt, ExamResultRecord, ProgressStatus, ProgressWrite,
    UserTopicProgress,
};
use crate::repository::{ProgressRepository, StoreError};

const PROGRESS_COLUMNS: &str = r#""id", "userId", "topicName", "status", "progress", "lastAccessed", "createdAt", "updatedAt""#;
const EXAM_COLUMNS: &str = r#""id", "userId", "topicName", "score", "totalQuestions", "correctAnswers", "timeTaken", "completedAt""#;

pub struct PgProgressRepository {
    proxy: Arc<DatabaseProxy>,
}

impl PgProgressRepository {
    pub fn new(proxy: Arc<DatabaseProxy>) -> Self {
        Self { proxy }
    }
}

fn map_progress(row: &PgRow) -> Result<UserTopicProgress, StoreError> {
    let status: String = row.try_get("status")?;
    let status = ProgressStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("user_topics.status = {status}")))?;
    let last_accessed: NaiveDateTime = row.try_get("lastAccessed")?;
    let created_at: NaiveDateTime = row.try_get("createdAt")?;
    let updated_at: NaiveDateTime = row.try_get("updatedAt")?;

    Ok(UserTopicProgress {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        topic_name: row.try_get("topicName")?,
        status,
        progress: row.try_get("progress")?,
        last_accessed: to_utc(last_accessed),
        created_at: to_utc(created_at),
        updated_at: to_utc(updated_at),
    })
}

fn map_exam_result(row: &PgRow) -> Result<ExamResultRecord, StoreError> {
    let completed_at: NaiveDateTime = row.try_get("completedAt")?;
    Ok(ExamResultRecord {
        id: row.try_get("id")?,
        user_id: row.try_get("userId")?,
        topic_name: row.try_get("topicName")?,
        score: row.try_get("score")?,
        total_questions: row.try_get("totalQuestions")?,
        correct_answers: row.try_get("correctAnswers")?,
        time_taken: row.try_get("timeTaken")?,
        completed_at: to_utc(completed_at),
    })
}

async fn upsert_row<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: &str,
    topic_name: &str,
    write: ProgressWrite,
) -> Result<UserTopicProgress, StoreError> {
    let now = Utc::now().naive_utc();
    let sql = format!(
        r#"
        INSERT INTO "user_topics" ({PROGRESS_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
        ON CONFLICT ("userId", "topicName") DO UPDATE SET
            "status" = EXCLUDED."status",
            "progress" = EXCLUDED."progress",
            "lastAccessed" = EXCLUDED."lastAccessed",
            "updatedAt" = EXCLUDED."updatedAt"
        RETURNING {PROGRESS_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(topic_name)
        .bind(write.status.as_str())
        .bind(write.progress)
        .bind(write.last_accessed.naive_utc())
        .bind(now)
        .fetch_one(executor)
        .await?;
    map_progress(&row)
}

async fn insert_exam_row<'e, E: PgExecutor<'e>>(
    executor: E,
    attempt: ExamAttempt,
) -> Result<ExamResultRecord, StoreError> {
    let sql = format!(
        r#"
        INSERT INTO "exam_results" ({EXAM_COLUMNS})
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING {EXAM_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(Uuid::new_v4().to_string())
        .bind(&attempt.user_id)
        .bind(&attempt.topic_name)
        .bind(attempt.score)
        .bind(attempt.total_questions)
        .bind(attempt.correct_answers)
        .bind(attempt.time_taken)
        .bind(attempt.completed_at.naive_utc())
        .fetch_one(executor)
        .await?;
    map_exam_result(&row)
}

async fn latest_row<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: &str,
    topic_name: &str,
) -> Result<Option<ExamResultRecord>, StoreError> {
    let sql = format!(
        r#"
        SELECT {EXAM_COLUMNS} FROM "exam_results"
        WHERE "userId" = $1 AND "topicName" = $2
        ORDER BY "completedAt" DESC, "seq" DESC
        LIMIT 1
        "#
    );
    let row = sqlx::query(&sql)
        .bind(user_id)
        .bind(topic_name)
        .fetch_optional(executor)
        .await?;
    row.as_ref().map(map_exam_result).transpose()
}

/// Serializes writers on one (user, topic) pair until the transaction ends.
async fn lock_pair<'e, E: PgExecutor<'e>>(
    executor: E,
    user_id: &str,
    topic_name: &str,
) -> Result<(), StoreError> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1), hashtext($2))")
        .bind(user_id)
        .bind(topic_name)
        .execute(executor)
        .await?;
    Ok(())
}

#[async_trait]
impl ProgressRepository for PgProgressRepository {
    async fn list_progress(&self, user_id: &str) -> Result<Vec<UserTopicProgress>, StoreError> {
        let sql = format!(
            r#"SELECT {PROGRESS_COLUMNS} FROM "user_topics" WHERE "userId" = $1 ORDER BY "createdAt" DESC, "topicName""#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(self.proxy.pool())
            .await?;
        rows.iter().map(map_progress).collect()
    }

    async fn find_progress(
        &self,
        user_id: &str,
        topic_name: &str,
    ) -> Result<Option<UserTopicProgress>, StoreError> {
        let sql = format!(
            r#"SELECT {PROGRESS_COLUMNS} FROM "user_topics" WHERE "userId" = $1 AND "topicName" = $2 LIMIT 1"#
        );
        let row = sqlx::query(&sql)
            .bind(user_id)
            .bind(topic_name)
            .fetch_optional(self.proxy.pool())
            .await?;
        row.as_ref().map(map_progress).transpose()
    }

    async fn insert_progress_if_absent(
        &self,
        user_id: &str,
        topic_name: &str,
        status: ProgressStatus,
    ) -> Result<Option<UserTopicProgress>, StoreError> {
        let now = Utc::now().naive_utc();
        let sql = format!(
            r#"
            INSERT INTO "user_topics" ({PROGRESS_COLUMNS})
            VALUES ($1, $2, $3, $4, 0, $5, $5, $5)
            ON CONFLICT ("userId", "topicName") DO NOTHING
            RETURNING {PROGRESS_COLUMNS}
            "#
        );
        let row = sqlx::query(&sql)
            .bind(Uuid::new_v4().to_string())
            .bind(user_id)
            .bind(topic_name)
            .bind(status.as_str())
            .bind(now)
            .fetch_optional(self.proxy.pool())
            .await?;
        row.as_ref().map(map_progress).transpose()
    }

    async fn upsert_progress(
        &self,
        user_id: &str,
        topic_name: &str,
        write: ProgressWrite,
    ) -> Result<UserTopicProgress, StoreError> {
        upsert_row(self.proxy.pool(), user_id, topic_name, write).await
    }

    async fn record_attempt(
        &self,
        attempt: ExamAttempt,
        write: ProgressWrite,
    ) -> Result<(ExamResultRecord, UserTopicProgress), StoreError> {
        let user_id = attempt.user_id.clone();
        let topic_name = attempt.topic_name.clone();

        let mut tx = self.proxy.pool().begin().await?;
        lock_pair(&mut *tx, &user_id, &topic_name).await?;
        let record = insert_exam_row(&mut *tx, attempt).await?;
        let row = upsert_row(&mut *tx, &user_id, &topic_name, write).await?;
        tx.commit().await?;

        Ok((record, row))
    }

    async fn record_attempt_if_higher(
        &self,
        attempt: ExamAttempt,
        write: ProgressWrite,
    ) -> Result<ConditionalRecord, StoreError> {
        let user_id = attempt.user_id.clone();
        let topic_name = attempt.topic_name.clone();

        let mut tx = self.proxy.pool().begin().await?;
        lock_pair(&mut *tx, &user_id, &topic_name).await?;

        if let Some(existing) = latest_row(&mut *tx, &user_id, &topic_name).await? {
            if existing.score >= attempt.score {
                tx.rollback().await?;
                return Ok(ConditionalRecord::Kept {
                    existing_score: existing.score,
                });
            }
        }

        let exam_result = insert_exam_row(&mut *tx, attempt).await?;
        let progress = upsert_row(&mut *tx, &user_id, &topic_name, write).await?;
        tx.commit().await?;

        Ok(ConditionalRecord::Recorded {
            exam_result,
            progress,
        })
    }

    async fn list_exam_results_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<ExamResultRecord>, StoreError> {
        let sql = format!(
            r#"SELECT {EXAM_COLUMNS} FROM "exam_results" WHERE "userId" = $1 ORDER BY "completedAt" DESC, "seq" DESC"#
        );
        let rows = sqlx::query(&sql)
            .bind(user_id)
            .fetch_all(self.proxy.pool())
            .await?;
        rows.iter().map(map_exam_result).collect()
    }

    async fn list_exam_results_for_topic(
        &self,
        topic_name: &str,
    ) -> Result<Vec<ExamResultRecord>, StoreError> {
        let sql = format!(
            r#"SELECT {EXAM_COLUMNS} FROM "exam_results" WHERE "topicName" = $1 ORDER BY "completedAt" DESC, "seq" DESC"#
        );
        let rows = sqlx::query(&sql)
            .bind(topic_name)
            .fetch_all(self.proxy.pool())
            .await?;
        rows.iter().map(map_exam_result).collect()
    }
}
