use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::db::DatabaseProxy;
use crate::models::{Difficulty, Topic, TopicCategory, TopicStatus};
use crate::repository::{StoreError, TopicCatalog};

const TOPIC_COLUMNS: &str = r#""name", "description", "difficulty", "prerequisites", "estimatedTime", "totalProblems", "category", "status", "progress""#;

pub struct PgTopicCatalog {
    proxy: Arc<DatabaseProxy>,
}

impl PgTopicCatalog {
    pub fn new(proxy: Arc<DatabaseProxy>) -> Self {
        Self { proxy }
    }
}

fn map_topic(row: &PgRow) -> Result<Topic, StoreError> {
    let name: String = row.try_get("name")?;
    let difficulty: String = row.try_get("difficulty")?;
    let category: String = row.try_get("category")?;
    let status: String = row.try_get("status")?;

    let difficulty = Difficulty::parse(&difficulty)
        .ok_or_else(|| StoreError::Corrupt(format!("topics.difficulty = {difficulty} ({name})")))?;
    let category = TopicCategory::parse(&category)
        .ok_or_else(|| StoreError::Corrupt(format!("topics.category = {category} ({name})")))?;
    let status = TopicStatus::parse(&status)
        .ok_or_else(|| StoreError::Corrupt(format!("topics.status = {status} ({name})")))?;

    Ok(Topic {
        description: row.try_get("description")?,
        prerequisites: row.try_get("prerequisites")?,
        estimated_time: row.try_get("estimatedTime")?,
        total_problems: row.try_get("totalProblems")?,
        progress: row.try_get("progress")?,
        name,
        difficulty,
        category,
        status,
    })
}

#[async_trait]
impl TopicCatalog for PgTopicCatalog {
    async fn list_topics(&self) -> Result<Vec<Topic>, StoreError> {
        let sql = format!(r#"SELECT {TOPIC_COLUMNS} FROM "topics" ORDER BY "name""#);
        let rows = sqlx::query(&sql).fetch_all(self.proxy.pool()).await?;
        rows.iter().map(map_topic).collect()
    }

    async fn resolve_topic(&self, name: &str) -> Result<Option<Topic>, StoreError> {
        let sql = format!(
            r#"SELECT {TOPIC_COLUMNS} FROM "topics" WHERE lower(btrim("name")) = lower(btrim($1)) LIMIT 1"#
        );
        let row = sqlx::query(&sql)
            .bind(name)
            .fetch_optional(self.proxy.pool())
            .await?;
        row.as_ref().map(map_topic).transpose()
    }

    async fn find_topics(&self, names: &[String]) -> Result<Vec<Topic>, StoreError> {
        if names.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(r#"SELECT {TOPIC_COLUMNS} FROM "topics" WHERE "name" = ANY($1)"#);
        let rows = sqlx::query(&sql)
            .bind(names)
            .fetch_all(self.proxy.pool())
            .await?;

        let mut by_name: HashMap<String, Topic> = HashMap::with_capacity(rows.len());
        for row in &rows {
            let topic = map_topic(row)?;
            by_name.insert(topic.name.clone(), topic);
        }
        Ok(names.iter().filter_map(|n| by_name.remove(n)).collect())
    }

    async fn set_topic_status(&self, name: &str, status: TopicStatus) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"UPDATE "topics" SET "status" = $2, "updatedAt" = $3 WHERE "name" = $1"#,
        )
        .bind(name)
        .bind(status.as_str())
        .bind(Utc::now().naive_utc())
        .execute(self.proxy.pool())
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_topic(&self, topic: &Topic) -> Result<(), StoreError> {
        let now = Utc::now().naive_utc();
        sqlx::query(
            r#"
            INSERT INTO "topics" (
                "name", "description", "difficulty", "prerequisites", "estimatedTime",
                "totalProblems", "category", "status", "progress", "createdAt", "updatedAt"
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $10)
            ON CONFLICT ("name") DO UPDATE SET
                "description" = EXCLUDED."description",
                "difficulty" = EXCLUDED."difficulty",
                "prerequisites" = EXCLUDED."prerequisites",
                "estimatedTime" = EXCLUDED."estimatedTime",
                "totalProblems" = EXCLUDED."totalProblems",
                "category" = EXCLUDED."category",
                "updatedAt" = EXCLUDED."updatedAt"
            "#,
        )
        .bind(&topic.name)
        .bind(&topic.description)
        .bind(topic.difficulty.as_str())
        .bind(&topic.prerequisites)
        .bind(topic.estimated_time)
        .bind(topic.total_problems)
        .bind(topic.category.as_str())
        .bind(topic.status.as_str())
        .bind(topic.progress)
        .bind(now)
        .execute(self.proxy.pool())
        .await?;
        Ok(())
    }
}
