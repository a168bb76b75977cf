use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    normalize_topic_name, ProgressStatus, ProgressWrite, Topic, UserTopicProgress, MAX_SCORE,
    MIN_SCORE,
};
use crate::repository::{ProgressRepository, TopicCatalog};
use crate::services::ServiceError;

/// Validates a `topicNames` array.
pub fn parse_topic_names(value: Option<&Value>) -> Result<Vec<String>, ServiceError> {
    let Some(Value::Array(items)) = value else {
        return Err(ServiceError::invalid_fields(
            "topicNames must be an array",
            vec!["topicNames".to_string()],
        ));
    };

    items
        .iter()
        .map(|item| match item.as_str().map(str::trim) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(ServiceError::invalid_fields(
                "topicNames must contain only non-empty strings",
                vec!["topicNames".to_string()],
            )),
        })
        .collect()
}

/// Marks each named topic `selected` for the user. Names resolve against the
/// catalog ignoring case and surrounding whitespace; pairs that already have a
/// row are skipped, so repeating a selection is a no-op.
pub async fn select_topics(
    progress: &dyn ProgressRepository,
    catalog: &dyn TopicCatalog,
    user_id: &str,
    topic_names: &[String],
) -> Result<Vec<UserTopicProgress>, ServiceError> {
    let mut seen = HashSet::new();
    let mut resolved: Vec<Topic> = Vec::with_capacity(topic_names.len());
    let mut missing = Vec::new();

    for name in topic_names {
        if !seen.insert(normalize_topic_name(name)) {
            continue;
        }
        match catalog.resolve_topic(name).await? {
            Some(topic) => resolved.push(topic),
            None => missing.push(name.clone()),
        }
    }

    if !missing.is_empty() {
        return Err(ServiceError::NotFound(format!(
            "One or more topics not found: {}",
            missing.join(", ")
        )));
    }

    let mut created = Vec::new();
    for topic in resolved {
        match progress
            .insert_progress_if_absent(user_id, &topic.name, ProgressStatus::Selected)
            .await?
        {
            Some(row) => created.push(row),
            None => {
                tracing::debug!(user_id = %user_id, topic = %topic.name, "topic already selected");
            }
        }
    }

    tracing::info!(user_id = %user_id, count = created.len(), "topics selected");
    Ok(created)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOutcome {
    pub user_topic: UserTopicProgress,
    pub created: bool,
}

/// Moves the topic to `in-progress`, resetting progress to zero unless it is
/// already in progress.
pub async fn start_topic(
    progress: &dyn ProgressRepository,
    catalog: &dyn TopicCatalog,
    user_id: &str,
    topic_name: &str,
) -> Result<StartOutcome, ServiceError> {
    let topic_name = topic_name.trim();
    if topic_name.is_empty() {
        return Err(ServiceError::invalid_fields(
            "topicName is required",
            vec!["topicName".to_string()],
        ));
    }

    let Some(topic) = catalog.resolve_topic(topic_name).await? else {
        return Err(ServiceError::NotFound("Topic not found".to_string()));
    };

    let existing = progress.find_progress(user_id, &topic.name).await?;
    if let Some(row) = &existing {
        if row.status == ProgressStatus::InProgress {
            return Ok(StartOutcome {
                user_topic: row.clone(),
                created: false,
            });
        }
    }

    let write = ProgressWrite {
        status: ProgressStatus::InProgress,
        progress: 0,
        last_accessed: Utc::now(),
    };
    let user_topic = progress.upsert_progress(user_id, &topic.name, write).await?;
    tracing::info!(user_id = %user_id, topic = %topic.name, "topic started");

    Ok(StartOutcome {
        user_topic,
        created: existing.is_none(),
    })
}

/// Progress update payload as received.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProgressUpdate {
    #[serde(default)]
    pub progress: Option<Value>,
    #[serde(default)]
    pub status: Option<Value>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressUpdate {
    pub progress: Option<i32>,
    pub status: Option<ProgressStatus>,
}

impl RawProgressUpdate {
    /// Progress is clamped into range rather than rejected.
    pub fn validate(self) -> Result<ProgressUpdate, ServiceError> {
        let mut invalid = Vec::new();

        let progress = match self.progress {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_f64().filter(|v| v.is_finite()) {
                Some(v) => Some(v.round().clamp(MIN_SCORE as f64, MAX_SCORE as f64) as i32),
                None => {
                    invalid.push("progress".to_string());
                    None
                }
            },
        };

        let status = match self.status {
            None | Some(Value::Null) => None,
            Some(value) => match value.as_str().and_then(ProgressStatus::parse) {
                Some(status) => Some(status),
                None => {
                    invalid.push("status".to_string());
                    None
                }
            },
        };

        if !invalid.is_empty() {
            return Err(ServiceError::invalid_fields("Invalid progress update", invalid));
        }
        Ok(ProgressUpdate { progress, status })
    }
}

/// Explicit progress edit. This is the only path that can set `mastered`.
pub async fn update_topic_progress(
    progress: &dyn ProgressRepository,
    catalog: &dyn TopicCatalog,
    user_id: &str,
    topic_name: &str,
    update: ProgressUpdate,
) -> Result<UserTopicProgress, ServiceError> {
    let mut current = progress.find_progress(user_id, topic_name).await?;
    if current.is_none() {
        if let Some(topic) = catalog.resolve_topic(topic_name).await? {
            current = progress.find_progress(user_id, &topic.name).await?;
        }
    }
    let Some(current) = current else {
        return Err(ServiceError::NotFound(
            "Topic not found for this user".to_string(),
        ));
    };

    let write = ProgressWrite {
        status: update.status.unwrap_or(current.status),
        progress: update.progress.unwrap_or(current.progress),
        last_accessed: Utc::now(),
    };
    let updated = progress
        .upsert_progress(user_id, &current.topic_name, write)
        .await?;
    tracing::info!(
        user_id = %user_id,
        topic = %updated.topic_name,
        status = updated.status.as_str(),
        progress = updated.progress,
        "topic progress updated"
    );
    Ok(updated)
}

pub async fn get_user_progress(
    progress: &dyn ProgressRepository,
    user_id: &str,
) -> Result<Vec<UserTopicProgress>, ServiceError> {
    Ok(progress.list_progress(user_id).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawProgressUpdate {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_progress_is_clamped() {
        assert_eq!(raw(json!({ "progress": 140 })).validate().unwrap().progress, Some(100));
        assert_eq!(raw(json!({ "progress": -3 })).validate().unwrap().progress, Some(0));
    }

    #[test]
    fn test_status_accepts_mastered() {
        let update = raw(json!({ "status": "mastered" })).validate().unwrap();
        assert_eq!(update.status, Some(ProgressStatus::Mastered));
        assert_eq!(update.progress, None);
    }

    #[test]
    fn test_invalid_fields_reported() {
        let err = raw(json!({ "status": "finished", "progress": "ten" }))
            .validate()
            .unwrap_err();
        match err {
            ServiceError::Validation { fields, .. } => assert_eq!(fields, vec!["progress", "status"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_topic_names() {
        assert_eq!(
            parse_topic_names(Some(&json!(["Arrays", " Math "]))).unwrap(),
            vec!["Arrays", "Math"]
        );
        assert!(parse_topic_names(Some(&json!("Arrays"))).is_err());
        assert!(parse_topic_names(Some(&json!([""]))).is_err());
    }
}
