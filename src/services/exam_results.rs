use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{
    classify_aggregate, ConditionalRecord, ExamAttempt, ExamResultRecord, ProgressWrite,
    UserTopicProgress, MAX_SCORE, MIN_SCORE,
};
use crate::repository::{ProgressRepository, TopicCatalog};
use crate::services::ServiceError;

pub const KEPT_EXISTING_MESSAGE: &str = "Kept existing higher score.";
pub const UPDATED_MESSAGE: &str = "Score updated successfully.";

/// Exam payload as received, before any type checks.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawExamSubmission {
    #[serde(default)]
    pub topic_name: Option<Value>,
    #[serde(default)]
    pub score: Option<Value>,
    #[serde(default)]
    pub total_questions: Option<Value>,
    #[serde(default)]
    pub correct_answers: Option<Value>,
    #[serde(default)]
    pub time_taken: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExamSubmission {
    pub topic_name: String,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub time_taken: i64,
}

impl RawExamSubmission {
    pub fn validate(self) -> Result<ExamSubmission, ServiceError> {
        let mut invalid = Vec::new();

        let topic_name = match self.topic_name.as_ref().and_then(Value::as_str).map(str::trim) {
            Some(name) if !name.is_empty() => Some(name.to_string()),
            _ => {
                invalid.push("topicName".to_string());
                None
            }
        };

        let score = bounded_number(self.score.as_ref(), MIN_SCORE as f64, MAX_SCORE as f64);
        if score.is_none() {
            invalid.push("score".to_string());
        }
        let total_questions = bounded_number(self.total_questions.as_ref(), 0.0, i32::MAX as f64);
        if total_questions.is_none() {
            invalid.push("totalQuestions".to_string());
        }
        let correct_answers = bounded_number(self.correct_answers.as_ref(), 0.0, i32::MAX as f64);
        if correct_answers.is_none() {
            invalid.push("correctAnswers".to_string());
        }
        let time_taken = bounded_number(self.time_taken.as_ref(), 0.0, i64::MAX as f64);
        if time_taken.is_none() {
            invalid.push("timeTaken".to_string());
        }

        match (topic_name, score, total_questions, correct_answers, time_taken) {
            (Some(topic_name), Some(score), Some(total), Some(correct), Some(time_taken)) => {
                Ok(ExamSubmission {
                    topic_name,
                    score: score.round() as i32,
                    total_questions: total.round() as i32,
                    correct_answers: correct.round() as i32,
                    time_taken: time_taken.round() as i64,
                })
            }
            _ => Err(ServiceError::invalid_fields(
                "Missing or invalid required fields",
                invalid,
            )),
        }
    }
}

fn bounded_number(value: Option<&Value>, min: f64, max: f64) -> Option<f64> {
    let number = value?.as_f64()?;
    (number.is_finite() && number >= min && number <= max).then_some(number)
}

impl ExamSubmission {
    fn into_attempt(self, user_id: &str, now: DateTime<Utc>) -> ExamAttempt {
        ExamAttempt {
            user_id: user_id.to_string(),
            topic_name: self.topic_name,
            score: self.score,
            total_questions: self.total_questions,
            correct_answers: self.correct_answers,
            time_taken: self.time_taken,
            completed_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub exam_result: ExamResultRecord,
    pub user_topic: UserTopicProgress,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateOutcome {
    pub updated: bool,
    pub message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exam_result: Option<ExamResultRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_topic: Option<UserTopicProgress>,
}

/// Records the attempt and overwrites the user's progress with its score,
/// whether higher or lower than before. Topics known to the catalog are
/// stored under the catalog's spelling.
pub async fn submit_exam(
    progress: &dyn ProgressRepository,
    catalog: &dyn TopicCatalog,
    user_id: &str,
    mut submission: ExamSubmission,
) -> Result<SubmitOutcome, ServiceError> {
    submission.topic_name = catalog_spelling(catalog, &submission.topic_name).await?;
    let now = Utc::now();
    let write = ProgressWrite::from_score(submission.score, now);
    let attempt = submission.into_attempt(user_id, now);
    let topic_name = attempt.topic_name.clone();
    let score = attempt.score;

    let (exam_result, user_topic) = progress.record_attempt(attempt, write).await?;
    tracing::info!(
        user_id = %user_id,
        topic = %topic_name,
        score,
        status = write.status.as_str(),
        "exam result submitted"
    );

    mirror_topic_status(catalog, &topic_name, score).await;

    Ok(SubmitOutcome {
        exam_result,
        user_topic,
    })
}

/// Records the attempt only if it beats the most recent one for the pair.
pub async fn update_exam(
    progress: &dyn ProgressRepository,
    catalog: &dyn TopicCatalog,
    user_id: &str,
    mut submission: ExamSubmission,
) -> Result<UpdateOutcome, ServiceError> {
    submission.topic_name = catalog_spelling(catalog, &submission.topic_name).await?;
    let now = Utc::now();
    let write = ProgressWrite::from_score(submission.score, now);
    let attempt = submission.into_attempt(user_id, now);
    let topic_name = attempt.topic_name.clone();
    let score = attempt.score;

    match progress.record_attempt_if_higher(attempt, write).await? {
        ConditionalRecord::Kept { existing_score } => {
            tracing::info!(
                user_id = %user_id,
                topic = %topic_name,
                score,
                existing_score,
                "exam update rejected, previous score is higher or equal"
            );
            Ok(UpdateOutcome {
                updated: false,
                message: KEPT_EXISTING_MESSAGE,
                exam_result: None,
                user_topic: None,
            })
        }
        ConditionalRecord::Recorded {
            exam_result,
            progress: user_topic,
        } => {
            tracing::info!(
                user_id = %user_id,
                topic = %topic_name,
                score,
                status = write.status.as_str(),
                "exam update recorded"
            );
            mirror_topic_status(catalog, &topic_name, score).await;
            Ok(UpdateOutcome {
                updated: true,
                message: UPDATED_MESSAGE,
                exam_result: Some(exam_result),
                user_topic: Some(user_topic),
            })
        }
    }
}

pub async fn list_user_exam_results(
    progress: &dyn ProgressRepository,
    user_id: &str,
) -> Result<Vec<ExamResultRecord>, ServiceError> {
    Ok(progress.list_exam_results_for_user(user_id).await?)
}

pub async fn list_topic_exam_results(
    progress: &dyn ProgressRepository,
    topic_name: &str,
) -> Result<Vec<ExamResultRecord>, ServiceError> {
    Ok(progress.list_exam_results_for_topic(topic_name).await?)
}

/// The catalog's spelling of `topic_name`, or the name as given when the
/// catalog has no such topic.
async fn catalog_spelling(catalog: &dyn TopicCatalog, topic_name: &str) -> Result<String, ServiceError> {
    match catalog.resolve_topic(topic_name).await? {
        Some(topic) => Ok(topic.name),
        None => {
            tracing::debug!(topic = %topic_name, "exam topic not in catalog, keeping submitted name");
            Ok(topic_name.to_string())
        }
    }
}

/// Best-effort update of the topic-wide status. Failures are logged and
/// never reach the caller.
async fn mirror_topic_status(catalog: &dyn TopicCatalog, topic_name: &str, score: i32) {
    let Some(status) = classify_aggregate(score) else {
        return;
    };

    match catalog.set_topic_status(topic_name, status).await {
        Ok(true) => {
            tracing::debug!(topic = %topic_name, status = status.as_str(), "topic status mirrored");
        }
        Ok(false) => {
            tracing::debug!(topic = %topic_name, "no catalog entry to mirror exam status onto");
        }
        Err(err) => {
            tracing::warn!(error = %err, topic = %topic_name, "topic status mirror failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> RawExamSubmission {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_validate_accepts_complete_payload() {
        let submission = raw(json!({
            "topicName": " Arrays ",
            "score": 80,
            "totalQuestions": 10,
            "correctAnswers": 8,
            "timeTaken": 120
        }))
        .validate()
        .unwrap();

        assert_eq!(
            submission,
            ExamSubmission {
                topic_name: "Arrays".to_string(),
                score: 80,
                total_questions: 10,
                correct_answers: 8,
                time_taken: 120,
            }
        );
    }

    #[test]
    fn test_validate_reports_every_bad_field() {
        let err = raw(json!({
            "topicName": "Arrays",
            "score": "80",
            "correctAnswers": 8,
            "timeTaken": null
        }))
        .validate()
        .unwrap_err();

        match err {
            ServiceError::Validation { fields, .. } => {
                assert_eq!(fields, vec!["score", "totalQuestions", "timeTaken"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_score() {
        let err = raw(json!({
            "topicName": "Arrays",
            "score": 101,
            "totalQuestions": 10,
            "correctAnswers": 10,
            "timeTaken": 30
        }))
        .validate()
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref fields, .. } if fields == &["score"]));
    }

    #[test]
    fn test_validate_rejects_blank_topic() {
        let err = raw(json!({
            "topicName": "   ",
            "score": 50,
            "totalQuestions": 10,
            "correctAnswers": 5,
            "timeTaken": 30
        }))
        .validate()
        .unwrap_err();
        assert!(matches!(err, ServiceError::Validation { ref fields, .. } if fields == &["topicName"]));
    }

    #[test]
    fn test_fractional_score_rounds() {
        let submission = raw(json!({
            "topicName": "Arrays",
            "score": 66.67,
            "totalQuestions": 3,
            "correctAnswers": 2,
            "timeTaken": 12.4
        }))
        .validate()
        .unwrap();
        assert_eq!(submission.score, 67);
        assert_eq!(submission.time_taken, 12);
    }
}
