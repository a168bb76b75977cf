use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum exam score that marks a topic `completed` for the user.
pub const COMPLETION_THRESHOLD: i32 = 70;
/// Minimum exam score that marks the topic-wide aggregate `completed`.
pub const AGGREGATE_COMPLETION_THRESHOLD: i32 = 90;

pub const MIN_SCORE: i32 = 0;
pub const MAX_SCORE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Beginner => "beginner",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "beginner" => Some(Difficulty::Beginner),
            "intermediate" => Some(Difficulty::Intermediate),
            "advanced" => Some(Difficulty::Advanced),
            _ => None,
        }
    }

    /// Sort key used when ordering recommendations, easiest first.
    pub fn weight(self) -> u8 {
        match self {
            Difficulty::Beginner => 1,
            Difficulty::Intermediate => 2,
            Difficulty::Advanced => 3,
        }
    }

    /// Coarse 1..=10 difficulty estimate shown next to a recommendation.
    pub fn estimated_difficulty(self) -> u8 {
        match self {
            Difficulty::Beginner => 3,
            Difficulty::Intermediate => 6,
            Difficulty::Advanced => 9,
        }
    }

    pub fn priority(self) -> Priority {
        match self {
            Difficulty::Beginner => Priority::High,
            Difficulty::Intermediate => Priority::Medium,
            Difficulty::Advanced => Priority::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TopicCategory {
    #[serde(rename = "Data Structures")]
    DataStructures,
    #[serde(rename = "Algorithms")]
    Algorithms,
    #[serde(rename = "Math")]
    Math,
    #[serde(rename = "Advanced Concepts")]
    AdvancedConcepts,
}

impl TopicCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            TopicCategory::DataStructures => "Data Structures",
            TopicCategory::Algorithms => "Algorithms",
            TopicCategory::Math => "Math",
            TopicCategory::AdvancedConcepts => "Advanced Concepts",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Data Structures" => Some(TopicCategory::DataStructures),
            "Algorithms" => Some(TopicCategory::Algorithms),
            "Math" => Some(TopicCategory::Math),
            "Advanced Concepts" => Some(TopicCategory::AdvancedConcepts),
            _ => None,
        }
    }
}

/// Per-user status of a topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    Selected,
    InProgress,
    Completed,
    /// Only reachable through an explicit progress update.
    Mastered,
}

impl ProgressStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Selected => "selected",
            ProgressStatus::InProgress => "in-progress",
            ProgressStatus::Completed => "completed",
            ProgressStatus::Mastered => "mastered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "selected" => Some(ProgressStatus::Selected),
            "in-progress" | "in_progress" => Some(ProgressStatus::InProgress),
            "completed" => Some(ProgressStatus::Completed),
            "mastered" => Some(ProgressStatus::Mastered),
            _ => None,
        }
    }

    /// Whether a topic in this status counts as known for frontier purposes.
    pub fn is_known(self) -> bool {
        matches!(self, ProgressStatus::Completed | ProgressStatus::Mastered)
    }
}

/// Topic-wide denormalized status mirrored from exam scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TopicStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl TopicStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TopicStatus::NotStarted => "not-started",
            TopicStatus::InProgress => "in-progress",
            TopicStatus::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "not-started" => Some(TopicStatus::NotStarted),
            "in-progress" => Some(TopicStatus::InProgress),
            "completed" => Some(TopicStatus::Completed),
            _ => None,
        }
    }
}

/// Maps an exam score onto the user's progress status.
///
/// Every exam path goes through this function so the threshold lives in one
/// place.
pub fn classify(score: i32) -> ProgressStatus {
    if score >= COMPLETION_THRESHOLD {
        ProgressStatus::Completed
    } else {
        ProgressStatus::InProgress
    }
}

/// Maps an exam score onto the topic-wide aggregate. `None` leaves the
/// aggregate untouched.
pub fn classify_aggregate(score: i32) -> Option<TopicStatus> {
    if score >= AGGREGATE_COMPLETION_THRESHOLD {
        Some(TopicStatus::Completed)
    } else if score >= COMPLETION_THRESHOLD {
        Some(TopicStatus::InProgress)
    } else {
        None
    }
}

pub fn normalize_topic_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Immutable catalog entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub prerequisites: Vec<String>,
    /// Minutes.
    pub estimated_time: i32,
    pub total_problems: i32,
    pub category: TopicCategory,
    pub status: TopicStatus,
    pub progress: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserTopicProgress {
    pub id: String,
    pub user_id: String,
    pub topic_name: String,
    pub status: ProgressStatus,
    pub progress: i32,
    pub last_accessed: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Values written onto a progress row by an upsert.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressWrite {
    pub status: ProgressStatus,
    pub progress: i32,
    pub last_accessed: DateTime<Utc>,
}

impl ProgressWrite {
    pub fn from_score(score: i32, now: DateTime<Utc>) -> Self {
        Self {
            status: classify(score),
            progress: score,
            last_accessed: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResultRecord {
    pub id: String,
    pub user_id: String,
    pub topic_name: String,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    /// Seconds.
    pub time_taken: i64,
    pub completed_at: DateTime<Utc>,
}

/// A validated exam attempt that has not been persisted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamAttempt {
    pub user_id: String,
    pub topic_name: String,
    pub score: i32,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub time_taken: i64,
    pub completed_at: DateTime<Utc>,
}

impl ExamAttempt {
    pub fn into_record(self, id: String) -> ExamResultRecord {
        ExamResultRecord {
            id,
            user_id: self.user_id,
            topic_name: self.topic_name,
            score: self.score,
            total_questions: self.total_questions,
            correct_answers: self.correct_answers,
            time_taken: self.time_taken,
            completed_at: self.completed_at,
        }
    }
}

/// Outcome of a score-gated write.
#[derive(Debug, Clone, PartialEq)]
pub enum ConditionalRecord {
    Recorded {
        exam_result: ExamResultRecord,
        progress: UserTopicProgress,
    },
    /// The most recent attempt already scored at least as high.
    Kept { existing_score: i32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub topic_name: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub estimated_time: i32,
    pub total_problems: i32,
    pub prerequisites: Vec<String>,
    pub reason: String,
    pub confidence: f64,
    pub estimated_difficulty: u8,
    pub prereqs_met: bool,
    pub priority: Priority,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_threshold_boundary() {
        assert_eq!(classify(69), ProgressStatus::InProgress);
        assert_eq!(classify(70), ProgressStatus::Completed);
        assert_eq!(classify(0), ProgressStatus::InProgress);
        assert_eq!(classify(100), ProgressStatus::Completed);
    }

    #[test]
    fn test_classify_aggregate() {
        assert_eq!(classify_aggregate(69), None);
        assert_eq!(classify_aggregate(70), Some(TopicStatus::InProgress));
        assert_eq!(classify_aggregate(89), Some(TopicStatus::InProgress));
        assert_eq!(classify_aggregate(90), Some(TopicStatus::Completed));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ProgressStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
        assert_eq!(ProgressStatus::parse("Mastered"), Some(ProgressStatus::Mastered));
        assert_eq!(ProgressStatus::parse("done"), None);
    }

    #[test]
    fn test_difficulty_mappings() {
        assert_eq!(Difficulty::Beginner.priority(), Priority::High);
        assert_eq!(Difficulty::Intermediate.priority(), Priority::Medium);
        assert_eq!(Difficulty::Advanced.priority(), Priority::Low);
        assert!(Difficulty::Beginner.weight() < Difficulty::Advanced.weight());
    }

    #[test]
    fn test_normalize_topic_name() {
        assert_eq!(normalize_topic_name("  Arrays "), "arrays");
    }
}
