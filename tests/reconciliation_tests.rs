use std::sync::Arc;

use dsa_pathway_backend::db::memory::MemoryStore;
use dsa_pathway_backend::models::{ProgressStatus, TopicStatus};
use dsa_pathway_backend::repository::{ProgressRepository, TopicCatalog};
use dsa_pathway_backend::services::exam_results::{
    submit_exam, update_exam, ExamSubmission, KEPT_EXISTING_MESSAGE, UPDATED_MESSAGE,
};
use dsa_pathway_backend::services::user_topics::{start_topic, update_topic_progress, ProgressUpdate};
use dsa_pathway_backend::services::ServiceError;

mod common;

const USER: &str = "learner@example.com";

fn submission(topic: &str, score: i32) -> ExamSubmission {
    ExamSubmission {
        topic_name: topic.to_string(),
        score,
        total_questions: 10,
        correct_answers: score / 10,
        time_taken: 120,
    }
}

async fn stored_progress(store: &MemoryStore, topic: &str) -> (ProgressStatus, i32) {
    let row = store.find_progress(USER, topic).await.unwrap().unwrap();
    (row.status, row.progress)
}

async fn topic_status(store: &MemoryStore, topic: &str) -> TopicStatus {
    store.resolve_topic(topic).await.unwrap().unwrap().status
}

#[tokio::test]
async fn test_submit_classifies_at_threshold() {
    let store = common::seeded_store();

    submit_exam(&*store, &*store, USER, submission("Arrays", 69)).await.unwrap();
    assert_eq!(stored_progress(&store, "Arrays").await, (ProgressStatus::InProgress, 69));

    submit_exam(&*store, &*store, USER, submission("Arrays", 70)).await.unwrap();
    assert_eq!(stored_progress(&store, "Arrays").await, (ProgressStatus::Completed, 70));
}

#[tokio::test]
async fn test_submit_overwrites_downward() {
    let store = common::seeded_store();

    submit_exam(&*store, &*store, USER, submission("Arrays", 90)).await.unwrap();
    let outcome = submit_exam(&*store, &*store, USER, submission("Arrays", 50))
        .await
        .unwrap();

    assert_eq!(outcome.user_topic.status, ProgressStatus::InProgress);
    assert_eq!(outcome.user_topic.progress, 50);
    assert_eq!(store.list_exam_results_for_user(USER).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_update_first_attempt_is_recorded() {
    let store = common::seeded_store();

    let outcome = update_exam(&*store, &*store, USER, submission("Stacks", 40))
        .await
        .unwrap();

    assert!(outcome.updated);
    assert_eq!(outcome.message, UPDATED_MESSAGE);
    assert_eq!(stored_progress(&store, "Stacks").await, (ProgressStatus::InProgress, 40));
}

#[tokio::test]
async fn test_update_never_regresses() {
    let store = common::seeded_store();

    update_exam(&*store, &*store, USER, submission("Stacks", 80)).await.unwrap();
    let outcome = update_exam(&*store, &*store, USER, submission("Stacks", 60))
        .await
        .unwrap();

    assert!(!outcome.updated);
    assert_eq!(outcome.message, KEPT_EXISTING_MESSAGE);
    assert!(outcome.user_topic.is_none());
    assert_eq!(stored_progress(&store, "Stacks").await, (ProgressStatus::Completed, 80));
    assert_eq!(store.list_exam_results_for_user(USER).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_equal_score_is_kept() {
    let store = common::seeded_store();

    update_exam(&*store, &*store, USER, submission("Queues", 75)).await.unwrap();
    let outcome = update_exam(&*store, &*store, USER, submission("Queues", 75))
        .await
        .unwrap();

    assert!(!outcome.updated);
    assert_eq!(store.list_exam_results_for_topic("Queues").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_update_gates_on_latest_attempt() {
    let store = common::seeded_store();

    submit_exam(&*store, &*store, USER, submission("Trees", 90)).await.unwrap();
    submit_exam(&*store, &*store, USER, submission("Trees", 40)).await.unwrap();

    let outcome = update_exam(&*store, &*store, USER, submission("Trees", 60))
        .await
        .unwrap();
    assert!(outcome.updated);
    assert_eq!(stored_progress(&store, "Trees").await, (ProgressStatus::InProgress, 60));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_updates_keep_the_maximum() {
    let store = common::seeded_store();
    let scores = [55, 91, 70, 12, 88, 91, 64, 99, 3, 71];

    let mut handles = Vec::new();
    for score in scores {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            update_exam(&*store, &*store, USER, submission("Heaps", score))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    assert_eq!(stored_progress(&store, "Heaps").await, (ProgressStatus::Completed, 99));

    let recorded: Vec<i32> = store
        .list_exam_results_for_topic("Heaps")
        .await
        .unwrap()
        .iter()
        .map(|r| r.score)
        .collect();
    assert!(recorded.contains(&99));
    assert!(recorded.len() <= scores.len());
}

#[tokio::test]
async fn test_aggregate_status_mirror() {
    let store = common::seeded_store();

    submit_exam(&*store, &*store, USER, submission("Greedy", 60)).await.unwrap();
    assert_eq!(topic_status(&store, "Greedy").await, TopicStatus::NotStarted);

    submit_exam(&*store, &*store, USER, submission("Greedy", 75)).await.unwrap();
    assert_eq!(topic_status(&store, "Greedy").await, TopicStatus::InProgress);

    update_exam(&*store, &*store, USER, submission("Greedy", 95)).await.unwrap();
    assert_eq!(topic_status(&store, "Greedy").await, TopicStatus::Completed);

    // A kept update leaves the aggregate alone.
    submit_exam(&*store, &*store, USER, submission("Greedy", 40)).await.unwrap();
    update_exam(&*store, &*store, USER, submission("Greedy", 30)).await.unwrap();
    assert_eq!(topic_status(&store, "Greedy").await, TopicStatus::Completed);
}

#[tokio::test]
async fn test_mirror_failure_does_not_fail_submit() {
    let store = common::seeded_store();
    store.set_topic_status_unavailable(true);

    let outcome = submit_exam(&*store, &*store, USER, submission("DP", 97))
        .await
        .unwrap();

    assert_eq!(outcome.user_topic.status, ProgressStatus::Completed);
    assert_eq!(topic_status(&store, "DP").await, TopicStatus::NotStarted);
}

#[tokio::test]
async fn test_progress_store_failure_surfaces_persistence_error() {
    let store = common::seeded_store();
    store.set_progress_unavailable(true);

    let err = submit_exam(&*store, &*store, USER, submission("Arrays", 80))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(_)));

    store.set_progress_unavailable(false);
    assert!(store.find_progress(USER, "Arrays").await.unwrap().is_none());
    assert!(store.list_exam_results_for_user(USER).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_start_topic_resets_unless_in_progress() {
    let store = common::seeded_store();

    submit_exam(&*store, &*store, USER, submission("Arrays", 85)).await.unwrap();
    let outcome = start_topic(&*store, &*store, USER, "arrays").await.unwrap();
    assert!(!outcome.created);
    assert_eq!(outcome.user_topic.status, ProgressStatus::InProgress);
    assert_eq!(outcome.user_topic.progress, 0);

    submit_exam(&*store, &*store, USER, submission("Stacks", 30)).await.unwrap();
    let outcome = start_topic(&*store, &*store, USER, "Stacks").await.unwrap();
    assert_eq!(outcome.user_topic.progress, 30);
}

#[tokio::test]
async fn test_update_topic_progress_requires_existing_row() {
    let store = common::seeded_store();

    let err = update_topic_progress(
        &*store,
        &*store,
        USER,
        "Arrays",
        ProgressUpdate {
            progress: Some(40),
            status: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    start_topic(&*store, &*store, USER, "Arrays").await.unwrap();
    let row = update_topic_progress(
        &*store,
        &*store,
        USER,
        " ARRAYS ",
        ProgressUpdate {
            progress: Some(40),
            status: Some(ProgressStatus::Mastered),
        },
    )
    .await
    .unwrap();
    assert_eq!(row.topic_name, "Arrays");
    assert_eq!(row.status, ProgressStatus::Mastered);
    assert_eq!(row.progress, 40);
}

#[tokio::test]
async fn test_submit_uses_catalog_spelling() {
    let store = common::seeded_store();
    dsa_pathway_backend::services::user_topics::select_topics(
        &*store,
        &*store,
        USER,
        &["Arrays".to_string()],
    )
    .await
    .unwrap();

    let outcome = submit_exam(&*store, &*store, USER, submission("arrays", 90))
        .await
        .unwrap();
    assert_eq!(outcome.exam_result.topic_name, "Arrays");

    let rows = store.list_progress(USER).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].topic_name, "Arrays");
    assert_eq!((rows[0].status, rows[0].progress), (ProgressStatus::Completed, 90));
    assert_eq!(topic_status(&store, "Arrays").await, TopicStatus::Completed);
}

#[tokio::test]
async fn test_update_gate_ignores_spelling() {
    let store = common::seeded_store();

    update_exam(&*store, &*store, USER, submission("arrays", 90)).await.unwrap();
    let outcome = update_exam(&*store, &*store, USER, submission(" ARRAYS ", 40))
        .await
        .unwrap();

    assert!(!outcome.updated);
    assert_eq!(stored_progress(&store, "Arrays").await, (ProgressStatus::Completed, 90));
    assert_eq!(store.list_exam_results_for_topic("Arrays").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_submit_keeps_name_of_uncatalogued_topic() {
    let store = common::seeded_store();

    let outcome = submit_exam(&*store, &*store, USER, submission("Segment Trees", 55))
        .await
        .unwrap();
    assert_eq!(outcome.user_topic.topic_name, "Segment Trees");
    assert_eq!(stored_progress(&store, "Segment Trees").await, (ProgressStatus::InProgress, 55));
}

#[tokio::test]
async fn test_submit_fails_when_catalog_lookup_fails() {
    let store = common::seeded_store();
    store.set_catalog_unavailable(true);

    let err = submit_exam(&*store, &*store, USER, submission("Arrays", 80))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Persistence(_)));
    assert!(store.list_exam_results_for_user(USER).await.unwrap().is_empty());
}
