use std::sync::Arc;

use chrono::Utc;
use dsa_pathway_backend::db::memory::MemoryStore;
use dsa_pathway_backend::models::{Priority, ProgressStatus, ProgressWrite};
use dsa_pathway_backend::repository::ProgressRepository;
use dsa_pathway_backend::seed::default_catalog;
use dsa_pathway_backend::services::prerequisites::PrerequisiteGraph;
use dsa_pathway_backend::services::recommendation::Recommender;
use dsa_pathway_backend::services::ServiceError;

mod common;

const USER: &str = "learner@example.com";

async fn put_row(store: &MemoryStore, topic: &str, status: ProgressStatus, progress: i32) {
    let write = ProgressWrite {
        status,
        progress,
        last_accessed: Utc::now(),
    };
    store.upsert_progress(USER, topic, write).await.unwrap();
}

fn names(recs: &[dsa_pathway_backend::models::Recommendation]) -> Vec<&str> {
    recs.iter().map(|r| r.topic_name.as_str()).collect()
}

#[tokio::test]
async fn test_cold_start_suggests_entry_topic() {
    let store = common::seeded_store();
    let recs = common::recommender()
        .recommend(&*store, &*store, USER, &[])
        .await
        .unwrap();

    assert_eq!(names(&recs), vec!["Arrays"]);
    assert_eq!(recs[0].confidence, 1.0);
    assert_eq!(recs[0].estimated_difficulty, 3);
    assert_eq!(recs[0].priority, Priority::High);
    assert!(recs[0].prereqs_met);
}

#[tokio::test]
async fn test_cold_start_skipped_once_entry_topic_started() {
    let store = common::seeded_store();
    put_row(&store, "Arrays", ProgressStatus::Selected, 0).await;

    let recs = common::recommender()
        .recommend(&*store, &*store, USER, &[])
        .await
        .unwrap();
    assert!(recs.is_empty());
}

#[tokio::test]
async fn test_custom_cold_start_topic() {
    let store = common::seeded_store();
    let recommender = Recommender::new(Arc::new(PrerequisiteGraph::dsa_default()), "math");

    let recs = recommender.recommend(&*store, &*store, USER, &[]).await.unwrap();
    assert_eq!(names(&recs), vec!["Math"]);
    assert_eq!(recs[0].reason, "Start your DSA journey with Math!");
}

#[tokio::test]
async fn test_started_topics_are_excluded_from_frontier() {
    let store = common::seeded_store();
    put_row(&store, "Arrays", ProgressStatus::Completed, 90).await;
    put_row(&store, "LinkedLists", ProgressStatus::Selected, 0).await;
    put_row(&store, "Heaps", ProgressStatus::InProgress, 20).await;

    let recs = common::recommender()
        .recommend(&*store, &*store, USER, &["Arrays".to_string()])
        .await
        .unwrap();
    let recommended = names(&recs);

    assert!(!recommended.contains(&"Arrays"));
    assert!(!recommended.contains(&"LinkedLists"));
    assert!(!recommended.contains(&"Heaps"));
    assert!(recommended.contains(&"TwoPointer"));
}

#[tokio::test]
async fn test_confidence_penalized_for_many_open_topics() {
    let store = common::seeded_store();
    for topic in ["Stacks", "Queues", "Heaps", "Trees"] {
        put_row(&store, topic, ProgressStatus::InProgress, 10).await;
    }

    let recs = common::recommender()
        .recommend(&*store, &*store, USER, &["Arrays".to_string()])
        .await
        .unwrap();

    assert!(!recs.is_empty());
    for rec in &recs {
        assert!((rec.confidence - 0.64).abs() < 1e-9);
    }
}

#[tokio::test]
async fn test_recommendations_sorted_easiest_first() {
    let store = common::seeded_store();
    let known = vec!["Arrays".to_string(), "Searching & Sorting".to_string()];

    let recs = common::recommender()
        .recommend(&*store, &*store, USER, &known)
        .await
        .unwrap();

    let weights: Vec<u8> = recs.iter().map(|r| r.difficulty.weight()).collect();
    let mut sorted = weights.clone();
    sorted.sort();
    assert_eq!(weights, sorted);
    assert!(names(&recs).contains(&"Hashing"));
    assert_eq!(recs[0].reason, "Based on your completion of Arrays, Searching & Sorting");
}

#[tokio::test]
async fn test_topics_missing_from_catalog_are_skipped() {
    let graph = PrerequisiteGraph::dsa_default();
    let partial: Vec<_> = default_catalog(&graph)
        .into_iter()
        .filter(|t| t.name != "LinkedLists")
        .collect();
    let store = Arc::new(MemoryStore::with_topics(partial));

    let recs = common::recommender()
        .recommend(&*store, &*store, USER, &["Arrays".to_string()])
        .await
        .unwrap();
    assert!(!names(&recs).contains(&"LinkedLists"));
    assert!(names(&recs).contains(&"Strings"));
}

#[tokio::test]
async fn test_cycle_members_are_never_recommended() {
    let store = common::seeded_store();
    let graph = PrerequisiteGraph::dsa_default();
    let known: Vec<String> = graph
        .topics()
        .filter(|t| !matches!(*t, "Graphs" | "DFS" | "BFS"))
        .map(str::to_string)
        .collect();

    let recs = common::recommender()
        .recommend(&*store, &*store, USER, &known)
        .await
        .unwrap();
    assert!(recs.is_empty());
}

#[tokio::test]
async fn test_catalog_failure_is_unavailable() {
    let store = common::seeded_store();
    store.set_catalog_unavailable(true);

    let err = common::recommender()
        .recommend(&*store, &*store, USER, &["Arrays".to_string()])
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::RecommendationUnavailable(_)));
}

#[tokio::test]
async fn test_recommend_for_user_counts_mastered_as_known() {
    let store = common::seeded_store();
    put_row(&store, "Arrays", ProgressStatus::Mastered, 100).await;

    let recs = common::recommender()
        .recommend_for_user(&*store, &*store, USER)
        .await
        .unwrap();
    let recommended = names(&recs);

    assert!(recommended.contains(&"LinkedLists"));
    assert!(!recommended.contains(&"Arrays"));
    assert_eq!(recs[0].reason, "Based on your completion of Arrays");
}

#[tokio::test]
async fn test_recommend_for_new_user_is_cold_start() {
    let store = common::seeded_store();
    let recs = common::recommender()
        .recommend_for_user(&*store, &*store, USER)
        .await
        .unwrap();
    assert_eq!(names(&recs), vec!["Arrays"]);
}

#[tokio::test]
async fn test_started_topics_excluded_regardless_of_spelling() {
    let store = common::seeded_store();
    put_row(&store, " arrays ", ProgressStatus::InProgress, 30).await;

    let recs = common::recommender()
        .recommend(&*store, &*store, USER, &["Math".to_string()])
        .await
        .unwrap();
    let recommended = names(&recs);

    assert!(!recommended.contains(&"Arrays"));
    assert!(recommended.contains(&"NumberTheory"));
}

#[tokio::test]
async fn test_submitted_lowercase_topic_counts_as_started() {
    let store = common::seeded_store();
    dsa_pathway_backend::services::exam_results::submit_exam(
        &*store,
        &*store,
        USER,
        dsa_pathway_backend::services::exam_results::ExamSubmission {
            topic_name: "arrays".to_string(),
            score: 90,
            total_questions: 10,
            correct_answers: 9,
            time_taken: 60,
        },
    )
    .await
    .unwrap();

    let ranked = common::recommender()
        .recommend(&*store, &*store, USER, &["Math".to_string()])
        .await
        .unwrap();
    assert!(!names(&ranked).contains(&"Arrays"));

    let cold = common::recommender()
        .recommend(&*store, &*store, USER, &[])
        .await
        .unwrap();
    assert!(cold.is_empty());
}
