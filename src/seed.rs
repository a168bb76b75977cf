use crate::models::{Difficulty, Topic, TopicCategory, TopicStatus};
use crate::repository::{StoreError, TopicCatalog};
use crate::services::prerequisites::PrerequisiteGraph;

const ADVANCED_TOPICS: &[&str] = &[
    "DP",
    "AVLTree",
    "RedBlackTree",
    "BTree",
    "BPlusTree",
    "Graphs",
    "Dijkstra",
    "Kruskal",
    "Prim",
    "BellmanFord",
    "FloydWarshall",
    "StrassenMatrix",
    "ChineseRemainderTheorem",
    "EulerTotient",
    "TSP",
];

const INTERMEDIATE_TOPICS: &[&str] = &[
    "Trees",
    "BinaryTree",
    "BST",
    "Heaps",
    "Backtracking",
    "Greedy",
    "SegmentTree",
    "FenwickTree",
    "TopologicalSort",
    "NumberTheory",
    "DivideAndConquer",
    "BranchAndBound",
    "BitManipulation",
];

const DATA_STRUCTURE_TOPICS: &[&str] = &[
    "Arrays",
    "LinkedLists",
    "Stacks",
    "Queues",
    "Trees",
    "BinaryTree",
    "BST",
    "AVLTree",
    "RedBlackTree",
    "BTree",
    "BPlusTree",
    "Heaps",
    "MinHeap",
    "MaxHeap",
    "Trie",
    "DisjointSet",
];

const ADVANCED_CONCEPT_TOPICS: &[&str] = &[
    "DP",
    "Backtracking",
    "Greedy",
    "NumberTheory",
    "BitManipulation",
    "DivideAndConquer",
    "BranchAndBound",
];

const MATH_TOPICS: &[&str] = &[
    "Math",
    "GCD",
    "Sieve",
    "ModularExponentiation",
    "ChineseRemainderTheorem",
    "EulerTotient",
    "InclusionExclusion",
    "FastExponentiation",
];

const DESCRIPTIONS: &[(&str, &str)] = &[
    ("Arrays", "Fundamental data structure for storing sequential elements. Learn array operations, manipulation, and common patterns."),
    ("Searching & Sorting", "Techniques to find and order data. Master linear and binary search alongside the classic sorting algorithms and their complexities."),
    ("LinkedLists", "Sequential data structure with nodes. Understand singly and doubly linked lists implementations."),
    ("Stacks", "LIFO data structure. Learn stack operations and applications in problem-solving."),
    ("Queues", "FIFO data structure. Master queue implementations and their variations."),
    ("Trees", "Hierarchical data structure. Learn tree traversals and basic operations."),
    ("BinaryTree", "Tree with at most two children. Understand binary tree properties and operations."),
    ("BST", "Binary tree with ordering property. Master BST operations and balancing."),
    ("Graphs", "Non-linear data structure of vertices and edges. Learn graph representations and algorithms."),
    ("DP", "Problem-solving technique using subproblems. Master dynamic programming patterns."),
    ("Backtracking", "Algorithm technique to find all solutions. Learn constraint satisfaction problems."),
    ("Greedy", "Algorithmic paradigm making locally optimal choices. Understand greedy strategy."),
    ("Math", "Mathematical concepts in programming. Learn number theory and combinatorics."),
    ("BitManipulation", "Bit-level operations. Master bitwise operators and their applications."),
];

fn difficulty_for(name: &str) -> Difficulty {
    if ADVANCED_TOPICS.contains(&name) {
        Difficulty::Advanced
    } else if INTERMEDIATE_TOPICS.contains(&name) {
        Difficulty::Intermediate
    } else {
        Difficulty::Beginner
    }
}

fn category_for(name: &str) -> TopicCategory {
    if DATA_STRUCTURE_TOPICS.contains(&name) {
        TopicCategory::DataStructures
    } else if ADVANCED_CONCEPT_TOPICS.contains(&name) {
        TopicCategory::AdvancedConcepts
    } else if MATH_TOPICS.contains(&name) {
        TopicCategory::Math
    } else {
        TopicCategory::Algorithms
    }
}

fn description_for(name: &str) -> String {
    DESCRIPTIONS
        .iter()
        .find(|(topic, _)| *topic == name)
        .map(|(_, text)| text.to_string())
        .unwrap_or_else(|| format!("Learn about {name} and its applications in computer science."))
}

/// Builds one catalog entry per graph topic.
pub fn default_catalog(graph: &PrerequisiteGraph) -> Vec<Topic> {
    graph
        .topics()
        .map(|name| {
            let difficulty = difficulty_for(name);
            let (estimated_time, total_problems) = match difficulty {
                Difficulty::Advanced => (120, 15),
                Difficulty::Intermediate => (90, 12),
                Difficulty::Beginner => (60, 8),
            };
            Topic {
                name: name.to_string(),
                description: description_for(name),
                difficulty,
                prerequisites: graph.prerequisites_of(name).to_vec(),
                estimated_time,
                total_problems,
                category: category_for(name),
                status: TopicStatus::NotStarted,
                progress: 0,
            }
        })
        .collect()
}

/// Inserts the default catalog, leaving topics that already exist untouched.
/// An existing topic matches ignoring case and surrounding whitespace, the
/// same rule the catalog's unique name index enforces.
pub async fn seed_topics(
    catalog: &dyn TopicCatalog,
    graph: &PrerequisiteGraph,
) -> Result<usize, StoreError> {
    let mut inserted = 0usize;
    for topic in default_catalog(graph) {
        if let Some(existing) = catalog.resolve_topic(&topic.name).await? {
            tracing::debug!(topic = %topic.name, stored_as = %existing.name, "topic already seeded");
            continue;
        }
        catalog.upsert_topic(&topic).await?;
        inserted += 1;
    }

    if inserted > 0 {
        tracing::info!(count = inserted, "seeded topic catalog");
    } else {
        tracing::debug!("topic catalog already up to date");
    }
    Ok(inserted)
}
