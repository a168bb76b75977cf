use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use thiserror::Error;

/// Topic → prerequisite table shipped with the service.
const DSA_PREREQUISITES: &[(&str, &[&str])] = &[
    ("Arrays", &[]),
    ("Searching & Sorting", &["Arrays"]),
    ("Hashing", &["Searching & Sorting", "Arrays"]),
    ("LinkedLists", &["Arrays"]),
    ("Stacks", &["LinkedLists"]),
    ("Queues", &["LinkedLists"]),
    ("Recursion", &["Stacks"]),
    ("Backtracking", &["Recursion"]),
    ("Greedy", &["Searching & Sorting"]),
    ("DP", &["Recursion", "Backtracking", "Greedy"]),
    ("Trees", &["Recursion"]),
    ("BinaryTree", &["Trees"]),
    ("BST", &["BinaryTree"]),
    ("AVLTree", &["BST"]),
    ("RedBlackTree", &["BST"]),
    ("BTree", &["BinaryTree"]),
    ("BPlusTree", &["BTree"]),
    ("SegmentTree", &["Arrays", "Recursion"]),
    ("FenwickTree", &["Arrays"]),
    ("Heaps", &["Arrays"]),
    ("MinHeap", &["Heaps"]),
    ("MaxHeap", &["Heaps"]),
    ("Graphs", &["Trees", "DFS", "BFS", "DP"]),
    ("DFS", &["Graphs"]),
    ("BFS", &["Graphs"]),
    ("Dijkstra", &["Graphs", "Heaps"]),
    ("Kruskal", &["Graphs", "DisjointSet"]),
    ("Prim", &["Graphs", "Heaps"]),
    ("PriorityQueue", &["Heaps"]),
    ("Trie", &["Strings", "Hashing"]),
    ("Knapsack", &["DP"]),
    ("LCS", &["DP"]),
    ("SudokuSolver", &["Backtracking"]),
    ("TopologicalSort", &["Graphs", "DFS"]),
    ("BellmanFord", &["Graphs"]),
    ("FloydWarshall", &["Graphs"]),
    ("DisjointSet", &["Arrays"]),
    ("SlidingWindow", &["Arrays"]),
    ("TwoPointer", &["Arrays"]),
    ("PrefixSum", &["Arrays"]),
    ("NumberTheory", &["Math"]),
    ("GCD", &["NumberTheory"]),
    ("Sieve", &["NumberTheory"]),
    ("ModularExponentiation", &["NumberTheory"]),
    ("ChineseRemainderTheorem", &["NumberTheory"]),
    ("EulerTotient", &["NumberTheory"]),
    ("InclusionExclusion", &["NumberTheory"]),
    ("FastExponentiation", &["ModularExponentiation"]),
    ("BitManipulation", &["Arrays"]),
    ("DivideAndConquer", &["Recursion"]),
    ("MergeSort", &["DivideAndConquer"]),
    ("QuickSort", &["DivideAndConquer"]),
    ("BinarySearch", &["DivideAndConquer"]),
    ("ClosestPair", &["DivideAndConquer"]),
    ("StrassenMatrix", &["DivideAndConquer"]),
    ("Karatsuba", &["DivideAndConquer"]),
    ("BranchAndBound", &["Backtracking"]),
    ("NQueens", &["BranchAndBound"]),
    ("TSP", &["BranchAndBound"]),
    ("JobAssignment", &["BranchAndBound"]),
    ("Math", &[]),
    ("Strings", &["Arrays"]),
];

#[derive(Debug, Error)]
pub enum GraphLoadError {
    #[error("failed to read prerequisite graph {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid prerequisite graph {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only prerequisite table. Keys iterate in lexicographic order, which
/// makes every frontier computed from it deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrerequisiteGraph {
    entries: BTreeMap<String, Vec<String>>,
}

impl PrerequisiteGraph {
    pub fn dsa_default() -> Self {
        Self::from_entries(DSA_PREREQUISITES.iter().map(|(topic, prereqs)| {
            (
                topic.to_string(),
                prereqs.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            )
        }))
    }

    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, Vec<String>)>,
    {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Loads a `{ "Topic": ["Prereq", ...] }` JSON document.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, GraphLoadError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let raw = std::fs::read_to_string(path).map_err(|source| GraphLoadError::Io {
            path: display.clone(),
            source,
        })?;
        let entries: BTreeMap<String, Vec<String>> =
            serde_json::from_str(&raw).map_err(|source| GraphLoadError::Parse {
                path: display,
                source,
            })?;
        Ok(Self { entries })
    }

    /// Unknown topics have no prerequisites.
    pub fn prerequisites_of(&self, topic: &str) -> &[String] {
        self.entries.get(topic).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Topics with no prerequisites at all.
    pub fn roots(&self) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, prereqs)| prereqs.is_empty())
            .map(|(topic, _)| topic.as_str())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every graph topic not in `known` whose prerequisites are all in
    /// `known`, sorted by name.
    pub fn next_topics(&self, known: &HashSet<String>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(topic, prereqs)| {
                !known.contains(topic.as_str()) && prereqs.iter().all(|p| known.contains(p))
            })
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Returns one dependency cycle if the table has any. Prerequisites that
    /// are not themselves keys are treated as leaves.
    pub fn find_cycle(&self) -> Option<Vec<String>> {
        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Visiting,
            Done,
        }

        fn visit<'a>(
            graph: &'a PrerequisiteGraph,
            topic: &'a str,
            marks: &mut BTreeMap<&'a str, Mark>,
            path: &mut Vec<&'a str>,
        ) -> Option<Vec<String>> {
            match marks.get(topic) {
                Some(Mark::Done) => return None,
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|t| *t == topic).unwrap_or(0);
                    let mut cycle: Vec<String> =
                        path[start..].iter().map(|t| t.to_string()).collect();
                    cycle.push(topic.to_string());
                    return Some(cycle);
                }
                None => {}
            }

            marks.insert(topic, Mark::Visiting);
            path.push(topic);
            for prereq in graph.prerequisites_of(topic) {
                if let Some(cycle) = visit(graph, prereq.as_str(), marks, path) {
                    return Some(cycle);
                }
            }
            path.pop();
            marks.insert(topic, Mark::Done);
            None
        }

        let mut marks = BTreeMap::new();
        let mut path = Vec::new();
        for topic in self.entries.keys() {
            if let Some(cycle) = visit(self, topic.as_str(), &mut marks, &mut path) {
                return Some(cycle);
            }
        }
        None
    }

    /// Prerequisite names that never appear as keys.
    pub fn dangling_prerequisites(&self) -> BTreeSet<&str> {
        self.entries
            .values()
            .flatten()
            .map(String::as_str)
            .filter(|p| !self.entries.contains_key(*p))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn known(names: &[&str]) -> HashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_empty_known_set_yields_roots() {
        let graph = PrerequisiteGraph::dsa_default();
        assert_eq!(graph.next_topics(&HashSet::new()), vec!["Arrays", "Math"]);
    }

    #[test]
    fn test_hashing_requires_both_prerequisites() {
        let graph = PrerequisiteGraph::dsa_default();

        let next = graph.next_topics(&known(&["Arrays"]));
        assert!(!next.contains(&"Hashing".to_string()));
        assert!(next.contains(&"Searching & Sorting".to_string()));

        let next = graph.next_topics(&known(&["Arrays", "Searching & Sorting"]));
        assert!(next.contains(&"Hashing".to_string()));
        assert!(!next.contains(&"Arrays".to_string()));
    }

    #[test]
    fn test_next_topics_sorted() {
        let graph = PrerequisiteGraph::dsa_default();
        let next = graph.next_topics(&known(&["Arrays", "Math"]));
        let mut sorted = next.clone();
        sorted.sort();
        assert_eq!(next, sorted);
        assert!(next.contains(&"NumberTheory".to_string()));
    }

    #[test]
    fn test_unknown_topic_has_no_prerequisites() {
        let graph = PrerequisiteGraph::dsa_default();
        assert!(graph.prerequisites_of("Quantum Sorting").is_empty());
        assert_eq!(graph.prerequisites_of("Stacks"), ["LinkedLists".to_string()]);
    }

    #[test]
    fn test_known_topics_outside_graph_are_ignored() {
        let graph = PrerequisiteGraph::from_entries([
            ("A".to_string(), vec![]),
            ("B".to_string(), vec!["A".to_string()]),
        ]);
        assert_eq!(graph.next_topics(&known(&["A", "Z"])), vec!["B"]);
    }

    #[test]
    fn test_default_graph_cycle_detected() {
        let graph = PrerequisiteGraph::dsa_default();
        let cycle = graph.find_cycle().expect("default table has a Graphs/DFS cycle");
        assert!(cycle.contains(&"Graphs".to_string()));
        assert_eq!(cycle.first(), cycle.last());
    }

    #[test]
    fn test_acyclic_graph_has_no_cycle() {
        let graph = PrerequisiteGraph::from_entries([
            ("A".to_string(), vec![]),
            ("B".to_string(), vec!["A".to_string()]),
            ("C".to_string(), vec!["A".to_string(), "B".to_string(), "X".to_string()]),
        ]);
        assert!(graph.find_cycle().is_none());
        assert_eq!(graph.dangling_prerequisites().into_iter().collect::<Vec<_>>(), vec!["X"]);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, r#"{"Intro": [], "Next": ["Intro"]}"#).unwrap();

        let graph = PrerequisiteGraph::from_json_file(&path).unwrap();
        assert_eq!(graph.len(), 2);
        assert_eq!(graph.roots(), vec!["Intro"]);
    }

    #[test]
    fn test_from_json_file_rejects_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(&path, r#"["Intro"]"#).unwrap();

        assert!(matches!(
            PrerequisiteGraph::from_json_file(&path),
            Err(GraphLoadError::Parse { .. })
        ));
    }
}
