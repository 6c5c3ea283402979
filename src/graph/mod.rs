//! Breeding graph: depth computation and shortest-path reduction.
//!
//! The consolidated groups are flattened into an offspring → candidate list
//! view, where each candidate is one way of producing that offspring.

mod shortest_path;
mod traversal;

pub use shortest_path::{build_shortest_paths, ShortestPaths};
pub use traversal::{base_entities, compute_depths};

use std::collections::HashMap;

use crate::model::{Group, Requirement};

/// One way of producing an offspring.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Sorted parent keys.
    pub parents: [String; 2],
    /// Default chance of the offspring entry this candidate came from.
    pub chance: f64,
    /// The requirement this candidate stands for; `None` for the
    /// unconditional default.
    pub requirement: Option<Requirement>,
}

/// Offspring → candidates, in group / offspring / requirement encounter order.
#[derive(Debug, Clone, Default)]
pub struct MutationGraph {
    order: Vec<String>,
    candidates: HashMap<String, Vec<Candidate>>,
}

impl MutationGraph {
    pub fn from_groups(groups: &[Group]) -> Self {
        let mut graph = Self::default();
        for group in groups {
            for (offspring, entry) in &group.children {
                let list = graph.candidates.entry(offspring.clone()).or_insert_with(|| {
                    graph.order.push(offspring.clone());
                    Vec::new()
                });
                if entry.unconditional || entry.requirements.is_empty() {
                    list.push(Candidate {
                        parents: group.parents.clone(),
                        chance: entry.chance,
                        requirement: None,
                    });
                }
                for req in &entry.requirements {
                    list.push(Candidate {
                        parents: group.parents.clone(),
                        chance: entry.chance,
                        requirement: Some(req.clone()),
                    });
                }
            }
        }
        graph
    }

    /// Offspring keys in first-encounter order.
    pub fn offspring(&self) -> &[String] {
        &self.order
    }

    pub fn is_offspring(&self, key: &str) -> bool {
        self.candidates.contains_key(key)
    }

    pub fn candidates(&self, offspring: &str) -> &[Candidate] {
        self.candidates
            .get(offspring)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Parent → offspring it takes part in producing, in encounter order.
    pub(crate) fn adjacency(&self) -> HashMap<&str, Vec<&str>> {
        let mut adj: HashMap<&str, Vec<&str>> = HashMap::new();
        for offspring in &self.order {
            for candidate in self.candidates(offspring) {
                let [a, b] = &candidate.parents;
                adj.entry(a.as_str()).or_default().push(offspring.as_str());
                if a != b {
                    adj.entry(b.as_str()).or_default().push(offspring.as_str());
                }
            }
        }
        adj
    }
}
