//! Shortest-path reduction: one producing mutation per reachable species.

use std::collections::{BTreeMap, HashMap};

use super::{base_entities, compute_depths, Candidate, MutationGraph};
use crate::consolidate::sort_groups;
use crate::model::{parent_key, Entity, Group, OffspringEntry};

/// Result of the shortest-path reduction.
#[derive(Debug, Clone, Default)]
pub struct ShortestPaths {
    /// One group entry per reachable non-base species.
    pub groups: Vec<Group>,
    pub depths: BTreeMap<String, usize>,
    /// Species with no producing mutation.
    pub base: Vec<String>,
    /// Produced species no chain from a base species reaches.
    pub unreachable: Vec<String>,
}

impl ShortestPaths {
    pub fn max_depth(&self) -> usize {
        self.depths.values().copied().max().unwrap_or(0)
    }

    /// Number of species at each depth.
    pub fn depth_histogram(&self) -> BTreeMap<usize, usize> {
        let mut histogram = BTreeMap::new();
        for depth in self.depths.values() {
            *histogram.entry(*depth).or_insert(0) += 1;
        }
        histogram
    }
}

/// Reduce the consolidated groups to the minimum-depth producing mutation of
/// every reachable species. Ties go to the first candidate in group,
/// offspring and requirement order. Never fails: disconnected or cyclic parts
/// of the graph are reported as unreachable and left out.
pub fn build_shortest_paths(entities: &BTreeMap<String, Entity>, groups: &[Group]) -> ShortestPaths {
    let graph = MutationGraph::from_groups(groups);
    let base = base_entities(entities.keys(), &graph);
    let depths = compute_depths(&base, &graph);

    let mut reduced: HashMap<String, Group> = HashMap::new();
    let mut unreachable = Vec::new();

    for offspring in graph.offspring() {
        let Some(&depth) = depths.get(offspring) else {
            unreachable.push(offspring.clone());
            continue;
        };
        let Some(candidate) = pick_candidate(graph.candidates(offspring), &depths, depth) else {
            continue;
        };
        let [a, b] = &candidate.parents;
        let group = reduced
            .entry(parent_key(a, b))
            .or_insert_with(|| Group::new(a, b));
        let mut entry = OffspringEntry::new(candidate.chance);
        match &candidate.requirement {
            Some(req) => {
                entry.add_requirement(req.clone());
            }
            None => entry.unconditional = true,
        }
        group.children.insert(offspring.clone(), entry);
    }

    let mut groups: Vec<Group> = reduced.into_values().collect();
    sort_groups(&mut groups);
    unreachable.sort();

    if !unreachable.is_empty() {
        log::info!("{} species are not reachable from any base species", unreachable.len());
    }

    ShortestPaths {
        groups,
        depths: depths.into_iter().collect(),
        base,
        unreachable,
    }
}

/// First candidate whose deeper parent sits exactly one level above `depth`.
fn pick_candidate<'a>(
    candidates: &'a [Candidate],
    depths: &HashMap<String, usize>,
    depth: usize,
) -> Option<&'a Candidate> {
    candidates.iter().find(|c| {
        match (depths.get(&c.parents[0]), depths.get(&c.parents[1])) {
            (Some(&d1), Some(&d2)) => d1.max(d2) + 1 == depth,
            _ => false,
        }
    })
}
