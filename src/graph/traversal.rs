//! Multi-source BFS over the mutation graph.

use std::collections::HashMap;

use super::MutationGraph;

/// Species that no group produces. These start at depth 0.
pub fn base_entities<'a, I>(entities: I, graph: &MutationGraph) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut base: Vec<String> = entities
        .into_iter()
        .filter(|key| !graph.is_offspring(key))
        .cloned()
        .collect();
    base.sort();
    base
}

/// Minimum number of mutation hops from any base species.
///
/// Levels are expanded one at a time: an offspring gets depth `L` as soon as
/// some candidate has both parents at depth `< L`. Depths are frozen on first
/// assignment. Offspring that no chain from a base species reaches are absent
/// from the result.
pub fn compute_depths(base: &[String], graph: &MutationGraph) -> HashMap<String, usize> {
    let mut depths: HashMap<String, usize> = base.iter().map(|k| (k.clone(), 0)).collect();
    let adjacency = graph.adjacency();
    let mut frontier: Vec<String> = base.to_vec();
    let mut level = 0;

    while !frontier.is_empty() {
        level += 1;
        let mut next = Vec::new();
        for parent in &frontier {
            let Some(offspring_list) = adjacency.get(parent.as_str()) else {
                continue;
            };
            for &offspring in offspring_list {
                if depths.contains_key(offspring) {
                    continue;
                }
                let reachable = graph.candidates(offspring).iter().any(|c| {
                    c.parents
                        .iter()
                        .all(|p| depths.get(p).map_or(false, |&d| d < level))
                });
                if reachable {
                    depths.insert(offspring.to_string(), level);
                    next.push(offspring.to_string());
                }
            }
        }
        log::trace!("depth {}: {} species", level, next.len());
        frontier = next;
    }
    depths
}
