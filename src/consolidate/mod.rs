//! Consolidation engine: merge every extracted record set with the override
//! groups into one de-duplicated mutation graph.
//!
//! Order matters. Overrides seed the working group map first, then relations
//! are consumed in source priority order and file order, so duplicate and
//! merge classification depends only on what has been indexed before.

mod diagnostics;

pub use diagnostics::{ChanceConflict, ConsolidationReport, SkipDiagnostic, SkipReason};

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::model::{
    chance_key, chances_differ, normalize_chance, parent_key, ConditionSet, Entity, Group,
    IntermediateRecordSet, OffspringEntry, Relation, Requirement,
};
use crate::overrides::OverrideSet;

/// Result of a consolidation run.
#[derive(Debug, Clone, Default)]
pub struct Consolidated {
    pub entities: BTreeMap<String, Entity>,
    /// Override groups (enriched) followed by new groups, each part sorted by
    /// parent pair.
    pub groups: Vec<Group>,
    pub skipped: Vec<SkipDiagnostic>,
    pub conflicts: Vec<ChanceConflict>,
    pub report: ConsolidationReport,
}

/// Mutable state threaded through one consolidation run.
pub struct ConsolidationState<'a> {
    overrides: &'a OverrideSet,
    entities: BTreeMap<String, Entity>,
    groups: HashMap<String, Group>,
    seen: HashSet<String>,
    skipped: Vec<SkipDiagnostic>,
    conflicts: Vec<ChanceConflict>,
    report: ConsolidationReport,
}

impl<'a> ConsolidationState<'a> {
    /// Start a run with the working group map seeded from the overrides.
    pub fn new(overrides: &'a OverrideSet) -> Self {
        let groups = overrides
            .groups()
            .iter()
            .map(|g| (g.key(), g.clone()))
            .collect();
        Self {
            overrides,
            entities: BTreeMap::new(),
            groups,
            seen: HashSet::new(),
            skipped: Vec::new(),
            conflicts: Vec::new(),
            report: ConsolidationReport::default(),
        }
    }

    /// Add every entity of a record set to the registry.
    pub fn add_entities(&mut self, set: &IntermediateRecordSet) {
        for entity in &set.entities {
            if let Some(previous) = self.entities.insert(entity.key.clone(), entity.clone()) {
                if previous != *entity {
                    log::debug!("{}: redefinition of {} replaces earlier record", set.source, entity.key);
                }
            }
        }
    }

    pub fn entities(&self) -> &BTreeMap<String, Entity> {
        &self.entities
    }

    /// Consume one extracted relation.
    pub fn add_relation(&mut self, source: &str, relation: &Relation) {
        self.report.relations_seen += 1;
        let [p1, p2] = &relation.parents;
        let offspring = relation.offspring.as_str();

        let missing: Vec<String> = [p1.as_str(), p2.as_str(), offspring]
            .iter()
            .filter(|key| !self.entities.contains_key(**key))
            .map(|key| key.to_string())
            .collect();
        if !missing.is_empty() {
            let covered = self.overrides.has_offspring(offspring);
            self.skip(source, relation, SkipReason::Unresolved { missing }, covered);
            return;
        }

        let key = parent_key(p1, p2);
        let chance = normalize_chance(relation.chance);

        if self.overrides.is_exact_duplicate(&key, offspring, chance) {
            self.skip(source, relation, SkipReason::DuplicateOfOverride, true);
            return;
        }

        let identity = format!(
            "{}|{}|{}|{}",
            key,
            offspring,
            chance_key(chance),
            relation.conditions.signature().unwrap_or_default()
        );
        if !self.seen.insert(identity) {
            let covered = self.overrides.has_offspring(offspring);
            self.skip(source, relation, SkipReason::DuplicateWithinRun, covered);
            return;
        }

        if self.overrides.has_parent_pair(&key) {
            self.report.merged_into_override += 1;
        }
        let group = self
            .groups
            .entry(key)
            .or_insert_with(|| Group::new(p1, p2));
        self.report.accepted += 1;

        let is_new = !group.children.contains_key(offspring);
        let entry = group
            .children
            .entry(offspring.to_string())
            .or_insert_with(|| OffspringEntry::new(chance));

        if !relation.conditions.is_empty() {
            let override_chance = chances_differ(chance, entry.chance).then_some(chance);
            entry.add_requirement(Requirement::new(
                relation.conditions.clone(),
                override_chance,
            ));
        } else if is_new || !chances_differ(chance, entry.chance) {
            entry.unconditional = true;
        } else {
            log::warn!(
                "{}: {} + {} -> {} at {} disagrees with default {}; kept as extra requirement ({})",
                source,
                p1,
                p2,
                offspring,
                chance,
                entry.chance,
                relation.location()
            );
            entry.add_requirement(Requirement::new(ConditionSet::new(), Some(chance)));
            self.conflicts.push(ChanceConflict {
                source: source.to_string(),
                parents: group.parents.clone(),
                offspring: offspring.to_string(),
                default_chance: entry.chance,
                chance,
                provenance: relation.provenance.clone(),
            });
            self.report.conflicts += 1;
        }
    }

    fn skip(&mut self, source: &str, relation: &Relation, reason: SkipReason, in_override: bool) {
        log::debug!(
            "{}: skipping {} + {} -> {} ({:?}, in override: {}) at {}",
            source,
            relation.parents[0],
            relation.parents[1],
            relation.offspring,
            reason,
            in_override,
            relation.location()
        );
        self.report.record_skip(&reason, in_override);
        self.skipped.push(SkipDiagnostic {
            source: source.to_string(),
            offspring: relation.offspring.clone(),
            in_override,
            reason,
            provenance: relation.provenance.clone(),
        });
    }

    /// Reconcile working groups with the overrides and emit the final lists.
    pub fn finish(mut self) -> Consolidated {
        let mut override_groups = Vec::with_capacity(self.overrides.groups().len());
        for original in self.overrides.groups() {
            let mut enriched = original.clone();
            if let Some(working) = self.groups.remove(&original.key()) {
                enriched.merge_from(&working);
            }
            override_groups.push(enriched);
        }
        let mut new_groups: Vec<Group> = self.groups.into_values().collect();

        sort_groups(&mut override_groups);
        sort_groups(&mut new_groups);
        override_groups.extend(new_groups);

        Consolidated {
            entities: self.entities,
            groups: override_groups,
            skipped: self.skipped,
            conflicts: self.conflicts,
            report: self.report,
        }
    }
}

/// Sort groups by their (sorted) parent pair.
pub fn sort_groups(groups: &mut [Group]) {
    groups.sort_by(|a, b| a.parents.cmp(&b.parents));
}

/// Run a full consolidation over record sets given in priority order.
pub fn consolidate(sets: &[IntermediateRecordSet], overrides: &OverrideSet) -> Consolidated {
    let mut state = ConsolidationState::new(overrides);
    for set in sets {
        state.add_entities(set);
    }
    for set in sets {
        for relation in &set.relations {
            state.add_relation(&set.source, relation);
        }
    }
    let result = state.finish();
    log::info!(
        "Consolidated {} species into {} groups (accepted {}, merged into overrides {}, skipped {})",
        result.entities.len(),
        result.groups.len(),
        result.report.accepted,
        result.report.merged_into_override,
        result.report.skipped()
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_shortest_paths;
    use crate::model::Condition;
    use crate::store::format_groups;

    fn set_with(source: &str, keys: &[&str], relations: Vec<Relation>) -> IntermediateRecordSet {
        let mut set = IntermediateRecordSet::new(source, source);
        for key in keys {
            set.push_entity(Entity::new(*key, *key));
        }
        set.relations = relations;
        set
    }

    fn hell() -> ConditionSet {
        vec![Condition::Biome(vec!["Hell".to_string()])].into_iter().collect()
    }

    const KEYS: &[&str] = &["m:x", "m:y", "m:z", "m:w"];

    #[test]
    fn test_simple_merge_across_sources() {
        let a = set_with("a", KEYS, vec![Relation::new("m:x", "m:y", "m:z", 15.0)]);
        let b = set_with("b", &[], vec![Relation::new("m:x", "m:y", "m:z", 15.0)]);
        let out = consolidate(&[a, b], &OverrideSet::default());

        assert_eq!(out.groups.len(), 1);
        let value = serde_json::to_value(&out.groups[0]).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"parents": ["m:x", "m:y"], "children": {"m:z": {"chance": 0.15}}})
        );
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].reason, SkipReason::DuplicateWithinRun);
        assert_eq!(out.skipped[0].source, "b");
    }

    #[test]
    fn test_parent_pair_symmetry() {
        let a = set_with(
            "a",
            KEYS,
            vec![
                Relation::new("m:x", "m:y", "m:z", 10.0),
                Relation::new("m:y", "m:x", "m:w", 10.0),
            ],
        );
        let out = consolidate(&[a], &OverrideSet::default());
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].children.len(), 2);
    }

    #[test]
    fn test_override_supersede_scenario() {
        let overrides = OverrideSet::parse(
            r#"[{"parents": ["m:x", "m:y"], "children": {"m:z": {"chance": 0.2}}}]"#,
            "o",
        )
        .unwrap();
        let a = set_with("a", KEYS, vec![Relation::new("m:y", "m:x", "m:z", 20.0)]);
        let b = set_with(
            "b",
            &[],
            vec![Relation::new("m:x", "m:y", "m:z", 5.0).with_conditions(hell())],
        );
        let out = consolidate(&[a, b], &overrides);

        assert_eq!(out.groups.len(), 1);
        let z = &out.groups[0].children["m:z"];
        assert_eq!(z.chance, 0.2);
        assert_eq!(z.requirements.len(), 1);
        assert_eq!(
            serde_json::to_value(&z.requirements[0]).unwrap(),
            serde_json::json!({"biome": ["Hell"], "chance": 0.05})
        );
        assert_eq!(out.skipped.len(), 1);
        assert_eq!(out.skipped[0].reason, SkipReason::DuplicateOfOverride);
        assert!(out.skipped[0].in_override);
        assert_eq!(out.report.merged_into_override, 1);
    }

    #[test]
    fn test_requirement_without_chance_when_equal() {
        let a = set_with(
            "a",
            KEYS,
            vec![
                Relation::new("m:x", "m:y", "m:z", 10.0),
                Relation::new("m:x", "m:y", "m:z", 10.0).with_conditions(hell()),
            ],
        );
        let out = consolidate(&[a], &OverrideSet::default());
        let z = &out.groups[0].children["m:z"];
        assert_eq!(z.requirements.len(), 1);
        assert_eq!(z.requirements[0].chance, None);
        assert!(z.unconditional);
    }

    #[test]
    fn test_unresolved_parent() {
        let a = set_with(
            "a",
            KEYS,
            vec![Relation::new("m:x", "forestry(\"Nope\")", "m:z", 10.0)],
        );
        let out = consolidate(&[a], &OverrideSet::default());
        assert!(out.groups.is_empty());
        assert_eq!(out.skipped.len(), 1);
        assert!(!out.skipped[0].in_override);
        assert_eq!(
            out.skipped[0].reason,
            SkipReason::Unresolved { missing: vec!["forestry(\"Nope\")".to_string()] }
        );
    }

    #[test]
    fn test_unresolved_but_covered_by_override() {
        let overrides = OverrideSet::parse(
            r#"[{"parents": ["m:x", "m:y"], "children": {"m:z": {"chance": 0.2}}}]"#,
            "o",
        )
        .unwrap();
        let a = set_with("a", KEYS, vec![Relation::new("m:q", "m:y", "m:z", 10.0)]);
        let out = consolidate(&[a], &overrides);
        assert!(out.skipped[0].in_override);
        assert_eq!(out.report.unresolved_covered, 1);
    }

    #[test]
    fn test_new_offspring_merged_into_override_group() {
        let overrides = OverrideSet::parse(
            r#"[{"parents": ["m:x", "m:y"], "children": {"m:z": {"chance": 0.2}}}]"#,
            "o",
        )
        .unwrap();
        let a = set_with("a", KEYS, vec![Relation::new("m:x", "m:y", "m:w", 8.0)]);
        let out = consolidate(&[a], &overrides);
        assert_eq!(out.groups.len(), 1);
        assert_eq!(out.groups[0].children.len(), 2);
        assert_eq!(out.groups[0].children["m:w"].chance, 0.08);
    }

    #[test]
    fn test_conflicting_chance_kept_and_flagged() {
        let overrides = OverrideSet::parse(
            r#"[{"parents": ["m:x", "m:y"], "children": {"m:z": {"chance": 0.2}}}]"#,
            "o",
        )
        .unwrap();
        let a = set_with("a", KEYS, vec![Relation::new("m:x", "m:y", "m:z", 12.0)]);
        let out = consolidate(&[a], &overrides);
        let z = &out.groups[0].children["m:z"];
        assert_eq!(z.chance, 0.2);
        assert_eq!(z.requirements, vec![Requirement::new(ConditionSet::new(), Some(0.12))]);
        assert_eq!(out.conflicts.len(), 1);
        assert_eq!(out.conflicts[0].default_chance, 0.2);
    }

    #[test]
    fn test_no_duplicate_requirements() {
        let a = set_with(
            "a",
            KEYS,
            vec![
                Relation::new("m:x", "m:y", "m:z", 10.0).with_conditions(hell()),
                Relation::new("m:y", "m:x", "m:z", 10.0).with_conditions(hell()),
            ],
        );
        let b = set_with(
            "b",
            &[],
            vec![Relation::new("m:x", "m:y", "m:z", 10.0).with_conditions(hell())],
        );
        let out = consolidate(&[a, b], &OverrideSet::default());
        assert_eq!(out.groups[0].children["m:z"].requirements.len(), 1);
        assert_eq!(out.report.duplicate_within_run, 2);
    }

    #[test]
    fn test_group_order_overrides_first_then_new() {
        let overrides = OverrideSet::parse(
            r#"[{"parents": ["m:y", "m:z"], "children": {"m:w": {"chance": 0.2}}}]"#,
            "o",
        )
        .unwrap();
        let a = set_with(
            "a",
            KEYS,
            vec![
                Relation::new("m:z", "m:x", "m:w", 10.0),
                Relation::new("m:x", "m:y", "m:w", 10.0),
            ],
        );
        let out = consolidate(&[a], &overrides);
        let pairs: Vec<_> = out.groups.iter().map(|g| g.key()).collect();
        assert_eq!(pairs, vec!["m:y|m:z", "m:x|m:y", "m:x|m:z"]);
    }

    #[test]
    fn test_mutation_file_reparses_to_same_groups() {
        let a = set_with(
            "a",
            KEYS,
            vec![
                Relation::new("m:x", "m:y", "m:z", 20.0),
                Relation::new("m:x", "m:y", "m:z", 5.0).with_conditions(hell()),
            ],
        );
        let out = consolidate(&[a], &OverrideSet::default());
        assert!(out.groups[0].children["m:z"].unconditional);

        let text = format_groups(&out.groups).unwrap();
        let back: Vec<Group> = serde_json::from_str(&text).unwrap();
        assert_eq!(back, out.groups);

        let from_memory = build_shortest_paths(&out.entities, &out.groups);
        let from_file = build_shortest_paths(&out.entities, &back);
        assert_eq!(from_memory.groups, from_file.groups);
        assert!(from_file.groups[0].children["m:z"].requirements.is_empty());
    }

    #[test]
    fn test_requirement_dedup_ignores_array_order() {
        let overrides = OverrideSet::parse(
            r#"[{"parents": ["m:x", "m:y"], "children": {"m:z": {
                "chance": 0.2,
                "requirements": [ {"biome": ["Nether", "Hell"], "chance": 0.05} ] }}}]"#,
            "o",
        )
        .unwrap();
        let nether_or_hell: ConditionSet =
            vec![Condition::parse("biome", &["Hell".to_string(), "Nether".to_string()])]
                .into_iter()
                .collect();
        let a = set_with(
            "a",
            KEYS,
            vec![Relation::new("m:y", "m:x", "m:z", 5.0).with_conditions(nether_or_hell)],
        );
        let out = consolidate(&[a], &overrides);
        let z = &out.groups[0].children["m:z"];
        assert_eq!(z.requirements.len(), 1);
        assert_eq!(
            z.requirements[0].conditions.get("biome"),
            Some(&Condition::Biome(vec!["Hell".to_string(), "Nether".to_string()]))
        );
    }

    #[test]
    fn test_idempotent_output() {
        let overrides = OverrideSet::parse(
            r#"[{"parents": ["m:x", "m:y"], "children": {"m:z": {"chance": 0.2}}}]"#,
            "o",
        )
        .unwrap();
        let sets = vec![set_with(
            "a",
            KEYS,
            vec![
                Relation::new("m:x", "m:z", "m:w", 10.0).with_conditions(hell()),
                Relation::new("m:x", "m:y", "m:z", 5.0).with_conditions(hell()),
                Relation::new("m:w", "m:y", "m:x", 3.0),
            ],
        )];
        let first = format_groups(&consolidate(&sets, &overrides).groups).unwrap();
        let second = format_groups(&consolidate(&sets, &overrides).groups).unwrap();
        assert_eq!(first, second);
    }
}
