//! Hand-curated mutation overrides.
//!
//! The override file is a commented-JSON list of groups. Overrides are
//! authoritative: extracted relations that duplicate them are dropped, and
//! extracted relations sharing an override's parent pair are merged into it.

use std::collections::HashSet;

use crate::error::{BeegraphError, Result};
use crate::model::{chance_key, parent_key, Group};
use crate::store::parse_commented_json;

/// Loaded override groups plus lookup indices.
#[derive(Debug, Clone, Default)]
pub struct OverrideSet {
    groups: Vec<Group>,
    /// `parentKey|offspring|chance` for every override offspring.
    exact: HashSet<String>,
    parent_keys: HashSet<String>,
    offspring: HashSet<String>,
}

impl OverrideSet {
    /// Build the set from groups. Groups sharing a parent pair are merged so
    /// each pair appears once.
    pub fn from_groups(groups: Vec<Group>) -> Self {
        let mut merged: Vec<Group> = Vec::with_capacity(groups.len());
        for mut group in groups {
            group.normalize();
            for entry in group.children.values_mut() {
                entry.unconditional |= entry.requirements.is_empty();
            }
            match merged.iter_mut().find(|g| g.parents == group.parents) {
                Some(existing) => {
                    log::warn!(
                        "Override file lists parent pair {} more than once; merging",
                        group.key()
                    );
                    existing.merge_from(&group);
                }
                None => merged.push(group),
            }
        }

        let mut set = Self {
            groups: merged,
            ..Self::default()
        };
        for group in &set.groups {
            let key = group.key();
            for (offspring, entry) in &group.children {
                set.exact.insert(triple_key(&key, offspring, entry.chance));
                set.offspring.insert(offspring.clone());
            }
            set.parent_keys.insert(key);
        }
        set
    }

    /// Parse override text (comments allowed).
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let groups: Vec<Group> = parse_commented_json(content).map_err(|e| {
            BeegraphError::OverrideParse {
                path: origin.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Self::from_groups(groups))
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Exact (parents, offspring, normalized chance) match.
    pub fn is_exact_duplicate(&self, parent_key: &str, offspring: &str, chance: f64) -> bool {
        self.exact.contains(&triple_key(parent_key, offspring, chance))
    }

    pub fn has_parent_pair(&self, parent_key: &str) -> bool {
        self.parent_keys.contains(parent_key)
    }

    pub fn has_offspring(&self, offspring: &str) -> bool {
        self.offspring.contains(offspring)
    }
}

fn triple_key(parent_key: &str, offspring: &str, chance: f64) -> String {
    format!("{}|{}|{}", parent_key, offspring, chance_key(chance))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
// curated fixes
[
  {
    "parents": ["forestry:meadows", "forestry:forest"],
    "children": {
      "forestry:common": { "chance": 0.15 }
    }
  },
  /* Hell variant */
  {
    "parents": ["forestry:common", "forestry:cultivated"],
    "children": {
      "forestry:sinister": { "chance": 0.6, "requirements": [ { "biome": ["Hell"] } ] }
    }
  }
]
"#;

    #[test]
    fn test_parse_builds_indices() {
        let set = OverrideSet::parse(SAMPLE, "overrides.jsonc").unwrap();
        assert_eq!(set.groups().len(), 2);
        let key = parent_key("forestry:meadows", "forestry:forest");
        assert!(set.has_parent_pair(&key));
        assert!(set.is_exact_duplicate(&key, "forestry:common", 0.15));
        assert!(!set.is_exact_duplicate(&key, "forestry:common", 0.2));
        assert!(set.has_offspring("forestry:sinister"));
        assert!(!set.has_offspring("forestry:meadows"));
    }

    #[test]
    fn test_parents_sorted_and_unconditional_flag() {
        let set = OverrideSet::parse(SAMPLE, "overrides.jsonc").unwrap();
        let first = &set.groups()[0];
        assert_eq!(first.parents[0], "forestry:forest");
        assert!(first.children["forestry:common"].unconditional);
        assert!(!set.groups()[1].children["forestry:sinister"].unconditional);
    }

    #[test]
    fn test_explicit_unconditional_default_kept() {
        let text = r#"[
          {"parents": ["a:x", "a:y"], "children": {"a:z": {
            "chance": 0.2, "unconditional": true,
            "requirements": [ {"biome": ["Hell"], "chance": 0.05} ] }}}
        ]"#;
        let set = OverrideSet::parse(text, "o").unwrap();
        let z = &set.groups()[0].children["a:z"];
        assert!(z.unconditional);
        assert_eq!(z.requirements.len(), 1);
    }

    #[test]
    fn test_duplicate_pairs_merged() {
        let text = r#"[
          {"parents": ["a:x", "a:y"], "children": {"a:z": {"chance": 0.1}}},
          {"parents": ["a:y", "a:x"], "children": {"a:w": {"chance": 0.2}}}
        ]"#;
        let set = OverrideSet::parse(text, "o").unwrap();
        assert_eq!(set.groups().len(), 1);
        assert_eq!(set.groups()[0].children.len(), 2);
    }

    #[test]
    fn test_malformed_is_override_error() {
        let err = OverrideSet::parse("[ { \"parents\": [ }", "bad.jsonc").unwrap_err();
        match err {
            BeegraphError::OverrideParse { path, .. } => assert_eq!(path, "bad.jsonc"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
