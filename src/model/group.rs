//! Parent-pair groups: the unit the consolidation engine merges into.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::condition::{Condition, ConditionSet};

/// Order-independent key for a parent pair.
pub fn parent_key(a: &str, b: &str) -> String {
    if a <= b {
        format!("{}|{}", a, b)
    } else {
        format!("{}|{}", b, a)
    }
}

/// All offspring producible from one unordered parent pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Sorted parent keys.
    pub parents: [String; 2],
    #[serde(default)]
    pub children: BTreeMap<String, OffspringEntry>,
}

impl Group {
    pub fn new(a: &str, b: &str) -> Self {
        let parents = if a <= b {
            [a.to_string(), b.to_string()]
        } else {
            [b.to_string(), a.to_string()]
        };
        Self {
            parents,
            children: BTreeMap::new(),
        }
    }

    pub fn key(&self) -> String {
        parent_key(&self.parents[0], &self.parents[1])
    }

    /// Sort the parent pair in place.
    pub fn normalize(&mut self) {
        if self.parents[0] > self.parents[1] {
            self.parents.swap(0, 1);
        }
    }

    /// Fold another group's offspring into this one. Existing defaults win;
    /// requirements are appended unless structurally present already.
    /// Returns the number of offspring or requirements added.
    pub fn merge_from(&mut self, other: &Group) -> usize {
        let mut added = 0;
        for (offspring, entry) in &other.children {
            match self.children.get_mut(offspring) {
                Some(existing) => {
                    existing.unconditional |= entry.unconditional;
                    for req in &entry.requirements {
                        if existing.add_requirement(req.clone()) {
                            added += 1;
                        }
                    }
                }
                None => {
                    self.children.insert(offspring.clone(), entry.clone());
                    added += 1;
                }
            }
        }
        added
    }
}

/// One offspring of a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "OffspringRecord", into = "OffspringRecord")]
pub struct OffspringEntry {
    /// Default chance on the 0..1 scale.
    pub chance: f64,
    pub requirements: Vec<Requirement>,
    /// Whether the default chance is reachable without any requirement.
    pub unconditional: bool,
}

/// On-disk shape of an offspring entry. An entry without requirements is
/// unconditional; one with requirements carries `"unconditional": true` only
/// when its default chance also applies without them.
#[derive(Serialize, Deserialize)]
struct OffspringRecord {
    chance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    unconditional: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    requirements: Vec<Requirement>,
}

impl From<OffspringRecord> for OffspringEntry {
    fn from(record: OffspringRecord) -> Self {
        let unconditional = record
            .unconditional
            .unwrap_or(record.requirements.is_empty());
        Self {
            chance: record.chance,
            requirements: record.requirements,
            unconditional,
        }
    }
}

impl From<OffspringEntry> for OffspringRecord {
    fn from(entry: OffspringEntry) -> Self {
        let unconditional = (entry.unconditional && !entry.requirements.is_empty()).then_some(true);
        Self {
            chance: entry.chance,
            unconditional,
            requirements: entry.requirements,
        }
    }
}

impl OffspringEntry {
    pub fn new(chance: f64) -> Self {
        Self {
            chance,
            requirements: Vec::new(),
            unconditional: false,
        }
    }

    /// Append a requirement unless an identical one is present.
    pub fn add_requirement(&mut self, requirement: Requirement) -> bool {
        if self.requirements.contains(&requirement) {
            return false;
        }
        self.requirements.push(requirement);
        true
    }
}

/// A condition set under which an offspring can be produced, with an
/// optional chance that replaces the offspring's default.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Requirement {
    pub conditions: ConditionSet,
    pub chance: Option<f64>,
}

impl Requirement {
    pub fn new(conditions: ConditionSet, chance: Option<f64>) -> Self {
        Self { conditions, chance }
    }
}

impl Serialize for Requirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.conditions.len() + usize::from(self.chance.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        for c in self.conditions.iter() {
            map.serialize_entry(c.name(), &c.to_value())?;
        }
        if let Some(chance) = self.chance {
            map.serialize_entry("chance", &chance)?;
        }
        map.end()
    }
}

struct RequirementVisitor;

impl<'de> Visitor<'de> for RequirementVisitor {
    type Value = Requirement;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a requirement map")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut req = Requirement::default();
        while let Some((key, value)) = access.next_entry::<String, JsonValue>()? {
            if key == "chance" {
                let chance = value
                    .as_f64()
                    .ok_or_else(|| serde::de::Error::custom("requirement chance must be a number"))?;
                req.chance = Some(chance);
            } else {
                req.conditions.insert(Condition::from_json(&key, &value));
            }
        }
        Ok(req)
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(RequirementVisitor)
    }
}
