//! Core records shared by every stage: species, mutations and parent-pair groups.
//!
//! Extractors produce [`IntermediateRecordSet`]s; the consolidation engine turns
//! them into [`Group`]s keyed by sorted parent pair.

mod condition;
mod group;

pub use condition::{Condition, ConditionSet};
pub use group::{parent_key, Group, OffspringEntry, Requirement};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing normalized chances.
pub const CHANCE_TOLERANCE: f64 = 1e-4;

/// Convert an ingestion chance (0..100) to the normalized 0..1 scale.
pub fn normalize_chance(percent: f64) -> f64 {
    percent / 100.0
}

/// Whether two normalized chances differ by more than [`CHANCE_TOLERANCE`].
pub fn chances_differ(a: f64, b: f64) -> bool {
    (a - b).abs() > CHANCE_TOLERANCE
}

/// Stable textual form of a normalized chance, used in identity keys.
pub fn chance_key(chance: f64) -> String {
    format!("{:.6}", chance)
}

/// A breedable species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Canonical `namespace:slug` key.
    pub key: String,
    pub name: String,
    /// Taxonomic branch, e.g. `Noble`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default)]
    pub dominant: bool,
    /// Primary and secondary color, as written in the source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<(String, String)>,
    /// Discrete categorical trait values (speed, lifespan, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub traits: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<Product>,
}

impl Entity {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            branch: None,
            dominant: false,
            colors: None,
            traits: BTreeMap::new(),
            products: Vec::new(),
        }
    }
}

/// An item dropped by a species.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub item: String,
    /// Drop chance on the 0..100 scale.
    pub chance: f64,
    /// Specialty (bonus slot) product.
    #[serde(default)]
    pub bonus: bool,
}

/// Location of a record in its source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub file: String,
    pub line: usize,
}

/// A two-parent breeding edge as harvested from one source.
///
/// Parent and offspring references hold canonical keys once the extractor has
/// resolved them; unresolvable references keep their raw text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub parents: [String; 2],
    pub offspring: String,
    /// Chance on the 0..100 scale.
    pub chance: f64,
    #[serde(default, skip_serializing_if = "ConditionSet::is_empty")]
    pub conditions: ConditionSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

impl Relation {
    pub fn new(
        parent1: impl Into<String>,
        parent2: impl Into<String>,
        offspring: impl Into<String>,
        chance: f64,
    ) -> Self {
        Self {
            parents: [parent1.into(), parent2.into()],
            offspring: offspring.into(),
            chance,
            conditions: ConditionSet::default(),
            provenance: None,
        }
    }

    pub fn with_conditions(mut self, conditions: ConditionSet) -> Self {
        self.conditions = conditions;
        self
    }

    /// Human-readable location for diagnostics.
    pub fn location(&self) -> String {
        match &self.provenance {
            Some(p) => format!("{}:{}", p.file, p.line),
            None => "<unknown>".to_string(),
        }
    }
}

/// Everything one extractor harvested from one source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IntermediateRecordSet {
    /// Configured source name.
    pub source: String,
    pub namespace: String,
    #[serde(default)]
    pub entities: Vec<Entity>,
    #[serde(default)]
    pub relations: Vec<Relation>,
    /// Branch name to member keys.
    #[serde(default)]
    pub groupings: BTreeMap<String, Vec<String>>,
}

impl IntermediateRecordSet {
    pub fn new(source: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relations.is_empty()
    }

    /// Add an entity and record it under its branch.
    pub fn push_entity(&mut self, entity: Entity) {
        if let Some(branch) = &entity.branch {
            self.groupings
                .entry(branch.clone())
                .or_default()
                .push(entity.key.clone());
        }
        self.entities.push(entity);
    }
}
