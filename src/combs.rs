//! Comb registry derived from species products.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::Entity;
use crate::resolve::display_name;

/// Default marker identifying comb items.
pub const DEFAULT_COMB_MARKER: &str = "comb";

/// A comb item and the species that drop it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comb {
    pub name: String,
    pub producers: Vec<Producer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub species: String,
    /// Drop chance on the 0..100 scale.
    pub chance: f64,
}

/// Collect every product whose item id contains `marker` (case-insensitive).
/// Producers are sorted by species key.
pub fn collect_combs(entities: &BTreeMap<String, Entity>, marker: &str) -> BTreeMap<String, Comb> {
    let marker = marker.to_lowercase();
    let mut combs: BTreeMap<String, Comb> = BTreeMap::new();

    for entity in entities.values() {
        for product in &entity.products {
            if !product.item.to_lowercase().contains(&marker) {
                continue;
            }
            combs
                .entry(product.item.clone())
                .or_insert_with(|| Comb {
                    name: comb_name(&product.item),
                    producers: Vec::new(),
                })
                .producers
                .push(Producer {
                    species: entity.key.clone(),
                    chance: product.chance,
                });
        }
    }

    for comb in combs.values_mut() {
        comb.producers.sort_by(|a, b| a.species.cmp(&b.species));
    }
    combs
}

/// Display name from an item id: `forestry:comb_honey` → `Comb Honey`.
fn comb_name(item: &str) -> String {
    let local = item.rsplit(':').next().unwrap_or(item);
    display_name(local)
}
