//! Localized display names (`key=value` lang files).

use std::collections::HashMap;

use crate::model::Entity;

/// Parsed lang file.
#[derive(Debug, Clone, Default)]
pub struct LangTable {
    entries: HashMap<String, String>,
}

impl LangTable {
    /// Parse `key=value` lines; `#` starts a comment line.
    pub fn parse(content: &str) -> Self {
        let entries = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .filter(|(k, v)| !k.is_empty() && !v.is_empty())
            .collect();
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Localized name for a species, looked up as `species.<slug>`, then by
    /// the declaring symbol.
    pub fn species_name(&self, entity: &Entity, symbol: &str) -> Option<&str> {
        let slug = entity.key.split_once(':').map_or(entity.key.as_str(), |(_, s)| s);
        self.get(&format!("species.{}", slug))
            .or_else(|| self.get(symbol))
    }

    /// Replace the entity's display name when a localized one exists.
    pub fn apply(&self, entity: &mut Entity, symbol: &str) {
        if let Some(name) = self.species_name(entity, symbol) {
            entity.name = name.to_string();
        }
    }
}
