//! Mutation requirement vocabulary.

use std::fmt;

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

/// One named requirement a mutation places on the breeding environment.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Temperature(Vec<String>),
    Humidity(Vec<String>),
    Biome(Vec<String>),
    DateRange { from: String, to: String },
    TimeOfDay(String),
    Block(Vec<String>),
    MoonPhase(Vec<String>),
    MoonPhaseBonus(f64),
    Resource { item: String, amount: u32 },
    /// Ticks since the last nearby explosion.
    Explosion(u32),
    Player(String),
    Dimension(Vec<String>),
    Secret(bool),
    /// Unrecognized key, kept verbatim.
    Other { key: String, value: JsonValue },
}

impl Condition {
    /// Canonical key this condition serializes under.
    pub fn name(&self) -> &str {
        match self {
            Condition::Temperature(_) => "temperature",
            Condition::Humidity(_) => "humidity",
            Condition::Biome(_) => "biome",
            Condition::DateRange { .. } => "dateRange",
            Condition::TimeOfDay(_) => "timeOfDay",
            Condition::Block(_) => "block",
            Condition::MoonPhase(_) => "moonPhase",
            Condition::MoonPhaseBonus(_) => "moonPhaseBonus",
            Condition::Resource { .. } => "resource",
            Condition::Explosion(_) => "explosion",
            Condition::Player(_) => "player",
            Condition::Dimension(_) => "dimension",
            Condition::Secret(_) => "secret",
            Condition::Other { key, .. } => key,
        }
    }

    /// Sort and de-duplicate list values.
    fn canonicalize(&mut self) {
        match self {
            Condition::Temperature(v)
            | Condition::Humidity(v)
            | Condition::Biome(v)
            | Condition::Block(v)
            | Condition::MoonPhase(v)
            | Condition::Dimension(v) => {
                v.sort();
                v.dedup();
            }
            Condition::Other { value: JsonValue::Array(items), .. } => {
                items.sort_by_key(signature_item);
                items.dedup();
            }
            _ => {}
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Condition::Other { .. })
    }

    /// JSON value written for this condition.
    pub fn to_value(&self) -> JsonValue {
        match self {
            Condition::Temperature(v)
            | Condition::Humidity(v)
            | Condition::Biome(v)
            | Condition::Block(v)
            | Condition::MoonPhase(v)
            | Condition::Dimension(v) => json!(v),
            Condition::DateRange { from, to } => json!({ "from": from, "to": to }),
            Condition::TimeOfDay(s) | Condition::Player(s) => json!(s),
            Condition::MoonPhaseBonus(f) => json!(f),
            Condition::Resource { item, amount } => json!({ "item": item, "amount": amount }),
            Condition::Explosion(ticks) => json!(ticks),
            Condition::Secret(b) => json!(b),
            Condition::Other { value, .. } => value.clone(),
        }
    }

    /// Build a condition from a key and its textual values, as scraped from
    /// source text. Keys are matched case-insensitively and accept a few
    /// aliases; values that do not fit the expected shape fall back to
    /// [`Condition::Other`].
    pub fn parse(key: &str, values: &[String]) -> Condition {
        let values: Vec<String> = values
            .iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect();
        let first = values.first().cloned().unwrap_or_default();
        let parsed = match key.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" => Some(Condition::Temperature(values.clone())),
            "humidity" => Some(Condition::Humidity(values.clone())),
            "biome" | "biomes" => Some(Condition::Biome(values.clone())),
            "block" | "requiredblock" | "foundation" => Some(Condition::Block(values.clone())),
            "moonphase" | "moon" => Some(Condition::MoonPhase(values.clone())),
            "dimension" | "dim" => Some(Condition::Dimension(values.clone())),
            "timeofday" | "time" => Some(Condition::TimeOfDay(first.to_ascii_lowercase())),
            "player" => Some(Condition::Player(first.clone())),
            "moonphasebonus" | "moonbonus" => first.parse().ok().map(Condition::MoonPhaseBonus),
            "explosion" => first.parse().ok().map(Condition::Explosion),
            "secret" => Some(Condition::Secret(first.is_empty() || first.eq_ignore_ascii_case("true"))),
            "daterange" | "date" => parse_date_range(&values),
            "resource" => parse_resource(&values),
            _ => None,
        };
        parsed.unwrap_or_else(|| Condition::Other {
            key: key.trim().to_string(),
            value: match values.len() {
                0 => JsonValue::Bool(true),
                1 => JsonValue::String(first),
                _ => json!(values),
            },
        })
    }

    /// Build a condition from a key and a JSON value (override file shape).
    pub fn from_json(key: &str, value: &JsonValue) -> Condition {
        let strings = |v: &JsonValue| -> Option<Vec<String>> {
            match v {
                JsonValue::String(s) => Some(vec![s.clone()]),
                JsonValue::Array(items) => items
                    .iter()
                    .map(|i| i.as_str().map(str::to_string))
                    .collect(),
                _ => None,
            }
        };
        let parsed = match key {
            "temperature" => strings(value).map(Condition::Temperature),
            "humidity" => strings(value).map(Condition::Humidity),
            "biome" => strings(value).map(Condition::Biome),
            "block" => strings(value).map(Condition::Block),
            "moonPhase" => strings(value).map(Condition::MoonPhase),
            "dimension" => strings(value).map(Condition::Dimension),
            "timeOfDay" => value.as_str().map(|s| Condition::TimeOfDay(s.to_string())),
            "player" => value.as_str().map(|s| Condition::Player(s.to_string())),
            "moonPhaseBonus" => value.as_f64().map(Condition::MoonPhaseBonus),
            "explosion" => value
                .as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .map(Condition::Explosion),
            "secret" => value.as_bool().map(Condition::Secret),
            "dateRange" => match (value.get("from"), value.get("to")) {
                (Some(JsonValue::String(from)), Some(JsonValue::String(to))) => {
                    Some(Condition::DateRange { from: from.clone(), to: to.clone() })
                }
                _ => None,
            },
            "resource" => match (value.get("item"), value.get("amount")) {
                (Some(JsonValue::String(item)), Some(amount)) => amount
                    .as_u64()
                    .and_then(|n| u32::try_from(n).ok())
                    .map(|amount| Condition::Resource { item: item.clone(), amount }),
                _ => None,
            },
            _ => None,
        };
        parsed.unwrap_or_else(|| Condition::Other {
            key: key.to_string(),
            value: value.clone(),
        })
    }
}

fn parse_date_range(values: &[String]) -> Option<Condition> {
    match values {
        [from, to] => Some(Condition::DateRange { from: from.clone(), to: to.clone() }),
        [single] => single
            .split_once("..")
            .map(|(from, to)| Condition::DateRange {
                from: from.trim().to_string(),
                to: to.trim().to_string(),
            }),
        _ => None,
    }
}

fn parse_resource(values: &[String]) -> Option<Condition> {
    match values {
        [item, amount] => amount
            .parse()
            .ok()
            .map(|amount| Condition::Resource { item: item.clone(), amount }),
        [single] => match single.rsplit_once('*') {
            Some((item, amount)) => amount.trim().parse().ok().map(|amount| Condition::Resource {
                item: item.trim().to_string(),
                amount,
            }),
            None => Some(Condition::Resource { item: single.clone(), amount: 1 }),
        },
        _ => None,
    }
}

/// An ordered set of conditions with unique names, kept sorted by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionSet {
    conditions: Vec<Condition>,
}

impl ConditionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Condition> {
        self.conditions.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.name() == name)
    }

    /// Insert a condition, replacing any existing one with the same name.
    /// List values are stored sorted and de-duplicated, so sets that differ
    /// only in value order compare equal.
    pub fn insert(&mut self, mut condition: Condition) {
        condition.canonicalize();
        match self
            .conditions
            .binary_search_by(|c| c.name().cmp(condition.name()))
        {
            Ok(idx) => self.conditions[idx] = condition,
            Err(idx) => self.conditions.insert(idx, condition),
        }
    }

    /// Stable textual identity of the set: `None` when empty, otherwise
    /// `name=value` pairs in name order. Array values are sorted and joined;
    /// scalars are JSON-encoded.
    pub fn signature(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let pairs: Vec<String> = self
            .conditions
            .iter()
            .map(|c| format!("{}={}", c.name(), signature_value(&c.to_value())))
            .collect();
        Some(pairs.join(";"))
    }
}

fn signature_value(value: &JsonValue) -> String {
    match value {
        JsonValue::Array(items) => {
            let mut parts: Vec<String> = items.iter().map(signature_item).collect();
            parts.sort();
            parts.join(",")
        }
        other => other.to_string(),
    }
}

fn signature_item(item: &JsonValue) -> String {
    match item {
        JsonValue::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl FromIterator<Condition> for ConditionSet {
    fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
        let mut set = ConditionSet::new();
        for c in iter {
            set.insert(c);
        }
        set
    }
}

impl Serialize for ConditionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.conditions.len()))?;
        for c in &self.conditions {
            map.serialize_entry(c.name(), &c.to_value())?;
        }
        map.end()
    }
}

struct ConditionSetVisitor;

impl<'de> Visitor<'de> for ConditionSetVisitor {
    type Value = ConditionSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of condition name to value")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut set = ConditionSet::new();
        while let Some((key, value)) = access.next_entry::<String, JsonValue>()? {
            set.insert(Condition::from_json(&key, &value));
        }
        Ok(set)
    }
}

impl<'de> Deserialize<'de> for ConditionSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(ConditionSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_aliases() {
        assert_eq!(
            Condition::parse("Temp", &strs(&["Hot", "Hellish"])),
            Condition::Temperature(strs(&["Hot", "Hellish"]))
        );
        assert_eq!(
            Condition::parse("time", &strs(&["Night"])),
            Condition::TimeOfDay("night".to_string())
        );
        assert_eq!(Condition::parse("secret", &[]), Condition::Secret(true));
    }

    #[test]
    fn test_parse_date_range_and_resource() {
        assert_eq!(
            Condition::parse("date", &strs(&["12-24..12-26"])),
            Condition::DateRange { from: "12-24".into(), to: "12-26".into() }
        );
        assert_eq!(
            Condition::parse("resource", &strs(&["minecraft:iron_block*4"])),
            Condition::Resource { item: "minecraft:iron_block".into(), amount: 4 }
        );
        assert_eq!(
            Condition::parse("resource", &strs(&["minecraft:gold_block", "2"])),
            Condition::Resource { item: "minecraft:gold_block".into(), amount: 2 }
        );
    }

    #[test]
    fn test_parse_unknown_kept_as_other() {
        let c = Condition::parse("rainfall", &strs(&["heavy"]));
        assert!(!c.is_recognized());
        assert_eq!(c.name(), "rainfall");
        assert_eq!(c.to_value(), json!("heavy"));
    }

    #[test]
    fn test_bad_scalar_falls_back_to_other() {
        let c = Condition::parse("explosion", &strs(&["soon"]));
        assert_eq!(c.name(), "explosion");
        assert!(!c.is_recognized());
    }

    #[test]
    fn test_set_sorted_and_replacing() {
        let mut set = ConditionSet::new();
        set.insert(Condition::Temperature(strs(&["Hot"])));
        set.insert(Condition::Biome(strs(&["Hell"])));
        set.insert(Condition::Temperature(strs(&["Cold"])));
        let names: Vec<&str> = set.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["biome", "temperature"]);
        assert_eq!(set.get("temperature"), Some(&Condition::Temperature(strs(&["Cold"]))));
    }

    #[test]
    fn test_set_values_canonical() {
        let a: ConditionSet = vec![Condition::Biome(strs(&["Nether", "Hell", "Nether"]))]
            .into_iter()
            .collect();
        let b: ConditionSet = serde_json::from_str(r#"{"biome": ["Hell", "Nether"]}"#).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get("biome"), Some(&Condition::Biome(strs(&["Hell", "Nether"]))));

        let other: ConditionSet = vec![Condition::parse("rainfall", &strs(&["heavy", "light"]))]
            .into_iter()
            .collect();
        let reversed: ConditionSet = vec![Condition::parse("rainfall", &strs(&["light", "heavy"]))]
            .into_iter()
            .collect();
        assert_eq!(other, reversed);
    }

    #[test]
    fn test_signature_order_independent() {
        let a: ConditionSet = vec![
            Condition::Biome(strs(&["Hell", "Nether"])),
            Condition::Secret(true),
        ]
        .into_iter()
        .collect();
        let b: ConditionSet = vec![
            Condition::Secret(true),
            Condition::Biome(strs(&["Nether", "Hell"])),
        ]
        .into_iter()
        .collect();
        assert_eq!(a.signature(), b.signature());
        assert_eq!(a.signature().unwrap(), "biome=Hell,Nether;secret=true");
        assert_eq!(ConditionSet::new().signature(), None);
    }

    #[test]
    fn test_serde_map_shape() {
        let set: ConditionSet = vec![
            Condition::Biome(strs(&["Hell"])),
            Condition::MoonPhaseBonus(1.5),
        ]
        .into_iter()
        .collect();
        let text = serde_json::to_string(&set).unwrap();
        assert_eq!(text, r#"{"biome":["Hell"],"moonPhaseBonus":1.5}"#);
        let back: ConditionSet = serde_json::from_str(&text).unwrap();
        assert_eq!(back, set);
    }

    #[test]
    fn test_from_json_structured() {
        let c = Condition::from_json("resource", &json!({"item": "minecraft:stone", "amount": 3}));
        assert_eq!(c, Condition::Resource { item: "minecraft:stone".into(), amount: 3 });
        let c = Condition::from_json("biome", &json!("Hell"));
        assert_eq!(c, Condition::Biome(strs(&["Hell"])));
    }
}
