//! Identifier resolution: map raw species references found in source text onto
//! the canonical `namespace:slug` key space.
//!
//! Resolution tries, in order:
//! 1. the source's own symbol table (built completely before any relation is
//!    resolved, so forward references work),
//! 2. known cross-source helper-call shapes (`forestry("Meadows")`,
//!    `getSpecies("extrabees", "Ocean")`, `forestry.speciesMeadows`) and
//!    already-qualified `ns:slug` keys,
//! 3. a bare-symbol guess in the current namespace.
//!
//! Placeholders such as loop variables never resolve.

pub mod naming;

pub use naming::{canonical_key, display_name, slugify, split_words, to_pascal};

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

/// Names that denote a loop variable or dynamic value rather than a species.
const PLACEHOLDERS: &[&str] = &[
    "it", "this", "null", "species", "bee", "allele", "parent", "other", "self", "i", "j", "x",
];

/// Symbols declared by one source, mapped to their canonical keys.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    by_symbol: HashMap<String, String>,
    by_slug: HashMap<String, String>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declared symbol. Both the literal symbol and its slug map to
    /// the key, so `AE_SKYSTONE` and `"AE Skystone"` find the same species.
    pub fn insert(&mut self, symbol: &str, key: &str) {
        self.by_symbol.insert(symbol.to_string(), key.to_string());
        self.by_slug.insert(slugify(symbol), key.to_string());
    }

    /// Register an additional name (e.g. a display name) for an existing key.
    pub fn alias(&mut self, name: &str, key: &str) {
        self.by_slug.entry(slugify(name)).or_insert_with(|| key.to_string());
    }

    pub fn get(&self, symbol: &str) -> Option<&str> {
        self.by_symbol
            .get(symbol)
            .or_else(|| self.by_slug.get(&slugify(symbol)))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

fn helper_call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^([A-Za-z_][\w.]*)\(\s*"([^"]+)"\s*(?:,\s*"([^"]+)"\s*)?\)$"#)
            .expect("Invalid regex pattern")
    })
}

fn dotted_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z][A-Za-z0-9]*)\.(?:species)?([A-Za-z][A-Za-z0-9_]*)$")
            .expect("Invalid regex pattern")
    })
}

fn qualified_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z][\w]*):([A-Za-z0-9_ .'-]+)$").expect("Invalid regex pattern")
    })
}

fn symbol_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_ '-]*$").expect("Invalid regex pattern"))
}

/// Resolves references for one source against its symbol table.
pub struct IdentifierResolver<'a> {
    namespace: String,
    symbols: &'a SymbolTable,
    helper_aliases: HashMap<String, String>,
}

impl<'a> IdentifierResolver<'a> {
    pub fn new(namespace: &str, symbols: &'a SymbolTable) -> Self {
        Self {
            namespace: namespace.trim().to_lowercase(),
            symbols,
            helper_aliases: HashMap::new(),
        }
    }

    /// Map a helper function name onto a namespace (`EBSpecies` → `extrabees`).
    pub fn with_alias(mut self, helper: &str, namespace: &str) -> Self {
        self.helper_aliases
            .insert(helper.to_lowercase(), namespace.to_lowercase());
        self
    }

    /// Resolve a raw reference to a canonical key, or `None` when it cannot
    /// denote a fixed species.
    pub fn resolve(&self, raw: &str) -> Option<String> {
        let raw = raw.trim().trim_end_matches(';').trim();
        let unquoted = strip_quotes(raw);
        if unquoted.is_empty() || is_placeholder(unquoted) {
            return None;
        }

        if let Some(key) = self.symbols.get(unquoted) {
            return Some(key.to_string());
        }
        if let Some(key) = self.resolve_helper(raw) {
            return Some(key);
        }
        if symbol_regex().is_match(unquoted) {
            let slug = slugify(unquoted);
            if !slug.is_empty() {
                return Some(format!("{}:{}", self.namespace, slug));
            }
        }
        None
    }

    /// Resolve a reference, falling back to the raw text so the caller can
    /// report it as unresolved.
    pub fn resolve_or_raw(&self, raw: &str) -> String {
        self.resolve(raw).unwrap_or_else(|| raw.trim().to_string())
    }

    fn resolve_helper(&self, raw: &str) -> Option<String> {
        if let Some(caps) = helper_call_regex().captures(raw) {
            let func = caps.get(1)?.as_str();
            let first = caps.get(2)?.as_str();
            if let Some(second) = caps.get(3) {
                return Some(canonical_key(first, second.as_str()));
            }
            if let Some(key) = self.resolve_qualified(first) {
                return Some(key);
            }
            return self
                .helper_namespace(func)
                .map(|ns| canonical_key(&ns, first));
        }
        if let Some(key) = self.resolve_qualified(raw) {
            return Some(key);
        }
        if let Some(caps) = dotted_regex().captures(raw) {
            let ns = caps.get(1)?.as_str();
            let name = caps.get(2)?.as_str();
            return Some(canonical_key(&self.alias_or(ns), name));
        }
        None
    }

    fn resolve_qualified(&self, raw: &str) -> Option<String> {
        let caps = qualified_regex().captures(raw)?;
        let ns = caps.get(1)?.as_str();
        let name = caps.get(2)?.as_str();
        let name = name.strip_prefix("species.").unwrap_or(name);
        let slug = slugify(name);
        if slug.is_empty() {
            return None;
        }
        Some(format!("{}:{}", self.alias_or(ns), slug))
    }

    fn alias_or(&self, ns: &str) -> String {
        let lower = ns.to_lowercase();
        self.helper_aliases.get(&lower).cloned().unwrap_or(lower)
    }

    /// Namespace a helper function refers to. Generic lookups without a
    /// namespace argument stay in the current namespace.
    fn helper_namespace(&self, func: &str) -> Option<String> {
        let func = func.rsplit('.').next().unwrap_or(func).to_lowercase();
        if let Some(ns) = self.helper_aliases.get(&func) {
            return Some(ns.clone());
        }
        if matches!(func.as_str(), "get" | "getspecies" | "species" | "lookup") {
            return Some(self.namespace.clone());
        }
        let trimmed = ["species", "bees", "bee"]
            .iter()
            .find_map(|suffix| func.strip_suffix(suffix))
            .filter(|s| !s.is_empty())
            .unwrap_or(&func);
        Some(trimmed.to_string())
    }
}

fn strip_quotes(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .trim()
}

fn is_placeholder(s: &str) -> bool {
    s.starts_with('$')
        || s.contains('{')
        || s.contains('%')
        || PLACEHOLDERS.iter().any(|p| p.eq_ignore_ascii_case(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SymbolTable {
        let mut t = SymbolTable::new();
        t.insert("AE_SKYSTONE", "ae:aeskystone");
        t.insert("CERTUS", "ae:certus");
        t
    }

    #[test]
    fn test_symbol_table_lookup() {
        let t = table();
        assert_eq!(t.get("AE_SKYSTONE"), Some("ae:aeskystone"));
        assert_eq!(t.get("AE Skystone"), Some("ae:aeskystone"));
        assert_eq!(t.get("missing"), None);
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn test_resolve_own_symbol_first() {
        let t = table();
        let r = IdentifierResolver::new("ae", &t);
        assert_eq!(r.resolve("CERTUS").as_deref(), Some("ae:certus"));
        assert_eq!(r.resolve("\"AE Skystone\"").as_deref(), Some("ae:aeskystone"));
    }

    #[test]
    fn test_resolve_helper_calls() {
        let t = SymbolTable::new();
        let r = IdentifierResolver::new("ae", &t).with_alias("EB", "extrabees");
        assert_eq!(r.resolve(r#"forestry("Meadows")"#).as_deref(), Some("forestry:meadows"));
        assert_eq!(
            r.resolve(r#"getSpecies("extrabees", "Ocean")"#).as_deref(),
            Some("extrabees:ocean")
        );
        assert_eq!(
            r.resolve(r#"Species.get("magicbees:arcane")"#).as_deref(),
            Some("magicbees:arcane")
        );
        assert_eq!(r.resolve(r#"EB("Ocean")"#).as_deref(), Some("extrabees:ocean"));
        assert_eq!(r.resolve(r#"getSpecies("Ocean")"#).as_deref(), Some("ae:ocean"));
    }

    #[test]
    fn test_resolve_dotted_and_qualified() {
        let t = SymbolTable::new();
        let r = IdentifierResolver::new("ae", &t);
        assert_eq!(r.resolve("forestry.speciesMeadows").as_deref(), Some("forestry:meadows"));
        assert_eq!(r.resolve("forestry:meadows").as_deref(), Some("forestry:meadows"));
        assert_eq!(r.resolve("forestry:species.Tropical").as_deref(), Some("forestry:tropical"));
    }

    #[test]
    fn test_bare_symbol_guess() {
        let t = SymbolTable::new();
        let r = IdentifierResolver::new("Gendustry", &t);
        assert_eq!(r.resolve("Ruby").as_deref(), Some("gendustry:ruby"));
    }

    #[test]
    fn test_placeholders_unresolved() {
        let t = table();
        let r = IdentifierResolver::new("ae", &t);
        assert_eq!(r.resolve("species"), None);
        assert_eq!(r.resolve("$parent"), None);
        assert_eq!(r.resolve("bees[i]"), None);
        assert_eq!(r.resolve(""), None);
        assert_eq!(r.resolve_or_raw("bees[i]"), "bees[i]");
    }

    #[test]
    fn test_cross_dialect_references_collide() {
        let mut t = SymbolTable::new();
        t.insert("AE_SKYSTONE", &canonical_key("ae", "AE_SKYSTONE"));
        let own = IdentifierResolver::new("ae", &t);
        let empty = SymbolTable::new();
        let other = IdentifierResolver::new("gendustry", &empty);
        assert_eq!(own.resolve("AE_SKYSTONE"), other.resolve(r#"ae("AE Skystone")"#));
    }
}
