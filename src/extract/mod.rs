//! Source extractors: one per source dialect, each turning raw text into an
//! [`IntermediateRecordSet`].
//!
//! Extractors work in two passes. Pass 1 collects every species symbol the
//! source declares; pass 2 resolves all mutation references against that
//! complete table, so forward references inside one file resolve.

pub mod cfg_dialect;
pub mod enum_dialect;
pub mod intermediate;
pub mod lang;

pub use lang::LangTable;

use crate::error::{BeegraphError, Result};
use crate::model::IntermediateRecordSet;

/// Per-source settings an extractor needs.
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    /// Configured source name, recorded on the output set.
    pub name: &'a str,
    /// Namespace used for keys declared by this source.
    pub namespace: &'a str,
    pub lang: Option<&'a LangTable>,
}

/// Trait for source extractors
pub trait SourceExtractor {
    /// Dialect name used in configuration.
    fn dialect(&self) -> &'static str;

    /// Extract species and mutations from source text.
    fn extract(&self, content: &str, path: &str, ctx: &SourceContext) -> Result<IntermediateRecordSet>;
}

/// Extractor registry that selects the extractor by dialect name
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn SourceExtractor>>,
}

impl ExtractorRegistry {
    /// Create a new registry with all built-in extractors
    pub fn new() -> Self {
        let mut registry = Self {
            extractors: Vec::new(),
        };

        registry.register(Box::new(enum_dialect::EnumExtractor));
        registry.register(Box::new(cfg_dialect::CfgExtractor));
        registry.register(Box::new(intermediate::IntermediateExtractor));

        registry
    }

    /// Register an extractor
    pub fn register(&mut self, extractor: Box<dyn SourceExtractor>) {
        self.extractors.push(extractor);
    }

    /// Find the extractor for a dialect
    pub fn find(&self, dialect: &str) -> Option<&dyn SourceExtractor> {
        self.extractors
            .iter()
            .find(|e| e.dialect() == dialect)
            .map(|e| e.as_ref())
    }

    /// Names of all registered dialects
    pub fn dialects(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.dialect()).collect()
    }

    /// Extract a source with the extractor for its dialect.
    pub fn extract(
        &self,
        dialect: &str,
        content: &str,
        path: &str,
        ctx: &SourceContext,
    ) -> Result<IntermediateRecordSet> {
        let extractor = self.find(dialect).ok_or_else(|| {
            BeegraphError::Parse(format!("No extractor found for dialect: {}", dialect))
        })?;
        let set = extractor.extract(content, path, ctx)?;
        log::debug!(
            "{}: {} species, {} mutations, {} branches",
            ctx.name,
            set.entities.len(),
            set.relations.len(),
            set.groupings.len()
        );
        Ok(set)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Split an argument list on top-level commas, ignoring commas inside quotes
/// and nested parentheses. Arguments are trimmed.
pub(crate) fn split_args(input: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut prev = '\0';

    for c in input.chars() {
        match c {
            '"' if prev != '\\' => in_string = !in_string,
            '(' if !in_string => depth += 1,
            ')' if !in_string => depth = depth.saturating_sub(1),
            ',' if !in_string && depth == 0 => {
                args.push(current.trim().to_string());
                current.clear();
                prev = c;
                continue;
            }
            _ => {}
        }
        current.push(c);
        prev = c;
    }
    if !current.trim().is_empty() || !args.is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

/// Remove one pair of surrounding double quotes.
pub(crate) fn unquote(s: &str) -> String {
    let s = s.trim();
    s.strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(s)
        .to_string()
}

/// Parse a chance written as `15`, `15.5` or `15%`.
pub(crate) fn parse_chance(s: &str) -> Option<f64> {
    let value: f64 = s.trim().trim_end_matches('%').trim().parse().ok()?;
    (0.0..=100.0).contains(&value).then_some(value)
}
