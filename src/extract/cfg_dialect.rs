//! Configuration-file species and mutation recipes:
//!
//! ```text
//! bee Ruby {
//!   name = "Ruby"
//!   branch = Gems
//!   dominant = true
//!   colors = #ff0000 #aa0000
//!   product = gendustry:comb_ruby @ 20
//!   specialty = minecraft:redstone @ 5
//!   trait.speed = fast
//! }
//! mutation: 10% forestry("Industrious") + forestry("Imperial") => Ruby [biome: Hell|Nether, secret]
//! ```
//!
//! `#` and `//` start comments. Requirements in brackets are `key: v1|v2`
//! pairs; a bare key is a flag.

use std::sync::OnceLock;

use regex::Regex;

use super::{parse_chance, unquote, SourceContext, SourceExtractor};
use crate::error::{BeegraphError, Result};
use crate::model::{Condition, ConditionSet, Entity, IntermediateRecordSet, Product, Provenance, Relation};
use crate::resolve::{canonical_key, display_name, IdentifierResolver, SymbolTable};
use crate::store::strip_comments;

/// Extractor for the cfg dialect
pub struct CfgExtractor;

fn block_start_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^bee\s+([A-Za-z][\w]*)\s*\{$").expect("Invalid regex pattern"))
}

fn mutation_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^mutation:\s*([\d.]+)\s*%\s*(.+?)\s*\+\s*(.+?)\s*=>\s*(.+?)\s*(?:\[(.*)\])?$")
            .expect("Invalid regex pattern")
    })
}

fn product_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\S+)\s*@\s*([\d.]+%?)$").expect("Invalid regex pattern"))
}

impl SourceExtractor for CfgExtractor {
    fn dialect(&self) -> &'static str {
        "cfg"
    }

    fn extract(&self, content: &str, path: &str, ctx: &SourceContext) -> Result<IntermediateRecordSet> {
        let stripped = strip_comments(content);
        let lines: Vec<(usize, &str)> = stripped
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
            .collect();

        // Pass 1: symbol table
        let mut symbols = SymbolTable::new();
        let mut open: Option<String> = None;
        for (_, line) in &lines {
            if let Some(caps) = block_start_regex().captures(line) {
                let key = canonical_key(ctx.namespace, &caps[1]);
                symbols.insert(&caps[1], &key);
                open = Some(key);
            } else if *line == "}" {
                open = None;
            } else if let (Some(key), Some(("name", value))) = (&open, split_assignment(line)) {
                symbols.alias(&unquote(value), key);
            }
        }
        let resolver = IdentifierResolver::new(ctx.namespace, &symbols);

        // Pass 2: entities and relations
        let mut set = IntermediateRecordSet::new(ctx.name, ctx.namespace);
        let mut block: Option<(String, Entity, usize)> = None;

        for (line_no, line) in lines {
            if let Some((symbol, entity, _)) = block.as_mut() {
                if line == "}" {
                    if let Some(lang) = ctx.lang {
                        lang.apply(entity, symbol);
                    }
                    if let Some((_, entity, _)) = block.take() {
                        set.push_entity(entity);
                    }
                    continue;
                }
                apply_property(entity, line)
                    .map_err(|msg| BeegraphError::Parse(format!("{}:{}: {}", path, line_no, msg)))?;
                continue;
            }

            if let Some(caps) = block_start_regex().captures(line) {
                let symbol = caps[1].to_string();
                let entity = Entity::new(canonical_key(ctx.namespace, &symbol), display_name(&symbol));
                block = Some((symbol, entity, line_no));
                continue;
            }

            if let Some(caps) = mutation_regex().captures(line) {
                let chance = parse_chance(&caps[1]).ok_or_else(|| {
                    BeegraphError::Parse(format!("{}:{}: bad chance: {}", path, line_no, &caps[1]))
                })?;
                let mut relation = Relation::new(
                    resolver.resolve_or_raw(&caps[2]),
                    resolver.resolve_or_raw(&caps[3]),
                    resolver.resolve_or_raw(&caps[4]),
                    chance,
                );
                if let Some(reqs) = caps.get(5) {
                    relation.conditions = parse_requirements(reqs.as_str());
                }
                relation.provenance = Some(Provenance { file: path.to_string(), line: line_no });
                set.relations.push(relation);
                continue;
            }

            return Err(BeegraphError::Parse(format!(
                "{}:{}: unrecognized line: {}",
                path, line_no, line
            )));
        }

        if let Some((symbol, _, start)) = block {
            return Err(BeegraphError::Parse(format!(
                "{}:{}: block for {} is never closed",
                path, start, symbol
            )));
        }
        Ok(set)
    }
}

fn split_assignment(line: &str) -> Option<(&str, &str)> {
    line.split_once('=').map(|(k, v)| (k.trim(), v.trim()))
}

fn apply_property(entity: &mut Entity, line: &str) -> std::result::Result<(), String> {
    let (key, value) = split_assignment(line).ok_or_else(|| format!("expected key = value: {}", line))?;
    match key {
        "name" => entity.name = unquote(value),
        "branch" => entity.branch = Some(display_name(&unquote(value))),
        "dominant" => entity.dominant = value == "true",
        "colors" => {
            let mut parts = value.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(a), Some(b)) => {
                    entity.colors = Some((a.trim_start_matches('#').to_string(), b.trim_start_matches('#').to_string()))
                }
                _ => return Err(format!("colors needs two values: {}", value)),
            }
        }
        "product" | "specialty" => {
            let caps = product_regex()
                .captures(value)
                .ok_or_else(|| format!("expected item @ chance: {}", value))?;
            let chance = parse_chance(&caps[2]).ok_or_else(|| format!("bad chance: {}", &caps[2]))?;
            entity.products.push(Product {
                item: caps[1].to_string(),
                chance,
                bonus: key == "specialty",
            });
        }
        other => match other.strip_prefix("trait.") {
            Some(name) => {
                entity.traits.insert(name.to_string(), unquote(value));
            }
            None => log::debug!("ignoring unknown property {}", other),
        },
    }
    Ok(())
}

/// `biome: Hell|Nether, secret, temperature: Hot`
fn parse_requirements(text: &str) -> ConditionSet {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once(':') {
            Some((key, values)) => {
                let values: Vec<String> = values.split('|').map(|v| unquote(v)).collect();
                Condition::parse(key, &values)
            }
            None => Condition::parse(part, &[]),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"
# Gendustry config
mutation: 10% forestry("Industrious") + forestry("Imperial") => Ruby [biome: Hell|Nether, secret]
mutation: 4.5% Ruby + "Sapphire Gem" => forestry:cultivated

bee Ruby {
  name = "Ruby"
  branch = Gems
  dominant = true
  colors = #ff0000 #aa0000
  product = gendustry:comb_ruby @ 20
  specialty = minecraft:redstone @ 5
  trait.speed = fast
}

bee Sapphire {
  name = "Sapphire Gem"
}
"#;

    fn ctx() -> SourceContext<'static> {
        SourceContext { name: "gendustry", namespace: "gendustry", lang: None }
    }

    #[test]
    fn test_blocks_parsed() {
        let set = CfgExtractor.extract(SOURCE, "bees.cfg", &ctx()).unwrap();
        assert_eq!(set.entities.len(), 2);
        let ruby = &set.entities[0];
        assert_eq!(ruby.key, "gendustry:ruby");
        assert_eq!(ruby.branch.as_deref(), Some("Gems"));
        assert!(ruby.dominant);
        assert_eq!(ruby.colors, Some(("ff0000".into(), "aa0000".into())));
        assert_eq!(ruby.products.len(), 2);
        assert_eq!(ruby.products[0].chance, 20.0);
        assert!(ruby.products[1].bonus);
        assert_eq!(ruby.traits["speed"], "fast");
        assert_eq!(set.entities[1].name, "Sapphire Gem");
    }

    #[test]
    fn test_mutations_resolve_forward_and_cross_source() {
        let set = CfgExtractor.extract(SOURCE, "bees.cfg", &ctx()).unwrap();
        assert_eq!(set.relations.len(), 2);
        let first = &set.relations[0];
        assert_eq!(
            first.parents,
            ["forestry:industrious".to_string(), "forestry:imperial".to_string()]
        );
        assert_eq!(first.offspring, "gendustry:ruby");
        assert_eq!(first.conditions.len(), 2);
        assert_eq!(first.conditions.get("secret"), Some(&Condition::Secret(true)));

        let second = &set.relations[1];
        assert_eq!(second.chance, 4.5);
        assert_eq!(second.parents[1], "gendustry:sapphire");
        assert_eq!(second.offspring, "forestry:cultivated");
        assert!(second.conditions.is_empty());
    }

    #[test]
    fn test_unclosed_block_is_error() {
        let err = CfgExtractor
            .extract("bee Ruby {\n  name = \"Ruby\"\n", "bees.cfg", &ctx())
            .unwrap_err();
        assert!(err.to_string().contains("never closed"));
    }

    #[test]
    fn test_garbage_line_is_error() {
        let err = CfgExtractor.extract("what is this", "bees.cfg", &ctx()).unwrap_err();
        assert!(err.to_string().contains("bees.cfg:1"));
    }
}
