//! Enum-style species definitions, as found in mod source code:
//!
//! ```text
//! MEADOWS("Meadows", HONEY, true, "ffffff", "ffdc16")
//!     .product("forestry:comb_honey", 30)
//!     .specialty("forestry:royal_jelly", 5)
//!     .trait("speed", "slowest")
//! COMMON("Common", NOBLE, false, "b2b2b2", "ffdc16")
//!     .mutation(MEADOWS, FOREST, 15)
//!     .mutation(forestry("Meadows"), $other, 15)
//!     .requires("biome", "Hell", "Nether")
//! ```
//!
//! A declaration is followed by chained calls that apply to it. Each
//! `.mutation` produces the declared species; `.requires` adds a condition to
//! the mutation directly before it.

use std::sync::OnceLock;

use regex::Regex;

use super::{parse_chance, split_args, unquote, SourceContext, SourceExtractor};
use crate::error::{BeegraphError, Result};
use crate::model::{Condition, Entity, IntermediateRecordSet, Product, Provenance, Relation};
use crate::resolve::{canonical_key, display_name, IdentifierResolver, SymbolTable};
use crate::store::strip_comments;

/// Extractor for the enum dialect
pub struct EnumExtractor;

fn declaration_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Z][A-Z0-9_]*)\s*\((.*)\)\s*[,;{]?$").expect("Invalid regex pattern")
    })
}

fn call_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\.(\w+)\s*\((.*)\)\s*[,;]?$").expect("Invalid regex pattern"))
}

/// Declared species currently receiving chained calls.
struct Current {
    entity: Entity,
    /// Index of the last `.mutation` in the output relation list.
    last_relation: Option<usize>,
}

impl SourceExtractor for EnumExtractor {
    fn dialect(&self) -> &'static str {
        "enum"
    }

    fn extract(&self, content: &str, path: &str, ctx: &SourceContext) -> Result<IntermediateRecordSet> {
        let stripped = strip_comments(content);
        let lines: Vec<(usize, &str)> = stripped
            .lines()
            .enumerate()
            .map(|(i, l)| (i + 1, l.trim()))
            .filter(|(_, l)| !l.is_empty())
            .collect();

        // Pass 1: symbol table
        let mut symbols = SymbolTable::new();
        for (_, line) in &lines {
            if let Some(caps) = declaration_regex().captures(line) {
                let symbol = &caps[1];
                let key = canonical_key(ctx.namespace, symbol);
                symbols.insert(symbol, &key);
                if let Some(name) = split_args(&caps[2]).first() {
                    symbols.alias(&unquote(name), &key);
                }
            }
        }
        let resolver = IdentifierResolver::new(ctx.namespace, &symbols);

        // Pass 2: entities and relations
        let mut set = IntermediateRecordSet::new(ctx.name, ctx.namespace);
        let mut current: Option<Current> = None;

        for (line_no, line) in lines {
            if let Some(caps) = declaration_regex().captures(line) {
                if let Some(done) = current.take() {
                    set.push_entity(done.entity);
                }
                let symbol = &caps[1];
                let mut entity = parse_declaration(ctx.namespace, symbol, &split_args(&caps[2]));
                if let Some(lang) = ctx.lang {
                    lang.apply(&mut entity, symbol);
                }
                current = Some(Current { entity, last_relation: None });
                continue;
            }

            let caps = call_regex().captures(line).ok_or_else(|| {
                BeegraphError::Parse(format!("{}:{}: unrecognized line: {}", path, line_no, line))
            })?;
            let cur = current.as_mut().ok_or_else(|| {
                BeegraphError::Parse(format!(
                    "{}:{}: .{}() before any species declaration",
                    path, line_no, &caps[1]
                ))
            })?;
            let args = split_args(&caps[2]);
            let provenance = Provenance { file: path.to_string(), line: line_no };

            match &caps[1] {
                "product" | "specialty" => {
                    let product = parse_product(&args, &caps[1] == "specialty").ok_or_else(|| {
                        BeegraphError::Parse(format!("{}:{}: bad product: {}", path, line_no, line))
                    })?;
                    cur.entity.products.push(product);
                }
                "trait" => {
                    if let [name, value] = args.as_slice() {
                        cur.entity.traits.insert(unquote(name), unquote(value));
                    }
                }
                "mutation" => {
                    let [a, b, chance] = args.as_slice() else {
                        return Err(BeegraphError::Parse(format!(
                            "{}:{}: mutation needs two parents and a chance",
                            path, line_no
                        )));
                    };
                    let chance = parse_chance(chance).ok_or_else(|| {
                        BeegraphError::Parse(format!("{}:{}: bad chance: {}", path, line_no, chance))
                    })?;
                    let mut relation = Relation::new(
                        resolver.resolve_or_raw(a),
                        resolver.resolve_or_raw(b),
                        cur.entity.key.clone(),
                        chance,
                    );
                    relation.provenance = Some(provenance);
                    set.relations.push(relation);
                    cur.last_relation = Some(set.relations.len() - 1);
                }
                "requires" => {
                    let Some(idx) = cur.last_relation else {
                        log::warn!("{}:{}: .requires() without a preceding mutation", path, line_no);
                        continue;
                    };
                    if let Some((key, values)) = args.split_first() {
                        let values: Vec<String> = values.iter().map(|v| unquote(v)).collect();
                        set.relations[idx]
                            .conditions
                            .insert(Condition::parse(&unquote(key), &values));
                    }
                }
                other => log::debug!("{}:{}: ignoring .{}()", path, line_no, other),
            }
        }
        if let Some(done) = current.take() {
            set.push_entity(done.entity);
        }

        Ok(set)
    }
}

/// `SYMBOL("Name", BRANCH, dominant, "primary", "secondary")`; everything
/// after the name is optional.
fn parse_declaration(namespace: &str, symbol: &str, args: &[String]) -> Entity {
    let name = args
        .first()
        .map(|a| unquote(a))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| display_name(symbol));
    let mut entity = Entity::new(canonical_key(namespace, symbol), name);
    entity.branch = args.get(1).map(|b| display_name(b)).filter(|b| !b.is_empty());
    entity.dominant = args.get(2).map_or(false, |d| d.trim() == "true");
    if let (Some(primary), Some(secondary)) = (args.get(3), args.get(4)) {
        entity.colors = Some((unquote(primary), unquote(secondary)));
    }
    entity
}

fn parse_product(args: &[String], bonus: bool) -> Option<Product> {
    let [item, chance] = args else {
        return None;
    };
    Some(Product {
        item: unquote(item),
        chance: parse_chance(chance)?,
        bonus,
    })
}
