//! Reader for saved intermediate record sets (`--save-intermediate` output).

use super::{SourceContext, SourceExtractor};
use crate::error::{BeegraphError, Result};
use crate::model::IntermediateRecordSet;
use crate::store::parse_commented_json;

/// Extractor for already-extracted JSON record sets
pub struct IntermediateExtractor;

impl SourceExtractor for IntermediateExtractor {
    fn dialect(&self) -> &'static str {
        "intermediate"
    }

    fn extract(&self, content: &str, path: &str, ctx: &SourceContext) -> Result<IntermediateRecordSet> {
        let mut set: IntermediateRecordSet = parse_commented_json(content)
            .map_err(|e| BeegraphError::Parse(format!("{}: {}", path, e)))?;
        if set.namespace != ctx.namespace {
            log::debug!(
                "{}: saved namespace {} differs from configured {}",
                path,
                set.namespace,
                ctx.namespace
            );
        }
        set.source = ctx.name.to_string();
        if let Some(lang) = ctx.lang {
            for entity in &mut set.entities {
                let slug = entity.key.split_once(':').map_or(entity.key.clone(), |(_, s)| s.to_string());
                lang.apply(entity, &slug);
            }
        }
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_saved_set() {
        let text = r#"
// saved by beegraph
{
  "source": "old-name",
  "namespace": "extrabees",
  "entities": [ { "key": "extrabees:ocean", "name": "Ocean" } ],
  "relations": [
    { "parents": ["forestry:meadows", "extrabees:ocean"], "offspring": "extrabees:water",
      "chance": 12, "conditions": { "humidity": ["Damp"] } }
  ]
}
"#;
        let ctx = SourceContext { name: "extrabees", namespace: "extrabees", lang: None };
        let set = IntermediateExtractor.extract(text, "extrabees.json", &ctx).unwrap();
        assert_eq!(set.source, "extrabees");
        assert_eq!(set.entities.len(), 1);
        assert_eq!(set.relations[0].chance, 12.0);
        assert_eq!(set.relations[0].conditions.len(), 1);
    }

    #[test]
    fn test_malformed_is_parse_error() {
        let ctx = SourceContext { name: "x", namespace: "x", lang: None };
        let err = IntermediateExtractor.extract("{ nope", "x.json", &ctx).unwrap_err();
        assert!(matches!(err, BeegraphError::Parse(_)));
    }
}
