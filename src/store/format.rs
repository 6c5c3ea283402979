//! Dedicated formatter for the mutation file.
//!
//! Scalar arrays stay on one line, arrays of records put one compact record per
//! line, and top-level groups are separated by a blank line.

use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::model::Group;

const INDENT: &str = "  ";

/// Render groups in the mutation-file layout.
pub fn format_groups(groups: &[Group]) -> Result<String> {
    if groups.is_empty() {
        return Ok("[]".to_string());
    }
    let mut out = String::from("[\n");
    for (i, group) in groups.iter().enumerate() {
        if i > 0 {
            out.push_str(",\n\n");
        }
        out.push_str(INDENT);
        write_value(&mut out, &serde_json::to_value(group)?, 1)?;
    }
    out.push_str("\n]");
    Ok(out)
}

fn is_scalar(value: &JsonValue) -> bool {
    !matches!(value, JsonValue::Array(_) | JsonValue::Object(_))
}

fn write_value(out: &mut String, value: &JsonValue, depth: usize) -> Result<()> {
    match value {
        JsonValue::Object(map) if !map.is_empty() => {
            out.push_str("{\n");
            for (i, (key, v)) in map.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                out.push_str(&INDENT.repeat(depth + 1));
                out.push_str(&serde_json::to_string(key)?);
                out.push_str(": ");
                write_value(out, v, depth + 1)?;
            }
            out.push('\n');
            out.push_str(&INDENT.repeat(depth));
            out.push('}');
        }
        JsonValue::Array(items) if items.iter().all(is_scalar) => {
            let parts = items
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<Vec<_>, _>>()?;
            out.push('[');
            out.push_str(&parts.join(", "));
            out.push(']');
        }
        JsonValue::Array(items) => {
            out.push_str("[\n");
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(",\n");
                }
                out.push_str(&INDENT.repeat(depth + 1));
                out.push_str(&serde_json::to_string(item)?);
            }
            out.push('\n');
            out.push_str(&INDENT.repeat(depth));
            out.push(']');
        }
        other => out.push_str(&serde_json::to_string(other)?),
    }
    Ok(())
}
