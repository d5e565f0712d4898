//! Recursive template resolution over strings, maps, and lists (§4.2, §9).
//!
//! Two entry points, as the design notes prescribe: [`resolve_to_string`]
//! renders mixed templates by stringifying each expression's result,
//! while [`resolve_value`] — used for whole-string `{{single}}` templates
//! and for recursing into maps/lists — returns the typed object.

use serde_json::Value;

use crate::context::ResolutionContext;
use crate::error::ExpressionError;
use crate::expr;
use crate::template::{self, Part};

/// Render a template string, substituting every `{{expr}}` with the
/// textual form of its resolved value (`null` becomes an empty string).
pub fn resolve_to_string(
    template: &str,
    ctx: &dyn ResolutionContext,
) -> Result<String, ExpressionError> {
    let parts = template::parse(template)?;
    let mut out = String::with_capacity(template.len());
    for part in parts {
        match part {
            Part::Static(text) => out.push_str(text),
            Part::Expression(raw) => {
                let value = expr::parse_and_resolve(raw, ctx);
                out.push_str(&stringify(&value));
            }
        }
    }
    Ok(out)
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Resolve a single string value: if the whole string (once trimmed) is
/// exactly one `{{expr}}`, return the raw resolved object preserving its
/// type; otherwise stringify as in [`resolve_to_string`].
pub fn resolve_string(template: &str, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
    if let Some(raw_expr) = template::as_single_expression(template) {
        return Ok(expr::parse_and_resolve(raw_expr, ctx));
    }
    resolve_to_string(template, ctx).map(Value::String)
}

/// Recursively resolve every string in `value` (maps and lists traversed
/// depth-first; non-string scalars pass through unchanged). This is what
/// the executor framework applies to a node's `config` before invoking its
/// body (§4.4 step 1).
pub fn resolve_value(value: &Value, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
    match value {
        Value::String(s) => resolve_string(s, ctx),
        Value::Array(items) => {
            let mut resolved = Vec::with_capacity(items.len());
            for item in items {
                resolved.push(resolve_value(item, ctx)?);
            }
            Ok(Value::Array(resolved))
        }
        Value::Object(map) => {
            let mut resolved = serde_json::Map::with_capacity(map.len());
            for (key, val) in map {
                resolved.insert(key.clone(), resolve_value(val, ctx)?);
            }
            Ok(Value::Object(resolved))
        }
        other => Ok(other.clone()),
    }
}
