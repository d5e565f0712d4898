//! Splits a template string into static text and `{{expr}}` holes.

use crate::error::ExpressionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part<'a> {
    Static(&'a str),
    /// The raw text between `{{` and `}}`, not yet trimmed.
    Expression(&'a str),
}

/// Parse a template into its static/expression parts, in order.
pub fn parse(template: &str) -> Result<Vec<Part<'_>>, ExpressionError> {
    let mut parts = Vec::new();
    let mut rest = template;
    let mut consumed = 0usize;

    loop {
        let Some(open) = rest.find("{{") else {
            if !rest.is_empty() {
                parts.push(Part::Static(rest));
            }
            break;
        };

        if open > 0 {
            parts.push(Part::Static(&rest[..open]));
        }

        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            return Err(ExpressionError::UnterminatedExpression {
                offset: consumed + open,
            });
        };

        let raw_expr = &after_open[..close];
        if raw_expr.trim().is_empty() {
            return Err(ExpressionError::EmptyExpression {
                offset: consumed + open,
            });
        }
        parts.push(Part::Expression(raw_expr));

        let advance = open + 2 + close + 2;
        consumed += advance;
        rest = &rest[advance..];
    }

    Ok(parts)
}

/// If `template`, once trimmed, is exactly one `{{expr}}` with nothing else
/// around it, return the trimmed expression text (§4.2's "whole-string"
/// rule: the caller should resolve to the raw typed object, not a string).
#[must_use]
pub fn as_single_expression(template: &str) -> Option<&str> {
    let trimmed = template.trim();
    let inner = trimmed.strip_prefix("{{")?.strip_suffix("}}")?;
    if inner.contains("{{") || inner.contains("}}") {
        return None;
    }
    Some(inner.trim())
}
