//! Expression resolution errors.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("unterminated '{{{{' starting at offset {offset}")]
    UnterminatedExpression { offset: usize },

    #[error("empty expression '{{{{}}}}' at offset {offset}")]
    EmptyExpression { offset: usize },

    /// A condition expression failed the §4.8 allow-list filter.
    #[error("condition expression rejected by security filter: {reason}")]
    SecurityViolation { reason: String },

    /// A condition expression passed the security filter but doesn't parse
    /// or evaluate as a well-formed boolean expression.
    #[error("malformed condition expression: {reason}")]
    MalformedCondition { reason: String },
}
