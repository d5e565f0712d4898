//! Boolean condition expressions for IF nodes and conditional edges (§4.8).
//!
//! A condition is a small expression language over node-output references
//! (`#nodeId.output.field`), `global.`/`input.`/`system.` lookups, numeric
//! and boolean literals, and the operators `== != < <= > >= && || ! + - * /
//! %` with parenthesization. [`check_security`] must pass before a
//! condition is ever parsed or evaluated — it is the only defense against a
//! hostile template and must not be loosened without compensating controls.

use serde_json::Value;

use crate::context::ResolutionContext;
use crate::error::ExpressionError;

const FORBIDDEN_SUBSTRINGS: &[&str] = &["T(", "new ", ".class", "System.", ".exec(", ".forName(", "Runtime"];

/// Reject a condition text that doesn't match the §4.8 allow-list, or that
/// contains one of the forbidden substrings regardless of character class.
pub fn check_security(text: &str) -> Result<(), ExpressionError> {
    let allowed = |c: char| {
        c.is_ascii_alphanumeric()
            || matches!(c, '_' | '.' | ' ' | '\t' | '+' | '-' | '*' | '/' | '%' | '(' | ')' | '=' | '!' | '<' | '>' | '|' | '&' | '#')
    };
    if !text.chars().all(allowed) {
        return Err(ExpressionError::SecurityViolation {
            reason: "expression contains characters outside the allow-list".to_string(),
        });
    }
    for forbidden in FORBIDDEN_SUBSTRINGS {
        if text.contains(forbidden) {
            return Err(ExpressionError::SecurityViolation {
                reason: format!("expression contains forbidden token '{forbidden}'"),
            });
        }
    }
    Ok(())
}

/// Evaluate a condition to a boolean, per §4.8. Runs [`check_security`]
/// first; a `None`/missing reference resolves to JSON `null`, which is
/// falsy under `truthy()` but never an error — symmetric with the
/// templating resolver's "missing means null" stance.
pub fn evaluate(text: &str, ctx: &dyn ResolutionContext) -> Result<bool, ExpressionError> {
    check_security(text)?;
    let tokens = tokenize(text)?;
    let mut parser = Parser { tokens: &tokens, pos: 0 };
    let value = parser.parse_or(ctx)?;
    parser.expect_end()?;
    Ok(truthy(&value))
}

#[must_use]
fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Null => false,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Number(f64),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(text: &str) -> Result<Vec<Token>, ExpressionError> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '(' {
            tokens.push(Token::LParen);
            i += 1;
        } else if c == ')' {
            tokens.push(Token::RParen);
            i += 1;
        } else if c.is_ascii_digit() {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            let text: String = chars[start..i].iter().collect();
            let n = text.parse::<f64>().map_err(|_| ExpressionError::MalformedCondition {
                reason: format!("invalid number literal '{text}'"),
            })?;
            tokens.push(Token::Number(n));
        } else if c.is_ascii_alphabetic() || c == '_' || c == '#' {
            let start = i;
            i += 1;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || matches!(chars[i], '_' | '.' | '#')) {
                i += 1;
            }
            tokens.push(Token::Ident(chars[start..i].iter().collect()));
        } else {
            let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
            let op = match two.as_str() {
                "==" | "!=" | "<=" | ">=" | "&&" | "||" => {
                    i += 2;
                    two
                }
                _ => {
                    let one = c.to_string();
                    if "<>!+-*/%".contains(c) {
                        i += 1;
                        one
                    } else {
                        return Err(ExpressionError::MalformedCondition {
                            reason: format!("unexpected character '{c}'"),
                        });
                    }
                }
            };
            tokens.push(Token::Op(match op.as_str() {
                "==" => "==",
                "!=" => "!=",
                "<=" => "<=",
                ">=" => ">=",
                "&&" => "&&",
                "||" => "||",
                "<" => "<",
                ">" => ">",
                "!" => "!",
                "+" => "+",
                "-" => "-",
                "*" => "*",
                "/" => "/",
                "%" => "%",
                other => {
                    return Err(ExpressionError::MalformedCondition {
                        reason: format!("unexpected operator '{other}'"),
                    })
                }
            }));
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let t = self.tokens.get(self.pos);
        self.pos += 1;
        t
    }

    fn expect_end(&self) -> Result<(), ExpressionError> {
        if self.pos != self.tokens.len() {
            return Err(ExpressionError::MalformedCondition {
                reason: "trailing tokens after a complete expression".to_string(),
            });
        }
        Ok(())
    }

    fn parse_or(&mut self, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
        let mut left = self.parse_and(ctx)?;
        while matches!(self.peek(), Some(Token::Op("||"))) {
            self.advance();
            let right = self.parse_and(ctx)?;
            left = Value::Bool(truthy(&left) || truthy(&right));
        }
        Ok(left)
    }

    fn parse_and(&mut self, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
        let mut left = self.parse_equality(ctx)?;
        while matches!(self.peek(), Some(Token::Op("&&"))) {
            self.advance();
            let right = self.parse_equality(ctx)?;
            left = Value::Bool(truthy(&left) && truthy(&right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
        let left = self.parse_comparison(ctx)?;
        if let Some(Token::Op(op @ ("==" | "!="))) = self.peek().cloned() {
            self.advance();
            let right = self.parse_comparison(ctx)?;
            let eq = values_equal(&left, &right);
            return Ok(Value::Bool(if op == "==" { eq } else { !eq }));
        }
        Ok(left)
    }

    fn parse_comparison(&mut self, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
        let left = self.parse_additive(ctx)?;
        if let Some(Token::Op(op @ ("<" | "<=" | ">" | ">="))) = self.peek().cloned() {
            self.advance();
            let right = self.parse_additive(ctx)?;
            let (l, r) = (as_f64(&left)?, as_f64(&right)?);
            let result = match op {
                "<" => l < r,
                "<=" => l <= r,
                ">" => l > r,
                ">=" => l >= r,
                _ => unreachable!(),
            };
            return Ok(Value::Bool(result));
        }
        Ok(left)
    }

    fn parse_additive(&mut self, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
        let mut left = self.parse_multiplicative(ctx)?;
        loop {
            match self.peek() {
                Some(Token::Op(op @ ("+" | "-"))) => {
                    let op = *op;
                    self.advance();
                    let right = self.parse_multiplicative(ctx)?;
                    let (l, r) = (as_f64(&left)?, as_f64(&right)?);
                    left = Value::from(if op == "+" { l + r } else { l - r });
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
        let mut left = self.parse_unary(ctx)?;
        loop {
            match self.peek() {
                Some(Token::Op(op @ ("*" | "/" | "%"))) => {
                    let op = *op;
                    self.advance();
                    let right = self.parse_unary(ctx)?;
                    let (l, r) = (as_f64(&left)?, as_f64(&right)?);
                    left = Value::from(match op {
                        "*" => l * r,
                        "/" => l / r,
                        "%" => l % r,
                        _ => unreachable!(),
                    });
                }
                _ => break,
            }
        }
        Ok(left)
    }

    fn parse_unary(&mut self, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
        if matches!(self.peek(), Some(Token::Op("!"))) {
            self.advance();
            let value = self.parse_unary(ctx)?;
            return Ok(Value::Bool(!truthy(&value)));
        }
        if matches!(self.peek(), Some(Token::Op("-"))) {
            self.advance();
            let value = self.parse_unary(ctx)?;
            return Ok(Value::from(-as_f64(&value)?));
        }
        self.parse_primary(ctx)
    }

    fn parse_primary(&mut self, ctx: &dyn ResolutionContext) -> Result<Value, ExpressionError> {
        match self.advance().cloned() {
            Some(Token::Number(n)) => Ok(Value::from(n)),
            Some(Token::Ident(name)) => Ok(resolve_identifier(&name, ctx)),
            Some(Token::LParen) => {
                let value = self.parse_or(ctx)?;
                match self.advance() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err(ExpressionError::MalformedCondition {
                        reason: "unclosed '('".to_string(),
                    }),
                }
            }
            other => Err(ExpressionError::MalformedCondition {
                reason: format!("unexpected token {other:?}"),
            }),
        }
    }
}

fn resolve_identifier(name: &str, ctx: &dyn ResolutionContext) -> Value {
    match name {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Some(rest) = name.strip_prefix('#') {
        let (node_id, path) = match rest.split_once(".output.") {
            Some((node_id, path)) => (node_id, path),
            None => match rest.split_once('.') {
                Some((node_id, path)) => (node_id, path),
                None => (rest, ""),
            },
        };
        return match ctx.node_output(node_id) {
            Some(output) => crate::path::lookup(&output, path),
            None => Value::Null,
        };
    }
    if let Some(rest) = name.strip_prefix("global.") {
        return ctx.global(rest).unwrap_or(Value::Null);
    }
    if let Some(rest) = name.strip_prefix("input.") {
        return ctx.input(rest).unwrap_or(Value::Null);
    }
    if let Some(rest) = name.strip_prefix("system.") {
        return ctx.system(rest).unwrap_or(Value::Null);
    }
    Value::Null
}

fn as_f64(value: &Value) -> Result<f64, ExpressionError> {
    value.as_f64().ok_or_else(|| ExpressionError::MalformedCondition {
        reason: format!("expected a number, got {value}"),
    })
}

fn values_equal(a: &Value, b: &Value) -> bool {
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x == y;
    }
    a == b
}
