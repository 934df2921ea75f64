//! Restricted condition language for scenario `CommandStep`s.
//!
//! Deliberately not a general-purpose expression evaluator: the grammar is
//! `device.<attr> <op> <literal>` with `op` one of `==`/`!=` and `literal`
//! a quoted string, `true`/`false`, or a number. Anything outside this
//! grammar is rejected at parse time; a condition that fails to parse or
//! to evaluate is treated as permissive (the step runs) rather than fatal,
//! since a scenario should not wedge on a stray typo in a rarely-hit
//! branch. Runtime evaluation errors (an unknown device) are the opposite:
//! they make the condition false, so the step is skipped rather than run
//! against a best guess.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operators the grammar supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Eq,
    Ne,
}

/// A literal value a condition compares an attribute against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Bool(bool),
    Int(i64),
    Float(f64),
}

impl Literal {
    fn matches(&self, value: &Value) -> bool {
        match (self, value) {
            (Literal::String(s), Value::String(v)) => s == v,
            (Literal::Bool(b), Value::Bool(v)) => b == v,
            (Literal::Int(i), Value::Number(n)) => n.as_i64() == Some(*i) || n.as_f64() == Some(*i as f64),
            (Literal::Float(f), Value::Number(n)) => n.as_f64() == Some(*f),
            _ => false,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) => write!(f, "{s:?}"),
            Literal::Bool(b) => write!(f, "{b}"),
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Float(v) => write!(f, "{v}"),
        }
    }
}

/// A parsed `device.<attr> <op> <literal>` condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub device_id: String,
    pub attr: String,
    pub op: Op,
    pub literal: Literal,
}

/// Errors encountered while parsing condition text. These are never fatal
/// to a scenario: a condition that fails to parse is treated as always
/// true by [`crate::condition::parse_permissive`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("condition {0:?} is not in the form `device.attr op literal`")]
    Malformed(String),
    #[error("condition {0:?} does not reference a device attribute (expected `id.attr`)")]
    NotAttributePath(String),
    #[error("{0:?} is not a recognised operator (expected == or !=)")]
    UnknownOperator(String),
    #[error("{0:?} is not a recognised literal")]
    UnknownLiteral(String),
}

/// Parse a condition string, strictly.
///
/// # Errors
///
/// Returns [`ParseError`] if `text` does not match the grammar.
pub fn parse(text: &str) -> Result<Condition, ParseError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let [path, op, literal] = tokens.as_slice() else {
        return Err(ParseError::Malformed(text.to_string()));
    };
    let (device_id, attr) = path
        .split_once('.')
        .ok_or_else(|| ParseError::NotAttributePath((*path).to_string()))?;
    if device_id.is_empty() || attr.is_empty() {
        return Err(ParseError::NotAttributePath((*path).to_string()));
    }
    let op = match *op {
        "==" => Op::Eq,
        "!=" => Op::Ne,
        other => return Err(ParseError::UnknownOperator(other.to_string())),
    };
    let literal = parse_literal(literal)?;
    Ok(Condition {
        device_id: device_id.to_string(),
        attr: attr.to_string(),
        op,
        literal,
    })
}

fn parse_literal(raw: &str) -> Result<Literal, ParseError> {
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return Ok(Literal::String(raw[1..raw.len() - 1].to_string()));
    }
    match raw {
        "true" => return Ok(Literal::Bool(true)),
        "false" => return Ok(Literal::Bool(false)),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Ok(Literal::Int(i));
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Ok(Literal::Float(f));
    }
    Err(ParseError::UnknownLiteral(raw.to_string()))
}

/// Evaluate a parsed condition against an attribute lookup function.
///
/// Returns `false`, not an error, when `lookup` cannot resolve the
/// attribute — a condition referencing a device that went away mid-scenario
/// should skip the step, not crash it.
pub fn evaluate(condition: &Condition, lookup: impl FnOnce(&str, &str) -> Option<Value>) -> bool {
    let Some(actual) = lookup(&condition.device_id, &condition.attr) else {
        return false;
    };
    let is_equal = condition.literal.matches(&actual);
    match condition.op {
        Op::Eq => is_equal,
        Op::Ne => !is_equal,
    }
}

/// Parse `text`, returning `true` (permissive) rather than an error when the
/// text is not well-formed. Used wherever a malformed condition must not
/// block a scenario transition.
#[must_use]
pub fn is_permissively_true(text: &str, lookup: impl FnOnce(&str, &str) -> Option<Value>) -> bool {
    match parse(text) {
        Ok(condition) => evaluate(&condition, lookup),
        Err(_) => true,
    }
}
