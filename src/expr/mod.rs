//! Embedded expression language for score formulas
//!
//! Score and rollup formulas are written in a subset of CEL: arithmetic,
//! comparison and logical operators, the ternary conditional, member and
//! index access, list and map literals, the `size`/`int`/`double`/`string`/
//! `bool` conversions, string predicates and the `has`, `all`, `exists`,
//! `exists_one`, `map` and `filter` macros.
//!
//! Arithmetic is strictly typed: `1 + 2.0` is an error, so callers convert
//! explicitly with `double(...)` or `int(...)`. Numbers read from artifact
//! JSON are always doubles.
//!
//! Evaluation is sandboxed. Expressions can only read the variables they
//! are given and cannot perform I/O.

mod eval;
mod lexer;
mod parser;
mod value;

pub use value::Value;

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("undeclared reference to '{0}'")]
    UnknownIdentifier(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("no such key: {0}")]
    NoSuchKey(String),

    #[error("index {index} out of range for list of size {size}")]
    IndexOutOfRange { index: i64, size: usize },

    #[error("found no matching overload for '{function}' applied to ({args})")]
    NoOverload { function: String, args: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("modulus by zero")]
    ModulusByZero,

    #[error("integer overflow in '{0}'")]
    Overflow(String),

    #[error("invalid regular expression {pattern:?}: {message}")]
    InvalidRegex { pattern: String, message: String },

    #[error("{0}")]
    Invalid(String),
}

impl ExprError {
    pub(crate) fn syntax(offset: usize, message: impl Into<String>) -> Self {
        ExprError::Syntax {
            offset,
            message: message.into(),
        }
    }
}

/// Evaluates an expression string against named variables
pub trait ExpressionEngine: Send + Sync {
    fn evaluate(&self, expression: &str, env: &BTreeMap<String, Value>) -> Result<Value, ExprError>;

    /// Checks that `expression` parses without evaluating it
    fn check(&self, expression: &str) -> Result<(), ExprError>;
}

/// The built-in CEL-subset interpreter
#[derive(Debug, Clone, Copy, Default)]
pub struct CelEngine;

impl CelEngine {
    pub fn new() -> Self {
        Self
    }
}

impl ExpressionEngine for CelEngine {
    fn evaluate(&self, expression: &str, env: &BTreeMap<String, Value>) -> Result<Value, ExprError> {
        let ast = parser::parse(expression)?;
        eval::Interpreter::new(env).eval(&ast)
    }

    fn check(&self, expression: &str) -> Result<(), ExprError> {
        parser::parse(expression).map(|_| ())
    }
}

/// Builds an environment from the top-level fields of a JSON object
///
/// Non-object JSON produces an empty environment.
pub fn env_from_json(json: serde_json::Value) -> BTreeMap<String, Value> {
    match Value::from(json) {
        Value::Map(map) => map,
        _ => BTreeMap::new(),
    }
}
