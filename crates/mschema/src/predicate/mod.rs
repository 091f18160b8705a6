//! # Predicate Compiler
//!
//! Compiles the `assertion` text of a schema node into a [`Predicate`]: a
//! reusable unary boolean test over a candidate value.
//!
//! Assertions are data, not code. They are written in a small closed
//! expression language (comparisons, arithmetic, boolean combinators,
//! membership, indexing and a fixed set of builtins) that is parsed once
//! at compile time and interpreted against each candidate value. Logic
//! that cannot be expressed in the language is supplied by the embedding
//! application through a [`PredicateRegistry`] and called by name.
//!
//! ## Accepted Forms
//!
//! ```text
//! lambda x: 10 < x < 30       legacy header
//! n => n % 2 == 0             arrow header
//! len(x) > 0 and x[0] != ''   implicit parameter `x`
//! is_even                     bare function name, applied to the value
//! ```

mod ast;
mod eval;
mod lexer;
mod parser;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;

use crate::error::CompileError;
use crate::value::truthy;

pub use parser::{IMPLICIT_PARAM, MAX_DEPTH};

/// A named predicate supplied by the embedding application.
pub type PredicateFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Failure to parse or evaluate an assertion expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("function '{name}' expects {expected} argument(s), found {found}")]
    Arity {
        name: String,
        expected: &'static str,
        found: usize,
    },

    #[error("invalid pattern: {0}")]
    Pattern(String),

    #[error("expression is nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("type error: {0}")]
    Type(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("key '{0}' not found")]
    MissingKey(String),
}

/// Named predicates callable from assertions.
///
/// Names must be plain identifiers and may not reuse a builtin function
/// or a keyword of the expression language.
#[derive(Clone, Default)]
pub struct PredicateRegistry {
    predicates: HashMap<String, PredicateFn>,
}

impl PredicateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a unary predicate under `name`.
    ///
    /// # Errors
    ///
    /// Returns `CompileError::InvalidRegistration` if `name` is not an
    /// identifier, is a keyword, or collides with a builtin.
    pub fn register<F>(&mut self, name: impl Into<String>, predicate: F) -> Result<(), CompileError>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let name = name.into();
        let reason = if !is_identifier(&name) {
            Some("predicate names must be identifiers")
        } else if parser::is_keyword(&name) {
            Some("predicate names must not be keywords")
        } else if ast::Builtin::lookup(&name).is_some() || name == ast::MATCHES {
            Some("predicate names must not shadow builtin functions")
        } else {
            None
        };
        if let Some(reason) = reason {
            return Err(CompileError::InvalidRegistration {
                name,
                reason: reason.to_string(),
            });
        }
        tracing::debug!(%name, "registered predicate");
        self.predicates.insert(name, Arc::new(predicate));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PredicateFn> {
        self.predicates.get(name)
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.predicates.keys().map(String::as_str).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("predicates", &self.names())
            .finish()
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// A compiled assertion and the text it was compiled from.
#[derive(Clone)]
pub struct Predicate {
    expression: String,
    body: ast::Expr,
}

impl Predicate {
    /// Compile an assertion expression.
    ///
    /// # Errors
    ///
    /// Returns an [`ExpressionError`] for syntax errors, unknown names or
    /// functions, wrong arity, invalid `matches()` patterns, or nesting
    /// deeper than [`MAX_DEPTH`].
    pub fn compile(expression: &str, registry: &PredicateRegistry) -> Result<Self, ExpressionError> {
        let body = parser::parse_assertion(expression, registry)?;
        Ok(Self {
            expression: expression.to_string(),
            body,
        })
    }

    /// The assertion text as written in the schema.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Evaluate the expression body against `value`.
    pub fn evaluate(&self, value: &Value) -> Result<Value, ExpressionError> {
        eval::evaluate(&self.body, value)
    }

    /// Whether `value` passes. Evaluation errors count as a failure.
    pub fn test(&self, value: &Value) -> bool {
        match self.evaluate(value) {
            Ok(result) => truthy(&result),
            Err(e) => {
                tracing::debug!(
                    expression = %self.expression,
                    error = %e,
                    "assertion evaluation failed"
                );
                false
            }
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}
