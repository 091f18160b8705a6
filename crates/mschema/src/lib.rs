//! # mschema: Declarative Shape Schemas
//!
//! Validates an in-memory data value (nested mappings, sequences and
//! scalars) against a schema written in YAML: accepted types,
//! enumerations, assertion expressions, required/optional mapping keys
//! and element schemas for sequences.
//!
//! ## Pipeline
//!
//! ```text
//! schema text ─► SchemaCompiler ─► CompiledSchema ─► validate(data, name) ─► Result<(), ValidationError>
//!                 │  types::resolve_types      (type tokens → TypeSet)
//!                 └─ predicate::Predicate      (assertion text → compiled expression)
//! ```
//!
//! - [`match_schema`] compiles and matches in one call, recompiling every
//!   time.
//! - [`compile`] / [`SchemaCompiler::compile`] followed by
//!   [`CompiledSchema::validate`] lets callers keep compiled schemas.
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//!
//! let schema = r#"
//! type: mapping
//! properties:
//!   name:
//!     type: text
//!   age:
//!     type: [integer, float]
//!     assertion: "lambda x: 10 < x < 30"
//! "#;
//!
//! let err = mschema::match_schema(&json!({"name": "qiqi"}), schema, mschema::DEFAULT_NAME)
//!     .unwrap_err();
//! assert_eq!(err.to_string(), "cannot find property age in variable");
//! ```
//!
//! ## Crate Policy
//!
//! - Matching is fail-fast: exactly one error, the first in check order.
//! - Schema problems are [`CompileError`]s and never masquerade as
//!   validation errors.
//! - Assertions never execute arbitrary code; external types and named
//!   predicates come from registries supplied by the caller.
//! - The library does not print. It emits `tracing` events only.

pub mod error;
pub mod matcher;
pub mod path;
pub mod predicate;
pub mod schema;
pub mod types;
pub mod value;

use serde_json::Value;

pub use error::{CompileError, MatchSchemaError, ValidationError};
pub use matcher::{MatchMode, Matcher};
pub use path::{PathSegment, ValidationPath};
pub use predicate::{ExpressionError, Predicate, PredicateFn, PredicateRegistry};
pub use schema::{CompiledSchema, Property, RawSchema, SchemaCompiler, SchemaNode};
pub use types::{TypeCheck, TypeDescriptor, TypeHandle, TypeRegistry, TypeSet};
pub use value::ValueKind;

/// Root name used in diagnostics when the caller does not supply one.
pub const DEFAULT_NAME: &str = "variable";

/// Compile schema text with empty type and predicate registries.
///
/// # Errors
///
/// See [`SchemaCompiler::compile`].
pub fn compile(schema_text: &str) -> Result<CompiledSchema, CompileError> {
    SchemaCompiler::new().compile(schema_text)
}

/// Compile `schema_text` and match `data` against it.
///
/// # Errors
///
/// Returns `MatchSchemaError::Compile` if the schema does not compile and
/// `MatchSchemaError::Validation` with the first violation otherwise.
pub fn match_schema(data: &Value, schema_text: &str, name: &str) -> Result<(), MatchSchemaError> {
    let schema = compile(schema_text)?;
    schema.validate(data, name)?;
    Ok(())
}
