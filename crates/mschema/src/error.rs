//! # Error Types
//!
//! Two independent families:
//!
//! - [`ValidationError`]: the data does not fit the schema. Exactly one is
//!   produced per failed match (the first violation found) and returned
//!   unmodified to the caller.
//! - [`CompileError`]: the schema itself is unusable (bad YAML, unknown
//!   type token, unresolved external type, malformed assertion). These
//!   surface from compilation, before any data is matched.
//!
//! Display strings of [`ValidationError`] keep the legacy message shapes so
//! existing log scrapers continue to work.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::value::ValueKind;

/// The first violation found while matching data against a schema.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// The runtime type of the value is not in the accepted set.
    #[error("the type of {name} should be {}, but it was {actual}", render_list(.expected))]
    TypeMismatch {
        /// Path-qualified name of the value.
        name: String,
        /// Kind the value actually has.
        actual: ValueKind,
        /// Accepted type descriptors, in schema order.
        expected: Vec<String>,
    },

    /// The value is not one of the allowed literals.
    #[error("{name} = {value}, is not in the enumeration {}", render_values(.allowed))]
    Enumeration {
        /// Path-qualified name of the value.
        name: String,
        /// The rejected value.
        value: Value,
        /// Allowed literals, in schema order.
        allowed: Vec<Value>,
    },

    /// The assertion predicate evaluated falsy (or failed to evaluate).
    #[error("{name} = {value}, cannot pass the assertion {expression}")]
    Assertion {
        /// Path-qualified name of the value.
        name: String,
        /// The rejected value.
        value: Value,
        /// The assertion text as written in the schema.
        expression: String,
    },

    /// A required mapping key is absent.
    #[error("cannot find property {property} in {name}")]
    MissingProperty {
        /// Path-qualified name of the mapping.
        name: String,
        /// The missing key.
        property: String,
    },
}

impl ValidationError {
    /// Path-qualified name of the offending value.
    pub fn name(&self) -> &str {
        match self {
            ValidationError::TypeMismatch { name, .. }
            | ValidationError::Enumeration { name, .. }
            | ValidationError::Assertion { name, .. }
            | ValidationError::MissingProperty { name, .. } => name,
        }
    }
}

fn render_list(items: &[String]) -> String {
    format!("[{}]", items.join(", "))
}

fn render_values(values: &[Value]) -> String {
    let rendered: Vec<String> = values.iter().map(Value::to_string).collect();
    format!("[{}]", rendered.join(", "))
}

/// The schema could not be compiled.
///
/// `location` names the offending schema node, `$` being the root and
/// children written as `$.properties.<key>` and `$.items`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// The schema text is not valid YAML or does not have the schema shape.
    #[error("invalid schema at {location}: {reason}")]
    InvalidSchema {
        /// Schema node location.
        location: String,
        /// What was wrong.
        reason: String,
    },

    /// A type token is neither a primitive kind, `any`, nor a
    /// `module:Name` reference.
    #[error("unknown type '{descriptor}' at {location}")]
    UnknownType {
        /// Schema node location.
        location: String,
        /// The offending token.
        descriptor: String,
    },

    /// A `module:Name` reference is not present in the type registry.
    #[error("unresolved type reference '{reference}' at {location}")]
    UnresolvedType {
        /// Schema node location.
        location: String,
        /// The reference as written.
        reference: String,
    },

    /// The assertion expression could not be compiled.
    #[error("invalid assertion '{expression}' at {location}: {reason}")]
    InvalidAssertion {
        /// Schema node location.
        location: String,
        /// The assertion text as written.
        expression: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A type or predicate could not be added to a registry.
    #[error("cannot register '{name}': {reason}")]
    InvalidRegistration {
        /// The name that was rejected.
        name: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Error from the one-shot [`match_schema`](crate::match_schema) entry point.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MatchSchemaError {
    /// The schema text did not compile.
    #[error("schema compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// The data did not match the schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn type_mismatch_message() {
        let err = ValidationError::TypeMismatch {
            name: "variable".to_string(),
            actual: ValueKind::Sequence,
            expected: vec!["mapping".to_string(), "null".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "the type of variable should be [mapping, null], but it was sequence"
        );
    }

    #[test]
    fn enumeration_message_renders_json_values() {
        let err = ValidationError::Enumeration {
            name: "variable".to_string(),
            value: json!("purple"),
            allowed: vec![json!("red"), json!(3)],
        };
        assert_eq!(
            err.to_string(),
            r#"variable = "purple", is not in the enumeration ["red", 3]"#
        );
    }

    #[test]
    fn assertion_and_missing_property_messages() {
        let assertion = ValidationError::Assertion {
            name: "age".to_string(),
            value: json!(40),
            expression: "10 < x < 30".to_string(),
        };
        assert_eq!(assertion.to_string(), "age = 40, cannot pass the assertion 10 < x < 30");

        let missing = ValidationError::MissingProperty {
            name: "variable".to_string(),
            property: "ags".to_string(),
        };
        assert_eq!(missing.to_string(), "cannot find property ags in variable");
        assert_eq!(missing.name(), "variable");
    }

    #[test]
    fn validation_error_serializes_with_kind_tag() {
        let err = ValidationError::MissingProperty {
            name: "variable".to_string(),
            property: "id".to_string(),
        };
        let value = serde_json::to_value(&err).unwrap();
        assert_eq!(
            value,
            json!({"kind": "missing_property", "name": "variable", "property": "id"})
        );
    }

    #[test]
    fn match_error_wraps_both_families() {
        let compile: MatchSchemaError = CompileError::UnknownType {
            location: "$".to_string(),
            descriptor: "tuple".to_string(),
        }
        .into();
        assert!(compile.to_string().starts_with("schema compilation failed"));

        let validation: MatchSchemaError = ValidationError::MissingProperty {
            name: "v".to_string(),
            property: "p".to_string(),
        }
        .into();
        assert_eq!(validation.to_string(), "cannot find property p in v");
    }
}
