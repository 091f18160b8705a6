//! # Schema Compiler
//!
//! Turns YAML schema text into a [`CompiledSchema`]: a tree of immutable
//! [`SchemaNode`]s with resolved type sets and compiled assertions.
//!
//! ## Schema Fields
//!
//! | Field | Meaning |
//! |---|---|
//! | `type` (required) | a type token or an ordered list of tokens |
//! | `properties` | mapping of property name to nested schema |
//! | `items` | nested schema for every sequence element |
//! | `enumeration` | list of allowed literal values |
//! | `assertion` | expression compiled into a unary predicate |
//! | `required` | on a property schema: whether the key must be present (default `true`) |
//!
//! Unknown fields (`description`, `examples`, ...) are ignored.
//!
//! ## Compilation Order
//!
//! Each node is compiled in one recursive pass: children first (every
//! declared property, then `items`), then the node's own assertion, then
//! its type. No node is revisited or mutated after it is built.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{CompileError, ValidationError};
use crate::matcher::{MatchMode, Matcher};
use crate::predicate::{Predicate, PredicateRegistry};
use crate::types::{resolve_types, TypeDescriptor, TypeRegistry, TypeSet};
use crate::value::ValueKind;

/// Location string of the schema root in compile errors.
pub const ROOT_LOCATION: &str = "$";

/// A schema node as written, before compilation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSchema {
    #[serde(rename = "type")]
    pub types: TypeDescriptor,
    #[serde(default)]
    pub properties: Option<IndexMap<String, Option<RawSchema>>>,
    #[serde(default)]
    pub items: Option<Box<RawSchema>>,
    #[serde(default)]
    pub enumeration: Option<Vec<Value>>,
    #[serde(default)]
    pub assertion: Option<String>,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// A compiled schema node.
#[derive(Debug, Clone)]
pub struct SchemaNode {
    types: TypeSet,
    properties: Option<IndexMap<String, Property>>,
    items: Option<Box<SchemaNode>>,
    enumeration: Option<Vec<Value>>,
    assertion: Option<Predicate>,
}

impl SchemaNode {
    /// A node accepting every value with no further checks.
    pub fn any() -> Self {
        Self {
            types: TypeSet::any(),
            properties: None,
            items: None,
            enumeration: None,
            assertion: None,
        }
    }

    pub fn types(&self) -> &TypeSet {
        &self.types
    }

    /// Declared mapping properties, in declaration order.
    pub fn properties(&self) -> Option<&IndexMap<String, Property>> {
        self.properties.as_ref()
    }

    pub fn items(&self) -> Option<&SchemaNode> {
        self.items.as_deref()
    }

    pub fn enumeration(&self) -> Option<&[Value]> {
        self.enumeration.as_deref()
    }

    pub fn assertion(&self) -> Option<&Predicate> {
        self.assertion.as_ref()
    }
}

/// A declared mapping property.
#[derive(Debug, Clone)]
pub struct Property {
    schema: SchemaNode,
    required: bool,
}

impl Property {
    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }

    pub fn required(&self) -> bool {
        self.required
    }
}

/// The result of compiling schema text, ready for matching.
///
/// Empty schema text compiles to a schema without a root, which every
/// value matches. A `CompiledSchema` is `Send + Sync` and can be reused
/// across calls and threads.
#[derive(Debug, Clone)]
pub struct CompiledSchema {
    root: Option<SchemaNode>,
}

impl CompiledSchema {
    pub fn root(&self) -> Option<&SchemaNode> {
        self.root.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Match `data` in the default [`MatchMode::Legacy`] mode.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(&self, data: &Value, name: &str) -> Result<(), ValidationError> {
        self.validate_with(data, name, MatchMode::default())
    }

    /// Match `data` in the given mode.
    pub fn validate_with(&self, data: &Value, name: &str, mode: MatchMode) -> Result<(), ValidationError> {
        match &self.root {
            Some(root) => Matcher::new(mode).check(data, root, name),
            None => Ok(()),
        }
    }
}

/// Compiles schema text against a set of registered external types and
/// named predicates.
///
/// ```
/// use mschema::SchemaCompiler;
/// use serde_json::json;
///
/// let schema = SchemaCompiler::new()
///     .with_predicate("is_even", |v| v.as_i64().is_some_and(|n| n % 2 == 0))
///     .unwrap()
///     .compile("type: integer\nassertion: is_even")
///     .unwrap();
/// assert!(schema.validate(&json!(4), "count").is_ok());
/// assert!(schema.validate(&json!(3), "count").is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct SchemaCompiler {
    types: TypeRegistry,
    predicates: PredicateRegistry,
}

impl SchemaCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use existing registries.
    pub fn with_registries(types: TypeRegistry, predicates: PredicateRegistry) -> Self {
        Self { types, predicates }
    }

    /// Register an external type, builder style.
    pub fn with_type<F>(mut self, name: impl Into<String>, check: F) -> Result<Self, CompileError>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.types.register(name, check)?;
        Ok(self)
    }

    /// Register a named predicate, builder style.
    pub fn with_predicate<F>(mut self, name: impl Into<String>, predicate: F) -> Result<Self, CompileError>
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.predicates.register(name, predicate)?;
        Ok(self)
    }

    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeRegistry {
        &mut self.types
    }

    pub fn predicates(&self) -> &PredicateRegistry {
        &self.predicates
    }

    pub fn predicates_mut(&mut self) -> &mut PredicateRegistry {
        &mut self.predicates
    }

    /// Compile YAML schema text.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if the text is not YAML, does not have
    /// the schema shape, or contains an unknown type token, an unresolved
    /// external type, or an invalid assertion.
    pub fn compile(&self, text: &str) -> Result<CompiledSchema, CompileError> {
        let document: serde_yaml::Value = if text.trim().is_empty() {
            serde_yaml::Value::Null
        } else {
            serde_yaml::from_str(text).map_err(|e| CompileError::InvalidSchema {
                location: ROOT_LOCATION.to_string(),
                reason: format!("invalid YAML: {e}"),
            })?
        };

        let is_empty = match &document {
            serde_yaml::Value::Null => true,
            serde_yaml::Value::Mapping(map) => map.is_empty(),
            _ => false,
        };
        if is_empty {
            tracing::debug!("empty schema compiled to a schema without a root");
            return Ok(CompiledSchema { root: None });
        }

        let raw: RawSchema = serde_yaml::from_value(document).map_err(|e| CompileError::InvalidSchema {
            location: ROOT_LOCATION.to_string(),
            reason: e.to_string(),
        })?;
        self.compile_raw(&raw).map(|root| CompiledSchema { root: Some(root) })
    }

    /// Compile an already-deserialized schema tree.
    pub fn compile_raw(&self, raw: &RawSchema) -> Result<SchemaNode, CompileError> {
        let root = self.compile_node(raw, ROOT_LOCATION)?;
        tracing::debug!(types = ?root.types().names(), "compiled schema");
        Ok(root)
    }

    /// Children are compiled only under a type that can hold them:
    /// `properties` when the node admits mappings, `items` when it admits
    /// sequences. Other declared children are dropped unchecked.
    fn compile_node(&self, raw: &RawSchema, location: &str) -> Result<SchemaNode, CompileError> {
        let types = resolve_types(&raw.types, &self.types, location)?;

        let properties = match &raw.properties {
            Some(declared) if types.includes(ValueKind::Mapping) => {
                let mut compiled = IndexMap::with_capacity(declared.len());
                for (key, child) in declared {
                    let property = match child {
                        Some(child) => Property {
                            schema: self.compile_node(child, &format!("{location}.properties.{key}"))?,
                            required: child.required,
                        },
                        None => Property {
                            schema: SchemaNode::any(),
                            required: true,
                        },
                    };
                    compiled.insert(key.clone(), property);
                }
                Some(compiled)
            }
            _ => None,
        };

        let items = match &raw.items {
            Some(child) if types.includes(ValueKind::Sequence) => {
                Some(Box::new(self.compile_node(child, &format!("{location}.items"))?))
            }
            _ => None,
        };

        let assertion = match &raw.assertion {
            Some(expression) => Some(Predicate::compile(expression, &self.predicates).map_err(|e| {
                CompileError::InvalidAssertion {
                    location: location.to_string(),
                    expression: expression.clone(),
                    reason: e.to_string(),
                }
            })?),
            None => None,
        };

        tracing::trace!(location, types = ?types.names(), "compiled schema node");

        Ok(SchemaNode {
            types,
            properties,
            items,
            enumeration: raw.enumeration.clone(),
            assertion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;
    use serde_json::json;

    fn compile(text: &str) -> Result<CompiledSchema, CompileError> {
        SchemaCompiler::new().compile(text)
    }

    #[test]
    fn empty_text_has_no_root() {
        for text in ["", "   \n", "{}", "~", "null"] {
            let schema = compile(text).unwrap();
            assert!(schema.is_empty(), "{text:?} should compile to an empty schema");
            assert!(schema.validate(&json!([1, "x"]), "v").is_ok());
        }
    }

    #[test]
    fn compiles_nested_tree() {
        let schema = compile(
            r#"
type: [dict, list]
description: ignored
properties:
  name:
    type: str
  age:
    type: [int, float]
    required: false
    assertion: "lambda x: 10 < x < 30"
items:
  type: text
  enumeration: [a, b]
"#,
        )
        .unwrap();

        let root = schema.root().unwrap();
        assert_eq!(root.types().names(), vec!["mapping", "sequence"]);

        let properties = root.properties().unwrap();
        let keys: Vec<&str> = properties.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["name", "age"]);
        assert!(properties["name"].required());
        assert!(!properties["age"].required());
        assert_eq!(
            properties["age"].schema().assertion().unwrap().expression(),
            "lambda x: 10 < x < 30"
        );

        let items = root.items().unwrap();
        assert!(items.types().includes(ValueKind::Text));
        assert_eq!(items.enumeration().unwrap(), &[json!("a"), json!("b")]);
    }

    #[test]
    fn null_property_schema_is_required_any() {
        let schema = compile("type: mapping\nproperties:\n  anything:\n").unwrap();
        let property = &schema.root().unwrap().properties().unwrap()["anything"];
        assert!(property.required());
        assert!(property.schema().types().accepts(&json!([1])));
    }

    #[test]
    fn missing_type_is_invalid_schema() {
        let err = compile("items:\n  type: text\n").unwrap_err();
        assert!(matches!(err, CompileError::InvalidSchema { ref location, .. } if location == "$"));
    }

    #[test]
    fn malformed_yaml_is_invalid_schema() {
        let err = compile("type: [mapping").unwrap_err();
        assert!(matches!(err, CompileError::InvalidSchema { .. }));
    }

    #[test]
    fn nested_errors_carry_location() {
        let err = compile(
            "type: mapping\nproperties:\n  tags:\n    type: sequence\n    items:\n      type: tuple\n",
        )
        .unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownType {
                location: "$.properties.tags.items".to_string(),
                descriptor: "tuple".to_string(),
            }
        );
    }

    #[test]
    fn bad_assertion_is_compile_error() {
        let err = compile("type: integer\nassertion: 'import os'").unwrap_err();
        match err {
            CompileError::InvalidAssertion { location, expression, .. } => {
                assert_eq!(location, "$");
                assert_eq!(expression, "import os");
            }
            other => panic!("expected InvalidAssertion, got {other}"),
        }
    }

    #[test]
    fn children_compile_only_under_a_type_that_holds_them() {
        let schema = compile("type: integer\nproperties:\n  a:\n    type: pkg:Missing\n").unwrap();
        let root = schema.root().unwrap();
        assert!(root.properties().is_none());
        assert!(schema.validate(&json!(3), "n").is_ok());

        let schema = compile("type: text\nitems:\n  type: pkg:Missing\n").unwrap();
        assert!(schema.root().unwrap().items().is_none());
        assert!(schema.validate(&json!("abc"), "s").is_ok());

        // A mapping-only node keeps its properties but drops `items`.
        let schema = compile(
            "type: mapping\nproperties:\n  id:\n    type: integer\nitems:\n  type: pkg:Missing\n",
        )
        .unwrap();
        let root = schema.root().unwrap();
        assert!(root.properties().is_some());
        assert!(root.items().is_none());
    }

    #[test]
    fn children_under_matching_types_are_still_compiled() {
        let err = compile("type: [mapping, sequence]\nitems:\n  type: pkg:Missing\n").unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedType {
                location: "$.items".to_string(),
                reference: "pkg:Missing".to_string(),
            }
        );
        let err = compile("type: any\nproperties:\n  a:\n    type: tuple\n").unwrap_err();
        assert!(matches!(err, CompileError::UnknownType { .. }));
    }

    #[test]
    fn registered_type_resolves() {
        let compiler = SchemaCompiler::new()
            .with_type("app.models:UserId", |v| {
                v.as_str().is_some_and(|s| s.starts_with("user-"))
            })
            .unwrap();
        let schema = compiler.compile("type: app.models:UserId").unwrap();
        assert!(schema.validate(&json!("user-42"), "id").is_ok());
        assert!(schema.validate(&json!("42"), "id").is_err());
    }

    #[test]
    fn compiled_schema_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledSchema>();
        assert_send_sync::<SchemaCompiler>();
    }
}
