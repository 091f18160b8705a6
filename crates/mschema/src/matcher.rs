//! # Matcher
//!
//! Walks data and a compiled [`SchemaNode`] in lock-step and returns the
//! first violation. Checks run in a fixed order and the first failure wins:
//!
//! 1. type: the value must be an instance of one of the node's types;
//! 2. enumeration: if declared, the value must equal one of the literals;
//! 3. assertion: if declared, the predicate must hold;
//! 4. shape: mappings must contain every required declared property,
//!    sequences have every element matched against `items`.
//!
//! ## Modes
//!
//! [`MatchMode::Legacy`] (the default) checks only the presence of
//! required mapping properties; their values are not matched against the
//! declared property schemas, and sequence elements are reported under
//! the parent's name. [`MatchMode::Deep`] additionally matches every
//! present declared property value and qualifies nested names with keys
//! and indexes (`variable['users'][2]`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::path::{PathSegment, ValidationPath};
use crate::schema::SchemaNode;
use crate::value::{loose_eq, ValueKind};

/// How far the matcher descends into mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Presence-only checks for mapping properties.
    #[default]
    Legacy,
    /// Recursive matching of mapping property values, with path-qualified names.
    Deep,
}

/// Fail-fast matcher for one top-level call.
#[derive(Debug, Clone, Copy, Default)]
pub struct Matcher {
    mode: MatchMode,
}

impl Matcher {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// Match `data` against `node`, naming the root value `name`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn check(&self, data: &Value, node: &SchemaNode, name: &str) -> Result<(), ValidationError> {
        let mut path = ValidationPath::new();
        self.match_node(data, node, &mut path, name)
    }

    fn match_node(
        &self,
        data: &Value,
        node: &SchemaNode,
        path: &mut ValidationPath,
        name: &str,
    ) -> Result<(), ValidationError> {
        tracing::trace!(name = %path.qualify(name), "matching value");

        if !node.types().accepts(data) {
            return Err(ValidationError::TypeMismatch {
                name: path.qualify(name),
                actual: ValueKind::of(data),
                expected: node.types().names(),
            });
        }

        if let Some(allowed) = node.enumeration() {
            if !allowed.iter().any(|candidate| loose_eq(candidate, data)) {
                return Err(ValidationError::Enumeration {
                    name: path.qualify(name),
                    value: data.clone(),
                    allowed: allowed.to_vec(),
                });
            }
        }

        if let Some(predicate) = node.assertion() {
            if !predicate.test(data) {
                return Err(ValidationError::Assertion {
                    name: path.qualify(name),
                    value: data.clone(),
                    expression: predicate.expression().to_string(),
                });
            }
        }

        match data {
            Value::Object(map) => self.match_mapping(map, node, path, name),
            Value::Array(elements) => self.match_sequence(elements, node, path, name),
            _ => Ok(()),
        }
    }

    fn match_mapping(
        &self,
        map: &Map<String, Value>,
        node: &SchemaNode,
        path: &mut ValidationPath,
        name: &str,
    ) -> Result<(), ValidationError> {
        let Some(properties) = node.properties() else {
            return Ok(());
        };

        for (key, property) in properties {
            if property.required() && !map.contains_key(key) {
                return Err(ValidationError::MissingProperty {
                    name: path.qualify(name),
                    property: key.clone(),
                });
            }
        }

        if self.mode == MatchMode::Legacy {
            return Ok(());
        }

        for (key, property) in properties {
            if let Some(value) = map.get(key) {
                path.push(PathSegment::Key(key.clone()));
                let result = self.match_node(value, property.schema(), path, name);
                path.pop();
                result?;
            }
        }
        Ok(())
    }

    fn match_sequence(
        &self,
        elements: &[Value],
        node: &SchemaNode,
        path: &mut ValidationPath,
        name: &str,
    ) -> Result<(), ValidationError> {
        let Some(item_schema) = node.items() else {
            return Ok(());
        };

        for (index, element) in elements.iter().enumerate() {
            match self.mode {
                MatchMode::Legacy => self.match_node(element, item_schema, path, name)?,
                MatchMode::Deep => {
                    path.push(PathSegment::Index(index));
                    let result = self.match_node(element, item_schema, path, name);
                    path.pop();
                    result?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaCompiler;
    use serde_json::json;

    fn node(text: &str) -> SchemaNode {
        SchemaCompiler::new()
            .compile(text)
            .unwrap()
            .root()
            .cloned()
            .unwrap()
    }

    #[test]
    fn type_check_runs_before_enumeration_and_assertion() {
        let schema = node("type: integer\nenumeration: [1, 2]\nassertion: x > 5");
        let err = Matcher::default().check(&json!("a"), &schema, "v").unwrap_err();
        assert!(matches!(err, ValidationError::TypeMismatch { .. }));
    }

    #[test]
    fn enumeration_runs_before_assertion() {
        let schema = node("type: integer\nenumeration: [1, 2]\nassertion: x > 5");
        let err = Matcher::default().check(&json!(3), &schema, "v").unwrap_err();
        assert_eq!(
            err,
            ValidationError::Enumeration {
                name: "v".to_string(),
                value: json!(3),
                allowed: vec![json!(1), json!(2)],
            }
        );
        let err = Matcher::default().check(&json!(2), &schema, "v").unwrap_err();
        assert!(matches!(err, ValidationError::Assertion { .. }));
    }

    #[test]
    fn assertion_runs_before_shape() {
        let schema = node("type: mapping\nassertion: len(x) > 1\nproperties:\n  id:\n    type: integer\n");
        let err = Matcher::default().check(&json!({}), &schema, "v").unwrap_err();
        assert_eq!(
            err,
            ValidationError::Assertion {
                name: "v".to_string(),
                value: json!({}),
                expression: "len(x) > 1".to_string(),
            }
        );
    }

    #[test]
    fn missing_properties_reported_in_declaration_order() {
        let schema = node("type: mapping\nproperties:\n  b:\n    type: text\n  a:\n    type: text\n");
        let err = Matcher::default().check(&json!({}), &schema, "v").unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingProperty {
                name: "v".to_string(),
                property: "b".to_string(),
            }
        );
    }

    #[test]
    fn legacy_mode_ignores_property_values() {
        let schema = node("type: mapping\nproperties:\n  age:\n    type: integer\n");
        assert!(Matcher::new(MatchMode::Legacy)
            .check(&json!({"age": "old"}), &schema, "v")
            .is_ok());
    }

    #[test]
    fn deep_mode_matches_property_values_with_qualified_names() {
        let schema = node(
            "type: mapping\nproperties:\n  users:\n    type: sequence\n    items:\n      type: mapping\n      properties:\n        age:\n          type: integer\n          assertion: x >= 0\n",
        );
        let data = json!({"users": [{"age": 3}, {"age": -1}]});
        let err = Matcher::new(MatchMode::Deep).check(&data, &schema, "config").unwrap_err();
        assert_eq!(
            err,
            ValidationError::Assertion {
                name: "config['users'][1]['age']".to_string(),
                value: json!(-1),
                expression: "x >= 0".to_string(),
            }
        );
        assert!(Matcher::new(MatchMode::Legacy).check(&data, &schema, "config").is_ok());
    }

    #[test]
    fn deep_mode_skips_absent_optional_properties() {
        let schema = node("type: mapping\nproperties:\n  nick:\n    type: text\n    required: false\n");
        assert!(Matcher::new(MatchMode::Deep).check(&json!({}), &schema, "v").is_ok());
        let err = Matcher::new(MatchMode::Deep)
            .check(&json!({"nick": 7}), &schema, "v")
            .unwrap_err();
        assert_eq!(err.name(), "v['nick']");
    }

    #[test]
    fn legacy_sequence_elements_share_parent_name() {
        let schema = node("type: sequence\nitems:\n  type: text\n");
        let err = Matcher::default().check(&json!(["a", 1]), &schema, "tags").unwrap_err();
        assert_eq!(
            err,
            ValidationError::TypeMismatch {
                name: "tags".to_string(),
                actual: ValueKind::Integer,
                expected: vec!["text".to_string()],
            }
        );
    }

    #[test]
    fn scalars_pass_after_value_checks() {
        let schema = node("type: [text, null]\nproperties:\n  ignored:\n    type: text\n");
        assert!(Matcher::default().check(&json!("s"), &schema, "v").is_ok());
        assert!(Matcher::default().check(&json!(null), &schema, "v").is_ok());
    }
}
