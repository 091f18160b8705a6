//! Property tests for the matching invariants.
//!
//! Arbitrary JSON values are generated with `proptest` and matched against
//! small fixed schemas whose outcome is known for every input.

use mschema::{compile, match_schema, MatchSchemaError, ValidationError, ValueKind, DEFAULT_NAME};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn arb_scalar() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        (-1.0e6f64..1.0e6).prop_map(|f| json!(f + 0.5)),
        "[a-z]{0,8}".prop_map(Value::String),
    ]
}

fn arb_value() -> impl Strategy<Value = Value> {
    arb_scalar().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect::<Map<String, Value>>())),
        ]
    })
}

proptest! {
    #[test]
    fn mapping_schema_accepts_exactly_mappings(value in arb_value()) {
        let result = match_schema(&value, "type: mapping", DEFAULT_NAME);
        if value.is_object() {
            prop_assert_eq!(result, Ok(()));
        } else {
            let is_type_mismatch = matches!(
                result,
                Err(MatchSchemaError::Validation(ValidationError::TypeMismatch { .. }))
            );
            prop_assert!(is_type_mismatch);
        }
    }

    #[test]
    fn text_items_reject_first_non_text_element(elements in prop::collection::vec(arb_scalar(), 0..8)) {
        let schema = compile("type: sequence\nitems:\n  type: text\n").unwrap();
        let data = Value::Array(elements.clone());
        let first_bad = elements.iter().find(|e| !e.is_string());

        match (schema.validate(&data, DEFAULT_NAME), first_bad) {
            (Ok(()), None) => {}
            (Err(ValidationError::TypeMismatch { actual, .. }), Some(bad)) => {
                prop_assert_eq!(actual, ValueKind::of(bad));
            }
            (other, bad) => prop_assert!(false, "unexpected {:?} for first bad element {:?}", other, bad),
        }
    }

    #[test]
    fn enumeration_accepts_members_only(member in 0i64..5, outsider in 5i64..1000) {
        let schema = compile("type: integer\nenumeration: [0, 1, 2, 3, 4]\n").unwrap();
        prop_assert!(schema.validate(&json!(member), DEFAULT_NAME).is_ok());
        let is_enumeration = matches!(
            schema.validate(&json!(outsider), DEFAULT_NAME),
            Err(ValidationError::Enumeration { .. })
        );
        prop_assert!(is_enumeration);
    }

    #[test]
    fn optional_property_may_be_absent(key in "[a-z]{1,6}", value in arb_scalar()) {
        let optional = compile("type: mapping\nproperties:\n  id:\n    type: any\n    required: false\n").unwrap();
        let required = compile("type: mapping\nproperties:\n  id:\n    type: any\n").unwrap();
        let mut map = Map::new();
        if key != "id" {
            map.insert(key, value);
        }
        let data = Value::Object(map);

        prop_assert!(optional.validate(&data, DEFAULT_NAME).is_ok());
        prop_assert_eq!(
            required.validate(&data, DEFAULT_NAME),
            Err(ValidationError::MissingProperty {
                name: DEFAULT_NAME.to_string(),
                property: "id".to_string(),
            })
        );
    }

    #[test]
    fn matching_is_deterministic(value in arb_value()) {
        let schema = "type: [sequence, text]\nitems:\n  type: integer\n  assertion: x > 0\n";
        let first = match_schema(&value, schema, "v");
        let second = match_schema(&value, schema, "v");
        prop_assert_eq!(first, second);
    }
}
