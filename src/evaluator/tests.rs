// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::draft::Draft;
use crate::output::ErrorRecord;
use crate::validator::{ValidationOptions, Validator, DEFAULT_MAX_DEPTH};
use serde_json::{json, Value};

fn validator(schema: Value) -> Validator {
    Validator::new(&schema).unwrap()
}

fn errors(schema: Value, instance: Value) -> Vec<ErrorRecord> {
    validator(schema).evaluate(&instance).into_errors()
}

fn messages(schema: Value, instance: Value) -> Vec<String> {
    errors(schema, instance)
        .into_iter()
        .map(|e| e.message)
        .collect()
}

#[test]
fn test_type_messages() {
    assert_eq!(
        messages(json!({"type": "integer"}), json!("abc")),
        [r#""abc" is not of type "integer""#]
    );
    assert_eq!(
        messages(json!({"type": ["string", "null"]}), json!(1)),
        [r#"1 is not of types "string", "null""#]
    );
}

#[test]
fn test_assertion_messages() {
    let cases = [
        (json!({"minimum": 5}), json!(3), "3 is less than the minimum of 5"),
        (
            json!({"exclusiveMaximum": 5}),
            json!(5),
            "5 is greater than or equal to the maximum of 5",
        ),
        (json!({"multipleOf": 2}), json!(7), "7 is not a multiple of 2"),
        (json!({"maxLength": 2}), json!("abc"), r#""abc" is longer than 2 characters"#),
        (json!({"minLength": 1}), json!(""), r#""" is shorter than 1 character"#),
        (json!({"pattern": "^a"}), json!("b"), r#""b" does not match "^a""#),
        (json!({"minItems": 2}), json!([1]), "[1] has less than 2 items"),
        (json!({"uniqueItems": true}), json!([1, 1.0]), "[1,1.0] has non-unique elements"),
        (json!({"enum": [1, "a"]}), json!(2), r#"2 is not one of [1, "a"]"#),
        (json!({"const": {"a": 1}}), json!({}), r#"{"a":1} was expected"#),
        (json!({"maxProperties": 1}), json!({"a": 1, "b": 2}), r#"{"a":1,"b":2} has more than 1 property"#),
        (json!(false), json!(1), "False schema does not allow 1"),
    ];
    for (schema, instance, expected) in cases {
        assert_eq!(messages(schema, instance), [expected]);
    }
}

#[test]
fn test_required_reports_each_missing_property() {
    let errors = errors(json!({"required": ["a", "b", "c"]}), json!({"b": 1}));
    let messages: Vec<_> = errors.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(
        messages,
        [r#""a" is a required property"#, r#""c" is a required property"#]
    );
    assert!(errors.iter().all(|e| e.keyword_location.as_str() == "/required"));
    assert!(errors.iter().all(|e| e.keyword == "required"));
}

#[test]
fn test_locations() {
    let schema = json!({
        "properties": {
            "items": {"type": "array", "items": {"type": "integer"}}
        }
    });
    let errors = errors(schema, json!({"items": [1, "x", 3]}));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_location.as_str(), "/items/1");
    assert_eq!(
        errors[0].keyword_location.as_str(),
        "/properties/items/items/type"
    );
    assert_eq!(errors[0].absolute_keyword_location, None);
}

#[test]
fn test_absolute_location_follows_references() {
    let schema = json!({
        "$id": "http://example.com/root.json",
        "properties": {"a": {"$ref": "#/$defs/positive"}},
        "$defs": {"positive": {"minimum": 0}}
    });
    let errors = errors(schema, json!({"a": -1}));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword_location.as_str(), "/properties/a/$ref/minimum");
    assert_eq!(
        errors[0].absolute_keyword_location.as_deref(),
        Some("http://example.com/root.json#/$defs/positive/minimum")
    );
}

#[test]
fn test_additional_properties_message() {
    let schema = json!({"properties": {"a": true}, "patternProperties": {"^x-": true}, "additionalProperties": false});
    assert_eq!(
        messages(schema.clone(), json!({"a": 1, "x-1": 2, "b": 3})),
        ["Additional properties are not allowed ('b' was unexpected)"]
    );
    assert_eq!(
        messages(schema, json!({"b": 1, "c": 2})),
        ["Additional properties are not allowed ('b', 'c' were unexpected)"]
    );
}

#[test]
fn test_any_of_keeps_branch_errors_only_on_failure() {
    let schema = json!({"anyOf": [{"type": "string"}, {"minimum": 10}]});
    assert!(errors(schema.clone(), json!(20)).is_empty());
    let errors = errors(schema, json!(1));
    let locations: Vec<_> = errors.iter().map(|e| e.keyword_location.as_str()).collect();
    assert_eq!(locations, ["/anyOf/0/type", "/anyOf/1/minimum"]);
}

#[test]
fn test_one_of() {
    let schema = json!({"oneOf": [{"type": "integer"}, {"minimum": 2}]});
    let v = validator(schema);
    assert!(v.is_valid(&json!(1)));
    assert!(v.is_valid(&json!(2.5)));
    assert!(!v.is_valid(&json!(3)));
    let errors = v.evaluate(&json!(3)).into_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "3 is valid under more than one of the schemas listed in the 'oneOf' keyword"
    );
    assert_eq!(errors[0].keyword_location.as_str(), "/oneOf");
}

#[test]
fn test_not_and_contains() {
    assert_eq!(
        messages(json!({"not": {"type": "string"}}), json!("a")),
        [r#""a" should not be valid under the given schema"#]
    );
    let schema = json!({"contains": {"type": "string"}});
    assert_eq!(
        messages(schema.clone(), json!([1, 2])),
        ["None of [1,2] are valid under the given schema"]
    );
    assert!(messages(schema, json!([1, "a"])).is_empty());
    let bounded = json!({"contains": {"type": "string"}, "minContains": 2, "maxContains": 3});
    let v = validator(bounded);
    assert!(!v.is_valid(&json!(["a", 1])));
    assert!(v.is_valid(&json!(["a", "b"])));
    assert!(!v.is_valid(&json!(["a", "b", "c", "d"])));
}

#[test]
fn test_if_then_else_locations() {
    let schema = json!({
        "if": {"type": "integer"},
        "then": {"minimum": 0},
        "else": {"type": "string"}
    });
    let v = validator(schema);
    assert!(v.is_valid(&json!(1)));
    assert!(v.is_valid(&json!("a")));
    let errors = v.evaluate(&json!(-1)).into_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].keyword_location.as_str(), "/then/minimum");
    let errors = v.evaluate(&json!(null)).into_errors();
    assert_eq!(errors[0].keyword_location.as_str(), "/else/type");
}

#[test]
fn test_property_names_errors_point_at_object() {
    let schema = json!({"propertyNames": {"maxLength": 3}});
    let errors = errors(schema, json!({"ok": 1, "too long": 2}));
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_location.as_str(), "");
    assert_eq!(errors[0].keyword_location.as_str(), "/propertyNames/maxLength");
    assert_eq!(errors[0].message, r#""too long" is longer than 3 characters"#);
}

#[test]
fn test_unevaluated_properties_sees_nested_applicators() {
    let schema = json!({
        "type": "object",
        "properties": {"a": true},
        "allOf": [{"properties": {"b": true}}],
        "if": {"properties": {"kind": {"const": "c"}}, "required": ["kind"]},
        "then": {"properties": {"c": true}},
        "unevaluatedProperties": false
    });
    let v = validator(schema);
    assert!(v.is_valid(&json!({"a": 1, "b": 2})));
    assert!(v.is_valid(&json!({"kind": "c", "c": 3})));
    assert!(!v.is_valid(&json!({"kind": "d", "c": 3})));
    assert_eq!(
        v.evaluate(&json!({"a": 1, "z": 2})).into_errors()[0].message,
        "Unevaluated properties are not allowed ('z' was unexpected)"
    );
}

#[test]
fn test_unevaluated_properties_ignores_failed_branches() {
    let schema = json!({
        "anyOf": [
            {"properties": {"a": {"type": "string"}}},
            {"properties": {"b": true}}
        ],
        "unevaluatedProperties": false
    });
    let v = validator(schema);
    assert!(v.is_valid(&json!({"a": "x", "b": 1})));
    // The first branch fails, so `a` is not evaluated by it.
    assert!(!v.is_valid(&json!({"a": 1, "b": 1})));
}

#[test]
fn test_unevaluated_items() {
    let schema = json!({
        "prefixItems": [{"type": "integer"}],
        "allOf": [{"prefixItems": [true, {"type": "string"}]}],
        "contains": {"type": "boolean"},
        "unevaluatedItems": false
    });
    let v = validator(schema);
    assert!(v.is_valid(&json!([1, "a", true])));
    assert!(!v.is_valid(&json!([1, "a", null, true])));
    assert_eq!(
        v.evaluate(&json!([1, "a", null, true])).into_errors()[0].message,
        "Unevaluated items are not allowed (null was unexpected)"
    );
}

#[test]
fn test_dynamic_ref_uses_outermost_anchor() {
    let schema = json!({
        "$id": "https://example.com/strict-tree",
        "$dynamicAnchor": "node",
        "$ref": "tree",
        "unevaluatedProperties": false,
        "$defs": {
            "tree": {
                "$id": "tree",
                "$dynamicAnchor": "node",
                "type": "object",
                "properties": {
                    "data": true,
                    "children": {"type": "array", "items": {"$dynamicRef": "#node"}}
                }
            }
        }
    });
    let v = validator(schema);
    assert!(v.is_valid(&json!({"children": [{"data": 1}]})));
    assert!(!v.is_valid(&json!({"children": [{"daat": 1}]})));
}

#[test]
fn test_recursive_ref() {
    let schema = json!({
        "$schema": "https://json-schema.org/draft/2019-09/schema",
        "$id": "http://example.com/extended",
        "$recursiveAnchor": true,
        "$ref": "tree",
        "properties": {"meta": {"type": "string"}},
        "unevaluatedProperties": false,
        "$defs": {
            "tree": {
                "$id": "tree",
                "$recursiveAnchor": true,
                "type": "object",
                "properties": {
                    "children": {"type": "array", "items": {"$recursiveRef": "#"}}
                }
            }
        }
    });
    let v = validator(schema);
    assert_eq!(v.draft(), Draft::Draft201909);
    assert!(v.is_valid(&json!({"meta": "a", "children": [{"meta": "b"}]})));
    assert!(!v.is_valid(&json!({"children": [{"meta": 1}]})));
    assert!(!v.is_valid(&json!({"children": [{"other": 1}]})));
}

#[test]
fn test_recursive_schema_against_nested_instance() {
    let schema = json!({
        "type": "object",
        "properties": {"next": {"$ref": "#"}, "value": {"type": "integer"}},
        "required": ["value"]
    });
    let v = validator(schema);
    let mut instance = json!({"value": 0});
    for i in 1..30 {
        instance = json!({"value": i, "next": instance});
    }
    assert!(v.is_valid(&instance));
    instance["next"]["next"]["value"] = json!("x");
    let errors = v.evaluate(&instance).into_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_location.as_str(), "/next/next/value");
}

#[test]
fn test_depth_guard() {
    let schema = json!({"properties": {"next": {"$ref": "#"}}});
    let mut options = ValidationOptions::default();
    options.set_max_depth(8);
    let v = options.build(&schema).unwrap();
    let mut instance = json!({});
    for _ in 0..3 {
        instance = json!({"next": instance});
    }
    assert!(v.is_valid(&instance));
    for _ in 0..10 {
        instance = json!({"next": instance});
    }
    assert!(!v.is_valid(&instance));
    let errors = v.evaluate(&instance).into_errors();
    assert!(errors[0].message.starts_with("Maximum evaluation depth of 8"));
}

#[test]
fn test_default_depth_guard_fires_before_the_stack_runs_out() {
    let v = validator(json!({"type": "object", "properties": {"c": {"$ref": "#"}}}));

    // Two schema objects per level: the root and `properties/c`.
    let mut instance = json!({});
    for _ in 0..(DEFAULT_MAX_DEPTH / 2 - 2) {
        instance = json!({"c": instance});
    }
    assert!(v.is_valid(&instance));
    assert!(v.evaluate(&instance).is_valid());

    for _ in 0..1000 {
        instance = json!({"c": instance});
    }
    assert!(!v.is_valid(&instance));
    let errors = v.evaluate(&instance).into_errors();
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        format!("Maximum evaluation depth of {DEFAULT_MAX_DEPTH} exceeded")
    );
}

#[test]
fn test_default_depth_guard_through_combinators() {
    let v = validator(json!({
        "anyOf": [
            {"type": "null"},
            {"allOf": [{"properties": {"c": {"$ref": "#"}}}], "required": ["c"]}
        ]
    }));
    let mut instance = json!(null);
    for _ in 0..1000 {
        instance = json!({"c": instance});
    }
    assert!(!v.is_valid(&instance));
    assert!(!v.evaluate(&instance).is_valid());
}

#[test]
fn test_short_circuit_agrees_with_exhaustive() {
    let schema = json!({
        "type": "object",
        "properties": {"a": {"type": "integer"}},
        "anyOf": [{"required": ["a"]}, {"properties": {"b": true}}],
        "unevaluatedProperties": false
    });
    let v = validator(schema);
    for instance in [
        json!({"a": 1}),
        json!({"b": 1}),
        json!({"a": "x"}),
        json!({"c": 1}),
        json!({"a": 1, "b": 2}),
        json!([]),
    ] {
        assert_eq!(
            v.is_valid(&instance),
            v.evaluate(&instance).is_valid(),
            "{instance}"
        );
    }
}

#[test]
fn test_annotations_dropped_for_failing_schemas() {
    let schema = json!({
        "anyOf": [
            {"title": "string branch", "type": "string"},
            {"title": "number branch", "type": "number"}
        ]
    });
    let evaluation = validator(schema).evaluate(&json!(1));
    let titles: Vec<_> = evaluation
        .iter_annotations()
        .filter(|a| a.keyword == "title")
        .map(|a| a.value.clone())
        .collect();
    assert_eq!(titles, [json!("number branch")]);
}

#[test]
fn test_format_assertion_by_draft() {
    let schema = json!({"format": "ipv4"});
    assert!(validator(schema.clone()).is_valid(&json!("not an address")));

    let mut options = ValidationOptions::default();
    options.set_draft(Draft::Draft7);
    assert!(!options.build(&schema).unwrap().is_valid(&json!("not an address")));

    let mut options = ValidationOptions::default();
    options.set_validate_formats(true);
    let v = options.build(&schema).unwrap();
    assert_eq!(
        v.evaluate(&json!("x")).into_errors()[0].message,
        r#""x" is not a "ipv4""#
    );
}

#[test]
fn test_draft4_integers() {
    let mut options = ValidationOptions::default();
    options.set_draft(Draft::Draft4);
    let v = options.build(&json!({"type": "integer"})).unwrap();
    assert!(v.is_valid(&json!(1)));
    assert!(!v.is_valid(&json!(1.0)));
    assert!(validator(json!({"type": "integer"})).is_valid(&json!(1.0)));
}

#[test]
fn test_evaluation_is_repeatable() {
    let v = validator(json!({"properties": {"a": {"type": "string"}}, "required": ["b"]}));
    let instance = json!({"a": 1});
    assert_eq!(v.evaluate(&instance), v.evaluate(&instance));
}
