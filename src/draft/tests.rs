// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use super::*;
use serde_json::json;

#[test]
fn test_detect_defaults_to_newest() {
    assert_eq!(Draft::detect(&json!({"type": "string"})), Draft::Draft202012);
    assert_eq!(Draft::detect(&json!({})), Draft::Draft202012);
    assert_eq!(Draft::detect(&json!(true)), Draft::Draft202012);
    assert_eq!(Draft::detect(&json!(false)), Draft::Draft202012);
}

#[test]
fn test_detect_known_uris() {
    let cases = [
        ("http://json-schema.org/draft-04/schema#", Draft::Draft4),
        ("https://json-schema.org/draft-04/schema#", Draft::Draft4),
        ("http://json-schema.org/draft-04/schema", Draft::Draft4),
        ("http://json-schema.org/draft-06/schema#", Draft::Draft6),
        ("https://json-schema.org/draft-06/schema#", Draft::Draft6),
        ("http://json-schema.org/draft-07/schema#", Draft::Draft7),
        ("https://json-schema.org/draft-07/schema#", Draft::Draft7),
        ("https://json-schema.org/draft/2019-09/schema", Draft::Draft201909),
        ("http://json-schema.org/draft/2019-09/schema", Draft::Draft201909),
        ("https://json-schema.org/draft/2020-12/schema", Draft::Draft202012),
        ("http://json-schema.org/draft/2020-12/schema#", Draft::Draft202012),
    ];
    for (uri, expected) in cases {
        assert_eq!(Draft::detect(&json!({ "$schema": uri })), expected, "{uri}");
    }
}

#[test]
fn test_detect_unknown_uri() {
    let schema = json!({"$schema": "http://custom.example.com/schema"});
    assert_eq!(Draft::detect(&schema), Draft::Draft202012);
    assert_eq!(Draft::detect_or(&schema, Draft::Draft7), Draft::Draft7);
    // Non-string values are ignored as well.
    assert_eq!(Draft::detect(&json!({"$schema": 4})), Draft::Draft202012);
}

#[test]
fn test_detect_ignores_structure() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "invalid_type"
    });
    assert_eq!(Draft::detect(&schema), Draft::Draft7);
}

#[test]
fn test_availability_table() {
    assert!(Draft::Draft4.keyword("id").is_some());
    assert!(Draft::Draft6.keyword("id").is_none());
    assert!(Draft::Draft4.keyword("const").is_none());
    assert!(Draft::Draft7.keyword("if").is_some());
    assert!(Draft::Draft6.keyword("if").is_none());
    assert!(Draft::Draft7.keyword("unevaluatedProperties").is_none());
    assert!(Draft::Draft201909.keyword("unevaluatedProperties").is_some());
    assert!(Draft::Draft201909.keyword("$recursiveRef").is_some());
    assert!(Draft::Draft202012.keyword("$recursiveRef").is_none());
    assert!(Draft::Draft202012.keyword("$dynamicRef").is_some());
    assert!(Draft::Draft202012.keyword("prefixItems").is_some());
    assert!(Draft::Draft202012.keyword("additionalItems").is_none());
    assert!(Draft::Draft7.keyword("dependencies").is_some());
    assert!(Draft::Draft201909.keyword("dependencies").is_none());
    assert!(Draft::Draft202012.keyword("x-vendor").is_none());
}

#[test]
fn test_subschemas_per_draft() {
    let schema = json!({
        "items": [{"type": "string"}, true],
        "properties": {"a": {}},
        "allOf": [{}],
        "$defs": {"d": {}}
    });
    let paths = |draft: Draft| {
        draft
            .subschemas(&schema)
            .into_iter()
            .map(|(path, _)| path)
            .collect::<Vec<_>>()
    };
    let legacy = paths(Draft::Draft7);
    assert!(legacy.contains(&vec![SegmentRef::Key("items"), SegmentRef::Index(1)]));
    assert!(!legacy.contains(&vec![SegmentRef::Key("$defs"), SegmentRef::Key("d")]));
    let modern = paths(Draft::Draft202012);
    assert!(modern.contains(&vec![SegmentRef::Key("$defs"), SegmentRef::Key("d")]));
    // Array-form `items` is not a subschema location in 2020-12.
    assert!(!modern.contains(&vec![SegmentRef::Key("items"), SegmentRef::Index(0)]));
}

#[test]
fn test_serialized_names() {
    assert_eq!(serde_json::to_value(Draft::Draft201909).unwrap(), json!("Draft2019-09"));
    assert_eq!(Draft::Draft4.to_string(), "Draft4");
}
