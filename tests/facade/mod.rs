// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use schemata::{
    CompileError, Draft, JsonPointer, Keyword, KeywordOutcome, OutputFormat, Validator,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::thread;

#[test]
fn dialect_detection() {
    let cases = [
        (json!({"$schema": "http://json-schema.org/draft-04/schema#"}), Draft::Draft4),
        (json!({"$schema": "https://json-schema.org/draft-06/schema"}), Draft::Draft6),
        (json!({"$schema": "http://json-schema.org/draft-07/schema"}), Draft::Draft7),
        (
            json!({"$schema": "https://json-schema.org/draft/2019-09/schema"}),
            Draft::Draft201909,
        ),
        (
            json!({"$schema": "https://json-schema.org/draft/2020-12/schema#"}),
            Draft::Draft202012,
        ),
        (json!({"$schema": "http://example.com/custom"}), Draft::Draft202012),
        (json!({"type": "string"}), Draft::Draft202012),
        (json!(true), Draft::Draft202012),
    ];
    for (schema, draft) in cases {
        assert_eq!(schemata::dialect_of(&schema), draft, "{schema}");
    }
}

#[test]
fn detection_never_fails_but_compilation_may() {
    let schema = json!({"$schema": "http://json-schema.org/draft-07/schema#", "type": "invalid_type"});
    assert_eq!(schemata::dialect_of(&schema), Draft::Draft7);
    assert!(matches!(
        schemata::validator_for(&schema),
        Err(CompileError::UnknownType { .. })
    ));
}

#[test]
fn fixed_draft_modules() -> Result<()> {
    let schema = json!({"type": "integer"});
    assert!(!schemata::draft4::is_valid(&schema, &json!(1.0))?);
    assert!(schemata::draft6::is_valid(&schema, &json!(1.0))?);
    assert!(schemata::draft7::is_valid(&schema, &json!(1.0))?);
    assert!(schemata::draft201909::is_valid(&schema, &json!(1.0))?);
    assert!(schemata::draft202012::is_valid(&schema, &json!(1.0))?);

    // `$schema` is ignored by the fixed draft modules.
    let declared = json!({"$schema": "http://json-schema.org/draft-04/schema#", "type": "integer"});
    assert_eq!(schemata::draft7::new(&declared)?.draft(), Draft::Draft7);
    assert_eq!(schemata::validator_for(&declared)?.draft(), Draft::Draft4);
    Ok(())
}

#[test]
fn one_shot_helpers() -> Result<()> {
    assert!(schemata::is_valid(&json!({"minimum": 1}), &json!(2))?);
    let evaluation = schemata::evaluate(&json!({"minimum": 1}), &json!(0))?;
    assert!(!evaluation.is_valid());
    assert_eq!(evaluation.errors().len(), 1);
    Ok(())
}

#[test]
fn validate_returns_first_error() -> Result<()> {
    let validator = Validator::new(&json!({"required": ["a", "b"]}))?;
    assert!(validator.validate(&json!({"a": 1, "b": 2})).is_ok());
    let error = validator.validate(&json!({})).unwrap_err();
    assert_eq!(error.message, "\"a\" is a required property");
    assert_eq!(error.keyword_location.as_str(), "/required");
    Ok(())
}

#[test]
fn format_assertion_can_be_configured() -> Result<()> {
    let schema = json!({"format": "email"});
    assert!(Validator::new(&schema)?.is_valid(&json!("not an email")));

    let mut options = schemata::options();
    options.set_validate_formats(true);
    let validator = options.build(&schema)?;
    assert!(!validator.is_valid(&json!("not an email")));
    assert!(validator.is_valid(&json!("someone@example.com")));

    let mut options = schemata::draft7::options();
    options.set_validate_formats(false);
    assert!(options.build(&schema)?.is_valid(&json!("not an email")));
    Ok(())
}

#[test]
fn custom_format() -> Result<()> {
    let mut options = schemata::options();
    options
        .set_validate_formats(true)
        .set_format("even-length", |s| s.chars().count() % 2 == 0);
    let validator = options.build(&json!({"format": "even-length"}))?;
    assert!(validator.is_valid(&json!("ab")));
    assert!(!validator.is_valid(&json!("abc")));
    // Unknown formats never fail.
    let validator = options.build(&json!({"format": "no-such-format"}))?;
    assert!(validator.is_valid(&json!("abc")));
    Ok(())
}

#[derive(Debug)]
struct DivisibleBy(u64);

impl Keyword for DivisibleBy {
    fn evaluate(&self, instance: &Value, _location: &JsonPointer) -> KeywordOutcome {
        match instance.as_u64() {
            Some(n) if n % self.0 != 0 => {
                KeywordOutcome::invalid(format!("{n} is not divisible by {}", self.0))
            }
            _ => KeywordOutcome::valid(),
        }
    }
}

fn divisible_by(value: &Value, _location: &str) -> Result<Arc<dyn Keyword>, String> {
    match value.as_u64() {
        Some(d) if d > 0 => Ok(Arc::new(DivisibleBy(d))),
        _ => Err("expected a positive integer".to_string()),
    }
}

#[test]
fn custom_keyword() -> Result<()> {
    let mut options = schemata::options();
    options.set_keyword("divisibleBy", divisible_by);

    let validator = options.build(&json!({"properties": {"n": {"divisibleBy": 3}}}))?;
    assert!(validator.is_valid(&json!({"n": 9})));
    let errors: Vec<_> = validator.iter_errors(&json!({"n": 10})).collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "10 is not divisible by 3");
    assert_eq!(errors[0].keyword_location.as_str(), "/properties/n/divisibleBy");
    assert_eq!(errors[0].instance_location.as_str(), "/n");

    assert!(matches!(
        options.build(&json!({"divisibleBy": 0})),
        Err(CompileError::CustomKeyword { .. })
    ));
    Ok(())
}

#[test]
fn max_depth_stops_runaway_recursion() -> Result<()> {
    let schema = json!({"properties": {"next": {"$ref": "#"}}});
    let mut instance = json!({});
    for _ in 0..20 {
        instance = json!({"next": instance});
    }

    assert!(Validator::new(&schema)?.is_valid(&instance));

    let mut options = schemata::options();
    options.set_max_depth(5);
    let validator = options.build(&schema)?;
    assert!(!validator.is_valid(&instance));
    let evaluation = validator.evaluate(&instance);
    assert!(evaluation
        .iter_errors()
        .any(|e| e.message.starts_with("Maximum evaluation depth")));
    Ok(())
}

#[test]
fn default_depth_limit_on_a_spawned_thread() -> Result<()> {
    let schema = json!({"properties": {"next": {"$ref": "#"}}});
    let mut instance = json!({});
    for _ in 0..2000 {
        instance = json!({"next": instance});
    }
    let validator = Validator::new(&schema)?;
    let handle = thread::spawn(move || {
        let valid = validator.is_valid(&instance);
        let messages: Vec<String> = validator
            .evaluate(&instance)
            .iter_errors()
            .map(|e| e.message.clone())
            .collect();
        (valid, messages)
    });
    let (valid, messages) = handle.join().expect("evaluation thread panicked");
    assert!(!valid);
    assert!(messages
        .iter()
        .any(|m| m.starts_with("Maximum evaluation depth of 128")));
    Ok(())
}

#[test]
fn references_that_never_consume_input_are_rejected() {
    for schema in [
        json!({"$defs": {"a": {"$dynamicRef": "#/$defs/a"}}, "$ref": "#/$defs/a"}),
        json!({"$schema": "https://json-schema.org/draft/2019-09/schema", "$recursiveRef": "#"}),
        json!({"oneOf": [{"$ref": "#"}]}),
    ] {
        assert!(
            matches!(Validator::new(&schema), Err(CompileError::ReferenceCycle { .. })),
            "{schema} should be rejected"
        );
    }
}

#[test]
fn base_uri_for_anonymous_schema() -> Result<()> {
    let mut options = schemata::options();
    options.set_base_uri("http://example.com/root.json");
    let validator = options.build(&json!({"minimum": 1}))?;
    let error = validator.validate(&json!(0)).unwrap_err();
    assert_eq!(
        error.absolute_keyword_location.as_deref(),
        Some("http://example.com/root.json#/minimum")
    );
    Ok(())
}

#[test]
fn output_by_name() -> Result<()> {
    let validator = Validator::new(&json!({"type": "string"}))?;
    for name in ["flag", "basic", "annotations", "detailed"] {
        let format: OutputFormat = name.parse()?;
        let report = validator.output(&json!(1), format);
        assert!(!report.valid());
        assert_eq!(report.to_json()?["valid"], json!(false));
    }
    assert!("verbose".parse::<OutputFormat>().is_err());
    Ok(())
}

#[test]
fn shared_validator_across_threads() -> Result<()> {
    let validator = Validator::new(&json!({
        "type": "array",
        "items": {"type": "integer", "minimum": 0},
        "unevaluatedItems": false
    }))?;
    let threads = num_cpus::get().clamp(2, 16);
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let validator = validator.clone();
            thread::spawn(move || {
                let good = json!([i, i + 1]);
                let bad = json!([i, -1]);
                (0..100).all(|_| validator.is_valid(&good) && !validator.is_valid(&bad))
                    && validator.evaluate(&bad).errors().len() == 1
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("thread panicked"));
    }
    Ok(())
}

#[test]
fn evaluation_is_repeatable() -> Result<()> {
    let validator = Validator::new(&json!({
        "anyOf": [{"type": "string"}, {"minimum": 10}],
        "properties": {"a": {"enum": [1, 2]}}
    }))?;
    let instance = json!({"a": 3});
    let first = validator.evaluate(&instance);
    let second = validator.evaluate(&instance);
    assert_eq!(first, second);
    assert_eq!(first.basic().to_json()?, second.basic().to_json()?);
    Ok(())
}
