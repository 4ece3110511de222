// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::Result;
use schemata::{Catalog, CompileError, Fetched, FileSystemSource, ResolverError};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;
use url::Url;

fn file_catalog() -> Result<Arc<Catalog>> {
    let catalog = Catalog::new();
    catalog.add_uri_source(
        "http://example.com/schemas/",
        FileSystemSource::new("tests/catalog/schemas"),
    )?;
    Ok(Arc::new(catalog))
}

#[test]
fn file_system_source() -> Result<()> {
    let mut options = schemata::options();
    options.set_catalog(file_catalog()?);
    let validator = options.build(&json!({
        "items": {"$ref": "http://example.com/schemas/address.json"}
    }))?;

    assert!(validator.is_valid(&json!([{"street": "Main", "zip": "12345"}])));
    assert!(!validator.is_valid(&json!([{"street": "Main", "zip": "1234"}])));
    assert!(!validator.is_valid(&json!([{"zip": "12345"}])));

    let errors: Vec<_> = validator
        .iter_errors(&json!([{"street": "Main", "zip": "x"}]))
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].instance_location.as_str(), "/0/zip");
    assert_eq!(
        errors[0].keyword_location.as_str(),
        "/items/$ref/properties/zip/$ref/pattern"
    );
    assert_eq!(
        errors[0].absolute_keyword_location.as_deref(),
        Some("http://example.com/schemas/types.yaml#/$defs/zip/pattern")
    );
    Ok(())
}

#[test]
fn missing_document() -> Result<()> {
    let mut options = schemata::options();
    options.set_catalog(file_catalog()?);
    let result = options.build(&json!({"$ref": "http://example.com/schemas/missing.json"}));
    assert!(matches!(
        result,
        Err(CompileError::UnresolvableReference { .. })
    ));
    Ok(())
}

#[test]
fn path_escape_is_rejected() -> Result<()> {
    let catalog = file_catalog()?;
    assert!(catalog
        .resolve("http://example.com/schemas/%2E%2E/mod.rs")
        .is_err());
    Ok(())
}

#[test]
fn bundled_meta_schemas() -> Result<()> {
    let catalog = Catalog::new();
    for uri in [
        "http://json-schema.org/draft-04/schema#",
        "http://json-schema.org/draft-06/schema#",
        "http://json-schema.org/draft-07/schema#",
        "https://json-schema.org/draft/2019-09/schema",
        "https://json-schema.org/draft/2020-12/schema",
    ] {
        catalog.resolve(uri)?;
    }
    Ok(())
}

#[test]
fn schema_valid_against_meta_schema() -> Result<()> {
    let validator =
        schemata::validator_for(&json!({"$ref": "http://json-schema.org/draft-07/schema#"}))?;
    assert!(validator.is_valid(&json!({"type": "string", "minLength": 1})));
    assert!(!validator.is_valid(&json!({"minLength": -1})));
    assert!(!validator.is_valid(&json!({"type": "invalid_type"})));
    Ok(())
}

#[test]
fn concurrent_compilation_fetches_once() -> Result<()> {
    let fetches = Arc::new(AtomicUsize::new(0));
    let counter = fetches.clone();
    let catalog = Arc::new(Catalog::new());
    catalog.add_uri_source(
        "http://slow.example/",
        move |_: &Url| -> Result<Fetched, ResolverError> {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok(Fetched::Json(json!({"type": "integer", "minimum": 0})))
        },
    )?;

    let threads = num_cpus::get().clamp(2, 16);
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let catalog = catalog.clone();
            let barrier = barrier.clone();
            thread::spawn(move || -> Result<bool> {
                let mut options = schemata::options();
                options.set_catalog(catalog);
                barrier.wait();
                let validator = options.build(&json!({"$ref": "http://slow.example/count.json"}))?;
                Ok(validator.is_valid(&json!(3)) && !validator.is_valid(&json!(-3)))
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.join().expect("thread panicked")?);
    }
    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn failed_fetch_is_retried() -> Result<()> {
    let attempts = Arc::new(AtomicUsize::new(0));
    let counter = attempts.clone();
    let catalog = Catalog::empty();
    catalog.add_uri_source(
        "http://flaky.example/",
        move |uri: &Url| -> Result<Fetched, ResolverError> {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(ResolverError::NoSource {
                    uri: uri.to_string(),
                });
            }
            Ok(Fetched::Bytes(br#"{"type": "null"}"#.to_vec()))
        },
    )?;
    assert!(catalog.resolve("http://flaky.example/a.json").is_err());
    assert!(!catalog.contains("http://flaky.example/a.json"));
    catalog.resolve("http://flaky.example/a.json")?;
    assert!(catalog.contains("http://flaky.example/a.json"));
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    Ok(())
}
