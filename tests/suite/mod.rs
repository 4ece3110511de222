// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{bail, Result};
use schemata::{Catalog, Draft, InMemorySource, OutputFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use test_generator::test_resources;
use walkdir::WalkDir;

const REMOTES: &str = "http://localhost:1234/";

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct Instance {
    note: String,
    data: Value,
    valid: bool,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    schema: Value,
    #[serde(default)]
    tests: Vec<Instance>,
    skip: Option<bool>,
    want_error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    draft: Option<String>,
    cases: Vec<TestCase>,
}

fn parse_draft(name: &str) -> Result<Draft> {
    Ok(match name {
        "draft4" => Draft::Draft4,
        "draft6" => Draft::Draft6,
        "draft7" => Draft::Draft7,
        "draft2019-09" => Draft::Draft201909,
        "draft2020-12" => Draft::Draft202012,
        _ => bail!("unknown draft {name}"),
    })
}

// Serve every file under tests/suite/remotes as http://localhost:1234/<relative path>.
fn remotes() -> Result<Arc<Catalog>> {
    let root = Path::new("tests/suite/remotes");
    let mut source = InMemorySource::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(root)?;
        let relative = relative.to_string_lossy().replace('\\', "/");
        let document: Value = serde_json::from_str(&std::fs::read_to_string(entry.path())?)?;
        source.insert(&format!("{REMOTES}{relative}"), document)?;
    }
    let catalog = Catalog::new();
    catalog.add_uri_source(REMOTES, source)?;
    Ok(Arc::new(catalog))
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;
    let catalog = remotes()?;

    println!("running {file}");

    for case in test.cases {
        print!("case {} ", case.note);
        if case.skip == Some(true) {
            println!("skipped");
            continue;
        }

        let mut options = schemata::options();
        options.set_catalog(catalog.clone());
        if let Some(draft) = &test.draft {
            options.set_draft(parse_draft(draft)?);
        }
        let validator = match (options.build(&case.schema), &case.want_error) {
            (Ok(validator), None) => validator,
            (Err(actual), Some(expected)) => {
                if !actual.to_string().contains(expected) {
                    bail!("{}: `{actual}` does not contain `{expected}`", case.note);
                }
                println!("passed");
                continue;
            }
            (Ok(_), Some(expected)) => bail!("{}: compiled, expected `{expected}`", case.note),
            (Err(actual), None) => return Err(actual.into()),
        };

        for instance in &case.tests {
            let fast = validator.is_valid(&instance.data);
            let evaluation = validator.evaluate(&instance.data);
            if fast != instance.valid {
                bail!(
                    "{}/{}: is_valid returned {fast}, expected {}",
                    case.note,
                    instance.note,
                    instance.valid
                );
            }
            if evaluation.is_valid() != instance.valid {
                bail!(
                    "{}/{}: evaluate returned {}, expected {}",
                    case.note,
                    instance.note,
                    evaluation.is_valid(),
                    instance.valid
                );
            }
            if evaluation.errors().is_empty() == !instance.valid {
                bail!(
                    "{}/{}: unexpected errors {:?}",
                    case.note,
                    instance.note,
                    evaluation.errors()
                );
            }
            for format in [
                OutputFormat::Flag,
                OutputFormat::Basic,
                OutputFormat::Annotations,
                OutputFormat::Detailed,
            ] {
                if evaluation.output(format).valid() != instance.valid {
                    bail!("{}/{}: {format:?} output disagrees", case.note, instance.note);
                }
            }
        }
        println!("passed");
    }

    println!("{file} passed");
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test]
fn yaml_test_basic() -> Result<()> {
    yaml_test("tests/suite/draft2020-12/core.yaml")
}

#[test_resources("tests/suite/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
