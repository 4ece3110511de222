// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![cfg(test)]

use anyhow::{bail, Result};
use schemata::OutputFormat;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use test_generator::test_resources;

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    schema: Value,
    data: Value,
    format: String,
    want: Value,
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn yaml_test_impl(file: &str) -> Result<()> {
    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    println!("running {file}");

    for case in test.cases {
        print!("case {} ", case.note);
        let format: OutputFormat = case.format.parse()?;
        let validator = schemata::validator_for(&case.schema)?;
        let report = validator.output(&case.data, format);
        let got = report.to_json()?;
        if got != case.want {
            bail!(
                "{}: output mismatch\ngot:  {}\nwant: {}",
                case.note,
                serde_json::to_string_pretty(&got)?,
                serde_json::to_string_pretty(&case.want)?
            );
        }
        if report.valid() != validator.is_valid(&case.data) {
            bail!("{}: report disagrees with is_valid", case.note);
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

#[test_resources("tests/output/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
