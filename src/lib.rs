// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]
#![deny(clippy::unwrap_used, clippy::expect_used)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]

mod catalog;
mod compiler;
mod draft;
mod ecma;
mod error;
mod evaluator;
mod formats;
mod graph;
mod keyword;
mod output;
mod utils;
mod validator;
mod value;

pub use catalog::{
    meta, Anchor, Catalog, Fetched, FileSystemSource, InMemorySource, Resource, SchemaDocument,
    SourceProvider,
};
pub use draft::{Draft, KeywordKind};
pub use error::{CompileError, ResolverError};
pub use formats::FormatChecker;
pub use graph::CompiledGraph;
pub use keyword::{Keyword, KeywordFactory, KeywordOutcome};
pub use output::{
    AnnotationRecord, ErrorRecord, Evaluation, LocationAnnotations, OutputFormat, OutputUnit,
    Report, UnknownOutputFormat,
};
pub use utils::pointer::JsonPointer;
pub use validator::{ValidationOptions, Validator};

use serde_json::Value;

/// Draft of `schema` according to its `$schema`. Never fails; unknown or missing
/// `$schema` gives [`Draft::Draft202012`].
pub fn dialect_of(schema: &Value) -> Draft {
    Draft::detect(schema)
}

/// Compile `schema` with default options.
pub fn validator_for(schema: &Value) -> Result<Validator, CompileError> {
    Validator::new(schema)
}

pub fn options() -> ValidationOptions {
    ValidationOptions::default()
}

/// Compile `schema` and check `instance` against it.
pub fn is_valid(schema: &Value, instance: &Value) -> Result<bool, CompileError> {
    Ok(validator_for(schema)?.is_valid(instance))
}

/// Compile `schema` and evaluate `instance` exhaustively.
pub fn evaluate(schema: &Value, instance: &Value) -> Result<Evaluation, CompileError> {
    Ok(validator_for(schema)?.evaluate(instance))
}

macro_rules! draft_module {
    ($module:ident, $draft:expr, $doc:literal) => {
        #[doc = $doc]
        pub mod $module {
            use super::*;

            pub fn new(schema: &Value) -> Result<Validator, CompileError> {
                options().build(schema)
            }

            pub fn options() -> ValidationOptions {
                let mut options = ValidationOptions::default();
                options.set_draft($draft);
                options
            }

            pub fn is_valid(schema: &Value, instance: &Value) -> Result<bool, CompileError> {
                Ok(new(schema)?.is_valid(instance))
            }
        }
    };
}

draft_module!(draft4, Draft::Draft4, "Validators that ignore `$schema` and use Draft 4.");
draft_module!(draft6, Draft::Draft6, "Validators that ignore `$schema` and use Draft 6.");
draft_module!(draft7, Draft::Draft7, "Validators that ignore `$schema` and use Draft 7.");
draft_module!(
    draft201909,
    Draft::Draft201909,
    "Validators that ignore `$schema` and use Draft 2019-09."
);
draft_module!(
    draft202012,
    Draft::Draft202012,
    "Validators that ignore `$schema` and use Draft 2020-12."
);
