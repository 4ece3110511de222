// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::catalog::{Catalog, SourceProvider};
use crate::compiler;
use crate::draft::Draft;
use crate::error::{CompileError, ResolverError};
use crate::evaluator::{self, Mode};
use crate::formats::FormatChecker;
use crate::graph::CompiledGraph;
use crate::keyword::KeywordFactory;
use crate::output::{ErrorRecord, Evaluation, OutputFormat, Report};
use core::fmt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Nested schema objects one evaluation may enter. Each level costs a few stack frames, so
/// this stays well within the 2 MiB stack of a spawned thread, also in debug builds.
pub(crate) const DEFAULT_MAX_DEPTH: usize = 128;

/// Configuration for building a [`Validator`].
///
/// ```no_run
/// # fn main() -> anyhow::Result<()> {
/// use schemata::Draft;
/// use serde_json::json;
///
/// let mut options = schemata::options();
/// options
///     .set_draft(Draft::Draft7)
///     .set_validate_formats(true)
///     .set_format("even", |s: &str| s.len() % 2 == 0);
/// let validator = options.build(&json!({"format": "even"}))?;
/// assert!(!validator.is_valid(&json!("odd")));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ValidationOptions {
    pub(crate) draft: Option<Draft>,
    pub(crate) catalog: Option<Arc<Catalog>>,
    pub(crate) validate_formats: Option<bool>,
    pub(crate) formats: HashMap<String, FormatChecker>,
    pub(crate) keywords: HashMap<String, Arc<dyn KeywordFactory>>,
    pub(crate) max_depth: usize,
    pub(crate) base_uri: Option<String>,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            draft: None,
            catalog: None,
            validate_formats: None,
            formats: HashMap::new(),
            keywords: HashMap::new(),
            max_depth: DEFAULT_MAX_DEPTH,
            base_uri: None,
        }
    }
}

impl fmt::Debug for ValidationOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationOptions")
            .field("draft", &self.draft)
            .field("catalog", &self.catalog)
            .field("validate_formats", &self.validate_formats)
            .field("formats", &self.formats.keys().collect::<Vec<_>>())
            .field("keywords", &self.keywords.keys().collect::<Vec<_>>())
            .field("max_depth", &self.max_depth)
            .field("base_uri", &self.base_uri)
            .finish()
    }
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile under `draft` regardless of `$schema`.
    pub fn set_draft(&mut self, draft: Draft) -> &mut Self {
        self.draft = Some(draft);
        self
    }

    /// Resolve remote references through `catalog`. Without one, each build uses a fresh
    /// catalog that only knows the bundled meta-schemas.
    pub fn set_catalog(&mut self, catalog: Arc<Catalog>) -> &mut Self {
        self.catalog = Some(catalog);
        self
    }

    /// Register a source provider on the configured catalog, creating one if needed.
    pub fn add_uri_source(
        &mut self,
        base_uri: &str,
        provider: impl SourceProvider + 'static,
    ) -> Result<&mut Self, ResolverError> {
        self.catalog
            .get_or_insert_with(|| Arc::new(Catalog::new()))
            .add_uri_source(base_uri, provider)?;
        Ok(self)
    }

    /// Whether `format` asserts. Defaults to the draft's behaviour: Draft 4, 6 and 7
    /// assert, 2019-09 and 2020-12 only annotate.
    pub fn set_validate_formats(&mut self, validate: bool) -> &mut Self {
        self.validate_formats = Some(validate);
        self
    }

    /// Add or replace a `format` checker.
    pub fn set_format(
        &mut self,
        name: &str,
        check: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> &mut Self {
        self.formats
            .insert(name.to_string(), FormatChecker::Custom(Arc::new(check)));
        self
    }

    /// Add a custom keyword. It takes precedence over a built-in keyword of the same name.
    pub fn set_keyword(
        &mut self,
        name: &str,
        factory: impl KeywordFactory + 'static,
    ) -> &mut Self {
        self.keywords.insert(name.to_string(), Arc::new(factory));
        self
    }

    /// Maximum number of nested schema objects entered while evaluating one instance.
    /// Defaults to 128. Deeper limits need a correspondingly larger thread stack.
    pub fn set_max_depth(&mut self, max_depth: usize) -> &mut Self {
        self.max_depth = max_depth;
        self
    }

    /// Base URI of the root schema when it has no `$id`.
    pub fn set_base_uri(&mut self, base_uri: &str) -> &mut Self {
        self.base_uri = Some(base_uri.to_string());
        self
    }

    pub fn build(&self, schema: &Value) -> Result<Validator, CompileError> {
        let graph = compiler::compile(schema, self)?;
        Ok(Validator {
            graph: Arc::new(graph),
        })
    }
}

/// A compiled schema.
///
/// Cloning is cheap and the validator can be shared between threads; every call keeps its
/// state on its own stack.
#[derive(Debug, Clone)]
pub struct Validator {
    graph: Arc<CompiledGraph>,
}

impl Validator {
    pub fn new(schema: &Value) -> Result<Self, CompileError> {
        ValidationOptions::default().build(schema)
    }

    pub fn options() -> ValidationOptions {
        ValidationOptions::default()
    }

    pub fn draft(&self) -> Draft {
        self.graph.draft()
    }

    pub fn graph(&self) -> &CompiledGraph {
        &self.graph
    }

    /// Short-circuit check: stops at the first failure and records nothing.
    pub fn is_valid(&self, instance: &Value) -> bool {
        evaluator::is_valid(&self.graph, instance)
    }

    /// Exhaustive evaluation collecting every error and annotation.
    pub fn evaluate(&self, instance: &Value) -> Evaluation {
        evaluator::evaluate(&self.graph, instance, Mode::Exhaustive)
    }

    /// Exhaustive evaluation rendered in `format`.
    pub fn output(&self, instance: &Value, format: OutputFormat) -> Report {
        self.evaluate(instance).output(format)
    }

    pub fn iter_errors(&self, instance: &Value) -> impl Iterator<Item = ErrorRecord> {
        self.evaluate(instance).into_errors().into_iter()
    }

    /// `Ok` when valid, otherwise the first error.
    pub fn validate(&self, instance: &Value) -> Result<(), ErrorRecord> {
        match self.iter_errors(instance).next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}
