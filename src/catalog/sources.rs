// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Source providers: pluggable loaders the catalog consults on a cache miss.

use crate::error::ResolverError;
use crate::utils::uri::{self, canonical};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// What a provider produced for a URI.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Raw JSON text, parsed by the catalog.
    Bytes(Vec<u8>),
    /// An already parsed document.
    Json(Value),
}

/// Produces raw documents for URIs under a registered prefix.
///
/// `relative` is the part of the canonical URI that follows the prefix the provider was
/// registered under. Providers may block; the catalog guarantees that each URI is fetched
/// at most once, even under concurrent callers.
pub trait SourceProvider: Send + Sync {
    fn fetch(&self, uri: &Url, relative: &str) -> Result<Fetched, ResolverError>;
}

impl<F> SourceProvider for F
where
    F: Fn(&Url) -> Result<Fetched, ResolverError> + Send + Sync,
{
    fn fetch(&self, uri: &Url, _relative: &str) -> Result<Fetched, ResolverError> {
        self(uri)
    }
}

/// A fixed map from URI to document.
#[derive(Debug, Default, Clone)]
pub struct InMemorySource {
    documents: HashMap<String, Value>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document. The fragment of `uri`, if any, is ignored.
    pub fn insert(&mut self, uri: &str, document: Value) -> Result<(), ResolverError> {
        let key = canonical(&uri::parse(uri)?);
        self.documents.insert(key, document);
        Ok(())
    }

    /// Builder form of [`InMemorySource::insert`].
    pub fn with_document(mut self, uri: &str, document: Value) -> Result<Self, ResolverError> {
        self.insert(uri, document)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl SourceProvider for InMemorySource {
    fn fetch(&self, uri: &Url, _relative: &str) -> Result<Fetched, ResolverError> {
        let key = canonical(uri);
        match self.documents.get(&key) {
            Some(document) => Ok(Fetched::Json(document.clone())),
            None => Err(ResolverError::NoSource { uri: key }),
        }
    }
}

/// Maps the path after the registered prefix onto a directory tree.
///
/// Files ending in `.yaml`/`.yml` are parsed as YAML when the `yaml` feature is enabled;
/// everything else is handed to the catalog as JSON text.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, uri: &Url, relative: &str) -> Result<PathBuf, ResolverError> {
        let relative = uri::percent_decode(relative.trim_start_matches('/'));
        let relative = Path::new(&relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ResolverError::unreachable(
                uri.as_str(),
                "path escapes the source root",
            ));
        }
        Ok(self.root.join(relative))
    }
}

impl SourceProvider for FileSystemSource {
    fn fetch(&self, uri: &Url, relative: &str) -> Result<Fetched, ResolverError> {
        let path = self.path_for(uri, relative)?;
        let bytes =
            std::fs::read(&path).map_err(|e| ResolverError::unreachable(uri.as_str(), e))?;
        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );
        if is_yaml {
            return parse_yaml(uri, &bytes);
        }
        Ok(Fetched::Bytes(bytes))
    }
}

#[cfg(feature = "yaml")]
fn parse_yaml(uri: &Url, bytes: &[u8]) -> Result<Fetched, ResolverError> {
    serde_yaml::from_slice::<Value>(bytes)
        .map(Fetched::Json)
        .map_err(|e| ResolverError::malformed(uri.as_str(), e))
}

#[cfg(not(feature = "yaml"))]
fn parse_yaml(uri: &Url, _bytes: &[u8]) -> Result<Fetched, ResolverError> {
    Err(ResolverError::malformed(
        uri.as_str(),
        "YAML documents require the `yaml` feature",
    ))
}
