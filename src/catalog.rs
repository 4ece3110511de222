// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Catalog of schema documents.
//!
//! The catalog maps canonical URIs to parsed [`SchemaDocument`]s. On a cache miss it asks the
//! source provider registered under the longest matching URI prefix for the document. Every
//! canonical URI is fetched at most once: concurrent callers asking for the same URI wait on
//! the in-flight fetch instead of issuing their own. Failed fetches are not cached.

use crate::draft::Draft;
use crate::error::ResolverError;
use crate::utils::uri::{self, canonical};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use url::Url;

mod document;
pub mod meta;
mod sources;

pub use document::{Anchor, Resource, SchemaDocument};
pub use sources::{FileSystemSource, Fetched, InMemorySource, SourceProvider};


type Slot = Arc<OnceLock<Result<Arc<SchemaDocument>, ResolverError>>>;

/// A thread-safe, caching document resolver.
pub struct Catalog {
    sources: RwLock<Vec<(String, Arc<dyn SourceProvider>)>>,
    documents: DashMap<String, Slot>,
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let prefixes: Vec<String> = self.sources.read().iter().map(|(p, _)| p.clone()).collect();
        f.debug_struct("Catalog")
            .field("sources", &prefixes)
            .field("documents", &self.documents.len())
            .finish()
    }
}

impl Catalog {
    /// A catalog that serves the bundled meta-schemas of every supported draft.
    pub fn new() -> Self {
        let catalog = Self::empty();
        {
            let mut sources = catalog.sources.write();
            let provider: Arc<dyn SourceProvider> = Arc::new(meta::MetaSchemaSource);
            sources.push(("http://json-schema.org/".to_string(), provider.clone()));
            sources.push(("https://json-schema.org/".to_string(), provider));
        }
        catalog
    }

    /// A catalog without any source.
    pub fn empty() -> Self {
        Self {
            sources: RwLock::new(Vec::new()),
            documents: DashMap::new(),
        }
    }

    /// Register `provider` for every URI starting with `prefix`.
    ///
    /// When several prefixes match a URI, the longest one wins. Registering the same
    /// prefix again replaces the earlier provider.
    pub fn add_uri_source(
        &self,
        prefix: &str,
        provider: impl SourceProvider + 'static,
    ) -> Result<(), ResolverError> {
        self.add_shared_source(prefix, Arc::new(provider))
    }

    pub fn add_shared_source(
        &self,
        prefix: &str,
        provider: Arc<dyn SourceProvider>,
    ) -> Result<(), ResolverError> {
        let prefix = normalize_prefix(prefix)?;
        let mut sources = self.sources.write();
        match sources.iter_mut().find(|(p, _)| *p == prefix) {
            Some(entry) => entry.1 = provider,
            None => sources.push((prefix, provider)),
        }
        Ok(())
    }

    /// Register a parsed document directly, replacing any cached entry for its URI.
    pub fn add_document(&self, uri: &str, value: Value) -> Result<Arc<SchemaDocument>, ResolverError> {
        let url = uri::parse(uri)?;
        let key = canonical(&url);
        let draft = Draft::detect(&value);
        let document = Arc::new(SchemaDocument::new(&url, value, draft)?);
        let slot = OnceLock::new();
        let _ = slot.set(Ok(document.clone()));
        self.documents.insert(key, Arc::new(slot));
        Ok(document)
    }

    /// Resolve `uri` to its document. The fragment, if any, is ignored.
    pub fn resolve(&self, uri: &str) -> Result<Arc<SchemaDocument>, ResolverError> {
        self.resolve_url(&uri::parse(uri)?)
    }

    pub fn resolve_url(&self, uri: &Url) -> Result<Arc<SchemaDocument>, ResolverError> {
        let key = canonical(uri);
        let slot: Slot = self
            .documents
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceLock::new()))
            .clone();

        if slot.get().is_some() {
            log::debug!("catalog hit for '{key}'");
        }
        match slot.get_or_init(|| self.fetch(&key)) {
            Ok(document) => Ok(document.clone()),
            Err(e) => {
                // Forget the failure so that a later call retries.
                self.documents
                    .remove_if(&key, |_, cached| Arc::ptr_eq(cached, &slot));
                Err(e.clone())
            }
        }
    }

    /// The cached document for `uri`, without fetching.
    pub fn get(&self, uri: &str) -> Option<Arc<SchemaDocument>> {
        let key = canonical(&uri::parse(uri).ok()?);
        let slot = self.documents.get(&key)?.clone();
        slot.get().and_then(|result| result.as_ref().ok().cloned())
    }

    pub fn contains(&self, uri: &str) -> bool {
        self.get(uri).is_some()
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.documents
            .iter()
            .filter(|entry| matches!(entry.value().get(), Some(Ok(_))))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn provider_for(&self, key: &str) -> Option<(usize, Arc<dyn SourceProvider>)> {
        self.sources
            .read()
            .iter()
            .filter(|(prefix, _)| key.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(prefix, provider)| (prefix.len(), provider.clone()))
    }

    fn fetch(&self, key: &str) -> Result<Arc<SchemaDocument>, ResolverError> {
        let (prefix_len, provider) = self
            .provider_for(key)
            .ok_or_else(|| ResolverError::NoSource {
                uri: key.to_string(),
            })?;
        let url = uri::parse(key)?;
        let relative = key.get(prefix_len..).unwrap_or_default();
        log::debug!("fetching '{key}'");
        let value = match provider.fetch(&url, relative)? {
            Fetched::Json(value) => value,
            Fetched::Bytes(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| ResolverError::malformed(key, e))?,
        };
        let draft = Draft::detect(&value);
        Ok(Arc::new(SchemaDocument::new(&url, value, draft)?))
    }
}

fn normalize_prefix(prefix: &str) -> Result<String, ResolverError> {
    let url = uri::parse(prefix)?;
    let mut normalized = canonical(&url);
    // `Url` adds a trailing slash to bare hosts; keep the caller's spelling otherwise.
    if !prefix.ends_with('/') && normalized.ends_with('/') && !prefix.contains('#') {
        let trimmed = prefix.trim_end_matches('#');
        if normalized.len() == trimmed.len() + 1 {
            normalized.pop();
        }
    }
    Ok(normalized)
}
