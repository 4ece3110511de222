// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

#![allow(clippy::expect_used)] // meta schema loader expects static resources

use crate::catalog::sources::{Fetched, SourceProvider};
use crate::error::ResolverError;
use crate::utils::uri::{canonical, normalize_meta_uri};
use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::HashMap;
use url::Url;

/// Bundled meta-schemas, keyed by their scheme-less URI.
const META_SCHEMAS: &[(&str, &str)] = &[
    (
        "json-schema.org/draft-04/schema",
        include_str!("meta/draft-04.json"),
    ),
    (
        "json-schema.org/draft-06/schema",
        include_str!("meta/draft-06.json"),
    ),
    (
        "json-schema.org/draft-07/schema",
        include_str!("meta/draft-07.json"),
    ),
    (
        "json-schema.org/draft/2019-09/schema",
        include_str!("meta/draft2019-09/schema.json"),
    ),
    (
        "json-schema.org/draft/2019-09/meta/core",
        include_str!("meta/draft2019-09/meta/core.json"),
    ),
    (
        "json-schema.org/draft/2019-09/meta/applicator",
        include_str!("meta/draft2019-09/meta/applicator.json"),
    ),
    (
        "json-schema.org/draft/2019-09/meta/validation",
        include_str!("meta/draft2019-09/meta/validation.json"),
    ),
    (
        "json-schema.org/draft/2019-09/meta/meta-data",
        include_str!("meta/draft2019-09/meta/meta-data.json"),
    ),
    (
        "json-schema.org/draft/2019-09/meta/format",
        include_str!("meta/draft2019-09/meta/format.json"),
    ),
    (
        "json-schema.org/draft/2019-09/meta/content",
        include_str!("meta/draft2019-09/meta/content.json"),
    ),
    (
        "json-schema.org/draft/2020-12/schema",
        include_str!("meta/draft2020-12/schema.json"),
    ),
    (
        "json-schema.org/draft/2020-12/meta/core",
        include_str!("meta/draft2020-12/meta/core.json"),
    ),
    (
        "json-schema.org/draft/2020-12/meta/applicator",
        include_str!("meta/draft2020-12/meta/applicator.json"),
    ),
    (
        "json-schema.org/draft/2020-12/meta/unevaluated",
        include_str!("meta/draft2020-12/meta/unevaluated.json"),
    ),
    (
        "json-schema.org/draft/2020-12/meta/validation",
        include_str!("meta/draft2020-12/meta/validation.json"),
    ),
    (
        "json-schema.org/draft/2020-12/meta/meta-data",
        include_str!("meta/draft2020-12/meta/meta-data.json"),
    ),
    (
        "json-schema.org/draft/2020-12/meta/format-annotation",
        include_str!("meta/draft2020-12/meta/format-annotation.json"),
    ),
    (
        "json-schema.org/draft/2020-12/meta/content",
        include_str!("meta/draft2020-12/meta/content.json"),
    ),
];

lazy_static! {
    #[allow(clippy::expect_used)] // bundled at build time, covered by tests
    static ref PARSED: HashMap<&'static str, Value> = META_SCHEMAS
        .iter()
        .map(|(uri, source)| {
            let value =
                serde_json::from_str(source).expect("bundled meta-schema should be valid JSON");
            (*uri, value)
        })
        .collect();
}

/// Look up a bundled meta-schema. `http`/`https` and a trailing `#` are ignored.
pub fn get(uri: &str) -> Option<&'static Value> {
    PARSED.get(normalize_meta_uri(uri))
}

/// Scheme-less URIs of all bundled meta-schemas.
pub fn uris() -> impl Iterator<Item = &'static str> {
    META_SCHEMAS.iter().map(|(uri, _)| *uri)
}

/// Serves the bundled meta-schemas. Registered by [`Catalog::new`](crate::Catalog::new)
/// under both `http://json-schema.org/` and `https://json-schema.org/`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MetaSchemaSource;

impl SourceProvider for MetaSchemaSource {
    fn fetch(&self, uri: &Url, _relative: &str) -> Result<Fetched, ResolverError> {
        let key = canonical(uri);
        get(&key)
            .cloned()
            .map(Fetched::Json)
            .ok_or(ResolverError::NoSource { uri: key })
    }
}
