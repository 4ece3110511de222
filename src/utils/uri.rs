// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! URI handling for schema identifiers and references.

use crate::error::ResolverError;
use url::Url;

/// Base URI for documents that do not declare an identifier.
pub const DEFAULT_BASE: &str = "json-schema:///";

lazy_static::lazy_static! {
    #[allow(clippy::expect_used)] // constant input
    static ref DEFAULT_BASE_URL: Url =
        Url::parse(DEFAULT_BASE).expect("DEFAULT_BASE should be a valid URI");
}

pub fn default_base() -> Url {
    DEFAULT_BASE_URL.clone()
}

/// Whether `uri` lives under [`DEFAULT_BASE`], i.e. its document declared no identifier.
pub fn is_default_base(uri: &str) -> bool {
    uri.starts_with("json-schema:")
}

/// Parse an absolute URI.
pub fn parse(uri: &str) -> Result<Url, ResolverError> {
    Url::parse(uri).map_err(|e| ResolverError::InvalidUri {
        uri: uri.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve `reference` against `base`.
pub fn join(base: &Url, reference: &str) -> Result<Url, ResolverError> {
    // Absolute references must not inherit anything from the base.
    if let Ok(absolute) = Url::parse(reference) {
        return Ok(absolute);
    }
    base.join(reference).map_err(|e| ResolverError::InvalidUri {
        uri: reference.to_string(),
        reason: e.to_string(),
    })
}

/// The URI without its fragment, used as cache and resource key.
pub fn canonical(uri: &Url) -> String {
    let mut uri = uri.clone();
    uri.set_fragment(None);
    uri.into()
}

/// Split a URI into its canonical form and its percent-decoded fragment.
pub fn split_fragment(uri: &Url) -> (String, String) {
    let fragment = uri.fragment().map(percent_decode).unwrap_or_default();
    (canonical(uri), fragment)
}

/// Decode `%XX` escapes. Invalid escapes are kept verbatim.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let decoded = core::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Normalise a `$schema` value for comparison: scheme-insensitive over http/https,
/// without a trailing empty fragment.
pub fn normalize_meta_uri(uri: &str) -> &str {
    let uri = uri.trim();
    let uri = uri.strip_suffix('#').unwrap_or(uri);
    uri.strip_prefix("https://")
        .or_else(|| uri.strip_prefix("http://"))
        .unwrap_or(uri)
}
