// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::sync::Arc;
use thiserror::Error;

/// Errors raised while fetching or parsing a schema document.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    #[error("No source registered for '{uri}'")]
    NoSource { uri: String },

    #[error("Source for '{uri}' could not be read: {reason}")]
    Unreachable { uri: String, reason: String },

    #[error("Document at '{uri}' is not valid JSON: {reason}")]
    Malformed { uri: String, reason: String },

    #[error("Invalid URI '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    #[error("Fragment '{fragment}' does not exist in '{uri}'")]
    UnresolvableFragment { uri: String, fragment: String },
}

impl ResolverError {
    pub(crate) fn unreachable(uri: impl Into<String>, reason: impl ToString) -> Self {
        ResolverError::Unreachable {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn malformed(uri: impl Into<String>, reason: impl ToString) -> Self {
        ResolverError::Malformed {
            uri: uri.into(),
            reason: reason.to_string(),
        }
    }
}

/// Errors raised when a schema cannot be compiled into a validator.
///
/// Every variant names the JSON pointer (`location`) of the offending value inside
/// its document, so that a structurally broken schema can be fixed without guessing.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Invalid value for '{keyword}' at '{location}': expected {expected}")]
    InvalidKeyword {
        keyword: String,
        location: String,
        expected: &'static str,
    },

    #[error("Unknown type '{name}' at '{location}'")]
    UnknownType { name: String, location: String },

    #[error("Invalid regular expression '{pattern}' at '{location}': {reason}")]
    InvalidPattern {
        pattern: String,
        location: String,
        reason: String,
    },

    #[error("Schema at '{location}' must be an object or a boolean")]
    InvalidSchema { location: String },

    #[error("Unresolvable reference '{reference}' at '{location}'")]
    UnresolvableReference {
        reference: String,
        location: String,
        #[source]
        source: Option<ResolverError>,
    },

    #[error("Failed to resolve '{uri}'")]
    Resolver {
        uri: String,
        #[source]
        source: ResolverError,
    },

    #[error("Reference cycle without progress on the instance: {}", chain.join(" -> "))]
    ReferenceCycle { chain: Vec<String> },

    #[error("Custom keyword '{keyword}' at '{location}' rejected its value: {reason}")]
    CustomKeyword {
        keyword: String,
        location: String,
        reason: Arc<str>,
    },
}

impl CompileError {
    pub(crate) fn invalid(
        keyword: impl Into<String>,
        location: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        CompileError::InvalidKeyword {
            keyword: keyword.into(),
            location: location.into(),
            expected,
        }
    }
}

impl From<ResolverError> for CompileError {
    fn from(source: ResolverError) -> Self {
        let uri = match &source {
            ResolverError::NoSource { uri }
            | ResolverError::Unreachable { uri, .. }
            | ResolverError::Malformed { uri, .. }
            | ResolverError::InvalidUri { uri, .. }
            | ResolverError::UnresolvableFragment { uri, .. } => uri.clone(),
        };
        CompileError::Resolver { uri, source }
    }
}

pub type Result<T> = core::result::Result<T, CompileError>;
