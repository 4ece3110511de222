// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-node compilation context.

use super::DocId;
use crate::catalog::SchemaDocument;
use crate::draft::Draft;
use crate::graph::NodeId;
use crate::utils::pointer::JsonPointer;
use crate::utils::uri;
use std::sync::Arc;
use url::Url;

/// Where the node being compiled lives, and under which rules it is compiled.
pub(crate) struct SchemaContext {
    pub node: NodeId,
    pub doc: DocId,
    /// Position of the schema object inside its document.
    pub pointer: JsonPointer,
    /// Base URI for relative references.
    pub base: Url,
    pub draft: Draft,
    pub document: Arc<SchemaDocument>,
}

impl SchemaContext {
    /// Pointer to a keyword of this schema object.
    pub fn keyword(&self, keyword: &str) -> JsonPointer {
        self.pointer.join(keyword)
    }

    /// Pointer to an entry below a keyword, e.g. `properties/name` or `allOf/0`.
    pub fn member(&self, keyword: &str, name: &str) -> JsonPointer {
        self.pointer.join(keyword).join(name)
    }

    pub fn element(&self, keyword: &str, index: usize) -> JsonPointer {
        self.pointer.join(keyword).join_index(index)
    }

    /// Location of a keyword for diagnostics.
    pub fn location(&self, keyword: &str) -> String {
        self.location_of(&self.keyword(keyword))
    }

    /// Diagnostic form of a pointer: bare for the root document, `<uri>#<pointer>` for
    /// documents with an identifier.
    pub fn location_of(&self, pointer: &JsonPointer) -> String {
        if uri::is_default_base(self.document.uri()) {
            pointer.to_string()
        } else {
            format!("{}#{pointer}", self.document.uri())
        }
    }
}
