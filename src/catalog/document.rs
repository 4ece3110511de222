// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::draft::{Draft, SegmentRef};
use crate::error::ResolverError;
use crate::utils::pointer::{self, JsonPointer};
use crate::utils::uri::{self, canonical};
use serde_json::Value;
use url::Url;

/// A schema resource embedded in a document: the document root, or any subschema that
/// declares its own identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    /// Canonical URI of the resource (no fragment).
    pub uri: String,
    /// Position of the resource root inside the document.
    pub pointer: JsonPointer,
    pub draft: Draft,
    /// `$recursiveAnchor: true` at the resource root (2019-09).
    pub recursive_anchor: bool,
}

/// A plain-name fragment (`$anchor`, `$dynamicAnchor` or a legacy `#name` id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Anchor {
    /// Root pointer of the resource the anchor belongs to.
    pub scope: JsonPointer,
    pub name: String,
    /// Position of the anchored subschema.
    pub pointer: JsonPointer,
    pub dynamic: bool,
}

/// A parsed JSON document together with its identifier and draft.
///
/// Construction indexes every embedded resource and anchor, so that fragment resolution
/// is a pure lookup afterwards. Documents are immutable once built.
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    uri: String,
    base: Url,
    value: Value,
    draft: Draft,
    resources: Vec<Resource>,
    anchors: Vec<Anchor>,
}

struct Frame<'v> {
    value: &'v Value,
    pointer: JsonPointer,
    base: Url,
    draft: Draft,
}

impl SchemaDocument {
    /// Index `value`, retrieved from `retrieval`, under `draft`.
    pub fn new(retrieval: &Url, value: Value, draft: Draft) -> Result<Self, ResolverError> {
        let (resources, anchors, base) = index(retrieval, &value, draft)?;
        Ok(Self {
            uri: canonical(retrieval),
            base,
            value,
            draft,
            resources,
            anchors,
        })
    }

    /// Re-index the same value under another draft.
    pub fn with_draft(&self, draft: Draft) -> Result<Self, ResolverError> {
        let retrieval = uri::parse(&self.uri)?;
        Self::new(&retrieval, self.value.clone(), draft)
    }

    /// Canonical URI the document was retrieved from.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Base URI of the root resource, which differs from [`uri`](Self::uri) when the root
    /// declares an identifier.
    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn draft(&self) -> Draft {
        self.draft
    }

    /// Whether the document names its own draft through `$schema`.
    pub fn declares_draft(&self) -> bool {
        self.value
            .get("$schema")
            .and_then(Value::as_str)
            .and_then(Draft::from_schema_uri)
            .is_some()
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn anchors(&self) -> &[Anchor] {
        &self.anchors
    }

    /// The resource identified by a canonical URI.
    pub fn resource(&self, uri: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    /// The innermost resource that contains `pointer`.
    pub fn resource_at(&self, pointer: &JsonPointer) -> Option<&Resource> {
        self.resources
            .iter()
            .filter(|r| pointer.starts_with(&r.pointer))
            .fold(None, |best: Option<&Resource>, r| match best {
                Some(b) if b.pointer.as_str().len() >= r.pointer.as_str().len() => Some(b),
                _ => Some(r),
            })
    }

    /// Resolve a (percent-decoded) fragment relative to the resource rooted at `scope`.
    ///
    /// An empty fragment denotes the resource itself, a fragment starting with `/` is a
    /// JSON pointer, anything else is an anchor name.
    pub fn resolve_fragment(
        &self,
        scope: &JsonPointer,
        fragment: &str,
    ) -> Result<(JsonPointer, &Value), ResolverError> {
        let unresolvable = || ResolverError::UnresolvableFragment {
            uri: self.uri.clone(),
            fragment: fragment.to_string(),
        };
        let target = if fragment.is_empty() {
            scope.clone()
        } else if fragment.starts_with('/') {
            JsonPointer::from(format!("{}{fragment}", scope.as_str()))
        } else {
            self.anchors
                .iter()
                .find(|a| &a.scope == scope && a.name == fragment)
                .map(|a| a.pointer.clone())
                .ok_or_else(unresolvable)?
        };
        let value = pointer::resolve(&self.value, target.as_str()).ok_or_else(unresolvable)?;
        Ok((target, value))
    }
}

type Index = (Vec<Resource>, Vec<Anchor>, Url);

fn index(retrieval: &Url, root: &Value, draft: Draft) -> Result<Index, ResolverError> {
    let mut resources: Vec<Resource> = Vec::new();
    let mut anchors = Vec::new();
    let mut root_base = retrieval.clone();
    let mut stack = vec![Frame {
        value: root,
        pointer: JsonPointer::root(),
        base: retrieval.clone(),
        draft,
    }];

    while let Some(frame) = stack.pop() {
        let Frame {
            value,
            pointer,
            mut base,
            mut draft,
        } = frame;
        let Some(object) = value.as_object() else {
            if pointer.as_str().is_empty() {
                resources.push(resource(&base, &pointer, draft, false));
            }
            continue;
        };
        let is_root = pointer.as_str().is_empty();

        if !is_root && draft >= Draft::Draft201909 && object.contains_key(draft.id_keyword()) {
            if let Some(switched) = object
                .get("$schema")
                .and_then(Value::as_str)
                .and_then(Draft::from_schema_uri)
            {
                draft = switched;
            }
        }

        let recursive_anchor = draft == Draft::Draft201909
            && object.get("$recursiveAnchor").and_then(Value::as_bool) == Some(true);

        // Up to Draft 7 a `$ref` hides every sibling, identifiers included.
        let ref_hides_id = draft.ref_overrides_siblings() && object.contains_key("$ref");
        let id = object
            .get(draft.id_keyword())
            .and_then(Value::as_str)
            .filter(|_| !ref_hides_id);

        let mut declared = false;
        match id {
            Some(id) if draft <= Draft::Draft7 && id.starts_with('#') => {
                anchors.push(Anchor {
                    scope: scope_of(&resources, &pointer),
                    name: uri::percent_decode(&id[1..]),
                    pointer: pointer.clone(),
                    dynamic: false,
                });
            }
            Some(id) => {
                let joined = uri::join(&base, id)?;
                let fragment = joined.fragment().map(uri::percent_decode);
                let mut resolved = joined.clone();
                resolved.set_fragment(None);
                resources.push(resource(&resolved, &pointer, draft, recursive_anchor));
                declared = true;
                if let Some(name) = fragment.filter(|f| !f.is_empty()) {
                    anchors.push(Anchor {
                        scope: pointer.clone(),
                        name,
                        pointer: pointer.clone(),
                        dynamic: false,
                    });
                }
                base = resolved;
                if is_root {
                    root_base = base.clone();
                }
            }
            None => {}
        }

        if is_root && (!declared || canonical(retrieval) != canonical(&root_base)) {
            resources.push(resource(retrieval, &pointer, draft, recursive_anchor));
        }

        if draft >= Draft::Draft201909 {
            let scope = scope_of(&resources, &pointer);
            if let Some(name) = object.get("$anchor").and_then(Value::as_str) {
                anchors.push(Anchor {
                    scope: scope.clone(),
                    name: name.to_string(),
                    pointer: pointer.clone(),
                    dynamic: false,
                });
            }
            if draft == Draft::Draft202012 {
                if let Some(name) = object.get("$dynamicAnchor").and_then(Value::as_str) {
                    anchors.push(Anchor {
                        scope,
                        name: name.to_string(),
                        pointer: pointer.clone(),
                        dynamic: true,
                    });
                }
            }
        }

        let mut children = draft.subschemas(value);
        children.reverse();
        for (segments, child) in children {
            let mut child_pointer = pointer.clone();
            for segment in segments {
                child_pointer = match segment {
                    SegmentRef::Key(key) => child_pointer.join(key),
                    SegmentRef::Index(i) => child_pointer.join_index(i),
                };
            }
            stack.push(Frame {
                value: child,
                pointer: child_pointer,
                base: base.clone(),
                draft,
            });
        }
    }

    Ok((resources, anchors, root_base))
}

fn resource(uri: &Url, pointer: &JsonPointer, draft: Draft, recursive_anchor: bool) -> Resource {
    Resource {
        uri: canonical(uri),
        pointer: pointer.clone(),
        draft,
        recursive_anchor,
    }
}

/// Root pointer of the innermost resource enclosing `pointer`.
fn scope_of(resources: &[Resource], pointer: &JsonPointer) -> JsonPointer {
    resources
        .iter()
        .filter(|r| pointer.starts_with(&r.pointer))
        .map(|r| &r.pointer)
        .max_by_key(|p| p.as_str().len())
        .cloned()
        .unwrap_or_default()
}
