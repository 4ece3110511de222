// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Schema compiler.
//!
//! Compilation is a work-queue walk rather than a recursion over the schema. Every subschema
//! position `(document, JSON pointer)` gets exactly one arena node, allocated on first
//! request and compiled when it is popped from the queue. References only record a pending
//! binding; once the queue drains, the binding pass resolves them (fetching remote documents
//! through the catalog), which may request new nodes, and the two phases alternate until
//! both are empty. Forward and cyclic references therefore need no special handling.

use crate::catalog::{Catalog, SchemaDocument};
use crate::draft::Draft;
use crate::error::{CompileError, Result};
use crate::graph::{
    absolute_location, BindingId, CompiledGraph, NodeBody, NodeId, ReferenceBinding,
    ReferenceKind, ResourceId, ResourceInfo, SchemaNode,
};
use crate::utils::pointer::{self, JsonPointer};
use crate::utils::uri;
use crate::validator::ValidationOptions;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use url::Url;

mod context;
mod keywords;
mod refs;

use context::SchemaContext;


pub(crate) type DocId = usize;

/// A reference waiting for the binding pass.
struct PendingBinding {
    id: BindingId,
    uri: Url,
    draft: Draft,
    location: String,
}

pub(crate) struct Compiler<'o> {
    options: &'o ValidationOptions,
    catalog: Arc<Catalog>,
    documents: Vec<Arc<SchemaDocument>>,
    /// Resource URI to its document and root pointer. Resources of documents loaded
    /// earlier shadow later ones, so the root document wins over the catalog.
    resources: HashMap<String, (DocId, JsonPointer)>,
    resource_ids: HashMap<(DocId, JsonPointer), ResourceId>,
    resource_infos: Vec<ResourceInfo>,
    nodes: Vec<SchemaNode>,
    /// `<uri>#<pointer>` of every node, for diagnostics.
    origins: Vec<String>,
    node_ids: HashMap<(DocId, JsonPointer), NodeId>,
    queue: VecDeque<(NodeId, DocId, JsonPointer)>,
    bindings: Vec<ReferenceBinding>,
    pending: Vec<PendingBinding>,
    /// Edges that apply a subschema to the same instance location.
    in_place: Vec<(NodeId, NodeId)>,
    tracks_evaluated: bool,
}

/// Compile `schema` into a validator graph.
pub(crate) fn compile(schema: &Value, options: &ValidationOptions) -> Result<CompiledGraph> {
    let catalog = options
        .catalog
        .clone()
        .unwrap_or_else(|| Arc::new(Catalog::new()));
    let draft = options.draft.unwrap_or_else(|| Draft::detect(schema));
    let base = match &options.base_uri {
        Some(base) => uri::parse(base)?,
        None => uri::default_base(),
    };
    let document = SchemaDocument::new(&base, schema.clone(), draft)?;

    let mut compiler = Compiler::new(options, catalog);
    let root_doc = compiler.add_document(Arc::new(document))?;
    let root = compiler.node_for(root_doc, JsonPointer::root())?;

    loop {
        while let Some((node, doc, pointer)) = compiler.queue.pop_front() {
            compiler.compile_node(node, doc, pointer)?;
        }
        if compiler.pending.is_empty() {
            break;
        }
        for pending in core::mem::take(&mut compiler.pending) {
            compiler.bind(pending)?;
        }
    }
    compiler.check_cycles()?;

    log::debug!(
        "compiled {draft} schema: {} nodes, {} bindings, {} documents",
        compiler.nodes.len(),
        compiler.bindings.len(),
        compiler.documents.len()
    );

    Ok(CompiledGraph {
        nodes: compiler.nodes,
        resources: compiler.resource_infos,
        bindings: compiler.bindings,
        root,
        draft,
        tracks_evaluated: compiler.tracks_evaluated,
        max_depth: options.max_depth,
    })
}

impl<'o> Compiler<'o> {
    fn new(options: &'o ValidationOptions, catalog: Arc<Catalog>) -> Self {
        Self {
            options,
            catalog,
            documents: Vec::new(),
            resources: HashMap::new(),
            resource_ids: HashMap::new(),
            resource_infos: Vec::new(),
            nodes: Vec::new(),
            origins: Vec::new(),
            node_ids: HashMap::new(),
            queue: VecDeque::new(),
            bindings: Vec::new(),
            pending: Vec::new(),
            in_place: Vec::new(),
            tracks_evaluated: false,
        }
    }

    /// Make a document's resources and dynamic anchors known to the compiler.
    fn add_document(&mut self, document: Arc<SchemaDocument>) -> Result<DocId> {
        let doc = self.documents.len();
        self.documents.push(document.clone());

        for resource in document.resources() {
            self.resources
                .entry(resource.uri.clone())
                .or_insert_with(|| (doc, resource.pointer.clone()));
            let key = (doc, resource.pointer.clone());
            if !self.resource_ids.contains_key(&key) {
                self.resource_ids.insert(key, self.resource_infos.len());
                self.resource_infos.push(ResourceInfo {
                    uri: resource.uri.clone(),
                    dynamic_anchors: HashMap::new(),
                    recursive_anchor: resource.recursive_anchor,
                    root: None,
                });
            }
        }

        for resource in document.resources().iter().filter(|r| r.recursive_anchor) {
            let node = self.node_for(doc, resource.pointer.clone())?;
            if let Some(&id) = self.resource_ids.get(&(doc, resource.pointer.clone())) {
                self.resource_infos[id].root = Some(node);
            }
        }

        for anchor in document.anchors().iter().filter(|a| a.dynamic) {
            let node = self.node_for(doc, anchor.pointer.clone())?;
            if let Some(&resource) = self.resource_ids.get(&(doc, anchor.scope.clone())) {
                self.resource_infos[resource]
                    .dynamic_anchors
                    .entry(anchor.name.clone())
                    .or_insert(node);
            }
        }
        Ok(doc)
    }

    /// The node for a subschema position, allocated and queued on first request.
    fn node_for(&mut self, doc: DocId, pointer: JsonPointer) -> Result<NodeId> {
        if let Some(&id) = self.node_ids.get(&(doc, pointer.clone())) {
            return Ok(id);
        }
        let document = &self.documents[doc];
        let resource = document
            .resource_at(&pointer)
            .ok_or_else(|| CompileError::InvalidSchema {
                location: pointer.to_string(),
            })?;
        let resource_id = self
            .resource_ids
            .get(&(doc, resource.pointer.clone()))
            .copied()
            .unwrap_or_default();
        let relative = JsonPointer::from(
            pointer
                .as_str()
                .get(resource.pointer.as_str().len()..)
                .unwrap_or_default(),
        );
        let absolute = (!uri::is_default_base(&resource.uri))
            .then(|| absolute_location(&resource.uri, &relative));

        let id = self.nodes.len();
        self.nodes.push(SchemaNode {
            body: NodeBody::Bool(true),
            resource: resource_id,
            draft: resource.draft,
            absolute_location: absolute,
        });
        self.origins.push(format!("{}#{relative}", resource.uri));
        self.node_ids.insert((doc, pointer.clone()), id);
        self.queue.push_back((id, doc, pointer));
        Ok(id)
    }

    fn compile_node(&mut self, node: NodeId, doc: DocId, pointer: JsonPointer) -> Result<()> {
        let document = self.documents[doc].clone();
        let draft = self.nodes[node].draft;
        let base = match document.resource_at(&pointer) {
            Some(resource) => uri::parse(&resource.uri)?,
            None => document.base().clone(),
        };
        let ctx = SchemaContext {
            node,
            doc,
            pointer,
            base,
            draft,
            document: document.clone(),
        };
        let value = pointer::resolve(document.value(), ctx.pointer.as_str()).ok_or_else(|| {
            CompileError::InvalidSchema {
                location: ctx.location_of(&ctx.pointer),
            }
        })?;
        let body = match value {
            Value::Bool(b) => NodeBody::Bool(*b),
            Value::Object(object) => NodeBody::Keywords(self.compile_keywords(&ctx, object)?),
            _ => {
                return Err(CompileError::InvalidSchema {
                    location: ctx.location_of(&ctx.pointer),
                })
            }
        };
        self.nodes[node].body = body;
        Ok(())
    }

    /// Request the node for a subschema below the current one.
    fn subschema(&mut self, ctx: &SchemaContext, child: JsonPointer, in_place: bool) -> Result<NodeId> {
        let node = self.node_for(ctx.doc, child)?;
        if in_place {
            self.in_place.push((ctx.node, node));
        }
        Ok(node)
    }

    /// Record a reference for the binding pass.
    fn reference(
        &mut self,
        ctx: &SchemaContext,
        keyword: &str,
        reference: &str,
        kind: ReferenceKind,
    ) -> Result<BindingId> {
        let location = ctx.location(keyword);
        let uri = uri::join(&ctx.base, reference).map_err(|e| {
            CompileError::UnresolvableReference {
                reference: reference.to_string(),
                location: location.clone(),
                source: Some(e),
            }
        })?;
        let id = self.bindings.len();
        self.bindings.push(ReferenceBinding {
            source: ctx.node,
            reference: reference.to_string(),
            uri: uri.to_string(),
            base: ctx.base.to_string(),
            kind,
            target: ctx.node,
            dynamic_anchor: None,
        });
        self.pending.push(PendingBinding {
            id,
            uri,
            draft: ctx.draft,
            location,
        });
        Ok(id)
    }
}
