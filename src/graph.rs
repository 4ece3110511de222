// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The compiled representation of a schema.
//!
//! Nodes live in an arena and refer to each other by index only, so references that point
//! back at an ancestor (or at the node itself) need no special treatment. A node is either a
//! boolean schema or an ordered list of keywords whose state was parsed at compile time.

use crate::draft::Draft;
use crate::ecma::EcmaRegex;
use crate::formats::FormatChecker;
use crate::keyword::Keyword as CustomKeyword;
use crate::utils::pointer::JsonPointer;
use crate::value::TypeSet;
use indexmap::IndexMap;
use serde_json::{Number, Value};
use std::collections::HashMap;
use std::sync::Arc;

pub type NodeId = usize;
pub type ResourceId = usize;
pub type BindingId = usize;

/// An immutable, shareable validator graph.
#[derive(Debug)]
pub struct CompiledGraph {
    pub(crate) nodes: Vec<SchemaNode>,
    pub(crate) resources: Vec<ResourceInfo>,
    pub(crate) bindings: Vec<ReferenceBinding>,
    pub(crate) root: NodeId,
    pub(crate) draft: Draft,
    /// Whether any node uses `unevaluatedProperties`/`unevaluatedItems`.
    pub(crate) tracks_evaluated: bool,
    pub(crate) max_depth: usize,
}

impl CompiledGraph {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn draft(&self) -> Draft {
        self.draft
    }

    pub fn node(&self, id: NodeId) -> &SchemaNode {
        &self.nodes[id]
    }

    pub fn nodes(&self) -> &[SchemaNode] {
        &self.nodes
    }

    pub fn bindings(&self) -> &[ReferenceBinding] {
        &self.bindings
    }

    pub fn resource(&self, id: ResourceId) -> &ResourceInfo {
        &self.resources[id]
    }

    /// Number of keywords that can reject an instance.
    pub fn checking_keywords(&self) -> usize {
        self.nodes
            .iter()
            .map(|node| match &node.body {
                NodeBody::Bool(false) => 1,
                NodeBody::Bool(true) => 0,
                NodeBody::Keywords(keywords) => keywords
                    .iter()
                    .filter(|k| !matches!(k.state, KeywordState::Annotation(_)))
                    .count(),
            })
            .sum()
    }
}

#[derive(Debug)]
pub struct SchemaNode {
    pub body: NodeBody,
    pub resource: ResourceId,
    pub draft: Draft,
    /// `<resource uri>#<pointer>` for resources with a non-default base URI.
    pub absolute_location: Option<Arc<str>>,
}

#[derive(Debug)]
pub enum NodeBody {
    Bool(bool),
    Keywords(Vec<Keyword>),
}

#[derive(Debug)]
pub struct Keyword {
    pub name: Arc<str>,
    pub state: KeywordState,
}

/// A schema resource as seen by the evaluator.
#[derive(Debug, Clone, Default)]
pub struct ResourceInfo {
    pub uri: String,
    /// `$dynamicAnchor` names declared in this resource and their subschemas.
    pub dynamic_anchors: HashMap<String, NodeId>,
    /// `$recursiveAnchor: true` at the resource root.
    pub recursive_anchor: bool,
    /// Root node, compiled for resources a `$recursiveRef` may land on.
    pub root: Option<NodeId>,
}

/// A reference site: `$ref`, `$dynamicRef` or `$recursiveRef`.
#[derive(Debug, Clone)]
pub struct ReferenceBinding {
    /// Node holding the reference.
    pub source: NodeId,
    /// The reference as written.
    pub reference: String,
    /// Absolute target URI, fragment included.
    pub uri: String,
    /// Base URI the reference was resolved against.
    pub base: String,
    pub kind: ReferenceKind,
    /// The statically resolved target, filled by the binding pass.
    pub target: NodeId,
    /// For a bookended `$dynamicRef`: the anchor name to look up in the dynamic scope.
    pub dynamic_anchor: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Ref,
    DynamicRef,
    RecursiveRef,
}

#[derive(Debug, Clone)]
pub enum Dependency {
    Required(Vec<String>),
    Schema(NodeId),
}

#[derive(Debug, Clone)]
pub struct PatternSchema {
    pub pattern: Arc<str>,
    pub regex: EcmaRegex,
    pub schema: NodeId,
}

/// Per-keyword state, parsed once at compile time.
#[derive(Debug, Clone)]
pub enum KeywordState {
    Type(TypeSet),
    Enum(Vec<Value>),
    Const(Value),
    MultipleOf(Number),
    Minimum { limit: Number, exclusive: bool },
    Maximum { limit: Number, exclusive: bool },
    MinLength(u64),
    MaxLength(u64),
    Pattern { source: Arc<str>, regex: EcmaRegex },
    MinItems(u64),
    MaxItems(u64),
    UniqueItems,
    Contains { schema: NodeId, min: u64, max: Option<u64> },
    MinProperties(u64),
    MaxProperties(u64),
    Required(Vec<String>),
    DependentRequired(Vec<(String, Vec<String>)>),
    Dependencies(Vec<(String, Dependency)>),
    Properties(IndexMap<String, NodeId>),
    PatternProperties(Vec<PatternSchema>),
    AdditionalProperties {
        schema: NodeId,
        forbidden: bool,
        known: Vec<String>,
        patterns: Vec<EcmaRegex>,
    },
    PropertyNames(NodeId),
    /// Positional subschemas: `prefixItems`, or array-form `items` before 2020-12.
    PrefixItems(Vec<NodeId>),
    /// One subschema for every item past `skip`: `items`, `additionalItems`.
    Items { schema: NodeId, skip: usize, forbidden: bool },
    AllOf(Vec<NodeId>),
    AnyOf(Vec<NodeId>),
    OneOf(Vec<NodeId>),
    Not(NodeId),
    Conditional {
        condition: NodeId,
        then: Option<NodeId>,
        otherwise: Option<NodeId>,
    },
    DependentSchemas(IndexMap<String, NodeId>),
    Ref(BindingId),
    DynamicRef(BindingId),
    RecursiveRef(BindingId),
    UnevaluatedProperties { schema: NodeId, forbidden: bool },
    UnevaluatedItems { schema: NodeId, forbidden: bool },
    Format {
        name: Arc<str>,
        checker: Option<FormatChecker>,
        assert: bool,
    },
    ContentEncoding(Arc<str>),
    ContentMediaType {
        media_type: Arc<str>,
        encoding: Option<Arc<str>>,
    },
    Custom(Arc<dyn CustomKeyword>),
    /// A keyword that only contributes its value as an annotation.
    Annotation(Value),
}

impl KeywordState {
    /// Keywords that depend on the evaluated locations reported by their siblings.
    pub fn is_deferred(&self) -> bool {
        matches!(
            self,
            KeywordState::UnevaluatedProperties { .. } | KeywordState::UnevaluatedItems { .. }
        )
    }
}

pub(crate) fn absolute_location(resource_uri: &str, relative: &JsonPointer) -> Arc<str> {
    Arc::from(format!("{resource_uri}#{relative}"))
}
