// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! The binding pass and in-place cycle detection.

use super::{Compiler, DocId, PendingBinding};
use crate::draft::Draft;
use crate::error::{CompileError, ResolverError, Result};
use crate::graph::ReferenceKind;
use crate::utils::pointer::JsonPointer;
use crate::utils::uri;
use serde_json::Value;
use std::sync::Arc;

impl Compiler<'_> {
    /// Resolve one pending reference to its target node.
    pub(super) fn bind(&mut self, pending: PendingBinding) -> Result<()> {
        let PendingBinding {
            id,
            uri,
            draft,
            location,
        } = pending;
        let unresolvable = |source: Option<ResolverError>, reference: &str| {
            CompileError::UnresolvableReference {
                reference: reference.to_string(),
                location: location.clone(),
                source,
            }
        };
        let reference = self.bindings[id].reference.clone();
        let (canonical, fragment) = uri::split_fragment(&uri);

        let (doc, scope) = self
            .locate(&canonical, draft)
            .map_err(|e| unresolvable(Some(e), &reference))?;
        let document = self.documents[doc].clone();
        let (target_pointer, target_value) = document
            .resolve_fragment(&scope, &fragment)
            .map_err(|e| unresolvable(Some(e), &reference))?;
        let target_value = target_value.clone();
        let target = self.node_for(doc, target_pointer)?;

        let binding = &mut self.bindings[id];
        binding.target = target;
        self.in_place.push((binding.source, target));
        match binding.kind {
            ReferenceKind::Ref | ReferenceKind::RecursiveRef => {}
            ReferenceKind::DynamicRef => {
                // Only a reference whose static target declares the same dynamic anchor
                // consults the dynamic scope.
                let bookended = !fragment.is_empty()
                    && !fragment.starts_with('/')
                    && target_value.get("$dynamicAnchor").and_then(Value::as_str)
                        == Some(fragment.as_str());
                if bookended {
                    binding.dynamic_anchor = Some(fragment);
                }
            }
        }
        log::trace!("bound '{reference}' to node {target}");
        Ok(())
    }

    /// Find the document and root pointer of the resource `canonical`, loading it through
    /// the catalog when no known document embeds it.
    fn locate(
        &mut self,
        canonical: &str,
        draft: Draft,
    ) -> core::result::Result<(DocId, JsonPointer), ResolverError> {
        if let Some(location) = self.resources.get(canonical) {
            return Ok(location.clone());
        }
        let mut document = self.catalog.resolve(canonical)?;
        // Documents without `$schema` are read under the draft of the referencing schema.
        if !document.declares_draft() && document.draft() != draft {
            document = Arc::new(document.with_draft(draft)?);
        }
        let doc = self
            .add_document(document)
            .map_err(|e| ResolverError::unreachable(canonical, e))?;
        Ok(self
            .resources
            .get(canonical)
            .cloned()
            .unwrap_or((doc, JsonPointer::root())))
    }

    /// Reject cycles made only of in-place edges: evaluating them would never advance
    /// into the instance.
    pub(super) fn check_cycles(&self) -> Result<()> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for &(from, to) in &self.in_place {
            adjacency[from].push(to);
        }
        // A dynamic reference may land on any resource that redeclares its anchor.
        for binding in &self.bindings {
            let candidates: Vec<usize> = match binding.kind {
                ReferenceKind::DynamicRef => match &binding.dynamic_anchor {
                    Some(anchor) => self
                        .resource_infos
                        .iter()
                        .filter_map(|info| info.dynamic_anchors.get(anchor).copied())
                        .collect(),
                    None => Vec::new(),
                },
                ReferenceKind::RecursiveRef
                    if self.resource_infos[self.nodes[binding.target].resource].recursive_anchor =>
                {
                    self.resource_infos
                        .iter()
                        .filter(|info| info.recursive_anchor)
                        .filter_map(|info| info.root)
                        .collect()
                }
                _ => Vec::new(),
            };
            adjacency[binding.source].extend(candidates);
        }

        const NEW: u8 = 0;
        const ACTIVE: u8 = 1;
        const DONE: u8 = 2;
        let mut state = vec![NEW; self.nodes.len()];
        let mut path: Vec<usize> = Vec::new();

        for start in 0..self.nodes.len() {
            if state[start] != NEW {
                continue;
            }
            let mut stack = vec![(start, 0usize)];
            state[start] = ACTIVE;
            path.push(start);
            while let Some(top) = stack.last_mut() {
                let node = top.0;
                if let Some(&child) = adjacency[node].get(top.1) {
                    top.1 += 1;
                    match state[child] {
                        NEW => {
                            state[child] = ACTIVE;
                            path.push(child);
                            stack.push((child, 0));
                        }
                        ACTIVE => {
                            let from = path.iter().position(|&n| n == child).unwrap_or(0);
                            let mut chain: Vec<String> =
                                path[from..].iter().map(|&n| self.origins[n].clone()).collect();
                            chain.push(self.origins[child].clone());
                            return Err(CompileError::ReferenceCycle { chain });
                        }
                        _ => {}
                    }
                } else {
                    state[node] = DONE;
                    path.pop();
                    stack.pop();
                }
            }
        }
        Ok(())
    }
}
