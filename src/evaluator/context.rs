// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::graph::{CompiledGraph, NodeId, ResourceId};
use crate::output::{AnnotationRecord, ErrorRecord};
use crate::utils::pointer::{JsonPointer, LocationStack};
use serde_json::Value;
use std::sync::Arc;

/// Evaluation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Stop at the first failing keyword and record nothing.
    ShortCircuit,
    /// Run every keyword and record errors and annotations.
    Exhaustive,
}

/// Scratch state of one evaluation call.
pub(crate) struct EvaluationContext<'g, 'v> {
    pub graph: &'g CompiledGraph,
    pub exhaustive: bool,
    /// Whether evaluated locations must be collected for `unevaluated*`.
    pub track: bool,
    pub instance_path: LocationStack<'v>,
    pub keyword_path: LocationStack<'g>,
    pub errors: Vec<ErrorRecord>,
    pub annotations: Vec<AnnotationRecord>,
    /// Resources entered so far, outermost first.
    pub scope: Vec<ResourceId>,
    /// Absolute location of each entered node and the keyword path length at entry.
    frames: Vec<(Option<&'g Arc<str>>, usize)>,
    pub depth: usize,
}

impl<'g, 'v> EvaluationContext<'g, 'v> {
    pub fn new(graph: &'g CompiledGraph, mode: Mode) -> Self {
        Self {
            graph,
            exhaustive: mode == Mode::Exhaustive,
            track: graph.tracks_evaluated,
            instance_path: LocationStack::new(),
            keyword_path: LocationStack::new(),
            errors: Vec::new(),
            annotations: Vec::new(),
            scope: Vec::new(),
            frames: Vec::new(),
            depth: 0,
        }
    }

    pub fn enter(&mut self, node: NodeId) {
        let node = &self.graph.nodes[node];
        self.frames
            .push((node.absolute_location.as_ref(), self.keyword_path.len()));
    }

    pub fn leave(&mut self) {
        self.frames.pop();
    }

    fn absolute_location(&self) -> Option<String> {
        let (base, mark) = self.frames.last()?;
        let base = (*base)?;
        Some(format!("{base}{}", self.keyword_path.render_from(*mark)))
    }

    /// Record a failure of the current keyword. Always returns `false`.
    pub fn fail(&mut self, keyword: &str, message: impl FnOnce() -> String) -> bool {
        if self.exhaustive {
            self.errors.push(ErrorRecord {
                instance_location: self.instance_path.to_pointer(),
                keyword_location: self.keyword_path.to_pointer(),
                absolute_keyword_location: self.absolute_location(),
                keyword: keyword.to_string(),
                message: message(),
            });
        }
        false
    }

    pub fn annotate(&mut self, keyword: &str, value: impl FnOnce() -> Value) {
        if self.exhaustive {
            self.annotations.push(AnnotationRecord {
                instance_location: self.instance_path.to_pointer(),
                keyword_location: self.keyword_path.to_pointer(),
                absolute_keyword_location: self.absolute_location(),
                keyword: keyword.to_string(),
                value: value(),
            });
        }
    }

    /// Errors produced by a detached evaluation, moved under the current locations.
    pub fn adopt_errors(&mut self, errors: Vec<ErrorRecord>) {
        let instance_location = self.instance_path.to_pointer();
        let keyword_location = self.keyword_path.to_pointer();
        for mut error in errors {
            error.instance_location = instance_location.clone();
            error.keyword_location =
                JsonPointer::from(format!("{keyword_location}{}", error.keyword_location));
            self.errors.push(error);
        }
    }

    /// Start a separate evaluation of a value that does not live in the instance, such as
    /// a property name. The dynamic scope and depth carry over.
    pub fn detached<'w>(&self) -> EvaluationContext<'g, 'w> {
        EvaluationContext {
            graph: self.graph,
            exhaustive: self.exhaustive,
            track: self.track,
            instance_path: LocationStack::new(),
            keyword_path: LocationStack::new(),
            errors: Vec::new(),
            annotations: Vec::new(),
            scope: self.scope.clone(),
            frames: Vec::new(),
            depth: self.depth,
        }
    }

    pub fn marks(&self) -> (usize, usize) {
        (self.errors.len(), self.annotations.len())
    }

    pub fn truncate_errors(&mut self, mark: usize) {
        self.errors.truncate(mark);
    }

    pub fn truncate_annotations(&mut self, mark: usize) {
        self.annotations.truncate(mark);
    }
}
