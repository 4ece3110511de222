// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Evaluator.
//!
//! A synchronous walk over the compiled graph. Each schema object runs its keywords in
//! compiled order, which places `unevaluatedProperties`/`unevaluatedItems` after every
//! sibling, and returns the instance locations it evaluated so that enclosing in-place
//! applicators (`allOf`, `$ref`, `if`, ...) can pass them up to the keywords that need them.
//!
//! In short-circuit mode a schema object stops at its first failing keyword and nothing is
//! recorded. In exhaustive mode every keyword runs; errors of failing subschemas that do not
//! decide the outcome (a failed `anyOf` branch when another branch passed, the `if` schema)
//! are discarded, and annotations of a schema object are dropped when it fails.

use crate::draft::Draft;
use crate::graph::{
    BindingId, CompiledGraph, Dependency, Keyword, KeywordState, NodeBody, NodeId, SchemaNode,
};
use crate::output::Evaluation;
use crate::value::render;
use serde_json::Value;

mod assertions;
mod context;
mod evaluated;

use assertions::quote;
pub(crate) use context::{EvaluationContext, Mode};
use evaluated::Evaluated;

#[cfg(test)]
mod tests;

/// Result of evaluating one schema object.
pub(crate) struct Outcome<'v> {
    pub valid: bool,
    evaluated: Evaluated<'v>,
}

/// Evaluate `instance` against the root of `graph`.
pub(crate) fn evaluate(graph: &CompiledGraph, instance: &Value, mode: Mode) -> Evaluation {
    let mut ctx = EvaluationContext::new(graph, mode);
    let outcome = ctx.node(graph.root, instance);
    Evaluation::new(outcome.valid, ctx.errors, ctx.annotations)
}

/// Short-circuit check of `instance` against the root of `graph`.
pub(crate) fn is_valid(graph: &CompiledGraph, instance: &Value) -> bool {
    EvaluationContext::new(graph, Mode::ShortCircuit)
        .node(graph.root, instance)
        .valid
}

impl<'g, 'v> EvaluationContext<'g, 'v> {
    pub(crate) fn node(&mut self, id: NodeId, instance: &'v Value) -> Outcome<'v> {
        let graph = self.graph;
        let node = &graph.nodes[id];
        let mut evaluated = Evaluated::new(self.track);

        if self.depth >= graph.max_depth {
            let valid = self.fail("$ref", || {
                format!("Maximum evaluation depth of {} exceeded", graph.max_depth)
            });
            return Outcome { valid, evaluated };
        }

        let keywords = match &node.body {
            NodeBody::Bool(true) => {
                return Outcome {
                    valid: true,
                    evaluated,
                }
            }
            NodeBody::Bool(false) => {
                self.enter(id);
                let valid = self.fail("false", || {
                    format!("False schema does not allow {}", render(instance))
                });
                self.leave();
                return Outcome { valid, evaluated };
            }
            NodeBody::Keywords(keywords) => keywords,
        };

        self.depth += 1;
        let entered = self.scope.last() != Some(&node.resource);
        if entered {
            self.scope.push(node.resource);
        }
        self.enter(id);
        let (_, annotation_mark) = self.marks();

        let mut valid = true;
        for keyword in keywords {
            self.keyword_path.push_key(&keyword.name);
            let keyword_valid = self.keyword(node, keyword, instance, &mut evaluated);
            self.keyword_path.pop();
            if !keyword_valid {
                valid = false;
                if !self.exhaustive {
                    break;
                }
            }
        }

        self.leave();
        if entered {
            self.scope.pop();
        }
        self.depth -= 1;

        if !valid {
            self.truncate_annotations(annotation_mark);
            evaluated = Evaluated::new(self.track);
        }
        Outcome { valid, evaluated }
    }

    fn keyword(
        &mut self,
        node: &'g SchemaNode,
        keyword: &'g Keyword,
        instance: &'v Value,
        evaluated: &mut Evaluated<'v>,
    ) -> bool {
        let name: &'g str = &keyword.name;
        if let Some(valid) =
            self.assertion(name, &keyword.state, node.draft.legacy_integers(), instance)
        {
            return valid;
        }

        match &keyword.state {
            KeywordState::Properties(..)
            | KeywordState::PatternProperties(..)
            | KeywordState::AdditionalProperties { .. }
            | KeywordState::PropertyNames(..)
            | KeywordState::DependentSchemas(..)
            | KeywordState::Dependencies(..) => {
                self.object_keyword(name, &keyword.state, instance, evaluated)
            }
            KeywordState::PrefixItems(..)
            | KeywordState::Items { .. }
            | KeywordState::Contains { .. } => {
                self.array_keyword(name, &keyword.state, instance, evaluated, node.draft)
            }
            KeywordState::AllOf(..)
            | KeywordState::AnyOf(..)
            | KeywordState::OneOf(..)
            | KeywordState::Not(..)
            | KeywordState::Conditional { .. }
            | KeywordState::Ref(..)
            | KeywordState::DynamicRef(..)
            | KeywordState::RecursiveRef(..) => {
                self.in_place_keyword(name, &keyword.state, instance, evaluated)
            }
            KeywordState::UnevaluatedProperties { .. }
            | KeywordState::UnevaluatedItems { .. } => {
                self.unevaluated_keyword(name, &keyword.state, instance, evaluated)
            }
            _ => true,
        }
    }

    /// Object applicators.
    #[inline(never)]
    fn object_keyword(
        &mut self,
        name: &'g str,
        state: &'g KeywordState,
        instance: &'v Value,
        evaluated: &mut Evaluated<'v>,
    ) -> bool {
        match state {
            KeywordState::Properties(properties) => {
                let Value::Object(object) = instance else {
                    return true;
                };
                let mut valid = true;
                let mut matched = Vec::new();
                for (property, &schema) in properties {
                    let Some((key, value)) = object.get_key_value(property) else {
                        continue;
                    };
                    evaluated.property(key);
                    matched.push(key.as_str());
                    self.keyword_path.push_key(property);
                    let child_valid = self.child_key(schema, key, value);
                    self.keyword_path.pop();
                    if !child_valid {
                        valid = false;
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                if valid && !matched.is_empty() {
                    self.annotate(name, || names(&matched));
                }
                valid
            }
            KeywordState::PatternProperties(patterns) => {
                let Value::Object(object) = instance else {
                    return true;
                };
                let mut valid = true;
                let mut matched = Vec::new();
                'properties: for (key, value) in object {
                    let mut hit = false;
                    for pattern in patterns {
                        if !pattern.regex.is_match(key) {
                            continue;
                        }
                        hit = true;
                        self.keyword_path.push_key(&pattern.pattern);
                        let child_valid = self.child_key(pattern.schema, key, value);
                        self.keyword_path.pop();
                        if !child_valid {
                            valid = false;
                            if !self.exhaustive {
                                break 'properties;
                            }
                        }
                    }
                    if hit {
                        evaluated.property(key);
                        matched.push(key.as_str());
                    }
                }
                if valid && !matched.is_empty() {
                    self.annotate(name, || names(&matched));
                }
                valid
            }
            KeywordState::AdditionalProperties {
                schema,
                forbidden,
                known,
                patterns,
            } => {
                let Value::Object(object) = instance else {
                    return true;
                };
                let mut valid = true;
                let mut matched = Vec::new();
                let mut unexpected = Vec::new();
                for (key, value) in object {
                    if known.iter().any(|k| k == key) || patterns.iter().any(|p| p.is_match(key))
                    {
                        continue;
                    }
                    evaluated.property(key);
                    if *forbidden {
                        unexpected.push(format!("'{key}'"));
                        if !self.exhaustive {
                            break;
                        }
                        continue;
                    }
                    matched.push(key.as_str());
                    if !self.child_key(*schema, key, value) {
                        valid = false;
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                if !unexpected.is_empty() {
                    return self.fail(name, || {
                        unexpected_message("Additional properties are not allowed", &unexpected)
                    });
                }
                if valid && !matched.is_empty() {
                    self.annotate(name, || names(&matched));
                }
                valid
            }
            KeywordState::PropertyNames(schema) => {
                let Value::Object(object) = instance else {
                    return true;
                };
                let mut valid = true;
                for key in object.keys() {
                    let property = Value::String(key.clone());
                    let mut detached = self.detached();
                    let outcome = detached.node(*schema, &property);
                    if !outcome.valid {
                        valid = false;
                        let errors = detached.errors;
                        self.adopt_errors(errors);
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                valid
            }
            KeywordState::DependentSchemas(schemas) => {
                let Value::Object(object) = instance else {
                    return true;
                };
                let mut valid = true;
                for (property, &schema) in schemas {
                    if !object.contains_key(property) {
                        continue;
                    }
                    self.keyword_path.push_key(property);
                    let outcome = self.node(schema, instance);
                    self.keyword_path.pop();
                    if outcome.valid {
                        evaluated.merge(outcome.evaluated);
                    } else {
                        valid = false;
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                valid
            }
            KeywordState::Dependencies(dependencies) => {
                let Value::Object(object) = instance else {
                    return true;
                };
                let mut valid = true;
                for (property, dependency) in dependencies {
                    if !object.contains_key(property) {
                        continue;
                    }
                    match dependency {
                        Dependency::Required(required) => {
                            for dependency in required {
                                if !object.contains_key(dependency) {
                                    valid = self.fail(name, || {
                                        format!(
                                            "{} is a dependency of {}",
                                            quote(dependency),
                                            quote(property)
                                        )
                                    });
                                }
                            }
                        }
                        Dependency::Schema(schema) => {
                            self.keyword_path.push_key(property);
                            let outcome = self.node(*schema, instance);
                            self.keyword_path.pop();
                            valid &= outcome.valid;
                        }
                    }
                    if !valid && !self.exhaustive {
                        break;
                    }
                }
                valid
            }
            _ => true,
        }
    }

    #[inline(never)]
    fn array_keyword(
        &mut self,
        name: &'g str,
        state: &'g KeywordState,
        instance: &'v Value,
        evaluated: &mut Evaluated<'v>,
        draft: Draft,
    ) -> bool {
        match state {
            KeywordState::PrefixItems(schemas) => {
                let Value::Array(items) = instance else {
                    return true;
                };
                let mut valid = true;
                for (index, (item, &schema)) in items.iter().zip(schemas).enumerate() {
                    self.keyword_path.push_index(index);
                    let child_valid = self.child_index(schema, index, item);
                    self.keyword_path.pop();
                    if !child_valid {
                        valid = false;
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                let applied = items.len().min(schemas.len());
                evaluated.prefix(applied);
                if valid && applied > 0 {
                    self.annotate(name, || {
                        if applied == items.len() {
                            Value::Bool(true)
                        } else {
                            Value::from(applied - 1)
                        }
                    });
                }
                valid
            }
            KeywordState::Items {
                schema,
                skip,
                forbidden,
            } => {
                let Value::Array(items) = instance else {
                    return true;
                };
                if items.len() <= *skip {
                    return true;
                }
                if *forbidden {
                    return self.fail(name, || {
                        let rest: Vec<String> = items[*skip..].iter().map(render).collect();
                        unexpected_message("Additional items are not allowed", &rest)
                    });
                }
                let mut valid = true;
                for (index, item) in items.iter().enumerate().skip(*skip) {
                    if !self.child_index(*schema, index, item) {
                        valid = false;
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                evaluated.all_items();
                if valid {
                    self.annotate(name, || Value::Bool(true));
                }
                valid
            }
            KeywordState::Contains { schema, min, max } => {
                let Value::Array(items) = instance else {
                    return true;
                };
                let (error_mark, _) = self.marks();
                let mut matched = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    if self.child_index(*schema, index, item) {
                        matched.push(index);
                    }
                }
                self.truncate_errors(error_mark);
                if draft >= Draft::Draft202012 {
                    for &index in &matched {
                        evaluated.item(index);
                    }
                }
                let count = matched.len() as u64;
                if count < *min {
                    return self.fail(name, || {
                        if count == 0 {
                            format!(
                                "None of {} are valid under the given schema",
                                render(instance)
                            )
                        } else {
                            format!(
                                "Too few items match the given schema (expected at least {min} but only {count} matched)"
                            )
                        }
                    });
                }
                if let Some(max) = max {
                    if count > *max {
                        return self.fail(name, || {
                            format!(
                                "Too many items match the given schema (expected at most {max})"
                            )
                        });
                    }
                }
                self.annotate(name, || Value::from(matched));
                true
            }
            _ => true,
        }
    }

    /// Applicators that evaluate subschemas against the same instance.
    #[inline(never)]
    fn in_place_keyword(
        &mut self,
        name: &'g str,
        state: &'g KeywordState,
        instance: &'v Value,
        evaluated: &mut Evaluated<'v>,
    ) -> bool {
        match state {
            KeywordState::AllOf(schemas) => {
                let mut valid = true;
                for (index, &schema) in schemas.iter().enumerate() {
                    self.keyword_path.push_index(index);
                    let outcome = self.node(schema, instance);
                    self.keyword_path.pop();
                    if outcome.valid {
                        evaluated.merge(outcome.evaluated);
                    } else {
                        valid = false;
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                valid
            }
            KeywordState::AnyOf(schemas) => {
                let (error_mark, _) = self.marks();
                let mut any = false;
                for (index, &schema) in schemas.iter().enumerate() {
                    self.keyword_path.push_index(index);
                    let outcome = self.node(schema, instance);
                    self.keyword_path.pop();
                    if outcome.valid {
                        any = true;
                        evaluated.merge(outcome.evaluated);
                        // Later branches only matter for what they record or evaluate.
                        if !self.exhaustive && !self.track {
                            break;
                        }
                    }
                }
                if any {
                    self.truncate_errors(error_mark);
                }
                any
            }
            KeywordState::OneOf(schemas) => {
                let (error_mark, _) = self.marks();
                let mut first = None;
                let mut count = 0;
                for (index, &schema) in schemas.iter().enumerate() {
                    self.keyword_path.push_index(index);
                    let outcome = self.node(schema, instance);
                    self.keyword_path.pop();
                    if outcome.valid {
                        count += 1;
                        if first.is_none() {
                            first = Some(outcome.evaluated);
                        }
                        if count > 1 && !self.exhaustive {
                            break;
                        }
                    }
                }
                match (count, first) {
                    (0, _) => false,
                    (1, Some(branch)) => {
                        self.truncate_errors(error_mark);
                        evaluated.merge(branch);
                        true
                    }
                    _ => {
                        self.truncate_errors(error_mark);
                        self.fail(name, || {
                            format!(
                                "{} is valid under more than one of the schemas listed in the 'oneOf' keyword",
                                render(instance)
                            )
                        })
                    }
                }
            }
            KeywordState::Not(schema) => {
                let (error_mark, annotation_mark) = self.marks();
                let outcome = self.node(*schema, instance);
                self.truncate_errors(error_mark);
                self.truncate_annotations(annotation_mark);
                if outcome.valid {
                    self.fail(name, || {
                        format!(
                            "{} should not be valid under the given schema",
                            render(instance)
                        )
                    })
                } else {
                    true
                }
            }
            KeywordState::Conditional {
                condition,
                then,
                otherwise,
            } => {
                let (error_mark, _) = self.marks();
                let outcome = self.node(*condition, instance);
                self.truncate_errors(error_mark);
                let branch = if outcome.valid {
                    evaluated.merge(outcome.evaluated);
                    then.map(|schema| ("then", schema))
                } else {
                    otherwise.map(|schema| ("else", schema))
                };
                let Some((branch, schema)) = branch else {
                    return true;
                };
                self.keyword_path.pop();
                self.keyword_path.push_key(branch);
                let outcome = self.node(schema, instance);
                self.keyword_path.pop();
                self.keyword_path.push_key(name);
                if outcome.valid {
                    evaluated.merge(outcome.evaluated);
                }
                outcome.valid
            }
            KeywordState::Ref(binding) => {
                let target = self.graph.bindings[*binding].target;
                self.reference(target, instance, evaluated)
            }
            KeywordState::DynamicRef(binding) => {
                let target = self.dynamic_target(*binding);
                self.reference(target, instance, evaluated)
            }
            KeywordState::RecursiveRef(binding) => {
                let target = self.recursive_target(*binding);
                self.reference(target, instance, evaluated)
            }
            _ => true,
        }
    }

    #[inline(never)]
    fn unevaluated_keyword(
        &mut self,
        name: &'g str,
        state: &'g KeywordState,
        instance: &'v Value,
        evaluated: &mut Evaluated<'v>,
    ) -> bool {
        match state {
            KeywordState::UnevaluatedProperties { schema, forbidden } => {
                let Value::Object(object) = instance else {
                    return true;
                };
                let mut valid = true;
                let mut matched = Vec::new();
                let mut unexpected = Vec::new();
                for (key, value) in object {
                    if evaluated.has_property(key) {
                        continue;
                    }
                    if *forbidden {
                        unexpected.push(format!("'{key}'"));
                        if !self.exhaustive {
                            break;
                        }
                        continue;
                    }
                    matched.push(key.as_str());
                    if !self.child_key(*schema, key, value) {
                        valid = false;
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                evaluated.all_properties();
                if !unexpected.is_empty() {
                    return self.fail(name, || {
                        unexpected_message("Unevaluated properties are not allowed", &unexpected)
                    });
                }
                if valid && !matched.is_empty() {
                    self.annotate(name, || names(&matched));
                }
                valid
            }
            KeywordState::UnevaluatedItems { schema, forbidden } => {
                let Value::Array(items) = instance else {
                    return true;
                };
                let mut valid = true;
                let mut applied = false;
                let mut unexpected = Vec::new();
                for (index, item) in items.iter().enumerate() {
                    if evaluated.has_item(index) {
                        continue;
                    }
                    if *forbidden {
                        unexpected.push(render(item));
                        if !self.exhaustive {
                            break;
                        }
                        continue;
                    }
                    applied = true;
                    if !self.child_index(*schema, index, item) {
                        valid = false;
                        if !self.exhaustive {
                            break;
                        }
                    }
                }
                evaluated.all_items();
                if !unexpected.is_empty() {
                    return self.fail(name, || {
                        unexpected_message("Unevaluated items are not allowed", &unexpected)
                    });
                }
                if valid && applied {
                    self.annotate(name, || Value::Bool(true));
                }
                valid
            }
            _ => true,
        }
    }

    fn child_key(&mut self, schema: NodeId, key: &'v str, value: &'v Value) -> bool {
        self.instance_path.push_key(key);
        let valid = self.node(schema, value).valid;
        self.instance_path.pop();
        valid
    }

    fn child_index(&mut self, schema: NodeId, index: usize, value: &'v Value) -> bool {
        self.instance_path.push_index(index);
        let valid = self.node(schema, value).valid;
        self.instance_path.pop();
        valid
    }

    fn reference(
        &mut self,
        target: NodeId,
        instance: &'v Value,
        evaluated: &mut Evaluated<'v>,
    ) -> bool {
        let outcome = self.node(target, instance);
        if outcome.valid {
            evaluated.merge(outcome.evaluated);
        }
        outcome.valid
    }

    /// The outermost resource in the dynamic scope that declares the anchor wins.
    fn dynamic_target(&self, binding: BindingId) -> NodeId {
        let graph = self.graph;
        let binding = &graph.bindings[binding];
        let Some(anchor) = &binding.dynamic_anchor else {
            return binding.target;
        };
        self.scope
            .iter()
            .find_map(|&resource| graph.resources[resource].dynamic_anchors.get(anchor))
            .copied()
            .unwrap_or(binding.target)
    }

    /// Walk outwards through resources marked `$recursiveAnchor: true` and take the last one.
    fn recursive_target(&self, binding: BindingId) -> NodeId {
        let graph = self.graph;
        let mut target = graph.bindings[binding].target;
        let initial = &graph.resources[graph.nodes[target].resource];
        if !initial.recursive_anchor {
            return target;
        }
        for &resource in self.scope.iter().rev() {
            let info = &graph.resources[resource];
            match (info.recursive_anchor, info.root) {
                (true, Some(root)) => target = root,
                _ => break,
            }
        }
        target
    }
}

fn names(names: &[&str]) -> Value {
    Value::Array(
        names
            .iter()
            .map(|name| Value::String(name.to_string()))
            .collect(),
    )
}

fn unexpected_message(prefix: &str, unexpected: &[String]) -> String {
    let verb = if unexpected.len() == 1 { "was" } else { "were" };
    format!("{prefix} ({} {verb} unexpected)", unexpected.join(", "))
}
