// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Parsing of keyword values into typed [`KeywordState`].

use super::{Compiler, SchemaContext};
use crate::draft::{Draft, KeywordKind};
use crate::ecma::EcmaRegex;
use crate::error::{CompileError, Result};
use crate::formats;
use crate::graph::{Dependency, Keyword, KeywordState, NodeId, PatternSchema, ReferenceKind};
use crate::value::{PrimitiveType, TypeSet};
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use std::sync::Arc;

type Object = Map<String, Value>;

impl Compiler<'_> {
    /// Compile the members of a schema object, in declaration order except that
    /// `unevaluated*` keywords always come last.
    pub(super) fn compile_keywords(
        &mut self,
        ctx: &SchemaContext,
        object: &Object,
    ) -> Result<Vec<Keyword>> {
        let mut keywords = Vec::with_capacity(object.len());
        let mut deferred = Vec::new();

        // Up to Draft 7 `$ref` replaces the whole schema object.
        if ctx.draft.ref_overrides_siblings() {
            if let Some(reference) = object.get("$ref") {
                let state = self.reference_keyword(ctx, "$ref", reference, ReferenceKind::Ref)?;
                keywords.push(Keyword {
                    name: Arc::from("$ref"),
                    state,
                });
                return Ok(keywords);
            }
        }

        for (name, value) in object {
            let state = if let Some(factory) = self.options.keywords.get(name.as_str()) {
                let location = ctx.location(name);
                let keyword = factory.compile(value, &location).map_err(|reason| {
                    CompileError::CustomKeyword {
                        keyword: name.clone(),
                        location,
                        reason: Arc::from(reason),
                    }
                })?;
                Some(KeywordState::Custom(keyword))
            } else {
                match ctx.draft.keyword(name) {
                    Some(kind) => self.compile_keyword(ctx, object, kind, name, value)?,
                    None => Some(KeywordState::Annotation(value.clone())),
                }
            };
            if let Some(state) = state {
                let keyword = Keyword {
                    name: Arc::from(name.as_str()),
                    state,
                };
                if keyword.state.is_deferred() {
                    deferred.push(keyword);
                } else {
                    keywords.push(keyword);
                }
            }
        }
        keywords.extend(deferred);
        Ok(keywords)
    }

    fn compile_keyword(
        &mut self,
        ctx: &SchemaContext,
        object: &Object,
        kind: KeywordKind,
        name: &str,
        value: &Value,
    ) -> Result<Option<KeywordState>> {
        use KeywordKind::*;
        let state = match kind {
            // Handled by the document index, or folded into a sibling keyword.
            Schema | Id | LegacyId | Anchor | DynamicAnchor | RecursiveAnchor | Defs
            | Definitions | Vocabulary | Comment | Then | Else | MinContains | MaxContains => {
                return Ok(None)
            }

            Type => KeywordState::Type(parse_type(ctx, value)?),
            Enum => match value {
                Value::Array(items) => KeywordState::Enum(items.clone()),
                _ => return Err(CompileError::invalid(name, ctx.location(name), "an array")),
            },
            Const => KeywordState::Const(value.clone()),
            MultipleOf => {
                let divisor = number(ctx, name, value)?;
                if divisor.as_f64().map_or(true, |d| d <= 0.0) {
                    return Err(CompileError::invalid(
                        name,
                        ctx.location(name),
                        "a number greater than 0",
                    ));
                }
                KeywordState::MultipleOf(divisor)
            }
            Maximum | Minimum => {
                let limit = number(ctx, name, value)?;
                let exclusive = if ctx.draft == Draft::Draft4 {
                    let modifier = if kind == Maximum {
                        "exclusiveMaximum"
                    } else {
                        "exclusiveMinimum"
                    };
                    match object.get(modifier) {
                        None => false,
                        Some(Value::Bool(b)) => *b,
                        Some(_) => {
                            return Err(CompileError::invalid(
                                modifier,
                                ctx.location(modifier),
                                "a boolean",
                            ))
                        }
                    }
                } else {
                    false
                };
                if kind == Maximum {
                    KeywordState::Maximum { limit, exclusive }
                } else {
                    KeywordState::Minimum { limit, exclusive }
                }
            }
            ExclusiveMaximum | ExclusiveMinimum => {
                if ctx.draft == Draft::Draft4 {
                    // A boolean modifier of `maximum`/`minimum`, checked there.
                    if !value.is_boolean() {
                        return Err(CompileError::invalid(name, ctx.location(name), "a boolean"));
                    }
                    return Ok(None);
                }
                let limit = number(ctx, name, value)?;
                if kind == ExclusiveMaximum {
                    KeywordState::Maximum {
                        limit,
                        exclusive: true,
                    }
                } else {
                    KeywordState::Minimum {
                        limit,
                        exclusive: true,
                    }
                }
            }
            MaxLength => KeywordState::MaxLength(non_negative(ctx, name, value)?),
            MinLength => KeywordState::MinLength(non_negative(ctx, name, value)?),
            Pattern => {
                let source = string(ctx, name, value)?;
                KeywordState::Pattern {
                    source: Arc::from(source),
                    regex: regex(ctx, name, source)?,
                }
            }
            MaxItems => KeywordState::MaxItems(non_negative(ctx, name, value)?),
            MinItems => KeywordState::MinItems(non_negative(ctx, name, value)?),
            UniqueItems => match value {
                Value::Bool(true) => KeywordState::UniqueItems,
                Value::Bool(false) => return Ok(None),
                _ => return Err(CompileError::invalid(name, ctx.location(name), "a boolean")),
            },
            MaxProperties => KeywordState::MaxProperties(non_negative(ctx, name, value)?),
            MinProperties => KeywordState::MinProperties(non_negative(ctx, name, value)?),
            Required => KeywordState::Required(string_array(ctx, name, value)?),
            DependentRequired => {
                let entries = object_value(ctx, name, value)?;
                let mut dependencies = Vec::with_capacity(entries.len());
                for (property, required) in entries {
                    let location = ctx.location_of(&ctx.member(name, property));
                    dependencies.push((property.clone(), strings_at(&location, name, required)?));
                }
                KeywordState::DependentRequired(dependencies)
            }
            Dependencies => {
                let entries = object_value(ctx, name, value)?;
                let mut dependencies = Vec::with_capacity(entries.len());
                for (property, dependency) in entries {
                    let dependency = match dependency {
                        Value::Array(_) => {
                            let location = ctx.location_of(&ctx.member(name, property));
                            Dependency::Required(strings_at(&location, name, dependency)?)
                        }
                        Value::Object(_) | Value::Bool(_) => Dependency::Schema(self.subschema(
                            ctx,
                            ctx.member(name, property),
                            true,
                        )?),
                        _ => {
                            return Err(CompileError::invalid(
                                name,
                                ctx.location_of(&ctx.member(name, property)),
                                "an array of strings or a schema",
                            ))
                        }
                    };
                    dependencies.push((property.clone(), dependency));
                }
                KeywordState::Dependencies(dependencies)
            }
            Properties => KeywordState::Properties(self.schema_map(ctx, name, value, false)?),
            PatternProperties => {
                let entries = object_value(ctx, name, value)?;
                let mut patterns = Vec::with_capacity(entries.len());
                for pattern in entries.keys() {
                    patterns.push(PatternSchema {
                        pattern: Arc::from(pattern.as_str()),
                        regex: regex(ctx, name, pattern)?,
                        schema: self.subschema(ctx, ctx.member(name, pattern), false)?,
                    });
                }
                KeywordState::PatternProperties(patterns)
            }
            AdditionalProperties => {
                let known = object
                    .get("properties")
                    .and_then(Value::as_object)
                    .map(|p| p.keys().cloned().collect())
                    .unwrap_or_default();
                let mut patterns = Vec::new();
                if let Some(entries) = object.get("patternProperties").and_then(Value::as_object) {
                    for pattern in entries.keys() {
                        patterns.push(regex(ctx, "patternProperties", pattern)?);
                    }
                }
                KeywordState::AdditionalProperties {
                    schema: self.subschema(ctx, ctx.keyword(name), false)?,
                    forbidden: *value == Value::Bool(false),
                    known,
                    patterns,
                }
            }
            PropertyNames => KeywordState::PropertyNames(self.subschema(ctx, ctx.keyword(name), false)?),
            Items => match value {
                Value::Array(_) if ctx.draft <= Draft::Draft201909 => {
                    KeywordState::PrefixItems(self.schema_array(ctx, name, value, false, false)?)
                }
                Value::Object(_) | Value::Bool(_) => {
                    let skip = if ctx.draft == Draft::Draft202012 {
                        object
                            .get("prefixItems")
                            .and_then(Value::as_array)
                            .map_or(0, Vec::len)
                    } else {
                        0
                    };
                    KeywordState::Items {
                        schema: self.subschema(ctx, ctx.keyword(name), false)?,
                        skip,
                        forbidden: *value == Value::Bool(false),
                    }
                }
                _ => return Err(CompileError::invalid(name, ctx.location(name), "a schema")),
            },
            PrefixItems => KeywordState::PrefixItems(self.schema_array(ctx, name, value, false, true)?),
            AdditionalItems => {
                // Only meaningful next to array-form `items`.
                let Some(tuple) = object.get("items").and_then(Value::as_array) else {
                    return Ok(None);
                };
                if !value.is_object() && !value.is_boolean() {
                    return Err(CompileError::invalid(name, ctx.location(name), "a schema"));
                }
                KeywordState::Items {
                    schema: self.subschema(ctx, ctx.keyword(name), false)?,
                    skip: tuple.len(),
                    forbidden: *value == Value::Bool(false),
                }
            }
            Contains => {
                let (min, max) = if ctx.draft >= Draft::Draft201909 {
                    let min = match object.get("minContains") {
                        Some(v) => non_negative(ctx, "minContains", v)?,
                        None => 1,
                    };
                    let max = match object.get("maxContains") {
                        Some(v) => Some(non_negative(ctx, "maxContains", v)?),
                        None => None,
                    };
                    (min, max)
                } else {
                    (1, None)
                };
                KeywordState::Contains {
                    schema: self.subschema(ctx, ctx.keyword(name), false)?,
                    min,
                    max,
                }
            }
            AllOf => KeywordState::AllOf(self.schema_array(ctx, name, value, true, true)?),
            AnyOf => KeywordState::AnyOf(self.schema_array(ctx, name, value, true, true)?),
            OneOf => KeywordState::OneOf(self.schema_array(ctx, name, value, true, true)?),
            Not => KeywordState::Not(self.subschema(ctx, ctx.keyword(name), true)?),
            If => {
                let condition = self.subschema(ctx, ctx.keyword(name), true)?;
                let then = match object.get("then") {
                    Some(_) => Some(self.subschema(ctx, ctx.keyword("then"), true)?),
                    None => None,
                };
                let otherwise = match object.get("else") {
                    Some(_) => Some(self.subschema(ctx, ctx.keyword("else"), true)?),
                    None => None,
                };
                KeywordState::Conditional {
                    condition,
                    then,
                    otherwise,
                }
            }
            DependentSchemas => KeywordState::DependentSchemas(self.schema_map(ctx, name, value, true)?),
            UnevaluatedProperties => {
                self.tracks_evaluated = true;
                KeywordState::UnevaluatedProperties {
                    schema: self.subschema(ctx, ctx.keyword(name), false)?,
                    forbidden: *value == Value::Bool(false),
                }
            }
            UnevaluatedItems => {
                self.tracks_evaluated = true;
                KeywordState::UnevaluatedItems {
                    schema: self.subschema(ctx, ctx.keyword(name), false)?,
                    forbidden: *value == Value::Bool(false),
                }
            }
            Ref => self.reference_keyword(ctx, name, value, ReferenceKind::Ref)?,
            DynamicRef => self.reference_keyword(ctx, name, value, ReferenceKind::DynamicRef)?,
            RecursiveRef => self.reference_keyword(ctx, name, value, ReferenceKind::RecursiveRef)?,
            Format => {
                let format = string(ctx, name, value)?;
                let checker = self
                    .options
                    .formats
                    .get(format)
                    .cloned()
                    .or_else(|| formats::builtin(format));
                KeywordState::Format {
                    name: Arc::from(format),
                    checker,
                    assert: self
                        .options
                        .validate_formats
                        .unwrap_or_else(|| ctx.draft.validates_formats_by_default()),
                }
            }
            ContentEncoding => {
                let encoding = string(ctx, name, value)?;
                if ctx.draft.validates_content() {
                    KeywordState::ContentEncoding(Arc::from(encoding))
                } else {
                    KeywordState::Annotation(value.clone())
                }
            }
            ContentMediaType => {
                let media_type = string(ctx, name, value)?;
                if ctx.draft.validates_content() {
                    KeywordState::ContentMediaType {
                        media_type: Arc::from(media_type),
                        encoding: object
                            .get("contentEncoding")
                            .and_then(Value::as_str)
                            .map(Arc::from),
                    }
                } else {
                    KeywordState::Annotation(value.clone())
                }
            }
            ContentSchema => KeywordState::Annotation(value.clone()),
        };
        Ok(Some(state))
    }

    fn reference_keyword(
        &mut self,
        ctx: &SchemaContext,
        name: &str,
        value: &Value,
        kind: ReferenceKind,
    ) -> Result<KeywordState> {
        let reference = string(ctx, name, value)?;
        let binding = self.reference(ctx, name, reference, kind)?;
        Ok(match kind {
            ReferenceKind::Ref => KeywordState::Ref(binding),
            ReferenceKind::DynamicRef => KeywordState::DynamicRef(binding),
            ReferenceKind::RecursiveRef => KeywordState::RecursiveRef(binding),
        })
    }

    fn schema_array(
        &mut self,
        ctx: &SchemaContext,
        name: &str,
        value: &Value,
        in_place: bool,
        non_empty: bool,
    ) -> Result<Vec<NodeId>> {
        let items = match value {
            Value::Array(items) if !(non_empty && items.is_empty()) => items,
            _ => {
                return Err(CompileError::invalid(
                    name,
                    ctx.location(name),
                    "a non-empty array of schemas",
                ))
            }
        };
        (0..items.len())
            .map(|i| self.subschema(ctx, ctx.element(name, i), in_place))
            .collect()
    }

    fn schema_map(
        &mut self,
        ctx: &SchemaContext,
        name: &str,
        value: &Value,
        in_place: bool,
    ) -> Result<IndexMap<String, NodeId>> {
        let entries = object_value(ctx, name, value)?;
        let mut map = IndexMap::with_capacity(entries.len());
        for key in entries.keys() {
            let node = self.subschema(ctx, ctx.member(name, key), in_place)?;
            map.insert(key.clone(), node);
        }
        Ok(map)
    }
}

fn parse_type(ctx: &SchemaContext, value: &Value) -> Result<TypeSet> {
    let mut set = TypeSet::default();
    let mut add = |name: &Value| -> Result<()> {
        let Some(name) = name.as_str() else {
            return Err(CompileError::invalid(
                "type",
                ctx.location("type"),
                "a type name or an array of type names",
            ));
        };
        let primitive = PrimitiveType::from_name(name).ok_or_else(|| CompileError::UnknownType {
            name: name.to_string(),
            location: ctx.location("type"),
        })?;
        set.insert(primitive);
        Ok(())
    };
    match value {
        Value::Array(names) => names.iter().try_for_each(&mut add)?,
        _ => add(value)?,
    }
    Ok(set)
}

fn number(ctx: &SchemaContext, name: &str, value: &Value) -> Result<Number> {
    match value {
        Value::Number(n) => Ok(n.clone()),
        _ => Err(CompileError::invalid(name, ctx.location(name), "a number")),
    }
}

fn string<'v>(ctx: &SchemaContext, name: &str, value: &'v Value) -> Result<&'v str> {
    value
        .as_str()
        .ok_or_else(|| CompileError::invalid(name, ctx.location(name), "a string"))
}

/// A non-negative integer; `2.0` is accepted as `2`.
fn non_negative(ctx: &SchemaContext, name: &str, value: &Value) -> Result<u64> {
    let parsed = value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    });
    parsed.ok_or_else(|| CompileError::invalid(name, ctx.location(name), "a non-negative integer"))
}

fn object_value<'v>(ctx: &SchemaContext, name: &str, value: &'v Value) -> Result<&'v Object> {
    value
        .as_object()
        .ok_or_else(|| CompileError::invalid(name, ctx.location(name), "an object"))
}

fn string_array(ctx: &SchemaContext, name: &str, value: &Value) -> Result<Vec<String>> {
    strings_at(&ctx.location(name), name, value)
}

fn strings_at(location: &str, name: &str, value: &Value) -> Result<Vec<String>> {
    let invalid = || CompileError::invalid(name, location, "an array of strings");
    value
        .as_array()
        .ok_or_else(invalid)?
        .iter()
        .map(|item| item.as_str().map(str::to_string).ok_or_else(invalid))
        .collect()
}

fn regex(ctx: &SchemaContext, name: &str, pattern: &str) -> Result<EcmaRegex> {
    crate::ecma::compile(pattern).map_err(|reason| CompileError::InvalidPattern {
        pattern: pattern.to_string(),
        location: ctx.location(name),
        reason,
    })
}
