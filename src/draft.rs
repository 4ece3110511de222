// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Dialect registry.
//!
//! Every keyword the engine understands is listed once in [`KeywordKind`]. A draft is then
//! nothing more than an availability table over that list, plus a handful of behavioural
//! switches (how identifiers are spelled, whether `$ref` hides its siblings, whether
//! `format` asserts). The compiler consults [`Draft::keyword`] for each member of a schema
//! object; names that are unavailable in the active draft are treated like unknown keywords.

use crate::utils::uri::normalize_meta_uri;
use core::fmt;
use serde::Serialize;
use serde_json::Value;

/// Supported JSON Schema dialects.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Draft {
    Draft4,
    Draft6,
    Draft7,
    #[serde(rename = "Draft2019-09")]
    Draft201909,
    #[default]
    #[serde(rename = "Draft2020-12")]
    Draft202012,
}

/// Keywords known to at least one draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeywordKind {
    // Core
    Schema,
    Id,
    LegacyId,
    Ref,
    DynamicRef,
    DynamicAnchor,
    RecursiveRef,
    RecursiveAnchor,
    Anchor,
    Defs,
    Definitions,
    Vocabulary,
    Comment,
    // Assertions
    Type,
    Enum,
    Const,
    MultipleOf,
    Maximum,
    Minimum,
    ExclusiveMaximum,
    ExclusiveMinimum,
    MaxLength,
    MinLength,
    Pattern,
    MaxItems,
    MinItems,
    UniqueItems,
    MaxContains,
    MinContains,
    MaxProperties,
    MinProperties,
    Required,
    DependentRequired,
    Dependencies,
    // Applicators
    Properties,
    PatternProperties,
    AdditionalProperties,
    PropertyNames,
    Items,
    PrefixItems,
    AdditionalItems,
    Contains,
    AllOf,
    AnyOf,
    OneOf,
    Not,
    If,
    Then,
    Else,
    DependentSchemas,
    UnevaluatedProperties,
    UnevaluatedItems,
    // Format and content
    Format,
    ContentEncoding,
    ContentMediaType,
    ContentSchema,
}

impl KeywordKind {
    pub fn from_name(name: &str) -> Option<Self> {
        use KeywordKind::*;
        Some(match name {
            "$schema" => Schema,
            "$id" => Id,
            "id" => LegacyId,
            "$ref" => Ref,
            "$dynamicRef" => DynamicRef,
            "$dynamicAnchor" => DynamicAnchor,
            "$recursiveRef" => RecursiveRef,
            "$recursiveAnchor" => RecursiveAnchor,
            "$anchor" => Anchor,
            "$defs" => Defs,
            "definitions" => Definitions,
            "$vocabulary" => Vocabulary,
            "$comment" => Comment,
            "type" => Type,
            "enum" => Enum,
            "const" => Const,
            "multipleOf" => MultipleOf,
            "maximum" => Maximum,
            "minimum" => Minimum,
            "exclusiveMaximum" => ExclusiveMaximum,
            "exclusiveMinimum" => ExclusiveMinimum,
            "maxLength" => MaxLength,
            "minLength" => MinLength,
            "pattern" => Pattern,
            "maxItems" => MaxItems,
            "minItems" => MinItems,
            "uniqueItems" => UniqueItems,
            "maxContains" => MaxContains,
            "minContains" => MinContains,
            "maxProperties" => MaxProperties,
            "minProperties" => MinProperties,
            "required" => Required,
            "dependentRequired" => DependentRequired,
            "dependencies" => Dependencies,
            "properties" => Properties,
            "patternProperties" => PatternProperties,
            "additionalProperties" => AdditionalProperties,
            "propertyNames" => PropertyNames,
            "items" => Items,
            "prefixItems" => PrefixItems,
            "additionalItems" => AdditionalItems,
            "contains" => Contains,
            "allOf" => AllOf,
            "anyOf" => AnyOf,
            "oneOf" => OneOf,
            "not" => Not,
            "if" => If,
            "then" => Then,
            "else" => Else,
            "dependentSchemas" => DependentSchemas,
            "unevaluatedProperties" => UnevaluatedProperties,
            "unevaluatedItems" => UnevaluatedItems,
            "format" => Format,
            "contentEncoding" => ContentEncoding,
            "contentMediaType" => ContentMediaType,
            "contentSchema" => ContentSchema,
            _ => return None,
        })
    }
}

impl Draft {
    pub const ALL: [Draft; 5] = [
        Draft::Draft4,
        Draft::Draft6,
        Draft::Draft7,
        Draft::Draft201909,
        Draft::Draft202012,
    ];

    /// Map a `$schema` URI to a draft. Scheme (`http`/`https`) and a trailing `#` are ignored.
    pub fn from_schema_uri(uri: &str) -> Option<Draft> {
        Some(match normalize_meta_uri(uri) {
            "json-schema.org/draft-04/schema" => Draft::Draft4,
            "json-schema.org/draft-06/schema" => Draft::Draft6,
            "json-schema.org/draft-07/schema" => Draft::Draft7,
            "json-schema.org/draft/2019-09/schema" => Draft::Draft201909,
            "json-schema.org/draft/2020-12/schema" => Draft::Draft202012,
            _ => return None,
        })
    }

    /// Detect the draft of a schema document. Never fails: absent or unknown `$schema`
    /// values, and boolean schemas, map to the newest draft.
    pub fn detect(schema: &Value) -> Draft {
        Self::detect_or(schema, Draft::default())
    }

    /// Like [`Draft::detect`], but falls back to `default` instead of the newest draft.
    pub fn detect_or(schema: &Value, default: Draft) -> Draft {
        match schema.get("$schema").and_then(Value::as_str) {
            Some(uri) => Self::from_schema_uri(uri).unwrap_or_else(|| {
                log::warn!("unrecognized $schema '{uri}', using {default}");
                default
            }),
            None => default,
        }
    }

    /// Canonical meta-schema URI of this draft.
    pub const fn meta_schema_uri(self) -> &'static str {
        match self {
            Draft::Draft4 => "http://json-schema.org/draft-04/schema#",
            Draft::Draft6 => "http://json-schema.org/draft-06/schema#",
            Draft::Draft7 => "http://json-schema.org/draft-07/schema#",
            Draft::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
            Draft::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Draft::Draft4 => "Draft4",
            Draft::Draft6 => "Draft6",
            Draft::Draft7 => "Draft7",
            Draft::Draft201909 => "Draft2019-09",
            Draft::Draft202012 => "Draft2020-12",
        }
    }

    /// Resolve a keyword name to its kind, if the keyword exists in this draft.
    pub fn keyword(self, name: &str) -> Option<KeywordKind> {
        KeywordKind::from_name(name).filter(|kind| self.supports(*kind))
    }

    /// The availability table.
    pub fn supports(self, kind: KeywordKind) -> bool {
        use Draft::*;
        use KeywordKind::*;
        match kind {
            Schema | Ref | Definitions | Type | Enum | MultipleOf | Maximum | Minimum
            | ExclusiveMaximum | ExclusiveMinimum | MaxLength | MinLength | Pattern | MaxItems
            | MinItems | UniqueItems | MaxProperties | MinProperties | Required | Properties
            | PatternProperties | AdditionalProperties | Items | AllOf | AnyOf | OneOf | Not
            | Format => true,
            LegacyId => self == Draft4,
            Id | Const | Contains | PropertyNames => self != Draft4,
            AdditionalItems => self <= Draft201909,
            // Split into `dependentRequired`/`dependentSchemas` in 2019-09.
            Dependencies => self <= Draft7,
            If | Then | Else | Comment => self >= Draft7,
            ContentEncoding | ContentMediaType => self >= Draft6,
            Anchor | Defs | Vocabulary | DependentRequired | DependentSchemas | MaxContains
            | MinContains | UnevaluatedProperties | UnevaluatedItems | ContentSchema => {
                self >= Draft201909
            }
            RecursiveRef | RecursiveAnchor => self == Draft201909,
            DynamicRef | DynamicAnchor | PrefixItems => self == Draft202012,
        }
    }

    /// Whether a schema object holding `$ref` ignores its sibling keywords.
    pub fn ref_overrides_siblings(self) -> bool {
        self <= Draft::Draft7
    }

    /// Whether `format` is an assertion unless configured otherwise.
    pub fn validates_formats_by_default(self) -> bool {
        self <= Draft::Draft7
    }

    /// Whether `contentEncoding`/`contentMediaType` are assertions.
    pub fn validates_content(self) -> bool {
        matches!(self, Draft::Draft6 | Draft::Draft7)
    }

    /// Draft 4 treats `1.0` as a number but not as an integer.
    pub fn legacy_integers(self) -> bool {
        self == Draft::Draft4
    }

    /// Name of the identifier keyword.
    pub fn id_keyword(self) -> &'static str {
        if self == Draft::Draft4 {
            "id"
        } else {
            "$id"
        }
    }

    /// Keywords whose value is a single subschema, in this draft.
    pub fn single_schema_keywords(self) -> &'static [&'static str] {
        match self {
            Draft::Draft4 => &["additionalItems", "additionalProperties", "not"],
            Draft::Draft6 => &[
                "additionalItems",
                "additionalProperties",
                "contains",
                "not",
                "propertyNames",
            ],
            Draft::Draft7 => &[
                "additionalItems",
                "additionalProperties",
                "contains",
                "else",
                "if",
                "not",
                "propertyNames",
                "then",
            ],
            Draft::Draft201909 => &[
                "additionalItems",
                "additionalProperties",
                "contains",
                "contentSchema",
                "else",
                "if",
                "not",
                "propertyNames",
                "then",
                "unevaluatedItems",
                "unevaluatedProperties",
            ],
            Draft::Draft202012 => &[
                "additionalProperties",
                "contains",
                "contentSchema",
                "else",
                "if",
                "items",
                "not",
                "propertyNames",
                "then",
                "unevaluatedItems",
                "unevaluatedProperties",
            ],
        }
    }

    /// Keywords whose value is an array of subschemas.
    pub fn schema_array_keywords(self) -> &'static [&'static str] {
        match self {
            Draft::Draft202012 => &["allOf", "anyOf", "oneOf", "prefixItems"],
            _ => &["allOf", "anyOf", "oneOf"],
        }
    }

    /// Keywords whose value is an object of subschemas.
    pub fn schema_map_keywords(self) -> &'static [&'static str] {
        match self {
            Draft::Draft4 | Draft::Draft6 | Draft::Draft7 => {
                &["definitions", "patternProperties", "properties"]
            }
            Draft::Draft201909 | Draft::Draft202012 => &[
                "$defs",
                "definitions",
                "dependentSchemas",
                "patternProperties",
                "properties",
            ],
        }
    }

    /// Iterate every direct subschema of `schema` together with its path segments.
    pub fn subschemas<'v>(self, schema: &'v Value) -> Vec<(Vec<SegmentRef<'v>>, &'v Value)> {
        let mut out = Vec::new();
        let Some(map) = schema.as_object() else {
            return out;
        };
        for (key, value) in map {
            let key = key.as_str();
            if self.single_schema_keywords().contains(&key) {
                out.push((vec![SegmentRef::Key(key)], value));
            } else if self.schema_array_keywords().contains(&key) {
                if let Some(items) = value.as_array() {
                    for (i, item) in items.iter().enumerate() {
                        out.push((vec![SegmentRef::Key(key), SegmentRef::Index(i)], item));
                    }
                }
            } else if self.schema_map_keywords().contains(&key) {
                if let Some(entries) = value.as_object() {
                    for (name, item) in entries {
                        out.push((vec![SegmentRef::Key(key), SegmentRef::Key(name)], item));
                    }
                }
            } else if key == "items" || (key == "dependencies" && self <= Draft::Draft7) {
                match value {
                    Value::Array(items) if key == "items" => {
                        for (i, item) in items.iter().enumerate() {
                            out.push((vec![SegmentRef::Key(key), SegmentRef::Index(i)], item));
                        }
                    }
                    Value::Object(entries) if key == "dependencies" => {
                        for (name, item) in entries {
                            if item.is_object() || item.is_boolean() {
                                out.push((vec![SegmentRef::Key(key), SegmentRef::Key(name)], item));
                            }
                        }
                    }
                    _ if key == "items" => out.push((vec![SegmentRef::Key(key)], value)),
                    _ => {}
                }
            }
        }
        out
    }
}

/// A borrowed path segment produced by [`Draft::subschemas`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentRef<'a> {
    Key(&'a str),
    Index(usize),
}

impl fmt::Display for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests;
