// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Output formats.
//!
//! An [`Evaluation`] holds the verdict together with the error and annotation records of
//! an exhaustive evaluation, and renders them in one of the standard output formats:
//!
//! * `flag`: `{"valid": bool}`
//! * `basic`: the verdict and a flat list of errors
//! * `annotations`: annotations grouped by instance location, one entry per keyword; a
//!   keyword that annotated a location more than once carries the list of its values
//! * `detailed`: errors (or annotations) arranged by keyword location, with single-child
//!   levels collapsed

use crate::utils::pointer::JsonPointer;
use core::fmt;
use core::str::FromStr;
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// A keyword that rejected the instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    pub instance_location: JsonPointer,
    pub keyword_location: JsonPointer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    #[serde(skip)]
    pub keyword: String,
    #[serde(rename = "error")]
    pub message: String,
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.instance_location.as_str().is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.instance_location, self.message)
        }
    }
}

/// A value a keyword attached to an instance location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub instance_location: JsonPointer,
    pub keyword_location: JsonPointer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    #[serde(skip)]
    pub keyword: String,
    #[serde(rename = "annotation")]
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Flag,
    Basic,
    Annotations,
    Detailed,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown output format '{0}'")]
pub struct UnknownOutputFormat(pub String);

impl FromStr for OutputFormat {
    type Err = UnknownOutputFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "flag" => Ok(OutputFormat::Flag),
            "basic" => Ok(OutputFormat::Basic),
            "annotations" => Ok(OutputFormat::Annotations),
            "detailed" => Ok(OutputFormat::Detailed),
            _ => Err(UnknownOutputFormat(s.to_string())),
        }
    }
}

/// Annotations attached to one instance location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationAnnotations {
    pub instance_location: JsonPointer,
    pub annotations: IndexMap<String, Value>,
}

/// One node of the `detailed` output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputUnit {
    pub valid: bool,
    pub keyword_location: JsonPointer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub absolute_keyword_location: Option<String>,
    pub instance_location: JsonPointer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OutputUnit>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<OutputUnit>,
}

impl OutputUnit {
    fn group(valid: bool, keyword_location: JsonPointer, instance_location: JsonPointer) -> Self {
        Self {
            valid,
            keyword_location,
            absolute_keyword_location: None,
            instance_location,
            error: None,
            annotation: None,
            errors: Vec::new(),
            annotations: Vec::new(),
        }
    }
}

/// A rendered evaluation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    Flag {
        valid: bool,
    },
    Basic {
        valid: bool,
        errors: Vec<ErrorRecord>,
    },
    Annotations {
        valid: bool,
        annotations: Vec<LocationAnnotations>,
    },
    Detailed(OutputUnit),
}

impl Report {
    pub fn valid(&self) -> bool {
        match self {
            Report::Flag { valid }
            | Report::Basic { valid, .. }
            | Report::Annotations { valid, .. } => *valid,
            Report::Detailed(unit) => unit.valid,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// The outcome of an exhaustive evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    valid: bool,
    errors: Vec<ErrorRecord>,
    annotations: Vec<AnnotationRecord>,
}

impl Evaluation {
    pub(crate) fn new(
        valid: bool,
        errors: Vec<ErrorRecord>,
        annotations: Vec<AnnotationRecord>,
    ) -> Self {
        Self {
            valid,
            errors,
            annotations,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    pub fn errors(&self) -> &[ErrorRecord] {
        &self.errors
    }

    pub fn iter_errors(&self) -> impl Iterator<Item = &ErrorRecord> {
        self.errors.iter()
    }

    pub fn iter_annotations(&self) -> impl Iterator<Item = &AnnotationRecord> {
        self.annotations.iter()
    }

    pub fn into_errors(self) -> Vec<ErrorRecord> {
        self.errors
    }

    /// Annotation values per (instance location, keyword), in the order they were produced.
    pub fn annotations_by_location(&self) -> IndexMap<(JsonPointer, String), Vec<Value>> {
        let mut grouped: IndexMap<(JsonPointer, String), Vec<Value>> = IndexMap::new();
        for record in &self.annotations {
            grouped
                .entry((record.instance_location.clone(), record.keyword.clone()))
                .or_default()
                .push(record.value.clone());
        }
        grouped
    }

    pub fn output(&self, format: OutputFormat) -> Report {
        match format {
            OutputFormat::Flag => self.flag(),
            OutputFormat::Basic => self.basic(),
            OutputFormat::Annotations => self.annotations(),
            OutputFormat::Detailed => self.detailed(),
        }
    }

    pub fn flag(&self) -> Report {
        Report::Flag { valid: self.valid }
    }

    pub fn basic(&self) -> Report {
        Report::Basic {
            valid: self.valid,
            errors: self.errors.clone(),
        }
    }

    /// Annotations grouped by instance location and keyword. A keyword annotated once keeps
    /// its value; several annotations of one keyword merge into an array, so they cannot be
    /// told apart from a single array-valued annotation here. Use
    /// [`Evaluation::annotations_by_location`] to see each value separately.
    pub fn annotations(&self) -> Report {
        let mut locations: IndexMap<JsonPointer, IndexMap<String, Vec<Value>>> = IndexMap::new();
        for ((instance_location, keyword), values) in self.annotations_by_location() {
            locations
                .entry(instance_location)
                .or_default()
                .insert(keyword, values);
        }
        let annotations = locations
            .into_iter()
            .map(|(instance_location, keywords)| LocationAnnotations {
                instance_location,
                annotations: keywords
                    .into_iter()
                    .map(|(keyword, mut values)| {
                        let value = if values.len() == 1 {
                            values.remove(0)
                        } else {
                            Value::Array(values)
                        };
                        (keyword, value)
                    })
                    .collect(),
            })
            .collect();
        Report::Annotations {
            valid: self.valid,
            annotations,
        }
    }

    pub fn detailed(&self) -> Report {
        let mut trie = Trie::default();
        if self.valid {
            for record in &self.annotations {
                trie.insert(
                    &record.keyword_location,
                    OutputUnit {
                        annotation: Some(record.value.clone()),
                        absolute_keyword_location: record.absolute_keyword_location.clone(),
                        ..OutputUnit::group(
                            true,
                            record.keyword_location.clone(),
                            record.instance_location.clone(),
                        )
                    },
                );
            }
        } else {
            for record in &self.errors {
                trie.insert(
                    &record.keyword_location,
                    OutputUnit {
                        error: Some(record.message.clone()),
                        absolute_keyword_location: record.absolute_keyword_location.clone(),
                        ..OutputUnit::group(
                            false,
                            record.keyword_location.clone(),
                            record.instance_location.clone(),
                        )
                    },
                );
            }
        }

        let mut root = OutputUnit::group(self.valid, JsonPointer::root(), JsonPointer::root());
        let children = trie.into_units(self.valid, &JsonPointer::root());
        if self.valid {
            root.annotations = children;
        } else {
            root.errors = children;
        }
        Report::Detailed(root)
    }
}

/// Output units arranged by keyword location.
#[derive(Default)]
struct Trie {
    units: Vec<OutputUnit>,
    children: IndexMap<String, Trie>,
}

impl Trie {
    fn insert(&mut self, location: &JsonPointer, unit: OutputUnit) {
        let mut trie = self;
        for segment in location.segments() {
            trie = trie.children.entry(segment).or_default();
        }
        trie.units.push(unit);
    }

    fn into_units(self, valid: bool, location: &JsonPointer) -> Vec<OutputUnit> {
        let mut units = self.units;
        for (segment, child) in self.children {
            let child_location = location.join(&segment);
            let mut nested = child.into_units(valid, &child_location);
            if nested.len() == 1 {
                units.append(&mut nested);
                continue;
            }
            let instance_location = common_prefix(nested.iter().map(|u| &u.instance_location));
            let mut group = OutputUnit::group(valid, child_location, instance_location);
            if valid {
                group.annotations = nested;
            } else {
                group.errors = nested;
            }
            units.push(group);
        }
        units
    }
}

fn common_prefix<'a>(mut locations: impl Iterator<Item = &'a JsonPointer>) -> JsonPointer {
    let Some(first) = locations.next() else {
        return JsonPointer::root();
    };
    let mut prefix = first.segments();
    for location in locations {
        let segments = location.segments();
        let shared = prefix
            .iter()
            .zip(&segments)
            .take_while(|(a, b)| a == b)
            .count();
        prefix.truncate(shared);
    }
    prefix
        .iter()
        .fold(JsonPointer::root(), |pointer, segment| pointer.join(segment))
}
