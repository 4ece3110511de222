// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! JSON Pointer (RFC 6901) utilities shared between the catalog, compiler and evaluator

use core::fmt;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::borrow::Cow;
use std::sync::Arc;

/// One component of an instance or keyword location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathChunk<'a> {
    /// Object property or schema keyword
    Key(&'a str),
    /// Array index
    Index(usize),
}

/// Mutable location used while walking a schema or instance.
#[derive(Debug, Clone, Default)]
pub struct LocationStack<'a> {
    chunks: Vec<PathChunk<'a>>,
}

impl<'a> LocationStack<'a> {
    pub fn new() -> Self {
        Self { chunks: Vec::new() }
    }

    pub fn push_key(&mut self, key: &'a str) {
        self.chunks.push(PathChunk::Key(key));
    }

    pub fn push_index(&mut self, index: usize) {
        self.chunks.push(PathChunk::Index(index));
    }

    pub fn pop(&mut self) {
        self.chunks.pop();
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Render the current location.
    pub fn to_pointer(&self) -> JsonPointer {
        let mut out = String::new();
        for chunk in &self.chunks {
            write_chunk(&mut out, chunk);
        }
        JsonPointer(out.into())
    }

    /// Render the chunks from `start` onwards, e.g. the part of a keyword location below
    /// the schema object it started at.
    pub fn render_from(&self, start: usize) -> String {
        let mut out = String::new();
        for chunk in self.chunks.iter().skip(start) {
            write_chunk(&mut out, chunk);
        }
        out
    }
}

fn write_chunk(out: &mut String, chunk: &PathChunk<'_>) {
    out.push('/');
    match chunk {
        PathChunk::Key(key) => out.push_str(&escape(key)),
        PathChunk::Index(index) => out.push_str(&index.to_string()),
    }
}

/// An owned, rendered JSON pointer such as `/properties/name`.
///
/// The empty pointer denotes the document root.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct JsonPointer(Arc<str>);

impl JsonPointer {
    pub fn root() -> Self {
        JsonPointer(Arc::from(""))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append one unescaped segment.
    pub fn join(&self, segment: &str) -> Self {
        let mut out = String::with_capacity(self.0.len() + segment.len() + 1);
        out.push_str(&self.0);
        out.push('/');
        out.push_str(&escape(segment));
        JsonPointer(out.into())
    }

    pub fn join_index(&self, index: usize) -> Self {
        JsonPointer(format!("{}/{index}", self.0).into())
    }

    /// Whether `self` equals `prefix` or lies underneath it.
    pub fn starts_with(&self, prefix: &JsonPointer) -> bool {
        let p = prefix.as_str();
        self.0.starts_with(p) && (self.0.len() == p.len() || self.0.as_bytes()[p.len()] == b'/')
    }

    /// The unescaped segments of this pointer.
    pub fn segments(&self) -> Vec<String> {
        parse(&self.0).unwrap_or_default()
    }
}

impl From<&str> for JsonPointer {
    fn from(s: &str) -> Self {
        JsonPointer(Arc::from(s))
    }
}

impl From<String> for JsonPointer {
    fn from(s: String) -> Self {
        JsonPointer(Arc::from(s))
    }
}

impl fmt::Display for JsonPointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for JsonPointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Escape `~` and `/` in a single segment.
pub fn escape(segment: &str) -> Cow<'_, str> {
    if segment.contains(['~', '/']) {
        Cow::Owned(segment.replace('~', "~0").replace('/', "~1"))
    } else {
        Cow::Borrowed(segment)
    }
}

/// Split a pointer into unescaped segments. Returns `None` if it is not a valid pointer.
pub fn parse(pointer: &str) -> Option<Vec<String>> {
    if pointer.is_empty() {
        return Some(Vec::new());
    }
    let rest = pointer.strip_prefix('/')?;
    rest.split('/')
        .map(|segment| {
            if segment.contains('~') {
                // Only ~0 and ~1 are legal escapes.
                let mut out = String::with_capacity(segment.len());
                let mut chars = segment.chars();
                while let Some(c) = chars.next() {
                    if c == '~' {
                        match chars.next() {
                            Some('0') => out.push('~'),
                            Some('1') => out.push('/'),
                            _ => return None,
                        }
                    } else {
                        out.push(c);
                    }
                }
                Some(out)
            } else {
                Some(segment.to_string())
            }
        })
        .collect()
}

/// Follow `pointer` into `value`.
pub fn resolve<'v>(value: &'v Value, pointer: &str) -> Option<&'v Value> {
    let mut current = value;
    for segment in parse(pointer)? {
        current = match current {
            Value::Object(map) => map.get(&segment)?,
            Value::Array(items) => {
                // Leading zeros are not array indices.
                if segment.len() > 1 && segment.starts_with('0') {
                    return None;
                }
                items.get(segment.parse::<usize>().ok()?)?
            }
            _ => return None,
        };
    }
    Some(current)
}
