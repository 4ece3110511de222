// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Instance locations covered by a schema object, as seen by `unevaluatedProperties` and
//! `unevaluatedItems`.

use std::collections::{BTreeSet, HashSet};

/// Properties and items evaluated at one instance location.
///
/// Only direct children of the instance are tracked; nested locations belong to the
/// subschemas that evaluated them. A set created with `tracking` off ignores every update.
#[derive(Debug, Clone)]
pub(crate) struct Evaluated<'v> {
    tracking: bool,
    all_properties: bool,
    properties: HashSet<&'v str>,
    all_items: bool,
    /// Items `0..prefix` were evaluated positionally.
    prefix: usize,
    /// Items matched by `contains`.
    items: BTreeSet<usize>,
}

impl<'v> Evaluated<'v> {
    pub fn new(tracking: bool) -> Self {
        Self {
            tracking,
            all_properties: false,
            properties: HashSet::new(),
            all_items: false,
            prefix: 0,
            items: BTreeSet::new(),
        }
    }

    pub fn property(&mut self, name: &'v str) {
        if self.tracking && !self.all_properties {
            self.properties.insert(name);
        }
    }

    pub fn all_properties(&mut self) {
        self.all_properties = self.tracking;
        self.properties.clear();
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.all_properties || self.properties.contains(name)
    }

    pub fn prefix(&mut self, len: usize) {
        if self.tracking {
            self.prefix = self.prefix.max(len);
        }
    }

    pub fn item(&mut self, index: usize) {
        if self.tracking && !self.all_items && index >= self.prefix {
            self.items.insert(index);
        }
    }

    pub fn all_items(&mut self) {
        self.all_items = self.tracking;
        self.items.clear();
    }

    pub fn has_item(&self, index: usize) -> bool {
        self.all_items || index < self.prefix || self.items.contains(&index)
    }

    /// Union with the locations a successful in-place subschema evaluated.
    pub fn merge(&mut self, other: Evaluated<'v>) {
        if !self.tracking {
            return;
        }
        if other.all_properties {
            self.all_properties();
        } else if !self.all_properties {
            self.properties.extend(other.properties);
        }
        if other.all_items {
            self.all_items();
        } else if !self.all_items {
            self.prefix(other.prefix);
            self.items.extend(other.items);
        }
    }
}
