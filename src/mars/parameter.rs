//! `Parameter` (component C5): a typed MARS key within a `Request` — a
//! name, a shared [`TypeRef`], and an ordered sequence of string values.
//!
//! Grounded on `original_source/src/metkit/mars/MarsRequest.cc`'s
//! `Parameter` usage (inferred from its `filter`/`merge`/`count` call
//! sites) and `Type.h`'s capability set.

use std::cmp::Ordering;

use crate::mars::types::TypeRef;

/// A single named, typed, ordered value list. Ordering is significant:
/// flattening is cartesian in declaration order (spec.md §3).
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    pub values: Vec<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            ty,
            values,
        }
    }

    /// Mutates `values` to the intersection with `filter_values`, per the
    /// Type's matching semantics. Returns `false` if nothing survives.
    pub fn filter(&mut self, filter_values: &[String]) -> bool {
        self.ty.filter(filter_values, &mut self.values)
    }

    /// Pure predicate form of [`Self::filter`].
    pub fn matches(&self, filter_values: &[String]) -> bool {
        self.ty.matches(filter_values, &self.values)
    }

    /// Unions `other`'s values into `self` under the Type's multiplicity
    /// rules (deduplicating unless the Type allows duplicates).
    pub fn merge(&mut self, other: &Parameter) {
        for v in &other.values {
            if self.ty.duplicates || !self.values.contains(v) {
                self.values.push(v.clone());
            }
        }
    }

    /// Cardinality, delegated to the Type.
    pub fn count(&self) -> usize {
        self.ty.count(&self.values)
    }
}

impl PartialEq for Parameter {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.values == other.values
    }
}
impl Eq for Parameter {}

impl PartialOrd for Parameter {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Parameter {
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.name, &self.values).cmp(&(&other.name, &other.values))
    }
}
