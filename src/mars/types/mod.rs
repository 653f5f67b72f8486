//! The MARS type registry (component C7): a per-key descriptor carrying
//! the capability set listed in spec.md §4.7 — `expand`, `tidy`,
//! `setDefaults`, `check`, `pass2`, `finalise`, `flattenValues`, `filter`,
//! `matches`, `count` — plus the `only`/`never` cross-key constraint maps.
//!
//! Grounded on `original_source/src/metkit/mars/Type.h`'s capability set.
//! No concrete `Type` subclass source was retrieved in the pack, so the
//! per-variant behavior below is built from spec.md §4.7 directly, using
//! a tagged enum rather than a trait object — the design notes in §9
//! explicitly allow either, and the teacher's `decoder.rs` dispatches its
//! packing variants the same way.

mod calendar;
mod enumerated;
mod identity;
mod numeric;

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::MarsError;
use crate::mars::request::Request;

pub use identity::WindFamily;

/// The per-key behavioral variant. `Range` is a marker for keys whose
/// only role is to participate in cartesian flattening with no intrinsic
/// validation of its own (spec §4.7: "keys whose Type enumerates into
/// cartesian points").
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Any,
    Enum {
        values: Vec<String>,
        aliases: HashMap<String, String>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    IntegerRange {
        min: Option<i64>,
        max: Option<i64>,
    },
    Float,
    Date,
    Time,
    Expver,
    Param {
        wind_families: Vec<WindFamily>,
        drop_tables: Vec<i64>,
    },
    Grid,
    Range,
}

/// A per-key `Type` descriptor. Constructed once by [`super::language`]'s
/// registry and shared (by `Rc`) across every `Parameter` using this key.
#[derive(Debug, Clone)]
pub struct TypeDef {
    pub name: String,
    pub category: String,
    pub kind: TypeKind,
    pub flatten: bool,
    pub multiple: bool,
    pub duplicates: bool,
    pub defaults: Vec<String>,
    pub original_defaults: Vec<String>,
    pub only: HashMap<String, Vec<String>>,
    pub never: HashMap<String, Vec<String>>,
}

pub type TypeRef = Rc<TypeDef>;

impl TypeDef {
    pub fn any(name: &str) -> Self {
        Self {
            name: name.to_string(),
            category: "any".to_string(),
            kind: TypeKind::Any,
            flatten: true,
            multiple: true,
            duplicates: false,
            defaults: Vec::new(),
            original_defaults: Vec::new(),
            only: HashMap::new(),
            never: HashMap::new(),
        }
    }

    /// Canonical single-value form, used by the parser/printer and by
    /// `expand` before deduplication.
    pub fn tidy(&self, value: &str) -> String {
        match &self.kind {
            TypeKind::Enum { values, aliases } => enumerated::tidy(values, aliases, value),
            TypeKind::Expver => {
                let mut v = vec![value.to_string()];
                let _ = identity::expand_expver(&self.name, &mut v);
                v.into_iter().next().unwrap_or_default()
            }
            _ => value.to_string(),
        }
    }

    /// Normalizes and, for range-capable types, expands `values` in
    /// place. Always idempotent: reapplying it to its own output is a
    /// no-op beyond possible deduplication.
    pub fn expand(&self, values: &mut Vec<String>) -> Result<(), MarsError> {
        match &self.kind {
            TypeKind::Any | TypeKind::Range => {}
            TypeKind::Enum {
                values: allowed,
                aliases,
            } => enumerated::expand(&self.name, allowed, aliases, values)?,
            TypeKind::Integer { min, max } => numeric::expand_integer(&self.name, *min, *max, values)?,
            TypeKind::IntegerRange { min, max } => {
                numeric::expand_integer_range(&self.name, values)?;
                numeric::check_integer(&self.name, *min, *max, values)?;
            }
            TypeKind::Float => numeric::expand_float(&self.name, values)?,
            TypeKind::Date => calendar::expand_date(&self.name, values)?,
            TypeKind::Time => calendar::expand_time(&self.name, values)?,
            TypeKind::Expver => identity::expand_expver(&self.name, values)?,
            TypeKind::Param {
                wind_families,
                drop_tables,
            } => identity::expand_param(values, wind_families, drop_tables)?,
            TypeKind::Grid => identity::expand_grid(values),
        }
        if !self.duplicates {
            dedup_preserve_order(values);
        }
        Ok(())
    }

    pub fn check(&self, values: &[String]) -> Result<(), MarsError> {
        match &self.kind {
            TypeKind::Enum { values: allowed, .. } => enumerated::check(&self.name, allowed, values),
            TypeKind::Integer { min, max } => numeric::check_integer(&self.name, *min, *max, values),
            _ => Ok(()),
        }
    }

    /// Injects this key's configured default when absent, per spec
    /// §4.9 step 2 (only when the expansion context's `inherit` flag is
    /// set — the caller is expected to skip this call otherwise).
    pub fn set_defaults(&self, req: &mut Request) {
        if !self.defaults.is_empty() && !req.has(&self.name) {
            req.set(&self.name, self.defaults.clone());
        }
    }

    /// Second-pass fix-up. Only `Date` needs one: it resolves any
    /// relative tokens left unresolved by `expand`.
    pub fn pass2(&self, req: &mut Request) -> Result<(), MarsError> {
        if matches!(self.kind, TypeKind::Date) {
            let current = req.get(&self.name).to_vec();
            if !current.is_empty() {
                let resolved = calendar::resolve_relative_dates(&self.name, &current)?;
                req.set(&self.name, resolved);
            }
        }
        Ok(())
    }

    /// Last-pass validation against sibling parameters via `only`/`never`.
    /// In non-strict mode, constraint violations are not surfaced here —
    /// the expansion engine downgrades them to a `warn!` log instead (see
    /// `crate::mars::expand`).
    pub fn finalise(&self, req: &Request, strict: bool) -> Result<(), MarsError> {
        if !strict {
            return Ok(());
        }
        for (other_key, allowed) in &self.only {
            if let Some(v) = req.get(other_key).first() {
                if !allowed.iter().any(|a| a.eq_ignore_ascii_case(v)) {
                    return Err(MarsError::ConstraintViolated {
                        key: self.name.clone(),
                        other: other_key.clone(),
                        reason: format!("requires {other_key} to be one of {allowed:?}"),
                    });
                }
            }
        }
        for (other_key, forbidden) in &self.never {
            if let Some(v) = req.get(other_key).first() {
                if forbidden.iter().any(|a| a.eq_ignore_ascii_case(v)) {
                    return Err(MarsError::ConstraintViolated {
                        key: self.name.clone(),
                        other: other_key.clone(),
                        reason: format!("forbidden when {other_key} is {v}"),
                    });
                }
            }
        }
        Ok(())
    }

    /// The values participating in cartesian flattening for this key
    /// (empty when `flatten` is false — the key contributes nothing to
    /// the product).
    pub fn flatten_values(&self, values: &[String]) -> Vec<String> {
        if self.flatten {
            values.to_vec()
        } else {
            Vec::new()
        }
    }

    fn values_match(&self, filter_value: &str, value: &str) -> bool {
        match &self.kind {
            TypeKind::Enum { aliases, .. } => {
                enumerated::canonical(aliases, filter_value) == enumerated::canonical(aliases, value)
            }
            _ => filter_value.eq_ignore_ascii_case(value),
        }
    }

    /// Mutates `values` to its intersection with `filter_values`, using
    /// this Type's equality semantics (e.g. enum aliasing). Returns
    /// `false` when the result is empty.
    pub fn filter(&self, filter_values: &[String], values: &mut Vec<String>) -> bool {
        values.retain(|v| filter_values.iter().any(|f| self.values_match(f, v)));
        !values.is_empty()
    }

    /// Pure predicate form of [`Self::filter`].
    pub fn matches(&self, filter_values: &[String], values: &[String]) -> bool {
        values.iter().any(|v| filter_values.iter().any(|f| self.values_match(f, v)))
    }

    /// Cardinality contributed to `Request::countCombinations`. Keys that
    /// do not flatten collapse to a single combinatorial slot.
    pub fn count(&self, values: &[String]) -> usize {
        if self.flatten {
            values.len().max(1)
        } else {
            1
        }
    }
}

fn dedup_preserve_order(values: &mut Vec<String>) {
    let mut seen = HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}
