//! The expansion engine (component C9): the six-step pipeline from
//! spec.md §4.9 that turns a parser-produced, unexpanded [`Request`] into
//! a fully typed, defaulted, and validated one.
//!
//! Grounded on spec.md §4.9 directly; the overall parse-then-expand
//! shape follows `original_source/src/tools/parse-mars-request.cc`'s
//! `MarsParser parser(in); MarsExpansion expand(inherit); parser.parse();
//! expand.expand(p);` driver.

use crate::error::MarsError;
use crate::mars::language::TypeRegistry;
use crate::mars::request::Request;

/// Flags threaded through the pipeline (spec.md §4.9).
#[derive(Debug, Clone, Copy)]
pub struct ExpansionFlags {
    /// Inject each key's configured default when the request omits it.
    pub inherit: bool,
    /// Escalate recoverable validation/constraint failures to hard
    /// errors instead of logging and passing the value through.
    pub strict: bool,
}

impl Default for ExpansionFlags {
    fn default() -> Self {
        Self {
            inherit: true,
            strict: true,
        }
    }
}

/// Runs the six-step pipeline over a single unexpanded Request.
///
/// 1. Replace each parameter's placeholder Type with the registry's Type
///    for its key (unknown keys fail in strict mode, fall back to `Any`
///    otherwise — `TypeRegistry::get_or_any` logs that fallback).
/// 2. Inject configured defaults for absent keys, if `inherit`.
/// 3. `Type::expand` then `Type::check` each parameter. Per spec.md
///    Scenario E, a non-strict `check` failure is logged and the
///    pre-expansion value is passed through rather than erroring — this
///    is slightly broader than §7's literal "unknown-key and
///    unresolved-default" wording, but Scenario E requires it (see
///    DESIGN.md).
/// 4. Run `pass2` over every parameter (cross-key fix-ups, e.g. resolving
///    relative dates).
/// 5. Run `finalise(strict)` over every parameter (`only`/`never`
///    constraint checks).
/// 6. Return the expanded Request.
pub fn expand_request(
    req: &Request,
    registry: &TypeRegistry,
    flags: ExpansionFlags,
) -> Result<Request, MarsError> {
    let mut out = req.clone();

    // Step 1: attach real Types.
    let names: Vec<String> = out.params().iter().map(|p| p.name.clone()).collect();
    for name in &names {
        let ty = if flags.strict {
            registry.get(name).ok_or_else(|| MarsError::UnknownKey(name.clone()))?
        } else {
            registry.get_or_any(name)
        };
        let values = out.get(name).to_vec();
        out.set_typed(name, ty, values);
    }

    // Step 2: defaults for absent keys.
    if flags.inherit {
        for ty in registry.with_defaults() {
            ty.set_defaults(&mut out);
        }
    }

    // Step 3: expand + check.
    let names: Vec<String> = out.params().iter().map(|p| p.name.clone()).collect();
    for name in &names {
        let ty = out.type_of(name).unwrap().clone();
        let original = out.get(name).to_vec();
        let mut values = original.clone();

        match ty.expand(&mut values) {
            Ok(()) => {}
            Err(e) => {
                if flags.strict {
                    return Err(e);
                }
                log::warn!("expansion of '{name}' failed ({e}), passing the value through unchanged");
                values = original.clone();
            }
        }
        if let Err(e) = ty.check(&values) {
            if flags.strict {
                return Err(e);
            }
            log::warn!("validation of '{name}' failed ({e}), passing the value through unchanged");
            values = original;
        }
        out.set_typed(name, ty, values);
    }

    // Step 4: pass2.
    for name in &names {
        let ty = out.type_of(name).unwrap().clone();
        if let Err(e) = ty.pass2(&mut out) {
            if flags.strict {
                return Err(e);
            }
            log::warn!("pass2 of '{name}' failed ({e}), leaving its value as-is");
        }
    }

    // Step 5: finalise.
    for name in &names {
        let ty = out.type_of(name).unwrap().clone();
        ty.finalise(&out, flags.strict)?;
    }

    Ok(out)
}

/// Expands a batch of parser-produced Requests in order. When `inherit`
/// is set, each request's successfully expanded values become the
/// defaults considered by the next request before the registry's own
/// defaults are applied (spec.md §4.9: "threading mutable defaults from
/// prior requests into the next").
pub fn expand_requests(
    requests: &[Request],
    registry: &TypeRegistry,
    flags: ExpansionFlags,
) -> Result<Vec<Request>, MarsError> {
    let mut out = Vec::with_capacity(requests.len());
    let mut carried: Option<Request> = None;

    for req in requests {
        let mut effective = req.clone();
        if flags.inherit {
            if let Some(prev) = &carried {
                for p in prev.params() {
                    if !effective.has(&p.name) {
                        effective.set(&p.name, p.values.clone());
                    }
                }
            }
        }
        let expanded = expand_request(&effective, registry, flags)?;
        carried = Some(expanded.clone());
        out.push(expanded);
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mars::language::{LanguageDefinition, TypeRegistry};
    use crate::mars::parser::parse;

    fn registry() -> TypeRegistry {
        TypeRegistry::from_definition(LanguageDefinition::embedded().unwrap())
    }

    #[test]
    fn scenario_e_enum_validation_strict_and_non_strict() {
        let registry = registry();

        let valid = parse("retrieve,levtype=SFC").unwrap().remove(0);
        let expanded = expand_request(&valid, &registry, ExpansionFlags { inherit: false, strict: true }).unwrap();
        assert_eq!(expanded.get("levtype"), ["sfc"]);

        let invalid = parse("retrieve,levtype=xx").unwrap().remove(0);
        let strict_err = expand_request(&invalid, &registry, ExpansionFlags { inherit: false, strict: true });
        assert!(strict_err.is_err());

        let non_strict = expand_request(&invalid, &registry, ExpansionFlags { inherit: false, strict: false }).unwrap();
        assert_eq!(non_strict.get("levtype"), ["xx"]);
    }

    #[test]
    fn scenario_f_integer_range_expansion() {
        let registry = registry();
        let req = parse("retrieve,step=0/to/12/by/3").unwrap().remove(0);
        let expanded = expand_request(&req, &registry, ExpansionFlags { inherit: false, strict: true }).unwrap();
        assert_eq!(expanded.get("step"), ["0", "3", "6", "9", "12"]);
        assert_eq!(expanded.count_combinations(), 5);
    }

    #[test]
    fn unknown_key_fails_in_strict_mode_and_falls_back_otherwise() {
        let registry = registry();
        let req = parse("retrieve,frobnicate=1").unwrap().remove(0);

        let strict_err = expand_request(&req, &registry, ExpansionFlags { inherit: false, strict: true });
        assert!(matches!(strict_err, Err(MarsError::UnknownKey(_))));

        let non_strict = expand_request(&req, &registry, ExpansionFlags { inherit: false, strict: false }).unwrap();
        assert_eq!(non_strict.get("frobnicate"), ["1"]);
    }

    #[test]
    fn inherit_injects_registry_defaults() {
        let registry = registry();
        let req = parse("retrieve,date=20240101").unwrap().remove(0);
        let expanded = expand_request(&req, &registry, ExpansionFlags { inherit: true, strict: true }).unwrap();
        assert_eq!(expanded.get("class"), ["od"]);
        assert_eq!(expanded.get("stream"), ["oper"]);
    }

    #[test]
    fn batch_expansion_threads_defaults_across_requests() {
        let registry = registry();
        let requests = parse("retrieve,class=rd,date=20240101;retrieve,date=20240102").unwrap();
        let expanded = expand_requests(&requests, &registry, ExpansionFlags { inherit: true, strict: true }).unwrap();
        assert_eq!(expanded[0].get("class"), ["rd"]);
        // second request omits class; it inherits the prior request's
        // expanded value rather than the registry default.
        assert_eq!(expanded[1].get("class"), ["rd"]);
    }

    #[test]
    fn levelist_only_constraint_is_enforced_in_strict_mode() {
        let registry = registry();
        let req = parse("retrieve,levtype=sfc,levelist=1/to/5").unwrap().remove(0);
        let err = expand_request(&req, &registry, ExpansionFlags { inherit: false, strict: true });
        assert!(matches!(err, Err(MarsError::ConstraintViolated { .. })));

        let ok = parse("retrieve,levtype=pl,levelist=1/to/5").unwrap().remove(0);
        assert!(expand_request(&ok, &registry, ExpansionFlags { inherit: false, strict: true }).is_ok());
    }
}
