//! `Enum` type behavior: validate against a fixed value set with aliases,
//! `tidy` to a canonical form. Grounded on `Type.h`'s capability set and
//! spec.md Scenario E (`levtype=SFC` tidies to `levtype=sfc`).

use std::collections::HashMap;

use crate::error::MarsError;

pub fn canonical(aliases: &HashMap<String, String>, value: &str) -> String {
    let lower = value.to_ascii_lowercase();
    aliases.get(&lower).cloned().unwrap_or(lower)
}

pub fn tidy(values: &[String], aliases: &HashMap<String, String>, value: &str) -> String {
    let candidate = canonical(aliases, value);
    if values.iter().any(|v| v == &candidate) {
        candidate
    } else {
        value.to_ascii_lowercase()
    }
}

pub fn expand(
    name: &str,
    allowed: &[String],
    aliases: &HashMap<String, String>,
    values: &mut [String],
) -> Result<(), MarsError> {
    for v in values.iter_mut() {
        *v = tidy(allowed, aliases, v);
    }
    let _ = name;
    Ok(())
}

pub fn check(name: &str, allowed: &[String], values: &[String]) -> Result<(), MarsError> {
    for v in values {
        if !allowed.iter().any(|a| a == v) {
            return Err(MarsError::InvalidValue {
                key: name.to_string(),
                value: v.clone(),
                reason: format!("not one of {allowed:?}"),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tidy_canonicalizes_case_and_aliases() {
        let values = vec!["sfc".to_string(), "pl".to_string(), "ml".to_string()];
        let mut aliases = HashMap::new();
        aliases.insert("surface".to_string(), "sfc".to_string());
        assert_eq!(tidy(&values, &aliases, "SFC"), "sfc");
        assert_eq!(tidy(&values, &aliases, "surface"), "sfc");
    }

    #[test]
    fn check_rejects_values_outside_the_set() {
        let values = vec!["sfc".to_string(), "pl".to_string(), "ml".to_string()];
        let err = check("levtype", &values, &["xx".to_string()]).unwrap_err();
        assert!(matches!(err, MarsError::InvalidValue { .. }));
    }
}
