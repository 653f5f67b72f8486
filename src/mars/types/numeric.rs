//! `Integer`, `IntegerRange`, and `Float` type behavior. Grounded on
//! `Type.h`'s capability set and spec.md Scenario F
//! (`step=0/to/12/by/3` expands to `[0,3,6,9,12]`).

use crate::error::MarsError;

fn parse_i64(name: &str, raw: &str) -> Result<i64, MarsError> {
    raw.trim().parse::<i64>().map_err(|_| MarsError::InvalidValue {
        key: name.to_string(),
        value: raw.to_string(),
        reason: "not an integer".to_string(),
    })
}

pub fn expand_integer(
    name: &str,
    min: Option<i64>,
    max: Option<i64>,
    values: &mut [String],
) -> Result<(), MarsError> {
    for v in values.iter_mut() {
        let n = parse_i64(name, v)?;
        if let Some(lo) = min {
            if n < lo {
                return Err(MarsError::InvalidValue {
                    key: name.to_string(),
                    value: v.clone(),
                    reason: format!("below minimum {lo}"),
                });
            }
        }
        if let Some(hi) = max {
            if n > hi {
                return Err(MarsError::InvalidValue {
                    key: name.to_string(),
                    value: v.clone(),
                    reason: format!("above maximum {hi}"),
                });
            }
        }
        *v = n.to_string();
    }
    Ok(())
}

pub fn check_integer(
    name: &str,
    min: Option<i64>,
    max: Option<i64>,
    values: &[String],
) -> Result<(), MarsError> {
    for v in values {
        let n = parse_i64(name, v)?;
        if min.is_some_and(|lo| n < lo) || max.is_some_and(|hi| n > hi) {
            return Err(MarsError::InvalidValue {
                key: name.to_string(),
                value: v.clone(),
                reason: "out of range".to_string(),
            });
        }
    }
    Ok(())
}

/// Expands `a/to/b[/by/step]` runs in place, leaving ordinary standalone
/// values untouched. Mirrors the MARS request syntax where `to`/`by` are
/// literal value tokens within a `/`-separated list, so a flat value list
/// like `["0", "to", "12", "by", "3"]` is the parser's natural output for
/// `step=0/to/12/by/3`.
pub fn expand_integer_range(name: &str, values: &mut Vec<String>) -> Result<(), MarsError> {
    let mut out = Vec::with_capacity(values.len());
    let mut i = 0;
    while i < values.len() {
        if i + 2 < values.len() && values[i + 1].eq_ignore_ascii_case("to") {
            let start = parse_i64(name, &values[i])?;
            let end = parse_i64(name, &values[i + 2])?;
            let (step, consumed) = if i + 4 < values.len() && values[i + 3].eq_ignore_ascii_case("by") {
                (parse_i64(name, &values[i + 4])?, 5)
            } else {
                (1, 3)
            };
            if step == 0 {
                return Err(MarsError::InvalidValue {
                    key: name.to_string(),
                    value: "0".to_string(),
                    reason: "range step must be non-zero".to_string(),
                });
            }
            let mut v = start;
            if step > 0 {
                while v <= end {
                    out.push(v.to_string());
                    v += step;
                }
            } else {
                while v >= end {
                    out.push(v.to_string());
                    v += step;
                }
            }
            i += consumed;
        } else {
            out.push(values[i].clone());
            i += 1;
        }
    }
    *values = out;
    Ok(())
}

pub fn expand_float(name: &str, values: &mut [String]) -> Result<(), MarsError> {
    for v in values.iter_mut() {
        let n: f64 = v.trim().parse().map_err(|_| MarsError::InvalidValue {
            key: name.to_string(),
            value: v.clone(),
            reason: "not a float".to_string(),
        })?;
        *v = format!("{n}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_f_range_expansion() {
        let mut values = vec!["0".to_string(), "to".to_string(), "12".to_string(), "by".to_string(), "3".to_string()];
        expand_integer_range("step", &mut values).unwrap();
        assert_eq!(values, vec!["0", "3", "6", "9", "12"]);
    }

    #[test]
    fn range_without_explicit_step_defaults_to_one() {
        let mut values = vec!["0".to_string(), "to".to_string(), "3".to_string()];
        expand_integer_range("step", &mut values).unwrap();
        assert_eq!(values, vec!["0", "1", "2", "3"]);
    }

    #[test]
    fn standalone_values_pass_through_untouched() {
        let mut values = vec!["0".to_string(), "6".to_string(), "12".to_string()];
        expand_integer_range("step", &mut values).unwrap();
        assert_eq!(values, vec!["0", "6", "12"]);
    }

    #[test]
    fn zero_step_is_rejected() {
        let mut values = vec!["0".to_string(), "to".to_string(), "3".to_string(), "by".to_string(), "0".to_string()];
        assert!(expand_integer_range("step", &mut values).is_err());
    }

    #[test]
    fn integer_bounds_are_enforced() {
        let mut values = vec!["50".to_string()];
        let err = expand_integer("number", Some(0), Some(10), &mut values).unwrap_err();
        assert!(matches!(err, MarsError::InvalidValue { .. }));
    }
}
