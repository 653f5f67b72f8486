//! `Date` and `Time` type behavior. Grounded on `Type.h`'s capability set
//! (`pass2` resolving relative values against a reference) and spec.md
//! §4.7's description of accepted absolute/relative forms.
//!
//! Open question (see DESIGN.md): the original resolves a relative date
//! against a reference date carried by a sibling key. No such key was
//! retrieved in the pack for this registry, so relative dates here are
//! resolved against the caller's current local date, consistently with
//! how an interactive MARS client would interpret `date=-1` with no
//! batch reference.

use chrono::{Datelike, Duration, NaiveDate};

use crate::error::MarsError;

fn is_relative(value: &str) -> bool {
    value == "0" || (value.starts_with('-') && value[1..].chars().all(|c| c.is_ascii_digit()) && value.len() > 1)
}

fn parse_absolute(name: &str, value: &str) -> Result<NaiveDate, MarsError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .map_err(|_| MarsError::InvalidValue {
            key: name.to_string(),
            value: value.to_string(),
            reason: "expected YYYY-MM-DD, YYYYMMDD, or a relative offset".to_string(),
        })
}

fn canonical_date(date: NaiveDate) -> String {
    format!("{:04}{:02}{:02}", date.year(), date.month(), date.day())
}

/// Canonicalizes absolute forms to `YYYYMMDD`; leaves relative tokens
/// (`"0"`, `"-N"`) untouched for [`resolve_relative_dates`] in `pass2`.
pub fn expand_date(name: &str, values: &mut [String]) -> Result<(), MarsError> {
    for v in values.iter_mut() {
        if is_relative(v) {
            continue;
        }
        *v = canonical_date(parse_absolute(name, v)?);
    }
    Ok(())
}

/// Resolves any remaining relative tokens against today's date.
pub fn resolve_relative_dates(name: &str, values: &[String]) -> Result<Vec<String>, MarsError> {
    let today = chrono::Local::now().date_naive();
    values
        .iter()
        .map(|v| {
            if is_relative(v) {
                let offset: i64 = v.parse().map_err(|_| MarsError::InvalidValue {
                    key: name.to_string(),
                    value: v.clone(),
                    reason: "not a relative day offset".to_string(),
                })?;
                Ok(canonical_date(today + Duration::days(offset)))
            } else {
                Ok(v.clone())
            }
        })
        .collect()
}

fn parse_hms(name: &str, value: &str) -> Result<(u32, u32, u32), MarsError> {
    let digits: String = value.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() || digits != value || digits.len() > 6 {
        return Err(MarsError::InvalidValue {
            key: name.to_string(),
            value: value.to_string(),
            reason: "expected HH, HHMM, or HHMMSS".to_string(),
        });
    }
    let padded = format!("{digits:0<6}");
    let hh: u32 = padded[0..2].parse().unwrap();
    let mm: u32 = padded[2..4].parse().unwrap();
    let ss: u32 = padded[4..6].parse().unwrap();
    if hh > 23 || mm > 59 || ss > 59 {
        return Err(MarsError::InvalidValue {
            key: name.to_string(),
            value: value.to_string(),
            reason: "hour/minute/second out of range".to_string(),
        });
    }
    Ok((hh, mm, ss))
}

/// Normalizes `HH`, `HHMM`, `HHMMSS` to a canonical 4-digit `HHMM` form.
pub fn expand_time(name: &str, values: &mut [String]) -> Result<(), MarsError> {
    for v in values.iter_mut() {
        let (hh, mm, _ss) = parse_hms(name, v)?;
        *v = format!("{hh:02}{mm:02}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_date_canonicalizes_dashed_form() {
        let mut values = vec!["2024-01-01".to_string()];
        expand_date("date", &mut values).unwrap();
        assert_eq!(values, vec!["20240101"]);
    }

    #[test]
    fn expand_date_leaves_relative_tokens_alone() {
        let mut values = vec!["-1".to_string(), "0".to_string()];
        expand_date("date", &mut values).unwrap();
        assert_eq!(values, vec!["-1", "0"]);
    }

    #[test]
    fn resolve_relative_dates_computes_offsets_from_today() {
        let today = chrono::Local::now().date_naive();
        let resolved = resolve_relative_dates("date", &["0".to_string(), "-1".to_string()]).unwrap();
        assert_eq!(resolved[0], canonical_date(today));
        assert_eq!(resolved[1], canonical_date(today - Duration::days(1)));
    }

    #[test]
    fn expand_time_normalizes_every_width() {
        let mut values = vec!["6".to_string(), "600".to_string(), "0600".to_string(), "060000".to_string()];
        expand_time("time", &mut values).unwrap();
        assert_eq!(values, vec!["0600", "0600", "0600", "0600"]);
    }

    #[test]
    fn expand_time_rejects_bad_values() {
        let mut values = vec!["9999".to_string()];
        assert!(expand_time("time", &mut values).is_err());
    }
}
