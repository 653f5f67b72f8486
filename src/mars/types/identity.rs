//! `Any`, `Expver`, `Param`, and `Grid` type behavior.
//!
//! `Grid` resolves against a geographic grid catalogue that was not part
//! of the retrieved pack (see DESIGN.md) and is implemented here as a
//! normalizing passthrough rather than a full table lookup. `Param`
//! normalizes plain numeric ids and applies wind-family and drop-table
//! handling grounded on `original_source/src/metkit/mars/ParamID.cc`'s
//! `getWindFamilies`/`getDropTables` (see [`WindFamily`]); full
//! short-name/`table.id`-to-id lookup against a parameter database still
//! needs an external table this crate does not embed.

use crate::error::MarsError;

/// One wind-family grouping: a direction/speed alias pair sharing the same
/// underlying u/v component parameters. Grounded on
/// `ParamID::WindFamily`/`getWindFamilies`, which loads a 4-element list
/// per entry from the language document's `wind` key; no header for
/// `WindFamily` was retrieved with the pack, so the 4 positions are read
/// here, in ECMWF's conventional wind-family order, as `[u, v, speed,
/// direction]` (e.g. `["165", "166", "207", "3031"]` for 10u/10v/10si/dd).
#[derive(Debug, Clone, PartialEq)]
pub struct WindFamily {
    pub u: String,
    pub v: String,
    pub speed: String,
    pub direction: String,
}

impl WindFamily {
    pub fn from_entry(entry: &[String; 4]) -> Self {
        Self {
            u: entry[0].clone(),
            v: entry[1].clone(),
            speed: entry[2].clone(),
            direction: entry[3].clone(),
        }
    }
}

/// Four-character, upper-cased, leading-zero-padded experiment version.
/// Grounded on `original_source/.../GribToRequest.cc`, which specifically
/// upper-cases `EXPVER` while leaving other keys untouched.
pub fn expand_expver(name: &str, values: &mut [String]) -> Result<(), MarsError> {
    for v in values.iter_mut() {
        if v.len() > 4 {
            return Err(MarsError::InvalidValue {
                key: name.to_string(),
                value: v.clone(),
                reason: "expver must be at most 4 characters".to_string(),
            });
        }
        *v = format!("{:0>4}", v.to_ascii_uppercase());
    }
    Ok(())
}

/// Normalizes each value, then applies the two table-driven rules
/// `ParamID` applies ahead of the (not-embedded) short-name lookup:
///
/// - a `table.id` pair (e.g. `"128.165"`) whose table number is listed in
///   `drop_tables` is rewritten to the bare `id`, matching
///   `getDropTables`'s use to ignore a table prefix that a site's
///   parameter database doesn't distinguish;
/// - a value matching a wind family's `speed` or `direction` alias is
///   expanded in place into that family's `u`/`v` component ids, matching
///   `getWindFamilies`'s use to let a request ask for a derived wind
///   quantity and receive its underlying components.
///
/// Plain numeric ids, non-dropped `table.id` pairs, and short names not
/// covered by either table pass through unchanged (trimmed) — full
/// short-name-to-id resolution still needs an external parameter table
/// this crate does not embed.
pub fn expand_param(
    values: &mut Vec<String>,
    wind_families: &[WindFamily],
    drop_tables: &[i64],
) -> Result<(), MarsError> {
    let mut expanded = Vec::with_capacity(values.len());
    for v in values.iter() {
        let v = v.trim();
        if let Some(family) = wind_families
            .iter()
            .find(|f| f.speed == v || f.direction == v)
        {
            expanded.push(family.u.clone());
            expanded.push(family.v.clone());
            continue;
        }
        if let Some((table, id)) = v.split_once('.') {
            if let Ok(table_num) = table.parse::<i64>() {
                if drop_tables.contains(&table_num) {
                    expanded.push(id.to_string());
                    continue;
                }
            }
        }
        expanded.push(v.to_string());
    }
    *values = expanded;
    Ok(())
}

/// Lower-cases grid shorthand; full reduced/regular-gaussian and named-grid
/// normalization needs a geographic grid catalogue this crate does not
/// embed.
pub fn expand_grid(values: &mut [String]) {
    for v in values.iter_mut() {
        *v = v.trim().to_ascii_lowercase();
    }
}
