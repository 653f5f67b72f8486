//! `Request` (component C6): a verb plus an ordered, name-unique sequence
//! of [`Parameter`]s, with the merge/subset/split/filter/matches algebra
//! that the rest of the system is built on.
//!
//! Grounded line-for-line (where the behavior survived into SPEC_FULL.md)
//! on `original_source/src/metkit/mars/MarsRequest.cc`'s `split`, `merge`,
//! `subset`, `extract`, `filter`, `matches`, `dump`/`print`, `json`, and
//! `encode`/decode.

use std::io::{self, Read, Write};
use std::rc::Rc;

use crate::error::MarsError;
use crate::mars::types::TypeDef;

/// A verb plus an ordered, name-unique list of [`Parameter`]s. Lookup is
/// by name; storage preserves insertion order (spec.md §3).
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    verb: String,
    params: Vec<crate::mars::parameter::Parameter>,
}

use crate::mars::parameter::Parameter;

impl Request {
    pub fn new(verb: impl Into<String>) -> Self {
        Self {
            verb: verb.into().to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    pub fn verb(&self) -> &str {
        &self.verb
    }

    pub fn params(&self) -> &[Parameter] {
        &self.params
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Sets `name`'s values, preserving its existing position if already
    /// present, else appending with the `Any` placeholder Type (the
    /// expansion engine replaces it with the registry's Type later).
    pub fn set(&mut self, name: &str, values: Vec<String>) {
        if let Some(i) = self.position(name) {
            self.params[i].values = values;
        } else {
            self.params
                .push(Parameter::new(name, Rc::new(TypeDef::any(name)), values));
        }
    }

    /// Like [`Self::set`], but attaches a specific Type (used by the
    /// expansion engine's step 1).
    pub fn set_typed(&mut self, name: &str, ty: Rc<TypeDef>, values: Vec<String>) {
        if let Some(i) = self.position(name) {
            self.params[i].ty = ty;
            self.params[i].values = values;
        } else {
            self.params.push(Parameter::new(name, ty, values));
        }
    }

    pub fn unset(&mut self, name: &str) {
        if let Some(i) = self.position(name) {
            self.params.remove(i);
        }
    }

    pub fn get(&self, name: &str) -> &[String] {
        self.position(name).map(|i| self.params[i].values.as_slice()).unwrap_or(&[])
    }

    pub fn has(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Single-value shortcut: `true` iff `name` has exactly one value and
    /// it equals `value` (case-insensitively).
    pub fn is(&self, name: &str, value: &str) -> bool {
        match self.get(name) {
            [only] => only.eq_ignore_ascii_case(value),
            _ => false,
        }
    }

    pub fn type_of(&self, name: &str) -> Option<&Rc<TypeDef>> {
        self.position(name).map(|i| &self.params[i].ty)
    }

    /// Product of `Type::count(values)` over every parameter (`1` for a
    /// request with no parameters).
    pub fn count_combinations(&self) -> usize {
        self.params.iter().map(|p| p.count()).product()
    }

    /// Unions `other`'s parameters into `self`. Parameters present in
    /// both are merged by the Type's multiplicity rules; parameters only
    /// in `other` are appended at the end (spec.md §5 ordering guarantee).
    pub fn merge(&mut self, other: &Request) {
        for op in &other.params {
            if let Some(i) = self.position(&op.name) {
                self.params[i].merge(op);
            } else {
                self.params.push(op.clone());
            }
        }
    }

    /// A new Request containing only the named keys, in `self`'s
    /// original order.
    pub fn subset(&self, keys: &[&str]) -> Request {
        let mut out = Request::new(self.verb.clone());
        out.params = self
            .params
            .iter()
            .filter(|p| keys.iter().any(|k| p.name.eq_ignore_ascii_case(k)))
            .cloned()
            .collect();
        out
    }

    /// A new Request containing only the keys NOT in `keys`.
    pub fn complement(&self, keys: &[&str]) -> Request {
        let mut out = Request::new(self.verb.clone());
        out.params = self
            .params
            .iter()
            .filter(|p| !keys.iter().any(|k| p.name.eq_ignore_ascii_case(k)))
            .cloned()
            .collect();
        out
    }

    /// A new Request containing only the keys whose Type belongs to
    /// `category`.
    pub fn extract(&self, category: &str) -> Request {
        let mut out = Request::new(self.verb.clone());
        out.params = self.params.iter().filter(|p| p.ty.category == category).cloned().collect();
        out
    }

    /// Mutates `self` to the intersection, key by key, with `filter`.
    /// Keys absent from `filter` are left untouched. Returns `false` if
    /// any shared key's intersection becomes empty.
    pub fn filter(&mut self, filter: &Request) -> bool {
        let mut ok = true;
        for p in self.params.iter_mut() {
            let fv = filter.get(&p.name);
            if !fv.is_empty() && !p.filter(fv) {
                ok = false;
            }
        }
        ok
    }

    /// Pure predicate form of [`Self::filter`]: every key present in
    /// `other` must have a non-empty intersection with `self`'s values
    /// for that key, and `self` must actually carry that key.
    pub fn matches(&self, other: &Request) -> bool {
        other.params.iter().all(|op| match self.position(&op.name) {
            Some(i) => self.params[i].matches(&op.values),
            None => false,
        })
    }

    /// Cartesian-expands `self` over `keys`: for each combination of
    /// their values, clones `self` with just those keys pinned to a
    /// single value. Later keys vary fastest (spec.md §4.6/§5). `[]`
    /// produces `[self.clone()]`.
    pub fn split(&self, keys: &[&str]) -> Vec<Request> {
        if keys.is_empty() {
            return vec![self.clone()];
        }

        let value_lists: Vec<Vec<String>> = keys
            .iter()
            .map(|k| {
                let v = self.get(k);
                if v.is_empty() {
                    vec![String::new()]
                } else {
                    v.to_vec()
                }
            })
            .collect();

        let mut strides = vec![1usize; keys.len()];
        for i in (0..keys.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * value_lists[i + 1].len();
        }
        let total: usize = value_lists.iter().map(|v| v.len()).product();

        let mut out = Vec::with_capacity(total);
        for combo in 0..total {
            let mut r = self.clone();
            for (i, key) in keys.iter().enumerate() {
                let idx = (combo / strides[i]) % value_lists[i].len();
                r.set(key, vec![value_lists[i][idx].clone()]);
            }
            out.push(r);
        }
        out
    }

    /// Textual `verb,k=v/v2,k2=v` form, quoting values that contain a
    /// grammar delimiter (spec.md §6).
    pub fn to_text(&self) -> String {
        let mut out = self.verb.clone();
        for p in &self.params {
            out.push(',');
            out.push_str(&p.name);
            out.push('=');
            let rendered: Vec<String> = p.values.iter().map(|v| quote_if_needed(v)).collect();
            out.push_str(&rendered.join("/"));
        }
        out
    }

    /// Structured JSON emission. Single-valued, non-`multiple` keys
    /// serialize as a bare string; everything else as a list, so that
    /// round-tripping through [`Self::from_json`] reproduces the same
    /// data (spec.md §4.6).
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("verb".to_string(), serde_json::Value::String(self.verb.clone()));
        let mut params = serde_json::Map::new();
        for p in &self.params {
            let value = if p.values.len() == 1 && !p.ty.multiple {
                serde_json::Value::String(p.values[0].clone())
            } else {
                serde_json::Value::Array(p.values.iter().cloned().map(serde_json::Value::String).collect())
            };
            params.insert(p.name.clone(), value);
        }
        map.insert("params".to_string(), serde_json::Value::Object(params));
        serde_json::Value::Object(map)
    }

    /// Inverse of [`Self::to_json`]. Produced parameters use the `Any`
    /// placeholder Type; pass the result through the expansion engine to
    /// reattach real Types.
    pub fn from_json(value: &serde_json::Value) -> Result<Request, MarsError> {
        let obj = value.as_object().ok_or_else(|| MarsError::Parse {
            message: "expected a JSON object".to_string(),
            line: 0,
            column: 0,
        })?;
        let verb = obj
            .get("verb")
            .and_then(|v| v.as_str())
            .ok_or_else(|| MarsError::Parse {
                message: "missing 'verb' field".to_string(),
                line: 0,
                column: 0,
            })?;
        let mut req = Request::new(verb);
        if let Some(params) = obj.get("params").and_then(|v| v.as_object()) {
            for (name, value) in params {
                let values = match value {
                    serde_json::Value::String(s) => vec![s.clone()],
                    serde_json::Value::Array(items) => items.iter().filter_map(|v| v.as_str().map(str::to_string)).collect(),
                    other => vec![other.to_string()],
                };
                req.set(name, values);
            }
        }
        Ok(req)
    }

    /// Binary stream encoding: `(verb, n_params, { name, n_values,
    /// values… })`, length-prefixed strings in network byte order. This
    /// is a portable wire format (unlike the sidecar's host-native
    /// layout, spec.md §6) since requests, unlike sidecar records, are
    /// expected to cross machines.
    pub fn encode<W: Write>(&self, w: &mut W) -> io::Result<()> {
        write_string(w, &self.verb)?;
        w.write_all(&(self.params.len() as u32).to_be_bytes())?;
        for p in &self.params {
            write_string(w, &p.name)?;
            w.write_all(&(p.values.len() as u32).to_be_bytes())?;
            for v in &p.values {
                write_string(w, v)?;
            }
        }
        Ok(())
    }

    /// Inverse of [`Self::encode`]. `lower_case` optionally lower-cases
    /// every decoded value (spec.md §4.6).
    pub fn decode<R: Read>(r: &mut R, lower_case: bool) -> io::Result<Request> {
        let verb = read_string(r)?;
        let mut req = Request::new(verb);
        let n_params = read_u32(r)?;
        for _ in 0..n_params {
            let name = read_string(r)?;
            let n_values = read_u32(r)?;
            let mut values = Vec::with_capacity(n_values as usize);
            for _ in 0..n_values {
                let v = read_string(r)?;
                values.push(if lower_case { v.to_ascii_lowercase() } else { v });
            }
            req.set(&name, values);
        }
        Ok(req)
    }
}

fn needs_quoting(v: &str) -> bool {
    v.is_empty() || v.chars().any(|c| matches!(c, '/' | ',' | '=' | ';' | '"' | '\n') || c_is_space(v))
}

fn c_is_space(v: &str) -> bool {
    v.chars().any(|c| c.is_whitespace())
}

fn quote_if_needed(v: &str) -> String {
    if !needs_quoting(v) {
        return v.to_string();
    }
    let mut out = String::with_capacity(v.len() + 2);
    out.push('"');
    for c in v.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn write_string<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_all(&(s.len() as u32).to_be_bytes())?;
    w.write_all(s.as_bytes())
}

fn read_u32<R: Read>(r: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_string<R: Read>(r: &mut R) -> io::Result<String> {
    let len = read_u32(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Request {
        let mut r = Request::new("retrieve");
        r.set("class", vec!["od".to_string()]);
        r.set("date", vec!["20240101".to_string(), "20240102".to_string()]);
        r.set("step", vec!["0".to_string(), "6".to_string()]);
        r
    }

    #[test]
    fn scenario_d_split_order() {
        let r = sample();
        let out = r.split(&["date", "step"]);
        let pairs: Vec<(String, String)> = out
            .iter()
            .map(|x| (x.get("date")[0].clone(), x.get("step")[0].clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("20240101".to_string(), "0".to_string()),
                ("20240101".to_string(), "6".to_string()),
                ("20240102".to_string(), "0".to_string()),
                ("20240102".to_string(), "6".to_string()),
            ]
        );
    }

    #[test]
    fn split_with_no_keys_returns_self() {
        let r = sample();
        let out = r.split(&[]);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0], r);
    }

    #[test]
    fn merge_of_subset_and_complement_reconstructs_the_request() {
        let r = sample();
        let mut subset = r.subset(&["date"]);
        let complement = r.complement(&["date"]);
        subset.merge(&complement);
        assert_eq!(subset.verb(), r.verb());
        assert_eq!(subset.get("class"), r.get("class"));
        assert_eq!(subset.get("date"), r.get("date"));
        assert_eq!(subset.get("step"), r.get("step"));
    }

    #[test]
    fn json_round_trips_multi_valued_keys() {
        let r = sample();
        let json = r.to_json();
        let back = Request::from_json(&json).unwrap();
        assert_eq!(back.get("date"), r.get("date"));
        assert_eq!(back.get("step"), r.get("step"));
        assert_eq!(back.get("class"), r.get("class"));
    }

    #[test]
    fn binary_codec_round_trips() {
        let r = sample();
        let mut buf = Vec::new();
        r.encode(&mut buf).unwrap();
        let back = Request::decode(&mut buf.as_slice(), false).unwrap();
        assert_eq!(back.verb(), r.verb());
        assert_eq!(back.get("date"), r.get("date"));
    }

    #[test]
    fn to_text_quotes_values_with_delimiters() {
        let mut r = Request::new("retrieve");
        r.set("area", vec!["a,b".to_string()]);
        assert_eq!(r.to_text(), "retrieve,area=\"a,b\"");
    }

    #[test]
    fn is_checks_the_single_value_shortcut() {
        let r = sample();
        assert!(r.is("class", "od"));
        assert!(!r.is("date", "20240101"));
    }
}
