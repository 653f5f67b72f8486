//! Builds an unexpanded MARS [`Request`] from a GRIB message's `mars`
//! namespace keys — the bridge between C2 (GRIB) and C6 (Request) named in
//! SPEC_FULL.md §B.1.
//!
//! Grounded on `original_source/src/metkit/grib/GribToRequest.cc`:
//! `handleToRequest` iterates the message's `mars` namespace, upper-cases
//! every key name, additionally upper-cases the `EXPVER` value, and
//! validates the message's `identifier` key equals `"GRIB"` before
//! returning. The free-format / pseudo-GRIB branches in the original are
//! `#if 0`'d out there and are not carried here.

use crate::error::JumpError;
use crate::jumpinfo::GribMessage;
use crate::mars::Request;

/// The mars namespace iterated by [`grib_to_request`], matching the
/// original's `gribToRequestNamespace` resource (default `"mars"`).
pub const GRIB_TO_REQUEST_NAMESPACE: &str = "mars";

/// Builds an unexpanded `Request` (verb `"retrieve"`, raw string values,
/// `Any`-typed parameters) from `msg`'s `mars`-namespace keys.
///
/// Fails if `msg`'s `identifier` key is not `"GRIB"` (the original rejects
/// any other message type outright).
pub fn grib_to_request(msg: &dyn GribMessage) -> Result<Request, JumpError> {
    let identifier = msg.get_string("identifier")?;
    if identifier != "GRIB" {
        return Err(JumpError::UnsupportedPacking(format!(
            "unexpected message type: {identifier}"
        )));
    }

    let mut req = Request::new("retrieve");
    for key in msg.namespace_keys(GRIB_TO_REQUEST_NAMESPACE)? {
        let mut value = msg.get_string(&key)?;
        if key.eq_ignore_ascii_case("expver") {
            value = value.to_ascii_uppercase();
        }
        req.set(&key.to_ascii_lowercase(), vec![value]);
    }
    Ok(req)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeMessage {
        strings: HashMap<&'static str, String>,
        namespace: Vec<String>,
    }

    impl GribMessage for FakeMessage {
        fn get_long(&self, _key: &str) -> Result<i64, JumpError> {
            Ok(0)
        }
        fn get_double(&self, _key: &str) -> Result<f64, JumpError> {
            Ok(0.0)
        }
        fn get_string(&self, key: &str) -> Result<String, JumpError> {
            Ok(self.strings.get(key).cloned().unwrap_or_default())
        }
        fn namespace_keys(&self, _namespace: &str) -> Result<Vec<String>, JumpError> {
            Ok(self.namespace.clone())
        }
    }

    fn fake() -> FakeMessage {
        let mut strings = HashMap::new();
        strings.insert("identifier", "GRIB".to_string());
        strings.insert("class", "od".to_string());
        strings.insert("expver", "ab1".to_string());
        FakeMessage {
            strings,
            namespace: vec!["class".to_string(), "expver".to_string()],
        }
    }

    #[test]
    fn builds_a_request_from_mars_namespace_keys() {
        let msg = fake();
        let req = grib_to_request(&msg).unwrap();
        assert_eq!(req.verb(), "retrieve");
        assert_eq!(req.get("CLASS"), ["od"]);
    }

    #[test]
    fn upper_cases_the_expver_value() {
        let msg = fake();
        let req = grib_to_request(&msg).unwrap();
        assert_eq!(req.get("EXPVER"), ["AB1"]);
    }

    #[test]
    fn rejects_a_non_grib_identifier() {
        let mut msg = fake();
        msg.strings.insert("identifier", "BUFR".to_string());
        assert!(grib_to_request(&msg).is_err());
    }
}
