// SPDX-License-Identifier: MIT OR Apache-2.0
//! `json-c14n-v1`: the canonical JSON encoding every hash in this workspace
//! is computed over.
//!
//! Object keys are sorted, there is no insignificant whitespace, output is
//! UTF-8 with non-ASCII characters left unescaped, and NaN/Infinity are
//! rejected rather than silently coerced. `serde_json`'s default map type is
//! a `BTreeMap`, which sorts keys for free once a value is a `Value::Object`,
//! but a typed struct serialized directly (`to_string(&problem_spec)`) never
//! becomes a `Map`, so `serde_json` walks its fields in declaration order
//! instead. We therefore always round-trip through `Value` first.
//!
//! That round-trip has its own trap: `serde_json::to_value` maps a
//! non-finite float straight to `Value::Null` instead of erroring, where
//! `to_string`/`to_writer` reject it. So we serialize to a string first
//! purely to surface that error, then discard it and do the real work
//! through `Value`.

use det_error::{DetError, DetResult, ErrorCode};
use serde::Serialize;
use sha2::{Digest, Sha256};

/// Render `value` as canonical JSON bytes.
///
/// # Errors
/// Returns [`ErrorCode::NonCanonicalJson`] if `value` serializes to NaN or
/// Infinity, which canonical JSON has no representation for.
pub fn canonical_json<T: Serialize>(value: &T) -> DetResult<String> {
    let non_canonical_err = |e: serde_json::Error| {
        DetError::new(
            ErrorCode::NonCanonicalJson,
            "value is not representable as canonical JSON (NaN/Infinity?)",
        )
        .with_source(e)
    };
    // `to_value` silently turns NaN/Infinity into `null`; `to_string` is the
    // one that actually rejects them, so run it first for the error alone.
    serde_json::to_string(value).map_err(non_canonical_err)?;
    let as_value = serde_json::to_value(value).map_err(non_canonical_err)?;
    serde_json::to_string(&as_value).map_err(non_canonical_err)
}

/// Render `value` as canonical JSON, then UTF-8 bytes.
///
/// # Errors
/// See [`canonical_json`].
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> DetResult<Vec<u8>> {
    canonical_json(value).map(String::into_bytes)
}

/// Lowercase hex SHA-256 of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// `hex(sha256(utf8(canonical_json(value))))`.
///
/// # Errors
/// See [`canonical_json`].
pub fn hash_json<T: Serialize>(value: &T) -> DetResult<String> {
    canonical_json_bytes(value).map(|bytes| sha256_hex(&bytes))
}

/// Compute a record hash for a JSON object that carries its own
/// `record_hash` field: the hash is taken over the object with that field
/// removed, so it is a fixed point — inserting the result back in and
/// re-hashing yields the same value.
///
/// # Errors
/// [`ErrorCode::NonCanonicalJson`] if `record` contains NaN/Infinity.
/// [`ErrorCode::Internal`] if `record` does not serialize to a JSON object.
pub fn compute_record_hash<T: Serialize>(record: &T) -> DetResult<String> {
    let mut value = serde_json::to_value(record).map_err(|e| {
        DetError::new(ErrorCode::NonCanonicalJson, "record is not representable as JSON").with_source(e)
    })?;
    let obj = value.as_object_mut().ok_or_else(|| {
        DetError::new(ErrorCode::Internal, "record_hash can only be computed over JSON objects")
    })?;
    obj.remove("record_hash");
    hash_json(&value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sorts_object_keys() {
        let a = canonical_json(&json!({"b": 1, "a": 2})).unwrap();
        let b = canonical_json(&json!({"a": 2, "b": 1})).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, r#"{"a":2,"b":1}"#);
    }

    #[test]
    fn no_insignificant_whitespace() {
        let s = canonical_json(&json!({"a": [1, 2, 3]})).unwrap();
        assert_eq!(s, r#"{"a":[1,2,3]}"#);
    }

    #[test]
    fn preserves_array_order() {
        let s = canonical_json(&json!(["z", "a", "m"])).unwrap();
        assert_eq!(s, r#"["z","a","m"]"#);
    }

    #[test]
    fn preserves_non_ascii_literally() {
        let s = canonical_json(&json!({"greeting": "héllo"})).unwrap();
        assert!(s.contains("héllo"));
        assert!(!s.contains("\\u"));
    }

    #[test]
    fn sorts_keys_of_a_typed_struct_not_just_a_value() {
        #[derive(serde::Serialize)]
        struct Unsorted {
            zebra: u32,
            apple: u32,
            mango: u32,
        }
        let s = canonical_json(&Unsorted { zebra: 1, apple: 2, mango: 3 }).unwrap();
        assert_eq!(s, r#"{"apple":2,"mango":3,"zebra":1}"#);
    }

    #[test]
    fn rejects_nan_and_infinity() {
        #[derive(serde::Serialize)]
        struct Wrap {
            v: f64,
        }
        let nan_err = canonical_json(&Wrap { v: f64::NAN }).unwrap_err();
        assert_eq!(nan_err.code(), ErrorCode::NonCanonicalJson);
        let inf_err = canonical_json(&Wrap { v: f64::INFINITY }).unwrap_err();
        assert_eq!(inf_err.code(), ErrorCode::NonCanonicalJson);
    }

    #[test]
    fn hash_json_is_deterministic_under_key_permutation() {
        let a = hash_json(&json!({"x": 1, "y": 2})).unwrap();
        let b = hash_json(&json!({"y": 2, "x": 1})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn record_hash_is_a_fixed_point() {
        let mut record = json!({"type": "header", "a": 1, "record_hash": "stale"});
        let hash = compute_record_hash(&record).unwrap();
        record["record_hash"] = json!(hash.clone());
        let recomputed = compute_record_hash(&record).unwrap();
        assert_eq!(hash, recomputed);
    }

    #[test]
    fn record_hash_ignores_initial_placeholder_value() {
        let with_placeholder = json!({"type": "header", "a": 1, "record_hash": "whatever"});
        let without_field = json!({"type": "header", "a": 1});
        assert_eq!(
            compute_record_hash(&with_placeholder).unwrap(),
            compute_record_hash(&without_field).unwrap()
        );
    }
}
