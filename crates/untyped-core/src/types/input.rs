//! Input snapshot parsing.
//!
//! The snapshot is a JSON array of objects with a `name` and an optional
//! `version`; any other fields are ignored. A record without a usable name
//! is a data-integrity failure for the whole list, so parsing stops at the
//! first bad record instead of skipping it.

use serde_json::Value;

use super::package::{PackageRef, DEFAULT_DIST_TAG};
use crate::error::{UntypedError, UntypedResult};

/// Parse the input snapshot into package references
pub fn parse_input(content: &str) -> UntypedResult<Vec<PackageRef>> {
    let records: Vec<Value> = serde_json::from_str(content).map_err(|e| UntypedError::JsonParse {
        message: format!("input must be a JSON array of records: {}", e),
    })?;

    records
        .iter()
        .enumerate()
        .map(|(index, record)| package_ref_from_record(index, record))
        .collect()
}

/// Convert one input record, identifying it by position on failure
pub fn package_ref_from_record(index: usize, record: &Value) -> UntypedResult<PackageRef> {
    let invalid = |reason: String| UntypedError::InvalidInput { index, reason };

    let fields = record
        .as_object()
        .ok_or_else(|| invalid(format!("expected an object, got {}", record)))?;

    let name = match fields.get("name") {
        Some(Value::String(name)) => name.clone(),
        Some(Value::Null) | None => return Err(invalid(format!("null or missing name in {}", record))),
        Some(other) => return Err(invalid(format!("name must be a string, got {}", other))),
    };

    let version = match fields.get("version") {
        Some(Value::String(version)) => version.clone(),
        Some(Value::Null) | None => DEFAULT_DIST_TAG.to_string(),
        Some(other) => return Err(invalid(format!("version must be a string, got {}", other))),
    };

    PackageRef::new(name, version).map_err(|e| invalid(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_records() {
        let refs = parse_input(
            r#"[
                {"name": "left-pad", "version": "1.0.0", "rank": 1},
                {"name": "@scope/pkg", "version": "2.0.0"},
                {"name": "chalk"}
            ]"#,
        )
        .unwrap();

        assert_eq!(refs.len(), 3);
        assert_eq!(refs[1].cache_key().as_str(), "scope__pkg__2.0.0");
        assert_eq!(refs[2].version(), DEFAULT_DIST_TAG);
    }

    #[test]
    fn test_null_name_is_fatal() {
        let err = parse_input(r#"[{"name": "ok", "version": "1.0.0"}, {"name": null, "version": "1.0.0"}]"#)
            .unwrap_err();

        match err {
            UntypedError::InvalidInput { index, reason } => {
                assert_eq!(index, 1);
                assert!(reason.contains("null"));
            },
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_wrong_types_are_fatal() {
        assert!(matches!(
            parse_input(r#"[{"name": 42}]"#),
            Err(UntypedError::InvalidInput { index: 0, .. })
        ));
        assert!(matches!(
            parse_input(r#"[{"name": "x", "version": 1}]"#),
            Err(UntypedError::InvalidInput { index: 0, .. })
        ));
        assert!(matches!(
            parse_input(r#"["left-pad"]"#),
            Err(UntypedError::InvalidInput { index: 0, .. })
        ));
    }

    #[test]
    fn test_not_an_array() {
        assert!(matches!(
            parse_input(r#"{"name": "left-pad"}"#),
            Err(UntypedError::JsonParse { .. })
        ));
    }
}
