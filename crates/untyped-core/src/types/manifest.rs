//! Per-version package manifest as served by the registry.
//!
//! Only the fields the classifier and extractor need are typed; everything
//! else is carried through `extra` so a cached manifest round-trips the
//! registry document.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Manifest for a single published version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    /// Legacy declaration entry point
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub typings: Option<String>,
    /// Declaration entry point
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub types: Option<String>,
    /// Files the publisher declared as part of the package
    #[serde(default, deserialize_with = "lenient_string_list", skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    pub dist: DistInfo,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Distribution information for the package tarball
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistInfo {
    /// Tarball download URL
    pub tarball: String,
    /// SHA-1 checksum (legacy)
    #[serde(default)]
    pub shasum: String,
    /// Subresource integrity hash (preferred)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub integrity: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PackageManifest {
    /// Create a manifest with only the required fields set
    pub fn new(name: impl Into<String>, version: impl Into<String>, dist: DistInfo) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            typings: None,
            types: None,
            files: None,
            dist,
            extra: Map::new(),
        }
    }

    /// `typings`, if it is a non-empty string
    pub fn typings_entry(&self) -> Option<&str> {
        self.typings.as_deref().filter(|s| !s.is_empty())
    }

    /// `types`, if it is a non-empty string
    pub fn types_entry(&self) -> Option<&str> {
        self.types.as_deref().filter(|s| !s.is_empty())
    }

    /// Declared files; empty when the field is absent
    pub fn declared_files(&self) -> &[String] {
        self.files.as_deref().unwrap_or_default()
    }
}

impl DistInfo {
    /// Create dist info for a tarball URL and SHA-1 checksum
    pub fn new(tarball: impl Into<String>, shasum: impl Into<String>) -> Self {
        Self {
            tarball: tarball.into(),
            shasum: shasum.into(),
            integrity: None,
            extra: Map::new(),
        }
    }
}

/// Accept any JSON value, keeping it only if it is a string
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        _ => None,
    })
}

/// Accept any JSON value, keeping the string entries of an array
fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    })
}
