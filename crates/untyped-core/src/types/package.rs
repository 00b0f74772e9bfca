//! Package identity types.
//!
//! A [`PackageRef`] is the `(name, version)` pair read from the input list.
//! Everything downstream keys off its normalized forms: the coverage index
//! uses [`normalize_name`], the cache uses [`CacheKey`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{UntypedError, UntypedResult};

/// Dist-tag used when an input record carries no version
pub const DEFAULT_DIST_TAG: &str = "latest";

/// Separator between the scope and package segments, and between the
/// normalized name and version in a cache key
const KEY_SEPARATOR: &str = "__";

/// A `(name, version)` pair from the input list
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageRef {
    name: String,
    version: String,
}

impl PackageRef {
    /// Create a validated package reference
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> UntypedResult<Self> {
        let name = name.into();
        let version = version.into();

        let invalid = |reason: &str| UntypedError::InvalidPackageRef {
            name: name.clone(),
            version: version.clone(),
            reason: reason.to_string(),
        };

        if name.is_empty() {
            return Err(invalid("name is empty"));
        }
        if !is_path_token(&normalize_name(&name)) {
            return Err(invalid("name does not normalize to a single path segment"));
        }
        if !is_path_token(&version) {
            return Err(invalid("version must be non-empty and contain no path separators"));
        }

        Ok(Self { name, version })
    }

    /// Package name as published (may be scoped)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested version or dist-tag
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Filesystem-safe identity token for the name
    pub fn normalized_name(&self) -> String {
        normalize_name(&self.name)
    }

    /// Whether the version is an exact semver version.
    ///
    /// Floating refs (dist-tags such as `latest`) can change what they point
    /// at, so their manifests are always fetched before the cache is used.
    pub fn is_pinned(&self) -> bool {
        semver::Version::parse(&self.version).is_ok()
    }

    /// Cache key for the requested version
    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from_parts(&self.normalized_name(), &self.version)
    }

    /// Cache key for a concrete version this ref resolved to
    pub fn cache_key_for(&self, resolved_version: &str) -> UntypedResult<CacheKey> {
        if !is_path_token(resolved_version) {
            return Err(UntypedError::InvalidPackageRef {
                name: self.name.clone(),
                version: resolved_version.to_string(),
                reason: "resolved version is not a safe path segment".to_string(),
            });
        }
        Ok(CacheKey::from_parts(&self.normalized_name(), resolved_version))
    }
}

impl fmt::Display for PackageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Cache key of the form `{normalized-name}__{version}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    fn from_parts(normalized_name: &str, version: &str) -> Self {
        Self(format!("{normalized_name}{KEY_SEPARATOR}{version}"))
    }

    /// Key as a path segment
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Rewrite a package name into a token safe for paths and index lookups.
///
/// `@scope/pkg` becomes `scope__pkg`; unscoped names are returned unchanged.
pub fn normalize_name(name: &str) -> String {
    match name.strip_prefix('@') {
        Some(scoped) => scoped.replacen('/', KEY_SEPARATOR, 1),
        None => name.to_string(),
    }
}

/// A single, non-special path segment
fn is_path_token(segment: &str) -> bool {
    !segment.is_empty()
        && segment != "."
        && segment != ".."
        && !segment.contains(['/', '\\', '\0'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_unscoped() {
        assert_eq!(normalize_name("left-pad"), "left-pad");
    }

    #[test]
    fn test_normalize_scoped() {
        assert_eq!(normalize_name("@scope/pkg"), "scope__pkg");
        assert_eq!(normalize_name("@types/node"), "types__node");
    }

    #[test]
    fn test_scoped_cache_key() {
        let pkg = PackageRef::new("@scope/pkg", "2.0.0").unwrap();
        assert_eq!(pkg.cache_key().as_str(), "scope__pkg__2.0.0");
        assert_eq!(pkg.to_string(), "@scope/pkg@2.0.0");
    }

    #[test]
    fn test_pinned_and_floating() {
        assert!(PackageRef::new("left-pad", "1.0.0").unwrap().is_pinned());
        assert!(PackageRef::new("left-pad", "2.1.0-beta.1").unwrap().is_pinned());
        assert!(!PackageRef::new("left-pad", DEFAULT_DIST_TAG).unwrap().is_pinned());
    }

    #[test]
    fn test_rejects_unsafe_refs() {
        assert!(PackageRef::new("", "1.0.0").is_err());
        assert!(PackageRef::new("..", "1.0.0").is_err());
        assert!(PackageRef::new("a/b", "1.0.0").is_err());
        assert!(PackageRef::new("@scope/pkg/extra", "1.0.0").is_err());
        assert!(PackageRef::new("left-pad", "").is_err());
        assert!(PackageRef::new("left-pad", "../1.0.0").is_err());
    }

    #[test]
    fn test_cache_key_for_resolved_version() {
        let pkg = PackageRef::new("@scope/pkg", "latest").unwrap();
        assert_eq!(pkg.cache_key_for("3.1.4").unwrap().as_str(), "scope__pkg__3.1.4");
        assert!(pkg.cache_key_for("3/1").is_err());
    }
}
