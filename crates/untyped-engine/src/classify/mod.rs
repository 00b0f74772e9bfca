//! Typedness classification
//!
//! Rules are applied in a fixed order and the first match wins:
//!
//! 1. a non-empty `typings` entry point
//! 2. a non-empty `types` entry point
//! 3. a declared file ending in `.d.ts`
//! 4. a `.d.ts` file anywhere in the extracted archive
//!
//! Rules 1-3 only ever decide "typed". When they don't, the archive scan is
//! the fallback, and a package with no extracted tree is untyped.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use untyped_core::error::UntypedError;
use untyped_core::types::PackageManifest;

use crate::EngineResult;

/// File name suffix of a TypeScript declaration file
pub const TYPE_DECLARATION_SUFFIX: &str = ".d.ts";

/// The rule that decided a classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    Typings(String),
    Types(String),
    /// Entry of the manifest `files` list
    DeclaredFile(String),
    /// Path inside the extracted archive, relative to its root
    ArchiveFile(PathBuf),
    None,
}

/// Whether a package ships type declarations, and why
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub typed: bool,
    pub evidence: Evidence,
}

impl Classification {
    pub fn typed(evidence: Evidence) -> Self {
        Self { typed: true, evidence }
    }

    pub fn untyped() -> Self {
        Self {
            typed: false,
            evidence: Evidence::None,
        }
    }
}

fn is_declaration(name: &str) -> bool {
    name.ends_with(TYPE_DECLARATION_SUFFIX)
}

/// Apply the manifest-only rules.
///
/// Returns `None` when the manifest does not prove the package typed; the
/// archive then has to be scanned.
pub fn classify_manifest(manifest: &PackageManifest) -> Option<Classification> {
    if let Some(typings) = manifest.typings_entry() {
        return Some(Classification::typed(Evidence::Typings(typings.to_string())));
    }

    if let Some(types) = manifest.types_entry() {
        return Some(Classification::typed(Evidence::Types(types.to_string())));
    }

    manifest
        .declared_files()
        .iter()
        .find(|file| is_declaration(file))
        .map(|file| Classification::typed(Evidence::DeclaredFile(file.clone())))
}

/// Find the first declaration file under `root`, in file-name order
pub fn scan_for_declarations(root: &Path) -> EngineResult<Option<PathBuf>> {
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).display().to_string();
            UntypedError::io(format!("Failed to scan {}", path), e.into())
        })?;

        if entry.file_type().is_dir() {
            continue;
        }

        if entry.file_name().to_str().is_some_and(is_declaration) {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            return Ok(Some(relative.to_path_buf()));
        }
    }

    Ok(None)
}

/// Classify a package from its manifest and, if available, its extracted tree
pub fn is_typed(manifest: &PackageManifest, extracted_dir: Option<&Path>) -> EngineResult<Classification> {
    if let Some(classification) = classify_manifest(manifest) {
        return Ok(classification);
    }

    let Some(dir) = extracted_dir else {
        return Ok(Classification::untyped());
    };

    Ok(match scan_for_declarations(dir)? {
        Some(path) => Classification::typed(Evidence::ArchiveFile(path)),
        None => Classification::untyped(),
    })
}

/// [`is_typed`] on a blocking thread
pub async fn is_typed_blocking(manifest: PackageManifest, extracted_dir: Option<PathBuf>) -> EngineResult<Classification> {
    tokio::task::spawn_blocking(move || is_typed(&manifest, extracted_dir.as_deref()))
        .await
        .map_err(|e| {
            UntypedError::io(
                "Classification task failed".to_string(),
                std::io::Error::new(std::io::ErrorKind::Other, e),
            )
        })?
}

#[cfg(test)]
mod tests {
    use super::*;
    use untyped_core::types::DistInfo;

    fn manifest() -> PackageManifest {
        PackageManifest::new("left-pad", "1.0.0", DistInfo::new("https://registry.example/x.tgz", ""))
    }

    #[test]
    fn test_rule_order() {
        let mut m = manifest();
        m.typings = Some("index.d.ts".to_string());
        m.types = Some("other.d.ts".to_string());
        assert_eq!(
            classify_manifest(&m).unwrap().evidence,
            Evidence::Typings("index.d.ts".to_string())
        );

        m.typings = Some(String::new());
        assert_eq!(
            classify_manifest(&m).unwrap().evidence,
            Evidence::Types("other.d.ts".to_string())
        );

        m.types = None;
        m.files = Some(vec!["index.js".to_string(), "lib/index.d.ts".to_string()]);
        assert_eq!(
            classify_manifest(&m).unwrap().evidence,
            Evidence::DeclaredFile("lib/index.d.ts".to_string())
        );
    }

    #[test]
    fn test_manifest_without_evidence_is_undecided() {
        let mut m = manifest();
        assert!(classify_manifest(&m).is_none());

        m.files = Some(vec!["index.js".to_string(), "README.md".to_string(), "index.d.tsx".to_string()]);
        assert!(classify_manifest(&m).is_none());
        assert_eq!(is_typed(&m, None).unwrap(), Classification::untyped());
    }

    #[test]
    fn test_archive_scan() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("package/dist/types")).unwrap();
        std::fs::write(root.join("package/index.js"), "").unwrap();
        std::fs::write(root.join("package/dist/types/index.d.ts"), "").unwrap();

        let classification = is_typed(&manifest(), Some(root)).unwrap();
        assert!(classification.typed);
        assert_eq!(
            classification.evidence,
            Evidence::ArchiveFile(PathBuf::from("package/dist/types/index.d.ts"))
        );
    }

    #[test]
    fn test_archive_without_declarations() {
        let temp_dir = tempfile::tempdir().unwrap();
        let root = temp_dir.path();
        std::fs::create_dir_all(root.join("package/index.d.ts.dir")).unwrap();
        std::fs::write(root.join("package/index.js"), "").unwrap();
        std::fs::write(root.join("package/types.ts"), "").unwrap();

        assert_eq!(scan_for_declarations(root).unwrap(), None);
        assert_eq!(is_typed(&manifest(), Some(root)).unwrap(), Classification::untyped());
    }

    #[test]
    fn test_manifest_decision_ignores_archive_contents() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("package")).unwrap();
        std::fs::write(temp_dir.path().join("package/index.js"), "").unwrap();

        let mut m = manifest();
        m.types = Some("index.d.ts".to_string());

        let without_archive = is_typed(&m, None).unwrap();
        let with_archive = is_typed(&m, Some(temp_dir.path())).unwrap();
        assert_eq!(with_archive, without_archive);
        assert_eq!(with_archive.evidence, Evidence::Types("index.d.ts".to_string()));
    }

    #[test]
    fn test_directory_named_like_declaration_is_ignored() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(temp_dir.path().join("package/odd.d.ts")).unwrap();
        assert_eq!(scan_for_declarations(temp_dir.path()).unwrap(), None);
    }

    #[tokio::test]
    async fn test_blocking_variant() {
        let mut m = manifest();
        m.types = Some("index.d.ts".to_string());
        assert!(is_typed_blocking(m, None).await.unwrap().typed);
    }
}
