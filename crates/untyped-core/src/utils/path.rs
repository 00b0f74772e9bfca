//! Path utilities for safe file system operations.
//!
//! Archive entries name their own paths, so every entry is checked before it
//! is joined onto an extraction root.

use crate::error::{UntypedError, UntypedResult};
use std::path::{Component, Path, PathBuf};

/// Normalize a path by resolving . and .. components
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                // Keep a leading `..` so the escape stays visible to callers
                if matches!(components.last(), None | Some(Component::ParentDir)) {
                    components.push(component);
                } else {
                    components.pop();
                }
            },
            other => components.push(other),
        }
    }

    components.iter().collect()
}

/// Check if a relative path stays inside its base directory
pub fn is_safe_path(path: &Path) -> bool {
    let mut depth = 0i32;

    for component in path.components() {
        match component {
            Component::CurDir => {},
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            },
            Component::Normal(_) => depth += 1,
            // Root and prefix components make the path absolute
            _ => return false,
        }
    }

    true
}

/// Safely join paths, preventing directory traversal
pub fn safe_join(base: &Path, path: &Path) -> UntypedResult<PathBuf> {
    if !is_safe_path(path) {
        return Err(UntypedError::UnsafePath {
            path: path.display().to_string(),
        });
    }

    Ok(base.join(normalize_path(path)))
}
