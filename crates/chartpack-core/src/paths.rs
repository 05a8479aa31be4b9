//! Workspace-anchored path resolution
//!
//! Inputs arrive relative to the pipeline workspace; outputs are reported
//! back relative to it so later steps running outside the container can use them.

use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path
///
/// Collapses `.`, `..` and redundant separators without touching the
/// filesystem. `..` above an absolute root is dropped; leading `..` of a
/// relative path is kept. An empty result becomes `.`.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut prefix = PathBuf::new();
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => prefix.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                _ if path.has_root() => {}
                _ => parts.push(component),
            },
            Component::Normal(_) => parts.push(component),
        }
    }

    let mut normalized = prefix;
    for part in parts {
        normalized.push(part.as_os_str());
    }

    if normalized.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalized
    }
}

/// Resolve `path` against `root`
///
/// Absolute paths are only normalized; relative ones are joined onto `root` first.
#[must_use]
pub fn resolve(root: &Path, path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    if path.is_absolute() {
        normalize(path)
    } else {
        normalize(&root.join(path))
    }
}

/// Express `path` relative to `root` for reporting
///
/// Falls back to the normalized path itself when no relative form exists
/// (unrelated prefixes, or a relative `path` against an absolute root).
#[must_use]
pub fn to_root_relative(root: &Path, path: &Path) -> String {
    let root = normalize(root);
    let path = normalize(path);

    match pathdiff::diff_paths(&path, &root) {
        Some(relative) if relative.as_os_str().is_empty() => ".".to_string(),
        Some(relative) if !relative.is_absolute() => relative.display().to_string(),
        _ => path.display().to_string(),
    }
}
