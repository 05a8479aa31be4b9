//! Chart version validation and tool tag normalization

use semver::Version;

use crate::error::{CoreError, Result};

/// Check that `version` is a strict SemVer 2.0 string
///
/// Surrounding whitespace is ignored. Leading zeros in the numeric
/// components, missing components and empty input are all rejected.
#[must_use]
pub fn validate_version(version: &str) -> bool {
    Version::parse(version.trim()).is_ok()
}

/// Normalize a tool release tag so it always starts with `v`
///
/// The tag is opaque: it is not SemVer-validated, only trimmed and prefixed.
pub fn normalize_tag(tag: &str) -> Result<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Err(CoreError::invalid_input("tool_version is empty"));
    }

    if tag.starts_with('v') {
        Ok(tag.to_string())
    } else {
        Ok(format!("v{}", tag))
    }
}

/// Parse a pipeline boolean input
///
/// Accepts `1`, `true`, `yes`, `y` and `on` in any case; everything else is false.
#[must_use]
pub fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "y" | "on"
    )
}
