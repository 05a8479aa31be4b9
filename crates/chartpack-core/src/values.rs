//! Layered values files with deep merge support

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};
use crate::paths;

/// A values document
///
/// Mappings are merged key by key; every other node (scalar, sequence,
/// tagged value, null) is an opaque leaf replaced wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub YamlValue);

impl Default for Values {
    fn default() -> Self {
        Self::new()
    }
}

impl Values {
    /// Create an empty mapping
    pub fn new() -> Self {
        Self(YamlValue::Mapping(Mapping::new()))
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from a YAML string
    ///
    /// An empty or `null` document yields an empty mapping. `<<` merge keys
    /// are expanded so aliased defaults take part in the deep merge.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut value: YamlValue = serde_yaml::from_str(yaml)?;
        value.apply_merge()?;
        if value.is_null() {
            return Ok(Self::new());
        }
        Ok(Self(value))
    }

    /// Serialize to block-style YAML, keys in mapping order
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Deep merge an overlay into this document
    ///
    /// Rules:
    /// - Mapping + Mapping: recursive merge, base-only keys kept
    /// - anything else: overlay replaces base (sequences are not appended)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Fold documents left to right; later documents win
    pub fn merge_all<'a>(values: impl IntoIterator<Item = &'a Values>) -> Self {
        let mut result = Values::new();
        for v in values {
            result.merge(v);
        }
        result
    }

    /// Get a value by dotted path (e.g., "image.tag")
    pub fn get(&self, path: &str) -> Option<&YamlValue> {
        path.split('.').try_fold(&self.0, |node, key| node.get(key))
    }

    /// Get the inner YAML value
    pub fn inner(&self) -> &YamlValue {
        &self.0
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            YamlValue::Mapping(map) => map.is_empty(),
            YamlValue::Null => true,
            _ => false,
        }
    }
}

/// Deep merge two YAML values in place
fn deep_merge(base: &mut YamlValue, overlay: &YamlValue) {
    match (base, overlay) {
        (YamlValue::Mapping(base_map), YamlValue::Mapping(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Split a raw values file list
///
/// Entries are separated by commas and/or line breaks in any combination.
/// Blank entries are dropped; order is preserved.
#[must_use]
pub fn parse_values_files(raw: &str) -> Vec<String> {
    raw.split(|c| matches!(c, ',' | '\n' | '\r'))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Load and fold values files resolved against the chart root
///
/// Every reference must exist as a file; the first missing one fails the
/// whole merge before anything is parsed.
pub fn merge_values_files(chart_root: &Path, references: &[String]) -> Result<Values> {
    let resolved: Vec<PathBuf> = references
        .iter()
        .map(|reference| paths::resolve(chart_root, reference))
        .collect();

    if let Some(missing) = resolved.iter().find(|path| !path.is_file()) {
        return Err(CoreError::MissingFile {
            what: "Values file",
            path: missing.clone(),
        });
    }

    let mut merged = Values::new();
    for path in &resolved {
        tracing::debug!("merging values from {}", path.display());
        merged.merge(&Values::from_file(path)?);
    }

    Ok(merged)
}
