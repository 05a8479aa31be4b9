//! Private chart copies for merged values
//!
//! Packaging with merged values must never write into the caller's chart,
//! so the chart is copied into a scoped temporary directory first and only
//! the copy's `values.yaml` is replaced.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::values::Values;

/// Values file replaced in the copy
pub const VALUES_FILE: &str = "values.yaml";

/// Prefix of the temporary directory holding the copy
pub const TEMP_PREFIX: &str = ".dist-temporary-";

/// A chart copy owned by the running pipeline
///
/// The temporary directory is removed when the handle is dropped, on
/// success and error paths alike. Removal is best-effort.
#[derive(Debug)]
pub struct ChartWorkspace {
    dir: TempDir,
    chart_path: PathBuf,
}

impl ChartWorkspace {
    /// Copy `chart_dir` under a fresh directory in `temp_parent` and write `values` into it
    ///
    /// The copy keeps the chart's directory name so the packaging tool
    /// sees the same chart layout.
    pub fn materialize(chart_dir: &Path, values: &Values, temp_parent: &Path) -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempdir_in(temp_parent)
            .map_err(|e| {
                CoreError::workspace(format!(
                    "cannot create temporary directory in {}: {}",
                    temp_parent.display(),
                    e
                ))
            })?;

        let chart_name = chart_dir
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "chart".into());
        let chart_path = dir.path().join(chart_name);

        copy_tree(chart_dir, &chart_path, dir.path())?;

        let values_path = chart_path.join(VALUES_FILE);
        let content = values.to_yaml().map_err(|e| {
            CoreError::workspace(format!("cannot serialize merged values: {}", e))
        })?;
        std::fs::write(&values_path, content).map_err(|e| {
            CoreError::workspace(format!("cannot write {}: {}", values_path.display(), e))
        })?;

        tracing::debug!("materialized chart copy at {}", chart_path.display());

        Ok(Self { dir, chart_path })
    }

    /// Path of the copied chart
    pub fn chart_path(&self) -> &Path {
        &self.chart_path
    }

    /// Temporary directory containing the copy
    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// Copy a directory tree, skipping `exclude` if it happens to lie inside `src`
fn copy_tree(src: &Path, dest: &Path, exclude: &Path) -> Result<()> {
    let walker = WalkDir::new(src)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| !entry.path().starts_with(exclude));

    for entry in walker {
        let entry = entry.map_err(|e| CoreError::workspace(format!("cannot read chart: {}", e)))?;
        let rel_path = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| CoreError::workspace(e.to_string()))?;
        let target = dest.join(rel_path);

        let copied = if entry.file_type().is_dir() {
            std::fs::create_dir_all(&target)
        } else {
            std::fs::copy(entry.path(), &target).map(|_| ())
        };

        copied.map_err(|e| {
            CoreError::workspace(format!(
                "cannot copy {} to {}: {}",
                entry.path().display(),
                target.display(),
                e
            ))
        })?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_chart(dir: &Path) {
        std::fs::create_dir_all(dir.join("templates")).unwrap();
        std::fs::write(dir.join("Chart.yaml"), "apiVersion: v2\nname: web\nversion: 0.1.0\n").unwrap();
        std::fs::write(dir.join("values.yaml"), "replicas: 1\n").unwrap();
        std::fs::write(
            dir.join("templates/deployment.yaml"),
            "apiVersion: apps/v1\nkind: Deployment\n",
        )
        .unwrap();
    }

    #[test]
    fn test_materialize_copies_chart_and_replaces_values() {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("charts/web");
        create_test_chart(&chart);

        let values = Values::from_yaml("replicas: 3\n").unwrap();
        let ws = ChartWorkspace::materialize(&chart, &values, temp.path()).unwrap();

        assert_eq!(ws.chart_path().file_name().unwrap(), "web");
        assert!(ws.root().file_name().unwrap().to_string_lossy().starts_with(TEMP_PREFIX));
        assert_eq!(
            std::fs::read_to_string(ws.chart_path().join("Chart.yaml")).unwrap(),
            std::fs::read_to_string(chart.join("Chart.yaml")).unwrap()
        );
        assert!(ws.chart_path().join("templates/deployment.yaml").is_file());

        let copied = Values::from_file(ws.chart_path().join(VALUES_FILE)).unwrap();
        assert_eq!(copied, values);
        assert_eq!(std::fs::read_to_string(chart.join("values.yaml")).unwrap(), "replicas: 1\n");
    }

    #[test]
    fn test_materialize_writes_values_when_chart_has_none() {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("bare");
        std::fs::create_dir_all(&chart).unwrap();
        std::fs::write(chart.join("Chart.yaml"), "name: bare\n").unwrap();

        let values = Values::from_yaml("a: 1\n").unwrap();
        let ws = ChartWorkspace::materialize(&chart, &values, temp.path()).unwrap();

        assert!(ws.chart_path().join(VALUES_FILE).is_file());
        assert!(!chart.join(VALUES_FILE).exists());
    }

    #[test]
    fn test_drop_removes_copy() {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("web");
        create_test_chart(&chart);

        let ws = ChartWorkspace::materialize(&chart, &Values::new(), temp.path()).unwrap();
        let root = ws.root().to_path_buf();
        assert!(root.exists());

        drop(ws);
        assert!(!root.exists());
        assert!(chart.join("Chart.yaml").exists());
    }

    #[test]
    fn test_chart_at_temp_parent_is_not_copied_recursively() {
        let temp = TempDir::new().unwrap();
        create_test_chart(temp.path());

        let ws = ChartWorkspace::materialize(temp.path(), &Values::new(), temp.path()).unwrap();

        let nested = std::fs::read_dir(ws.chart_path())
            .unwrap()
            .filter_map(|e| e.ok())
            .any(|e| e.file_name().to_string_lossy().starts_with(TEMP_PREFIX));
        assert!(!nested);
        assert!(ws.chart_path().join("templates/deployment.yaml").is_file());
    }

    #[test]
    fn test_materialize_fails_for_missing_parent() {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("web");
        create_test_chart(&chart);

        let err = ChartWorkspace::materialize(&chart, &Values::new(), &temp.path().join("nope"))
            .unwrap_err();
        assert!(matches!(err, CoreError::Workspace { .. }));
    }

    #[test]
    fn test_unwritable_values_path_is_workspace_error() {
        let temp = TempDir::new().unwrap();
        let chart = temp.path().join("web");
        std::fs::create_dir_all(chart.join("values.yaml")).unwrap();
        std::fs::write(chart.join("Chart.yaml"), "apiVersion: v2\nname: web\nversion: 0.1.0\n").unwrap();

        let err = ChartWorkspace::materialize(&chart, &Values::new(), temp.path()).unwrap_err();
        match err {
            CoreError::Workspace { message } => {
                assert!(message.contains("cannot write"), "message: {message}");
                assert!(message.contains("values.yaml"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
