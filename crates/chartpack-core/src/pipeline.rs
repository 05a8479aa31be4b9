//! The package pipeline
//!
//! Validation and path resolution happen in [`PackageRequest::prepare`],
//! before the tool is provisioned, so bad inputs fail without any download.
//! [`PreparedChart::package`] then merges values, packages and reports.

use std::path::PathBuf;

use crate::artifact::extract_artifact_path;
use crate::command::{
    PackageVersions, ToolCommand, build_dependency_update_command, build_package_command,
};
use crate::error::{CoreError, Result};
use crate::paths;
use crate::runner::ToolRunner;
use crate::values::{merge_values_files, parse_values_files};
use crate::version::validate_version;
use crate::workspace::ChartWorkspace;

/// Manifest descriptor required in the chart root
pub const MANIFEST_FILE: &str = "Chart.yaml";

/// Raw pipeline inputs
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Root that relative inputs resolve against and outputs are reported relative to
    pub workspace_root: PathBuf,
    pub chart_path: String,
    pub destination: String,
    pub chart_version: String,
    pub app_version: String,
    /// Comma and/or newline separated override files, relative to the chart
    pub values_files: String,
    /// Extra arguments for the package command, shell quoted
    pub package_args: String,
    pub dependency_update: bool,
}

/// A validated request with absolute paths
#[derive(Debug, Clone)]
pub struct PreparedChart {
    pub workspace_root: PathBuf,
    pub chart_path: PathBuf,
    pub destination: PathBuf,
    pub chart_version: String,
    pub app_version: String,
    pub values_files: Vec<String>,
    pub package_args: String,
    pub dependency_update: bool,
}

/// Result of a successful run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// Absolute path of the created archive
    pub artifact_path: PathBuf,
    /// Archive path relative to the workspace root when possible
    pub reported_path: String,
    /// The package command that produced it
    pub command: ToolCommand,
}

impl PackageRequest {
    /// Validate inputs, resolve paths and create the destination
    pub fn prepare(&self) -> Result<PreparedChart> {
        if !validate_version(&self.chart_version) {
            return Err(CoreError::invalid_input(format!(
                "Invalid chart version (SemVer required): {}",
                self.chart_version
            )));
        }

        let root = paths::normalize(&std::path::absolute(&self.workspace_root)?);
        let chart_path = paths::resolve(&root, &self.chart_path);
        let destination = paths::resolve(&root, &self.destination);
        tracing::debug!(
            chart = %chart_path.display(),
            destination = %destination.display(),
            "resolved paths"
        );

        let manifest = chart_path.join(MANIFEST_FILE);
        if !manifest.is_file() {
            return Err(CoreError::MissingFile {
                what: "`Chart.yaml`",
                path: manifest,
            });
        }

        std::fs::create_dir_all(&destination)?;

        Ok(PreparedChart {
            workspace_root: root,
            chart_path,
            destination,
            chart_version: self.chart_version.trim().to_string(),
            app_version: self.app_version.clone(),
            values_files: parse_values_files(&self.values_files),
            package_args: self.package_args.clone(),
            dependency_update: self.dependency_update,
        })
    }
}

impl PreparedChart {
    /// Merge values (if any), run the tool and locate the archive
    ///
    /// The chart copy used for merged values lives until this returns.
    pub fn package(&self, tool: &str, runner: &dyn ToolRunner) -> Result<PipelineOutcome> {
        let workspace = self.materialize_values()?;
        let chart = workspace
            .as_ref()
            .map_or(self.chart_path.as_path(), ChartWorkspace::chart_path);

        if self.dependency_update {
            tracing::info!("Running {} dependency update...", tool);
            runner.run_checked(&build_dependency_update_command(tool, chart))?;
        }

        let command = build_package_command(
            tool,
            chart,
            &self.destination,
            PackageVersions {
                chart_version: &self.chart_version,
                app_version: &self.app_version,
            },
            &self.package_args,
        )?;

        tracing::info!("Running: {}", command);
        let output = runner.run_checked(&command)?;

        let found = extract_artifact_path(&output.output, &self.destination)?;
        let artifact_path = paths::resolve(&self.workspace_root, &found);
        let reported_path = paths::to_root_relative(&self.workspace_root, &artifact_path);

        tracing::info!("Package created: {}", artifact_path.display());

        Ok(PipelineOutcome {
            artifact_path,
            reported_path,
            command,
        })
    }

    fn materialize_values(&self) -> Result<Option<ChartWorkspace>> {
        if self.values_files.is_empty() {
            return Ok(None);
        }

        tracing::info!("Merging values files: {}", self.values_files.join(", "));
        let merged = merge_values_files(&self.chart_path, &self.values_files)?;
        ChartWorkspace::materialize(&self.chart_path, &merged, &self.workspace_root).map(Some)
    }
}
