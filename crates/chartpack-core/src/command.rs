//! Packaging tool command lines

use std::fmt;
use std::path::Path;

use crate::error::{CoreError, Result};

/// A fully resolved tool invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl ToolCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program followed by its arguments
    #[must_use]
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

impl fmt::Display for ToolCommand {
    /// Shell-quoted form, for logs and error messages
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let argv = self.argv();
        match shlex::try_join(argv.iter().map(String::as_str)) {
            Ok(joined) => f.write_str(&joined),
            Err(_) => f.write_str(&argv.join(" ")),
        }
    }
}

/// Version identifiers stamped on the package
#[derive(Debug, Clone, Copy)]
pub struct PackageVersions<'a> {
    pub chart_version: &'a str,
    pub app_version: &'a str,
}

/// Build `<tool> package <chart> --destination <dest> --version <v> --app-version <av> [extra...]`
///
/// `extra_args` is split shell-style and appended verbatim after the fixed
/// flags; duplicates are left for the tool to resolve.
pub fn build_package_command(
    tool: &str,
    chart_path: &Path,
    destination: &Path,
    versions: PackageVersions<'_>,
    extra_args: &str,
) -> Result<ToolCommand> {
    let mut args = vec![
        "package".to_string(),
        chart_path.display().to_string(),
        "--destination".to_string(),
        destination.display().to_string(),
        "--version".to_string(),
        versions.chart_version.to_string(),
        "--app-version".to_string(),
        versions.app_version.to_string(),
    ];
    args.extend(split_args(extra_args)?);

    Ok(ToolCommand::new(tool, args))
}

/// Build `<tool> dependency update <chart>`
#[must_use]
pub fn build_dependency_update_command(tool: &str, chart_path: &Path) -> ToolCommand {
    ToolCommand::new(
        tool,
        vec![
            "dependency".to_string(),
            "update".to_string(),
            chart_path.display().to_string(),
        ],
    )
}

/// Shell-style tokenization honoring single and double quotes
fn split_args(raw: &str) -> Result<Vec<String>> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }

    shlex::split(raw).ok_or_else(|| {
        CoreError::invalid_input(format!("Invalid package_args (unbalanced quoting): {}", raw))
    })
}
