//! Chartpack CLI - package a chart into a versioned archive
//!
//! Every input can be given as a flag or through the `INPUT_<NAME>`
//! environment variable a pipeline runner exports for action inputs.

use chartpack_core::{
    DEFAULT_INSTALL_DIR, DEFAULT_TOOL_VERSION, Installer, PackageRequest, ProcessRunner,
    TOOL_BINARY, truthy,
};
use clap::Parser;
use console::style;
use miette::Diagnostic;
use std::path::PathBuf;

mod error;
mod exit_codes;
mod output;

use error::{CliError, Result};

/// Workspace root used when `GITHUB_WORKSPACE` is not set
const DEFAULT_WORKSPACE: &str = "/github/workspace";

#[derive(Parser)]
#[command(name = "chartpack")]
#[command(version)]
#[command(about = "Package a chart into a versioned archive", long_about = None)]
struct Cli {
    /// Chart directory, relative to the workspace (required)
    #[arg(long, env = "INPUT_CHART_PATH")]
    chart_path: Option<String>,

    /// Output directory for the archive [default: .]
    #[arg(long, env = "INPUT_DESTINATION")]
    destination: Option<String>,

    /// Release tag of the packaging tool to install
    #[arg(long, env = "INPUT_TOOL_VERSION")]
    tool_version: Option<String>,

    /// Run dependency resolution before packaging (1/true/yes/y/on)
    #[arg(long, env = "INPUT_DEPENDENCY_UPDATE")]
    dependency_update: Option<String>,

    /// Extra arguments appended to the package command, shell quoted
    #[arg(long, env = "INPUT_PACKAGE_ARGS", allow_hyphen_values = true)]
    package_args: Option<String>,

    /// Chart version, strict SemVer (required)
    #[arg(long, env = "INPUT_CHART_VERSION")]
    chart_version: Option<String>,

    /// Application version stamped on the chart (required)
    #[arg(long, env = "INPUT_CHART_APP_VERSION")]
    chart_app_version: Option<String>,

    /// Comma and/or newline separated values files, merged in order
    #[arg(long, env = "INPUT_VALUES_FILES")]
    values_files: Option<String>,

    /// Use an already installed tool instead of downloading one (1/true/yes/y/on)
    #[arg(long, env = "INPUT_SKIP_SETUP")]
    skip_setup: Option<String>,

    /// Tool executable used with --skip-setup [default: helm]
    #[arg(long, env = "INPUT_TOOL_PATH")]
    tool_path: Option<String>,

    /// Directory the downloaded tool is installed into [default: /usr/local/bin]
    #[arg(long, env = "INPUT_INSTALL_DIR")]
    install_dir: Option<String>,

    /// Workspace root [default: /github/workspace]
    #[arg(long, env = "GITHUB_WORKSPACE")]
    workspace: Option<String>,

    /// File receiving the `package_path` output; printed to stdout when unset
    #[arg(long, env = "GITHUB_OUTPUT", hide = true)]
    github_output: Option<String>,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

/// Pipeline runners export declared inputs even when left blank
fn input(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn path_input(value: Option<String>) -> Option<PathBuf> {
    input(value).map(PathBuf::from)
}

fn required(value: Option<String>, name: &str) -> Result<String> {
    input(value).ok_or_else(|| CliError::missing_input(name))
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CHARTPACK_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let request = PackageRequest {
        workspace_root: path_input(cli.workspace).unwrap_or_else(|| PathBuf::from(DEFAULT_WORKSPACE)),
        chart_path: required(cli.chart_path, "chart_path")?,
        destination: input(cli.destination).unwrap_or_else(|| ".".to_string()),
        chart_version: required(cli.chart_version, "chart_version")?,
        app_version: required(cli.chart_app_version, "chart_app_version")?,
        values_files: input(cli.values_files).unwrap_or_default(),
        package_args: input(cli.package_args).unwrap_or_default(),
        dependency_update: input(cli.dependency_update).is_some_and(|v| truthy(&v)),
    };

    let prepared = request.prepare()?;

    let tool = if input(cli.skip_setup).is_some_and(|v| truthy(&v)) {
        input(cli.tool_path).unwrap_or_else(|| TOOL_BINARY.to_string())
    } else {
        let version = input(cli.tool_version).unwrap_or_else(|| DEFAULT_TOOL_VERSION.to_string());
        let install_dir =
            path_input(cli.install_dir).unwrap_or_else(|| PathBuf::from(DEFAULT_INSTALL_DIR));
        Installer::new(install_dir)?
            .install(&version, &ProcessRunner)?
            .display()
            .to_string()
    };

    let outcome = prepared.package(&tool, &ProcessRunner)?;

    let target = path_input(cli.github_output);
    output::write_output(target.as_deref(), "package_path", &outcome.reported_path)
}

fn report(err: &CliError) {
    if let Some(code) = err.code() {
        tracing::debug!("error code: {}", code);
    }

    eprintln!("{} {}", style("ERROR:").red().bold().for_stderr(), err);
    if let Some(hint) = err.hint() {
        eprintln!("  {} {}", style("help:").cyan().for_stderr(), hint);
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            std::process::exit(exit_codes::ERROR);
        }
        Err(e) => e.exit(),
    };

    init_tracing(cli.verbose);

    let code = match run(cli) {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            report(&err);
            err.exit_code()
        }
    };

    std::process::exit(code);
}
