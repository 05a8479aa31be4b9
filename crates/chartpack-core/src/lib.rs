//! Chartpack Core - packaging charts into versioned archives
//!
//! This crate provides the pieces of the package pipeline:
//! - `version`: chart version validation and tool tag normalization
//! - `paths`: workspace-anchored path resolution
//! - `values`: layered values files with deep merge
//! - `workspace`: private chart copies carrying merged values
//! - `command` / `runner`: tool command lines and their execution
//! - `artifact`: locating the produced archive
//! - `install`: provisioning of the packaging tool
//! - `pipeline`: the end-to-end run

pub mod artifact;
pub mod command;
pub mod error;
pub mod install;
pub mod paths;
pub mod pipeline;
pub mod runner;
pub mod values;
pub mod version;
pub mod workspace;

pub use artifact::{ArtifactStrategy, extract_artifact_path};
pub use command::{PackageVersions, ToolCommand, build_package_command};
pub use error::{CoreError, Result};
pub use install::{DEFAULT_INSTALL_DIR, DEFAULT_TOOL_VERSION, Installer, TOOL_BINARY};
pub use pipeline::{MANIFEST_FILE, PackageRequest, PipelineOutcome, PreparedChart};
pub use runner::{ProcessRunner, ToolOutput, ToolRunner};
pub use values::{Values, parse_values_files};
pub use version::{normalize_tag, truthy, validate_version};
pub use workspace::ChartWorkspace;
