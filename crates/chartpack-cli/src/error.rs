//! CLI error types with exit code handling

use chartpack_core::CoreError;
use miette::Diagnostic;
use thiserror::Error;

use crate::exit_codes;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// A required input is missing or malformed
    #[error("{message}")]
    #[diagnostic(code(chartpack::cli::input))]
    Input {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// A pipeline step failed
    #[error(transparent)]
    #[diagnostic(code(chartpack::cli::pipeline))]
    Pipeline(#[from] CoreError),

    /// The named output could not be written
    #[error("Cannot write output to {target}: {source}")]
    #[diagnostic(code(chartpack::cli::output))]
    Output {
        target: String,
        source: std::io::Error,
    },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Input { .. } | CliError::Pipeline(_) | CliError::Output { .. } => {
                exit_codes::ERROR
            }
        }
    }

    /// Create an error for an unset required input
    pub fn missing_input(name: &str) -> Self {
        let env = format!("INPUT_{}", name.to_ascii_uppercase());
        Self::Input {
            message: format!("Missing required input: {} (env {})", name, env),
            help: Some(format!(
                "pass --{} or set {}",
                name.replace('_', "-"),
                env
            )),
        }
    }

    /// Hint shown under the error line, when one applies
    pub fn hint(&self) -> Option<String> {
        match self {
            CliError::Pipeline(CoreError::InvalidInput { message })
                if message.starts_with("Invalid chart version") =>
            {
                Some("chart_version must look like MAJOR.MINOR.PATCH, e.g. 1.2.3".to_string())
            }
            CliError::Pipeline(CoreError::Integrity { .. }) => {
                Some("the downloaded tool did not match its published checksum".to_string())
            }
            _ => self.help().map(|help| help.to_string()),
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_input_message() {
        let err = CliError::missing_input("chart_path");
        assert_eq!(
            err.to_string(),
            "Missing required input: chart_path (env INPUT_CHART_PATH)"
        );
        assert_eq!(err.hint().unwrap(), "pass --chart-path or set INPUT_CHART_PATH");
        assert_eq!(err.exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn test_core_errors_display_unchanged() {
        let err = CliError::from(CoreError::ArtifactNotFound {
            output: "silence".to_string(),
        });
        assert!(err.to_string().starts_with("Could not determine created package path"));
        assert_eq!(err.exit_code(), exit_codes::ERROR);
    }

    #[test]
    fn test_version_hint() {
        let err = CliError::from(CoreError::invalid_input(
            "Invalid chart version (SemVer required): 1.2",
        ));
        assert!(err.hint().unwrap().contains("MAJOR.MINOR.PATCH"));
    }
}
