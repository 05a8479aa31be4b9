//! Core error types

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("{message}")]
    InvalidInput { message: String },

    #[error("{what} not found: {}", .path.display())]
    MissingFile { what: &'static str, path: PathBuf },

    #[error("Workspace error: {message}")]
    Workspace { message: String },

    #[error("`{command}` failed:\n{output}")]
    ExternalTool { command: String, output: String },

    #[error("Could not determine created package path from tool output.\nOutput:\n{output}")]
    ArtifactNotFound { output: String },

    #[error("Integrity check failed: {message}")]
    Integrity { message: String },

    #[error("Tool setup failed: {message}")]
    Setup { message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn workspace(message: impl Into<String>) -> Self {
        Self::Workspace {
            message: message.into(),
        }
    }

    pub fn setup(message: impl Into<String>) -> Self {
        Self::Setup {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
