//! Locating the archive produced by the packaging tool
//!
//! Strategies are tried in order and the first one that yields a path wins.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::SystemTime;

use regex::Regex;

use crate::error::{CoreError, Result};

/// Extension of archives written by `helm package`
pub const ARCHIVE_EXTENSION: &str = "tgz";

static SAVED_TO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)saved it to:\s*(.+)").expect("valid regex")
});

/// One way of discovering the produced archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactStrategy {
    /// Last "saved it to: <path>" line in the tool output
    ToolOutput,
    /// Most recently modified archive in the destination directory
    NewestArchive,
}

impl ArtifactStrategy {
    /// Default extraction order
    pub const ORDER: [ArtifactStrategy; 2] = [Self::ToolOutput, Self::NewestArchive];

    pub fn locate(self, output: &str, destination: &Path) -> Option<PathBuf> {
        match self {
            Self::ToolOutput => saved_path_from_output(output),
            Self::NewestArchive => newest_archive(destination),
        }
    }
}

/// Find the archive path, preferring the tool's own report
pub fn extract_artifact_path(output: &str, destination: &Path) -> Result<PathBuf> {
    for strategy in ArtifactStrategy::ORDER {
        if let Some(path) = strategy.locate(output, destination) {
            tracing::debug!(?strategy, "artifact located at {}", path.display());
            return Ok(path);
        }
    }

    Err(CoreError::ArtifactNotFound {
        output: output.to_string(),
    })
}

fn saved_path_from_output(output: &str) -> Option<PathBuf> {
    output
        .lines()
        .filter_map(|line| SAVED_TO.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|path| !path.is_empty())
        .last()
        .map(PathBuf::from)
}

// Picks up stale archives too when the destination is shared between runs.
fn newest_archive(destination: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(destination).ok()?;

    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file() && path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION)
        })
        .map(|path| {
            let modified = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            (modified, path)
        })
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, path)| path)
}
