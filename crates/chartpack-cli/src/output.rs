//! Named output values for the calling pipeline

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::error::{CliError, Result};

/// Append `name=value` to `target`, or print it when there is no target
pub fn write_output(target: Option<&Path>, name: &str, value: &str) -> Result<()> {
    let line = format!("{}={}", name, value);

    let Some(path) = target else {
        println!("{}", line);
        return Ok(());
    };

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| writeln!(file, "{}", line))
        .map_err(|source| CliError::Output {
            target: path.display().to_string(),
            source,
        })
}
