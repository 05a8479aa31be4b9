//! Running the external packaging tool

use std::io::Read;
use std::process::Command;

use crate::command::ToolCommand;
use crate::error::{CoreError, Result};

/// Captured result of a finished tool invocation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code; `None` when the process was killed by a signal
    pub code: Option<i32>,
    /// Stdout and stderr, interleaved as written
    pub output: String,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Executes tool commands, blocking until they finish
pub trait ToolRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput>;

    /// Run and turn a nonzero exit into [`CoreError::ExternalTool`]
    fn run_checked(&self, command: &ToolCommand) -> Result<ToolOutput> {
        let output = self.run(command)?;
        if output.success() {
            Ok(output)
        } else {
            Err(CoreError::ExternalTool {
                command: tool_label(command),
                output: output.output,
            })
        }
    }
}

/// Spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ToolRunner for ProcessRunner {
    fn run(&self, command: &ToolCommand) -> Result<ToolOutput> {
        let start_failed = |e: std::io::Error| CoreError::ExternalTool {
            command: tool_label(command),
            output: format!("failed to start {}: {}", command.program, e),
        };

        // Both streams share one pipe so the combined output keeps the order
        // the tool wrote it in.
        let (mut reader, writer) = std::io::pipe().map_err(start_failed)?;
        let mut child = {
            let mut cmd = Command::new(&command.program);
            cmd.args(&command.args)
                .stdout(writer.try_clone().map_err(start_failed)?)
                .stderr(writer);
            cmd.spawn().map_err(start_failed)?
        };

        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        let status = child.wait()?;

        Ok(ToolOutput {
            code: status.code(),
            output: String::from_utf8_lossy(&raw).into_owned(),
        })
    }
}

/// Short label such as `helm package` used in failure messages
fn tool_label(command: &ToolCommand) -> String {
    let program = std::path::Path::new(&command.program)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| command.program.clone());

    let subcommands = command
        .args
        .iter()
        .take_while(|arg| !arg.starts_with('-') && !arg.contains(std::path::MAIN_SEPARATOR))
        .take(2);

    std::iter::once(program.as_str())
        .chain(subcommands.map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}
