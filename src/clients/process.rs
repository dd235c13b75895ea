use std::process::Stdio;

use thiserror::Error;
use tokio::process::Command;

// -----------------------------------------------------------------------------
// Types

/// Buffered result of a process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// Exit code, or -1 when the process was terminated by a signal.
    pub exit_code: i32,
}

/// The process could not be started at all.
#[derive(Debug, Error)]
#[error("failed to launch {program}: {source}")]
pub struct LaunchError {
    pub program: String,
    #[source]
    pub source: std::io::Error,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

// -----------------------------------------------------------------------------
// Running

/// Run a command to completion, buffering stdout and stderr.
///
/// A non-zero exit is reported through [`ProcessOutput::exit_code`], never as
/// an error; only a failure to spawn the process is.
pub async fn run(mut command: Command) -> Result<ProcessOutput, LaunchError> {
    let program = command
        .as_std()
        .get_program()
        .to_string_lossy()
        .into_owned();

    let output = command
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|source| LaunchError { program, source })?;

    Ok(ProcessOutput {
        stdout: output.stdout,
        stderr: output.stderr,
        exit_code: output.status.code().unwrap_or(-1),
    })
}
