use std::fmt::Display;
use std::path::Path;

use tokio::process::Command;
use tracing::instrument;

use crate::clients::process;
use crate::clients::process::LaunchError;

/// Exit code a script uses to declare that a repository needs no action.
pub const SKIP_EXIT_CODE: i32 = 10;

// -----------------------------------------------------------------------------
// Types

/// How a script run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStatus {
    Success,
    /// The script exited with [`SKIP_EXIT_CODE`].
    Skip,
    Failure(i32),
}

/// Result of a script that ran to completion, whatever its exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptOutcome {
    pub status: ScriptStatus,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ScriptStatus {
    pub fn from_exit_code(code: i32) -> Self {
        match code {
            0 => Self::Success,
            SKIP_EXIT_CODE => Self::Skip,
            code => Self::Failure(code),
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Skip => SKIP_EXIT_CODE,
            Self::Failure(code) => *code,
        }
    }
}

impl Display for ScriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("✅ SUCCESS"),
            Self::Skip => f.write_str("⏭  SKIPPED"),
            Self::Failure(code) => write!(f, "🚨 FAILED, exited with {}", code),
        }
    }
}

// -----------------------------------------------------------------------------
// Running

/// Run `script` with no arguments from inside `cwd`.
#[instrument(skip_all)]
pub async fn run_script(script: &Path, cwd: &Path) -> Result<ScriptOutcome, LaunchError> {
    let mut command = Command::new(script);
    command.current_dir(cwd);
    let output = process::run(command).await?;

    Ok(ScriptOutcome {
        status: ScriptStatus::from_exit_code(output.exit_code),
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
