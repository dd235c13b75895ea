#![allow(async_fn_in_trait)]

use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::instrument;

use super::process;

// -----------------------------------------------------------------------------
// GithubOps trait

/// Pull request operations, run from inside a working copy.
#[cfg_attr(test, automock)]
pub trait GithubOps {
    /// Open a pull request for `head` and return the tool's stdout.
    async fn pr_create(&self, repo: &Path, title: &str, body: &str, head: &str) -> Result<String>;
}

// -----------------------------------------------------------------------------
// GhCli

/// Implementation that shells out to the GitHub CLI (or a compatible tool).
pub struct GhCli {
    program: PathBuf,
}

impl GhCli {
    pub fn new(program: PathBuf) -> Self {
        Self { program }
    }
}

impl GithubOps for GhCli {
    #[instrument(skip_all)]
    async fn pr_create(&self, repo: &Path, title: &str, body: &str, head: &str) -> Result<String> {
        let mut command = Command::new(&self.program);
        command
            .current_dir(repo)
            .args(["pr", "create", "-t", title, "-b", body, "-H", head]);

        let output = process::run(command)
            .await
            .context("Failed to execute pull request tool")?;

        if !output.success() {
            bail!(
                "Error creating PR (exit code {}).\nEnsure you've tested {} in a separate terminal first, and then resolve the following errors:\n{}",
                output.exit_code,
                self.program.display(),
                output.stderr_lossy().trim_end()
            );
        }

        Ok(output.stdout_lossy())
    }
}
