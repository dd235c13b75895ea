#![allow(async_fn_in_trait)]

use std::fmt::Display;
use std::path::Path;

use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
#[cfg(test)]
use mockall::automock;
use tokio::process::Command;
use tracing::instrument;

use super::process;
use super::process::ProcessOutput;
use crate::auth::AuthCredential;
use crate::config::Author;

// -----------------------------------------------------------------------------
// GitOps trait

/// Operations on a local working copy.
#[cfg_attr(test, automock)]
pub trait GitOps {
    /// Clone only the tip of `branch` from `url` into `dest`.
    async fn clone_shallow(&self, url: &str, dest: &Path, branch: &str) -> Result<()>;

    /// Fetch only the tip of `branch` from origin into `refs/remotes/origin/<branch>`.
    async fn fetch_branch_shallow(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Check out a local branch, discarding local modifications.
    async fn checkout_force(&self, repo: &Path, branch: &str) -> Result<()>;

    /// Resolve a ref to a commit, or `None` when the ref doesn't exist.
    async fn resolve_commit(&self, repo: &Path, refname: &str) -> Result<Option<CommitId>>;

    async fn local_branch_exists(&self, repo: &Path, branch: &str) -> Result<bool>;

    /// Create `branch` at `commit` and check it out, discarding local modifications.
    async fn create_branch(&self, repo: &Path, branch: &str, commit: &CommitId) -> Result<()>;

    async fn reset_hard(&self, repo: &Path, commit: &CommitId) -> Result<()>;

    /// Delete untracked files and directories. Ignored files are kept.
    async fn remove_untracked(&self, repo: &Path) -> Result<()>;

    /// True when there is nothing to commit, untracked files included.
    async fn is_clean(&self, repo: &Path) -> Result<bool>;

    async fn add_all(&self, repo: &Path) -> Result<()>;
    async fn commit(&self, repo: &Path, message: &str, author: &Author) -> Result<()>;
    async fn push_branch(&self, repo: &Path, branch: &str) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitId(pub String);

impl Display for CommitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// -----------------------------------------------------------------------------
// RealGit

/// Real implementation that calls the git CLI
pub struct RealGit {
    auth: AuthCredential,
}

impl RealGit {
    pub fn new(auth: AuthCredential) -> Self {
        Self { auth }
    }

    fn local(&self, repo: &Path) -> Command {
        let mut command = Command::new("git");
        command.current_dir(repo);
        command
    }

    /// A git command carrying credentials for talking to origin.
    fn remote(&self, cwd: &Path) -> Result<Command> {
        let mut command = Command::new("git");
        command
            .current_dir(cwd)
            .args(self.auth.git_config_args())
            .envs(self.auth.git_env()?)
            .env("GIT_TERMINAL_PROMPT", "0");
        Ok(command)
    }

    async fn exec(command: Command) -> Result<ProcessOutput> {
        process::run(command)
            .await
            .context("Failed to execute git command")
    }

    async fn exec_checked(command: Command) -> Result<ProcessOutput> {
        let output = Self::exec(command).await?;
        if !output.success() {
            bail!("git command failed: {}", output.stderr_lossy().trim_end());
        }
        Ok(output)
    }
}

impl GitOps for RealGit {
    #[instrument(skip_all)]
    async fn clone_shallow(&self, url: &str, dest: &Path, branch: &str) -> Result<()> {
        let parent = dest
            .parent()
            .context("Clone destination has no parent directory")?;
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;

        let mut command = self.remote(parent)?;
        command
            .args(["clone", "--depth", "1", "--single-branch", "--branch", branch, url])
            .arg(dest);
        Self::exec_checked(command).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn fetch_branch_shallow(&self, repo: &Path, branch: &str) -> Result<()> {
        let refspec = format!("+refs/heads/{}:refs/remotes/origin/{}", branch, branch);
        let mut command = self.remote(repo)?;
        command.args(["fetch", "--depth", "1", "origin", &refspec]);
        Self::exec_checked(command).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn checkout_force(&self, repo: &Path, branch: &str) -> Result<()> {
        let mut command = self.local(repo);
        command.args(["checkout", "--force", branch, "--"]);
        Self::exec_checked(command).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn resolve_commit(&self, repo: &Path, refname: &str) -> Result<Option<CommitId>> {
        let mut command = self.local(repo);
        command.args([
            "rev-parse",
            "--verify",
            "--quiet",
            &format!("{}^{{commit}}", refname),
        ]);
        let output = Self::exec(command).await?;

        // Exit code 1 means the ref doesn't exist
        match output.exit_code {
            0 => Ok(Some(CommitId(output.stdout_lossy().trim().to_string()))),
            1 => Ok(None),
            _ => bail!("git command failed: {}", output.stderr_lossy().trim_end()),
        }
    }

    #[instrument(skip_all)]
    async fn local_branch_exists(&self, repo: &Path, branch: &str) -> Result<bool> {
        let mut command = self.local(repo);
        command.args([
            "show-ref",
            "--verify",
            "--quiet",
            &format!("refs/heads/{}", branch),
        ]);
        let output = Self::exec(command).await?;

        match output.exit_code {
            0 => Ok(true),
            1 => Ok(false),
            _ => bail!("git command failed: {}", output.stderr_lossy().trim_end()),
        }
    }

    #[instrument(skip_all)]
    async fn create_branch(&self, repo: &Path, branch: &str, commit: &CommitId) -> Result<()> {
        let mut command = self.local(repo);
        command.args(["checkout", "--force", "-b", branch, &commit.0]);
        Self::exec_checked(command).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn reset_hard(&self, repo: &Path, commit: &CommitId) -> Result<()> {
        let mut command = self.local(repo);
        command.args(["reset", "--hard", &commit.0]);
        Self::exec_checked(command).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn remove_untracked(&self, repo: &Path) -> Result<()> {
        let mut command = self.local(repo);
        command.args(["clean", "--force", "-d", "--quiet"]);
        Self::exec_checked(command).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn is_clean(&self, repo: &Path) -> Result<bool> {
        let mut command = self.local(repo);
        command.args(["status", "--porcelain"]);
        let output = Self::exec_checked(command).await?;
        Ok(output.stdout.iter().all(u8::is_ascii_whitespace))
    }

    #[instrument(skip_all)]
    async fn add_all(&self, repo: &Path) -> Result<()> {
        let mut command = self.local(repo);
        command.args(["add", "--all"]);
        Self::exec_checked(command).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn commit(&self, repo: &Path, message: &str, author: &Author) -> Result<()> {
        let mut command = self.local(repo);
        command
            .arg("-c")
            .arg(format!("user.name={}", author.name))
            .arg("-c")
            .arg(format!("user.email={}", author.email))
            .args(["commit", "--quiet", "-m", message]);
        Self::exec_checked(command).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn push_branch(&self, repo: &Path, branch: &str) -> Result<()> {
        let refspec = format!("refs/heads/{}:refs/heads/{}", branch, branch);
        let mut command = self.remote(repo)?;
        command.args(["push", "-u", "origin", &refspec]);
        Self::exec_checked(command).await?;
        Ok(())
    }
}
