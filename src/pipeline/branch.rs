use anyhow::Context;
use anyhow::anyhow;

use super::ReadyCopy;
use super::WorkingCopy;
use crate::App;
use crate::clients::git::GitOps;
use crate::clients::github::GithubOps;
use crate::error::RepoError;

impl<G: GitOps, H: GithubOps> App<G, H> {
    /// Check out the work branch pointing at the default branch tip.
    ///
    /// An existing work branch is force-checked-out and hard-reset, otherwise
    /// the branch is created at the tip. Untracked files are removed either
    /// way, so every run starts from the same tree whatever a previous run
    /// left behind.
    pub async fn reconcile_branch(
        &self,
        copy: WorkingCopy,
        stdout: &mut impl std::io::Write,
    ) -> Result<ReadyCopy, RepoError> {
        self.reconcile_work_branch(copy, stdout)
            .await
            .map_err(RepoError::Branch)
    }

    async fn reconcile_work_branch(
        &self,
        copy: WorkingCopy,
        stdout: &mut impl std::io::Write,
    ) -> anyhow::Result<ReadyCopy> {
        let default_branch = &self.config.default_branch;
        let work_branch = &self.config.work_branch;

        let default_ref = format!("refs/remotes/origin/{}", default_branch);
        let tip = self
            .git
            .resolve_commit(&copy.path, &default_ref)
            .await
            .context("error getting reference")?
            .ok_or_else(|| anyhow!("default branch {} not found", default_branch))?;

        if self.git.local_branch_exists(&copy.path, work_branch).await? {
            self.git
                .checkout_force(&copy.path, work_branch)
                .await
                .with_context(|| format!("error checking out {}", work_branch))?;
            writeln!(
                stdout,
                "{}: Resetting branch to latest {}",
                copy.name, default_branch
            )?;
            self.git
                .reset_hard(&copy.path, &tip)
                .await
                .context("error resetting branch")?;
        } else {
            writeln!(stdout, "{}: Creating new branch", copy.name)?;
            self.git
                .create_branch(&copy.path, work_branch, &tip)
                .await
                .context("error creating branch")?;
        }
        self.git
            .remove_untracked(&copy.path)
            .await
            .context("error removing untracked files")?;

        Ok(ReadyCopy {
            name: copy.name,
            path: copy.path,
            branch: work_branch.clone(),
            tip,
        })
    }
}
