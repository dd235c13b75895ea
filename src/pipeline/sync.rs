use anyhow::Context;
use log::debug;

use super::RepositoryTarget;
use super::WorkingCopy;
use crate::App;
use crate::clients::git::GitOps;
use crate::clients::github::GithubOps;
use crate::error::RepoError;

impl<G: GitOps, H: GithubOps> App<G, H> {
    /// Bring the working copy of `target` up to the latest default branch.
    ///
    /// 1. No working copy yet: shallow, single-branch clone of the default branch.
    /// 2. Existing working copy: force-checkout the default branch, then fetch
    ///    its tip from origin. Skipped entirely when fetching is disabled.
    pub async fn sync_repository(
        &self,
        target: &RepositoryTarget,
        stdout: &mut impl std::io::Write,
    ) -> Result<WorkingCopy, RepoError> {
        self.sync_working_copy(target, stdout)
            .await
            .map_err(RepoError::Sync)?;

        Ok(WorkingCopy {
            name: target.name.clone(),
            path: target.path.clone(),
        })
    }

    async fn sync_working_copy(
        &self,
        target: &RepositoryTarget,
        stdout: &mut impl std::io::Write,
    ) -> anyhow::Result<()> {
        let name = &target.name;
        let default_branch = &self.config.default_branch;
        writeln!(stdout, "{}: Checking out at {}", name, target.path.display())?;

        if !target.path.is_dir() {
            let url = self.config.remote_url(name);
            debug!("cloning {} into {}", url, target.path.display());
            writeln!(stdout, "{}: 🧘 Cloning (this could take a while...)", name)?;
            self.git
                .clone_shallow(&url, &target.path, default_branch)
                .await
                .context("error cloning repository")?;
            return Ok(());
        }

        writeln!(stdout, "{}: Repository exists", name)?;
        if self.config.skip_fetch {
            return Ok(());
        }

        self.git
            .checkout_force(&target.path, default_branch)
            .await
            .with_context(|| format!("error checking out {}", default_branch))?;
        writeln!(
            stdout,
            "{}: Fetching latest {} (could take a minute) ⏱",
            name, default_branch
        )?;
        self.git
            .fetch_branch_shallow(&target.path, default_branch)
            .await
            .context("error fetching")?;

        Ok(())
    }
}
