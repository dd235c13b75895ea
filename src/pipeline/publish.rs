use std::sync::LazyLock;
use std::time::Duration;

use anyhow::Context;
use log::warn;
use regex::Regex;

use super::ReadyCopy;
use crate::App;
use crate::clients::git::GitOps;
use crate::clients::github::GithubOps;
use crate::config::PR_TITLE_MARKER;
use crate::config::PullRequestConfig;
use crate::error::RepoError;

/// Wait before reading status so the script's writes are visible to git.
const SETTLE_DELAY: Duration = Duration::from_millis(200);

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\S+://\S+").expect("URL pattern is valid"));

/// First `scheme://rest` token in `output`.
pub fn extract_url(output: &str) -> Option<&str> {
    URL_RE.find(output).map(|m| m.as_str())
}

impl<G: GitOps, H: GithubOps> App<G, H> {
    /// Commit the script's changes, push the work branch and open a pull request.
    ///
    /// Returns the pull request URL, or an empty string when the script left the
    /// working tree clean (nothing is committed or pushed in that case).
    pub async fn publish_changes(
        &self,
        copy: &ReadyCopy,
        pr: &PullRequestConfig,
        stdout: &mut impl std::io::Write,
    ) -> Result<String, RepoError> {
        self.publish_pull_request(copy, pr, stdout)
            .await
            .map_err(RepoError::Publish)
    }

    async fn publish_pull_request(
        &self,
        copy: &ReadyCopy,
        pr: &PullRequestConfig,
        stdout: &mut impl std::io::Write,
    ) -> anyhow::Result<String> {
        tokio::time::sleep(SETTLE_DELAY).await;

        if self
            .git
            .is_clean(&copy.path)
            .await
            .context("error checking git status")?
        {
            writeln!(stdout, "{}: No changes to commit", copy.name)?;
            return Ok(String::new());
        }

        self.git
            .add_all(&copy.path)
            .await
            .context("error adding changes")?;
        writeln!(stdout, "{}: 📝 Committing changes", copy.name)?;
        self.git
            .commit(&copy.path, &pr.title, &pr.author)
            .await
            .context("error committing changes")?;

        writeln!(
            stdout,
            "{}: Setting upstream origin to {}",
            copy.name, copy.branch
        )?;
        self.git
            .push_branch(&copy.path, &copy.branch)
            .await
            .context("error during push")?;

        writeln!(stdout, "{}: 📝 Making pull request", copy.name)?;
        let title = format!("{}{}", PR_TITLE_MARKER, pr.title);
        let output = self
            .gh
            .pr_create(&copy.path, &title, &pr.description, &copy.branch)
            .await?;

        match extract_url(&output) {
            Some(url) => Ok(url.to_string()),
            None => {
                warn!(
                    "{}: no pull request URL in tool output: {}",
                    copy.name,
                    output.trim()
                );
                Ok(String::new())
            }
        }
    }
}
