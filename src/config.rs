use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;

use crate::auth::AuthCredential;

/// Marker prepended to the title of every pull request the tool opens.
pub const PR_TITLE_MARKER: &str = "🤖 ";

/// Commit identity used for the changes a script makes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone)]
pub struct PullRequestConfig {
    pub title: String,
    pub description: String,
    pub author: Author,
}

/// Everything a batch needs, resolved once before the first repository.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory under which every repository is cloned.
    pub workspace: PathBuf,
    pub organization: String,
    pub host: String,
    /// Replaces the host part of remote URLs when set.
    pub remote_base: Option<String>,
    pub default_branch: String,
    pub work_branch: String,
    /// Absolute path to the script run inside each repository.
    pub script: PathBuf,
    /// Present when pull requests should be opened.
    pub pull_request: Option<PullRequestConfig>,
    pub skip_fetch: bool,
    pub auth: AuthCredential,
    /// Program used to open pull requests.
    pub pr_tool: PathBuf,
}

impl Author {
    /// Load the identity from `git config user.name` / `user.email`.
    pub fn load() -> Result<Self> {
        let name = git_config_value("user.name")
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "Unknown".to_string());
        let email = git_config_value("user.email")
            .filter(|email| !email.is_empty())
            .context("Error getting author email. Set one with 'git config --global user.email'")?;
        Ok(Self { name, email })
    }
}

fn git_config_value(key: &str) -> Option<String> {
    let output = std::process::Command::new("git")
        .args(["config", "--get", key])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl Config {
    /// Default workspace: `~/repository-mapper`.
    pub fn default_workspace() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("repository-mapper")
    }

    /// Default SSH key: `~/.ssh/id_rsa`.
    pub fn default_ssh_key() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".ssh")
            .join("id_rsa")
    }

    /// Local path of a repository's working copy.
    pub fn repo_path(&self, repo: &str) -> PathBuf {
        self.workspace.join(repo)
    }

    pub fn remote_url(&self, repo: &str) -> String {
        self.auth.remote_url(
            &self.host,
            self.remote_base.as_deref(),
            &self.organization,
            repo,
        )
    }

    /// Check what can be checked before touching any repository.
    pub fn validate(mut self) -> Result<Self> {
        if self.work_branch.trim().is_empty() {
            anyhow::bail!("A branch name is required. Pass one with -b");
        }
        self.script = canonical_script(&self.script)?;

        if let Some(pr) = &self.pull_request {
            if pr.title.is_empty() {
                anyhow::bail!("A PR title is required. Pass one with -t");
            }
            if pr.description.is_empty() {
                anyhow::bail!("A PR description is required. Pass one with -d");
            }
            self.pr_tool = which::which(&self.pr_tool).with_context(|| {
                format!(
                    "{} is required to make a pull request. Install the GitHub CLI first",
                    self.pr_tool.display()
                )
            })?;
        }

        Ok(self)
    }

    /// Config for tests
    pub fn for_tests(workspace: PathBuf, script: PathBuf) -> Self {
        Self {
            workspace,
            organization: "acme".to_string(),
            host: "github.com".to_string(),
            remote_base: None,
            default_branch: "main".to_string(),
            work_branch: "test/change".to_string(),
            script,
            pull_request: None,
            skip_fetch: false,
            auth: AuthCredential::Token {
                username: "tester".to_string(),
                token: "token".to_string(),
            },
            pr_tool: PathBuf::from("gh"),
        }
    }
}

fn canonical_script(script: &Path) -> Result<PathBuf> {
    if !script.exists() {
        anyhow::bail!("Could not find script: '{}'", script.display());
    }
    script
        .canonicalize()
        .with_context(|| format!("Could not resolve script: '{}'", script.display()))
}
