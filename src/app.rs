use crate::clients::git::GitOps;
use crate::clients::git::RealGit;
use crate::clients::github::GhCli;
use crate::clients::github::GithubOps;
use crate::config::Config;
use crate::pipeline::RepositoryTarget;

pub struct App<G: GitOps, H: GithubOps> {
    pub config: Config,
    pub git: G,
    pub gh: H,
}

impl<G: GitOps, H: GithubOps> App<G, H> {
    pub fn new(config: Config, git: G, gh: H) -> Self {
        Self { config, git, gh }
    }

    /// Target for a repository name, rooted in the workspace.
    pub fn target(&self, name: &str) -> RepositoryTarget {
        RepositoryTarget {
            name: name.to_string(),
            path: self.config.repo_path(name),
        }
    }
}

impl App<RealGit, GhCli> {
    /// App backed by the git CLI and the configured pull request tool.
    pub fn real(config: Config) -> Self {
        let git = RealGit::new(config.auth.clone());
        let gh = GhCli::new(config.pr_tool.clone());
        Self::new(config, git, gh)
    }
}
