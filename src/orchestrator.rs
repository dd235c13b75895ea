use tracing::instrument;

use crate::App;
use crate::clients::git::GitOps;
use crate::clients::github::GithubOps;
use crate::error::RepoError;
use crate::pipeline::script::ScriptStatus;
use crate::pipeline::script::run_script;
use crate::report;
use crate::results::ResultSet;
use crate::results::RunResult;

/// How far one repository's pipeline got.
#[derive(Debug)]
pub enum RepoRun {
    /// A stage before the script failed; nothing is recorded for the repository.
    Aborted(RepoError),
    /// The script ran. Publishing may still have failed afterwards.
    Ran {
        result: RunResult,
        publish_error: Option<RepoError>,
    },
}

impl<G: GitOps, H: GithubOps> App<G, H> {
    /// Run the pipeline for every repository, in order, one at a time.
    ///
    /// Failures are reported on `stderr` and never stop the batch. The returned
    /// set holds a result for every repository whose script ran.
    pub async fn run_all(
        &self,
        repos: &[String],
        stdout: &mut impl std::io::Write,
        stderr: &mut impl std::io::Write,
    ) -> anyhow::Result<ResultSet> {
        writeln!(stdout, "Using script: {}", self.config.script.display())?;

        let mut results = ResultSet::new();
        for name in repos {
            match self.run_repo(name, stdout).await? {
                RepoRun::Aborted(err) => {
                    writeln!(stderr, "{}: {}", name, err)?;
                }
                RepoRun::Ran {
                    result,
                    publish_error,
                } => {
                    if let Some(err) = publish_error {
                        writeln!(stderr, "{}: {}", name, err)?;
                    }
                    report::log_result(&result, stdout, stderr)?;
                    results.insert(result);
                }
            }
        }

        Ok(results)
    }

    /// Sync, branch, run the script and, when it succeeded, publish.
    ///
    /// Only progress output errors are returned directly; every stage failure
    /// is folded into the [`RepoRun`].
    #[instrument(skip(self, stdout))]
    pub async fn run_repo(
        &self,
        name: &str,
        stdout: &mut impl std::io::Write,
    ) -> anyhow::Result<RepoRun> {
        let target = self.target(name);

        let copy = match self.sync_repository(&target, stdout).await {
            Ok(copy) => copy,
            Err(err) => return Ok(RepoRun::Aborted(err)),
        };
        let copy = match self.reconcile_branch(copy, stdout).await {
            Ok(copy) => copy,
            Err(err) => return Ok(RepoRun::Aborted(err)),
        };

        writeln!(stdout, "{}: 🏃 Running script", name)?;
        let outcome = match run_script(&self.config.script, &copy.path).await {
            Ok(outcome) => outcome,
            Err(err) => return Ok(RepoRun::Aborted(err.into())),
        };
        let mut result = RunResult::new(name, &outcome);

        let mut publish_error = None;
        if let (ScriptStatus::Success, Some(pr)) = (outcome.status, &self.config.pull_request) {
            match self.publish_changes(&copy, pr, stdout).await {
                Ok(url) => result.pull_request = url,
                Err(err) => publish_error = Some(err),
            }
        }

        Ok(RepoRun::Ran {
            result,
            publish_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt as _;
    use std::path::Path;
    use std::path::PathBuf;

    use anyhow::anyhow;

    use super::*;
    use crate::clients::git::CommitId;
    use crate::clients::git::MockGitOps;
    use crate::clients::github::MockGithubOps;
    use crate::config::Author;
    use crate::config::Config;
    use crate::config::PullRequestConfig;

    /// Script whose behaviour depends on the repository it runs in.
    const SCRIPT: &str = r#"#!/bin/sh
case "$(basename "$(pwd -P)")" in
  repoX) exit 0 ;;
  repoY) echo "nothing to do"; exit 10 ;;
  repoZ) printf 'lint failed' >&2; exit 3 ;;
  repoW) echo change > changed.txt; exit 0 ;;
esac
"#;

    fn setup(workspace: &Path) -> PathBuf {
        for repo in ["repoX", "repoY", "repoZ", "repoW", "broken"] {
            std::fs::create_dir_all(workspace.join(repo)).unwrap();
        }
        let script = workspace.join("script.sh");
        std::fs::write(&script, SCRIPT).unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn config(workspace: &Path, script: PathBuf, make_pr: bool) -> Config {
        let mut config = Config::for_tests(workspace.to_path_buf(), script);
        config.skip_fetch = true;
        if make_pr {
            config.pull_request = Some(PullRequestConfig {
                title: "Bump".to_string(),
                description: "Automated".to_string(),
                author: Author {
                    name: "Test User".to_string(),
                    email: "test@example.com".to_string(),
                },
            });
        }
        config
    }

    /// Git mock whose working trees are dirty exactly when the script wrote a file.
    fn git() -> MockGitOps {
        let mut git = MockGitOps::new();
        git.expect_resolve_commit().returning(|repo, _| {
            if repo.ends_with("broken") {
                Ok(None)
            } else {
                Ok(Some(CommitId("abc123".to_string())))
            }
        });
        git.expect_local_branch_exists().returning(|_, _| Ok(false));
        git.expect_create_branch().returning(|_, _, _| Ok(()));
        git.expect_remove_untracked().returning(|_| Ok(()));
        git.expect_is_clean()
            .returning(|repo| Ok(!repo.join("changed.txt").exists()));
        git
    }

    async fn run(
        app: &App<MockGitOps, MockGithubOps>,
        repos: &[&str],
    ) -> (ResultSet, String, String) {
        let repos = repos.iter().map(|r| r.to_string()).collect::<Vec<_>>();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let results = app.run_all(&repos, &mut out, &mut err).await.unwrap();
        (
            results,
            String::from_utf8(out).unwrap(),
            String::from_utf8(err).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_batch_classification_without_prs() {
        let workspace = tempfile::tempdir().unwrap();
        let script = setup(workspace.path());
        let mut git = git();
        git.expect_add_all().never();
        let mut gh = MockGithubOps::new();
        gh.expect_pr_create().never();
        let app = App::new(config(workspace.path(), script, false), git, gh);

        let (results, _, err) = run(&app, &["repoX", "broken", "repoY", "repoZ"]).await;

        assert_eq!(results.len(), 3);
        assert!(results.get("broken").is_none());
        assert_eq!(
            err,
            "broken: error preparing branch: default branch main not found\n\
             repoZ: Error: lint failed...\n"
        );

        let x = results.get("repoX").unwrap();
        assert_eq!((x.exit_code, x.pull_request.as_str()), (0, ""));

        let z = results.get("repoZ").unwrap();
        assert_eq!(z.exit_code, 3);
        assert_eq!(z.stderr, "lint failed");

        let buckets = results.buckets();
        assert_eq!(buckets.succeeded.len(), 1);
        assert_eq!(buckets.skipped[0].repo, "repoY");
        assert_eq!(buckets.failed[0].repo, "repoZ");
    }

    #[tokio::test]
    async fn test_publishes_only_dirty_successes() {
        let workspace = tempfile::tempdir().unwrap();
        let script = setup(workspace.path());
        let mut git = git();
        git.expect_add_all()
            .withf(|repo| repo.ends_with("repoW"))
            .times(1)
            .returning(|_| Ok(()));
        git.expect_commit().times(1).returning(|_, _, _| Ok(()));
        git.expect_push_branch().times(1).returning(|_, _| Ok(()));
        let mut gh = MockGithubOps::new();
        gh.expect_pr_create()
            .withf(|repo, _, _, _| repo.ends_with("repoW"))
            .times(1)
            .returning(|_, _, _, _| Ok("https://github.com/org/repoW/pull/42\n".to_string()));
        let app = App::new(config(workspace.path(), script, true), git, gh);

        let (results, out, _) = run(&app, &["repoX", "repoY", "repoW"]).await;

        assert_eq!(results.get("repoX").unwrap().pull_request, "");
        assert_eq!(results.get("repoY").unwrap().pull_request, "");
        assert_eq!(
            results.get("repoW").unwrap().pull_request,
            "https://github.com/org/repoW/pull/42"
        );
        let out = out.replace(&workspace.path().display().to_string(), "[WS]");
        insta::assert_snapshot!(out, @r"
        Using script: [WS]/script.sh
        repoX: Checking out at [WS]/repoX
        repoX: Repository exists
        repoX: Creating new branch
        repoX: 🏃 Running script
        repoX: No changes to commit
        repoX: ✅ SUCCESS
        repoY: Checking out at [WS]/repoY
        repoY: Repository exists
        repoY: Creating new branch
        repoY: 🏃 Running script
        repoY: ⏭  SKIPPED
        repoW: Checking out at [WS]/repoW
        repoW: Repository exists
        repoW: Creating new branch
        repoW: 🏃 Running script
        repoW: 📝 Committing changes
        repoW: Setting upstream origin to test/change
        repoW: 📝 Making pull request
        repoW: ✅ SUCCESS
        repoW: Pull Request: https://github.com/org/repoW/pull/42
        ");
    }

    #[tokio::test]
    async fn test_publish_failure_keeps_result() {
        let workspace = tempfile::tempdir().unwrap();
        let script = setup(workspace.path());
        let mut git = git();
        git.expect_add_all().returning(|_| Ok(()));
        git.expect_commit().returning(|_, _, _| Ok(()));
        git.expect_push_branch()
            .returning(|_, _| Err(anyhow!("git command failed: permission denied")));
        let mut gh = MockGithubOps::new();
        gh.expect_pr_create().never();
        let app = App::new(config(workspace.path(), script, true), git, gh);

        let (results, _, err) = run(&app, &["repoW", "repoX"]).await;

        let w = results.get("repoW").unwrap();
        assert_eq!((w.exit_code, w.pull_request.as_str()), (0, ""));
        assert_eq!(results.buckets().succeeded.len(), 2);
        assert_eq!(
            err,
            "repoW: error publishing changes: error during push: git command failed: permission denied\n"
        );
    }

    #[tokio::test]
    async fn test_launch_failure_records_nothing() {
        let workspace = tempfile::tempdir().unwrap();
        setup(workspace.path());
        let app = App::new(
            config(workspace.path(), workspace.path().join("missing.sh"), false),
            git(),
            MockGithubOps::new(),
        );

        let (results, _, err) = run(&app, &["repoX", "repoY"]).await;

        assert!(results.is_empty());
        assert_eq!(err.lines().count(), 2);
        assert!(err.starts_with("repoX: error running script: failed to launch"));
    }
}
