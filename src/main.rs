use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use repository_mapper::App;
use repository_mapper::Config;
use repository_mapper::auth::ASKPASS_ENV;
use repository_mapper::auth::AuthCredential;
use repository_mapper::config::Author;
use repository_mapper::config::PullRequestConfig;
use repository_mapper::report;
use repository_mapper::results::save_results;
use tracing::level_filters::LevelFilter;

#[derive(Parser)]
#[command(name = "repository-mapper", version)]
#[command(about = "Run scripts on repositories across your org", long_about = None)]
pub struct Cli {
    /// Repositories to run the script in
    #[arg(required = true)]
    pub repos: Vec<String>,

    /// The branch to create. Should be globally unique.
    #[arg(short, long = "branch-name")]
    pub branch_name: String,

    /// The GitHub organization the repos live in
    #[arg(short, long, default_value = "")]
    pub org: String,

    /// Path to the script to run in each repository
    #[arg(short, long)]
    pub script: PathBuf,

    /// Create a PR in each repo after running the script
    #[arg(short = 'p', long)]
    pub make_pr: bool,

    /// Title of the PR
    #[arg(short, long, default_value = "")]
    pub title: String,

    /// Description of the PR
    #[arg(short, long, default_value = "")]
    pub description: String,

    /// Don't update existing clones before running the script
    #[arg(long)]
    pub no_fetch: bool,

    /// Directory holding the clones (defaults to ~/repository-mapper)
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Branch new work is based on
    #[arg(long, default_value = "master")]
    pub default_branch: String,

    #[arg(long, default_value = "github.com")]
    pub host: String,

    /// Base URL replacing the host when building remote URLs, e.g. file:///srv/mirrors
    #[arg(long)]
    pub remote_base: Option<String>,

    /// Location of an ssh key with GitHub permissions (defaults to ~/.ssh/id_rsa)
    #[arg(long)]
    pub rsa_key_file: Option<PathBuf>,

    /// Password for the ssh key, if it has one
    #[arg(long)]
    pub rsa_key_password: Option<String>,

    /// GitHub user name
    #[arg(long)]
    pub user_name: Option<String>,

    /// GitHub auth token
    #[arg(long)]
    pub auth_token: Option<String>,

    /// Directory job results are written to
    #[arg(long, default_value = "results")]
    pub results_dir: PathBuf,

    /// Program used to open pull requests
    #[arg(long, default_value = "gh")]
    pub pr_tool: PathBuf,
}

impl Cli {
    fn into_config(self) -> Result<Config> {
        let auth = AuthCredential::resolve(
            self.user_name,
            self.auth_token,
            self.rsa_key_file.unwrap_or_else(Config::default_ssh_key),
            self.rsa_key_password,
        )?;

        let pull_request = if self.make_pr {
            Some(PullRequestConfig {
                title: self.title,
                description: self.description,
                author: Author::load()?,
            })
        } else {
            None
        };

        Config {
            workspace: self.workspace.unwrap_or_else(Config::default_workspace),
            organization: self.org,
            host: self.host,
            remote_base: self.remote_base,
            default_branch: self.default_branch,
            work_branch: self.branch_name,
            script: self.script,
            pull_request,
            skip_fetch: self.no_fetch,
            auth,
            pr_tool: self.pr_tool,
        }
        .validate()
    }
}

fn setup_logging() -> Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env()?;
    tracing_subscriber::fmt()
        .with_timer(timer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ssh runs this binary as SSH_ASKPASS to read the key passphrase
    if let Ok(passphrase) = std::env::var(ASKPASS_ENV) {
        println!("{}", passphrase);
        return Ok(());
    }

    let cli = Cli::parse();
    setup_logging()?;

    let results_dir = cli.results_dir.clone();
    let repos = cli.repos.clone();
    let config = cli.into_config()?;
    let work_branch = config.work_branch.clone();
    let app = App::real(config);

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let results = app.run_all(&repos, &mut stdout, &mut stderr).await?;
    report::summarize(&results, &mut stdout)?;

    let path = save_results(&results, &results_dir, &work_branch).context("error saving results")?;
    println!(
        "Job results (and stdout/stderr transcripts) available in {}",
        path.display()
    );

    Ok(())
}
