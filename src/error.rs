use thiserror::Error;

use crate::clients::process::LaunchError;

/// A failure that ends one repository's pipeline, never the batch.
#[derive(Debug, Error)]
pub enum RepoError {
    /// Clone, fetch or filesystem failure while obtaining the working copy.
    #[error("error syncing repository: {0:#}")]
    Sync(anyhow::Error),

    /// Missing default ref, or a checkout/reset failure.
    #[error("error preparing branch: {0:#}")]
    Branch(anyhow::Error),

    /// The script could not be started.
    #[error("error running script: {0}")]
    Launch(#[from] LaunchError),

    /// Status, commit, push or pull request tool failure.
    #[error("error publishing changes: {0:#}")]
    Publish(anyhow::Error),
}
