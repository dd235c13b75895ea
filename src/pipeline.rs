//! The per-repository pipeline, one stage per module:
//!
//! - [`sync`]: Clone or update the working copy of the default branch
//! - [`branch`]: Point the work branch at the default branch tip
//! - [`script`]: Run the user's script and classify its exit code
//! - [`publish`]: Commit, push and open a pull request for the script's changes
//!
//! [`crate::orchestrator`] drives the stages across a batch of repositories.

use std::path::PathBuf;

use crate::clients::git::CommitId;

pub mod branch;
pub mod publish;
pub mod script;
pub mod sync;

/// A repository to process and where its working copy lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    pub name: String,
    pub path: PathBuf,
}

/// A working copy with a resolvable default branch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingCopy {
    pub name: String,
    pub path: PathBuf,
}

/// A working copy checked out on the work branch at the default branch tip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyCopy {
    pub name: String,
    pub path: PathBuf,
    pub branch: String,
    pub tip: CommitId,
}
