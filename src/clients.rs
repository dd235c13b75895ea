//! Integration layers for the external programs the tool drives.
//!
//! - [`process`]: Buffered subprocess execution shared by every client
//! - [`git`]: Git operations on a working copy (clone, fetch, branch, commit, push)
//! - [`github`]: Pull request creation via the GitHub CLI
//!
//! Git and GitHub access sit behind traits with real and mock implementations
//! to support both production use and testing.

pub mod git;
pub mod github;
pub mod process;
