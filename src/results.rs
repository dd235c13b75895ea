use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use serde::Deserialize;
use serde::Serialize;
use serde::ser::SerializeMap as _;

use crate::pipeline::script::ScriptOutcome;
use crate::pipeline::script::ScriptStatus;

// -----------------------------------------------------------------------------
// Types

/// Outcome of one repository whose script ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub repo: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    /// Empty when no pull request was opened.
    pub pull_request: String,
}

/// Results keyed by repository name, in the order repositories were processed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    results: Vec<RunResult>,
}

/// Results split by how the script exited.
#[derive(Debug, Default)]
pub struct Buckets<'a> {
    pub succeeded: Vec<&'a RunResult>,
    pub skipped: Vec<&'a RunResult>,
    pub failed: Vec<&'a RunResult>,
}

// -----------------------------------------------------------------------------
// impls

impl RunResult {
    pub fn new(repo: &str, outcome: &ScriptOutcome) -> Self {
        Self {
            repo: repo.to_string(),
            stdout: String::from_utf8_lossy(&outcome.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&outcome.stderr).into_owned(),
            exit_code: outcome.status.exit_code(),
            pull_request: String::new(),
        }
    }

    pub fn status(&self) -> ScriptStatus {
        ScriptStatus::from_exit_code(self.exit_code)
    }
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a result. A repeated repository name replaces the earlier entry.
    pub fn insert(&mut self, result: RunResult) {
        match self.results.iter_mut().find(|r| r.repo == result.repo) {
            Some(existing) => *existing = result,
            None => self.results.push(result),
        }
    }

    pub fn get(&self, repo: &str) -> Option<&RunResult> {
        self.results.iter().find(|r| r.repo == repo)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RunResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn buckets(&self) -> Buckets<'_> {
        let mut buckets = Buckets::default();
        for result in &self.results {
            match result.status() {
                ScriptStatus::Success => buckets.succeeded.push(result),
                ScriptStatus::Skip => buckets.skipped.push(result),
                ScriptStatus::Failure(_) => buckets.failed.push(result),
            }
        }
        buckets
    }
}

impl Serialize for ResultSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.results.len()))?;
        for result in &self.results {
            map.serialize_entry(&result.repo, result)?;
        }
        map.end()
    }
}

// -----------------------------------------------------------------------------
// Persistence

/// File name results are saved under for a work branch.
pub fn results_file_name(work_branch: &str) -> String {
    format!("{}.json", work_branch.replace('/', "-"))
}

/// Write the results as JSON into `dir`, returning the file written.
pub fn save_results(results: &ResultSet, dir: &Path, work_branch: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create results directory {}", dir.display()))?;
    let path = dir.join(results_file_name(work_branch));
    let data = serde_json::to_vec(results)?;
    std::fs::write(&path, data).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}
