use anyhow::Result;
use colored::Colorize;

use crate::pipeline::script::ScriptStatus;
use crate::results::ResultSet;
use crate::results::RunResult;

/// Print the outcome of one repository as soon as it's known.
pub fn log_result(
    result: &RunResult,
    stdout: &mut impl std::io::Write,
    stderr: &mut impl std::io::Write,
) -> Result<()> {
    let status = result.status();
    writeln!(stdout, "{}: {}", result.repo, status)?;

    match status {
        ScriptStatus::Success if !result.pull_request.is_empty() => {
            writeln!(
                stdout,
                "{}: Pull Request: {}",
                result.repo, result.pull_request
            )?;
        }
        ScriptStatus::Failure(_) => {
            let first_line = result.stderr.lines().next().unwrap_or("");
            if !first_line.is_empty() {
                writeln!(stderr, "{}: Error: {}...", result.repo, first_line)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Print every result grouped by outcome.
pub fn summarize(results: &ResultSet, stdout: &mut impl std::io::Write) -> Result<()> {
    let buckets = results.buckets();

    heading(stdout, &"✅ SUCCEEDED ✅".green().bold().to_string())?;
    for result in &buckets.succeeded {
        let line = format!("{} {}", result.repo, result.pull_request);
        writeln!(stdout, "{}", line.trim_end())?;
    }

    heading(stdout, &"⏭  SKIPPED ⏭".yellow().bold().to_string())?;
    for result in &buckets.skipped {
        writeln!(stdout, "{}", result.repo)?;
    }

    heading(stdout, &"🚨 FAILED 🚨".red().bold().to_string())?;
    for result in &buckets.failed {
        writeln!(stdout, "{}", result.repo)?;
    }

    writeln!(stdout)?;
    Ok(())
}

fn heading(stdout: &mut impl std::io::Write, title: &str) -> Result<()> {
    writeln!(stdout)?;
    writeln!(stdout, "===============")?;
    writeln!(stdout, "{}", title)?;
    writeln!(stdout, "===============")?;
    Ok(())
}
