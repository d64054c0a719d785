//! Fetch and fast-forward every repository under the projects root.

use std::thread;
use std::time::Duration;

use colored::Colorize;

use crate::discovery::Prober;
use crate::error::Result;
use crate::git_cli::GitCli;
use crate::repo_status::RepoStatus;

const FETCH_ATTEMPTS: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullResult {
    Updated,
    FetchedOnly(&'static str),
    Failed(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullTally {
    pub updated: usize,
    pub fetched: usize,
    pub failed: usize,
}

/// Retry `op` with a fixed delay between attempts.
pub fn retry<T>(attempts: u32, delay: Duration, mut op: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempt = 1;
    loop {
        match op() {
            Ok(v) => return Ok(v),
            Err(e) if attempt < attempts => {
                tracing::warn!(attempt, error = %e, "retrying after failure");
                thread::sleep(delay);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn pull_repo(git: &GitCli, delay: Duration) -> PullResult {
    if let Err(e) = retry(FETCH_ATTEMPTS, delay, || {
        git.run(&["fetch", "--all", "--prune"]).map(|_| ())
    }) {
        return PullResult::Failed(e.to_string());
    }

    let status = match RepoStatus::probe(git.dir()) {
        Ok(status) => status,
        Err(e) => return PullResult::Failed(e.to_string()),
    };
    if status.is_detached() {
        return PullResult::FetchedOnly("detached HEAD");
    }
    if !status.has_tracking_branch() {
        return PullResult::FetchedOnly("no upstream");
    }
    if !status.staged.is_empty() || !status.modified.is_empty() {
        return PullResult::FetchedOnly("uncommitted changes");
    }
    if status.behind == 0 {
        return PullResult::FetchedOnly("up to date");
    }

    match git.run(&["pull", "--ff-only"]) {
        Ok(_) => PullResult::Updated,
        Err(e) => PullResult::Failed(e.to_string()),
    }
}

pub fn pull_all(prober: &Prober) -> PullTally {
    let mut tally = PullTally::default();
    for path in prober.candidates() {
        let result = pull_repo(&GitCli::new(&path), RETRY_DELAY);
        match &result {
            PullResult::Updated => {
                tally.updated += 1;
                println!("{} {}", "updated".green(), path.display());
            }
            PullResult::FetchedOnly(why) => {
                tally.fetched += 1;
                println!("{} {} ({why})", "fetched".cyan(), path.display());
            }
            PullResult::Failed(why) => {
                tally.failed += 1;
                println!("{} {}: {why}", "failed".red(), path.display());
                tracing::warn!(path = %path.display(), error = %why, "pull failed");
            }
        }
    }
    println!(
        "\n{} updated, {} fetched only, {} failed",
        tally.updated, tally.fetched, tally.failed
    );
    tally
}
