//! The end-of-day sync loop.
//!
//! Repositories are handled one at a time: show what changed, ask what to do,
//! commit, then hand over to the push guard. The counters live in a
//! [`SyncSummary`] that is threaded through the loop and returned.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Local;

use crate::config::Config;
use crate::display;
use crate::error::{Error, Result};
use crate::git_cli::GitCli;
use crate::prompt::{Action, Prompter};
use crate::push::{PushGuard, PushOutcome};
use crate::repo_status::RepoStatus;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub synced: usize,
    pub skipped: usize,
    pub errored: usize,
}

impl SyncSummary {
    pub fn record(&mut self, outcome: RepoOutcome) {
        match outcome {
            RepoOutcome::Synced => self.synced += 1,
            RepoOutcome::Skipped => self.skipped += 1,
            RepoOutcome::Errored => self.errored += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoOutcome {
    Synced,
    Skipped,
    Errored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEnd {
    Completed,
    Quit,
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub summary: SyncSummary,
    pub end: RunEnd,
}

enum Step {
    Done(RepoOutcome),
    /// The repository finished with this outcome, then Ctrl-C arrived.
    DoneThenInterrupted(RepoOutcome),
    Quit,
}

pub struct Orchestrator<'a, P: Prompter> {
    config: &'a Config,
    prompter: P,
    dry_run: bool,
    interrupted: Arc<AtomicBool>,
}

impl<'a, P: Prompter> Orchestrator<'a, P> {
    pub fn new(config: &'a Config, prompter: P, dry_run: bool) -> Self {
        Self {
            config,
            prompter,
            dry_run,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share an interrupt flag, usually set from a Ctrl-C handler.
    pub fn with_interrupt_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupted = flag;
        self
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }

    pub fn run(&mut self, repos: &[RepoStatus]) -> SyncReport {
        let mut summary = SyncSummary::default();

        for (i, repo) in repos.iter().enumerate() {
            if self.is_interrupted() {
                return SyncReport {
                    summary,
                    end: RunEnd::Interrupted,
                };
            }

            println!("\n[{}/{}]", i + 1, repos.len());
            print!("{}", display::detail_block(repo, display::DISPLAY_LIMIT));

            match self.process(repo) {
                Ok(Step::Done(outcome)) => summary.record(outcome),
                Ok(Step::DoneThenInterrupted(outcome)) => {
                    summary.record(outcome);
                    return SyncReport {
                        summary,
                        end: RunEnd::Interrupted,
                    };
                }
                Ok(Step::Quit) => {
                    display::info("Quitting, remaining repositories left untouched");
                    return SyncReport {
                        summary,
                        end: RunEnd::Quit,
                    };
                }
                Err(Error::Interrupted) => {
                    return SyncReport {
                        summary,
                        end: RunEnd::Interrupted,
                    };
                }
                Err(e) => {
                    display::error(format!("{}: {e}", repo.path.display()));
                    tracing::error!(path = %repo.path.display(), error = %e, "sync failed");
                    summary.record(RepoOutcome::Errored);
                }
            }
        }

        let end = if self.is_interrupted() {
            RunEnd::Interrupted
        } else {
            RunEnd::Completed
        };
        SyncReport { summary, end }
    }

    fn process(&mut self, repo: &RepoStatus) -> Result<Step> {
        let reply = self.prompter.action(repo)?;
        let action = match Action::parse(&reply) {
            Some(action) => action,
            None => {
                display::warn(format!("Unrecognised choice '{}', skipping", reply.trim()));
                Action::Skip
            }
        };

        match action {
            Action::Quit => Ok(Step::Quit),
            Action::Skip => {
                tracing::info!(path = %repo.path.display(), "skipped");
                Ok(Step::Done(RepoOutcome::Skipped))
            }
            Action::StageAll => self.stage_all(repo).map(Step::Done),
            Action::StageInteractive => self.stage_interactive(repo),
        }
    }

    fn stage_all(&mut self, repo: &RepoStatus) -> Result<RepoOutcome> {
        let git = GitCli::new(&repo.path);
        if repo.has_uncommitted_changes() {
            if self.dry_run {
                simulated(repo, "git add -A");
            } else {
                git.stage_all()?;
            }
            self.commit(&git, repo)?;
        }
        Ok(self.push(repo))
    }

    fn stage_interactive(&mut self, repo: &RepoStatus) -> Result<Step> {
        let git = GitCli::new(&repo.path);
        if self.dry_run {
            simulated(repo, "git add -p");
            self.commit(&git, repo)?;
            return Ok(Step::Done(self.push(repo)));
        }

        let patched = self.prompter.stage_patch(&git);
        if self.is_interrupted() {
            return Err(Error::Interrupted);
        }
        patched?;

        let after = RepoStatus::probe(&repo.path)?;
        if after.staged.is_empty() {
            display::info("Nothing staged, skipping");
            return Ok(Step::Done(RepoOutcome::Skipped));
        }

        self.commit(&git, repo)?;
        let outcome = self.push(repo);

        let remaining = match RepoStatus::probe(&repo.path) {
            Ok(remaining) => remaining,
            Err(e) => {
                tracing::warn!(path = %repo.path.display(), error = %e, "could not re-read status");
                return Ok(Step::Done(outcome));
            }
        };
        if remaining.modified.is_empty() && remaining.untracked.is_empty() {
            return Ok(Step::Done(outcome));
        }

        match self.offer_stash(&git) {
            Ok(()) => Ok(Step::Done(outcome)),
            Err(Error::Interrupted) => Ok(Step::DoneThenInterrupted(outcome)),
            Err(e) => {
                display::error(format!("{}: could not stash: {e}", repo.path.display()));
                Ok(Step::Done(outcome))
            }
        }
    }

    fn commit(&mut self, git: &GitCli, repo: &RepoStatus) -> Result<()> {
        let default = default_commit_message();
        let message = self.prompter.commit_message(&default)?;
        let message = if message.trim().is_empty() {
            default
        } else {
            message
        };

        if self.dry_run {
            simulated(repo, &format!("git commit -m {message:?}"));
            return Ok(());
        }
        git.commit(&message)?;
        tracing::info!(path = %repo.path.display(), message = %message, "committed");
        Ok(())
    }

    fn push(&mut self, repo: &RepoStatus) -> RepoOutcome {
        if self.dry_run {
            simulated(repo, "git push");
            return RepoOutcome::Synced;
        }

        match PushGuard::new(&repo.path).push() {
            Ok(PushOutcome::Pushed) => {
                display::info(format!("Pushed {}", repo.branch_name()));
                RepoOutcome::Synced
            }
            Ok(outcome @ PushOutcome::Conflict { .. }) => {
                display::warn(format!(
                    "{}: {outcome}. Resolve it by hand, then push again.",
                    repo.path.display()
                ));
                RepoOutcome::Skipped
            }
            Ok(outcome @ PushOutcome::Failed { .. }) => {
                display::error(format!("{}: {outcome}", repo.path.display()));
                RepoOutcome::Errored
            }
            Err(e) => {
                display::error(format!("{}: push failed: {e}", repo.path.display()));
                RepoOutcome::Errored
            }
        }
    }

    fn offer_stash(&mut self, git: &GitCli) -> Result<()> {
        let message = format!("gitday: left over on {}", Local::now().format("%Y-%m-%d"));
        let choice = if self.config.auto_stash_remaining {
            Some(message)
        } else {
            self.prompter.stash_remaining(&message)?
        };

        match choice {
            Some(message) => {
                git.stash(&message)?;
                display::info(format!("Stashed remaining changes: {message}"));
            }
            None => display::info("Leaving remaining changes in place"),
        }
        Ok(())
    }
}

pub fn default_commit_message() -> String {
    format!("End of day sync {}", Local::now().format("%Y-%m-%d"))
}

fn simulated(repo: &RepoStatus, what: &str) {
    println!("  [dry-run] would run `{what}` in {}", repo.path.display());
    tracing::info!(path = %repo.path.display(), action = what, "dry run");
}
