//! Interactive prompts for the sync loop
//!
//! The orchestrator only talks to the [`Prompter`] trait so the loop can be
//! driven from a script in tests. [`TerminalPrompter`] uses dialoguer.

use std::collections::VecDeque;

use dialoguer::{Confirm, Input};

use crate::error::Result;
use crate::git_cli::GitCli;
use crate::repo_status::RepoStatus;

/// What to do with one repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    StageAll,
    StageInteractive,
    Skip,
    Quit,
}

impl Action {
    /// Parse a user reply. `None` means the reply wasn't understood.
    pub fn parse(reply: &str) -> Option<Action> {
        match reply.trim().to_lowercase().as_str() {
            "a" | "add" | "all" => Some(Action::StageAll),
            "i" | "interactive" | "p" | "patch" => Some(Action::StageInteractive),
            "s" | "skip" | "" => Some(Action::Skip),
            "q" | "quit" | "exit" => Some(Action::Quit),
            _ => None,
        }
    }
}

pub trait Prompter {
    /// Raw reply to the action prompt for `repo`.
    fn action(&mut self, repo: &RepoStatus) -> Result<String>;

    /// Commit message, starting from `default`.
    fn commit_message(&mut self, default: &str) -> Result<String>;

    /// Whether to stash what is left unstaged. `Some(message)` stashes.
    fn stash_remaining(&mut self, default_message: &str) -> Result<Option<String>>;

    /// Let the user pick hunks to stage in the repository behind `git`.
    fn stage_patch(&mut self, git: &GitCli) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn action(&mut self, _repo: &RepoStatus) -> Result<String> {
        let reply: String = Input::new()
            .with_prompt("[a]dd all, [i]nteractive, [s]kip, [q]uit")
            .default("s".to_string())
            .show_default(true)
            .interact_text()?;
        Ok(reply)
    }

    fn commit_message(&mut self, default: &str) -> Result<String> {
        let message: String = Input::new()
            .with_prompt("Commit message")
            .with_initial_text(default)
            .interact_text()?;
        Ok(message)
    }

    fn stash_remaining(&mut self, default_message: &str) -> Result<Option<String>> {
        let stash = Confirm::new()
            .with_prompt("Unstaged changes remain. Stash them?")
            .default(false)
            .interact()?;
        if !stash {
            return Ok(None);
        }
        let message: String = Input::new()
            .with_prompt("Stash message")
            .with_initial_text(default_message)
            .interact_text()?;
        Ok(Some(message))
    }

    fn stage_patch(&mut self, git: &GitCli) -> Result<()> {
        git.stage_patch()
    }
}

/// Replies taken from a queue, for tests and non-interactive runs.
/// Once the queue is empty every action is "quit" and every other prompt
/// takes its default.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    replies: VecDeque<String>,
}

impl ScriptedPrompter {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: replies.into_iter().map(Into::into).collect(),
        }
    }
}

impl Prompter for ScriptedPrompter {
    fn action(&mut self, _repo: &RepoStatus) -> Result<String> {
        Ok(self.replies.pop_front().unwrap_or_else(|| "q".to_string()))
    }

    fn commit_message(&mut self, default: &str) -> Result<String> {
        Ok(match self.replies.pop_front() {
            Some(reply) if !reply.is_empty() => reply,
            _ => default.to_string(),
        })
    }

    fn stash_remaining(&mut self, default_message: &str) -> Result<Option<String>> {
        Ok(match self.replies.pop_front().as_deref() {
            Some("y") | Some("yes") => Some(default_message.to_string()),
            _ => None,
        })
    }

    /// `add -p` runs with no input, so it stops at the first hunk and only
    /// what is already in the index gets committed. Its exit status is not
    /// checked; the caller re-reads the index either way.
    fn stage_patch(&mut self, git: &GitCli) -> Result<()> {
        git.output(&["add", "-p"]).map(|_| ())
    }
}
