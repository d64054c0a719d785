//! Thin wrapper around the `git` executable for everything that mutates a
//! repository. Each command runs with its working directory set to the
//! repository, so the process cwd is never touched.

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// stderr if there is any, otherwise stdout.
    pub fn message(&self) -> &str {
        let err = self.stderr.trim();
        if err.is_empty() {
            self.stdout.trim()
        } else {
            err
        }
    }
}

#[derive(Debug, Clone)]
pub struct GitCli {
    dir: PathBuf,
}

impl GitCli {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.dir).args(args);
        cmd
    }

    /// Run git and capture its output. A non-zero exit is not an error here.
    pub fn output(&self, args: &[&str]) -> Result<GitOutput> {
        tracing::debug!(dir = %self.dir.display(), ?args, "git");
        let output = self
            .command(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| Error::io(&self.dir, e))?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    /// Run git and fail unless it exits zero.
    pub fn run(&self, args: &[&str]) -> Result<GitOutput> {
        let out = self.output(args)?;
        if out.success {
            Ok(out)
        } else {
            Err(Error::GitCommand {
                command: args.join(" "),
                message: out.message().to_string(),
            })
        }
    }

    /// Run git attached to the terminal, for prompts like `add -p`.
    pub fn interactive(&self, args: &[&str]) -> Result<()> {
        let status = self
            .command(args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .map_err(|e| Error::io(&self.dir, e))?;
        if status.success() {
            Ok(())
        } else {
            Err(Error::GitCommand {
                command: args.join(" "),
                message: format!("exited with {status}"),
            })
        }
    }

    pub fn stage_all(&self) -> Result<()> {
        self.run(&["add", "-A"]).map(|_| ())
    }

    pub fn stage_patch(&self) -> Result<()> {
        self.interactive(&["add", "-p"])
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "-m", message]).map(|_| ())
    }

    /// Stash tracked changes and untracked files.
    pub fn stash(&self, message: &str) -> Result<()> {
        self.run(&["stash", "push", "--include-untracked", "-m", message]).map(|_| ())
    }

    pub fn fetch(&self, remote: &str) -> Result<()> {
        self.run(&["fetch", remote]).map(|_| ())
    }

    /// The remote configured for `branch`, falling back to `origin`.
    pub fn remote_for(&self, branch: &str) -> String {
        self.config_value(&format!("branch.{branch}.remote"))
            .unwrap_or_else(|| "origin".to_string())
    }

    /// The upstream ref `branch` merges from, e.g. `refs/heads/main`.
    pub fn merge_ref_for(&self, branch: &str) -> Option<String> {
        self.config_value(&format!("branch.{branch}.merge"))
    }

    fn config_value(&self, key: &str) -> Option<String> {
        match self.output(&["config", "--get", key]) {
            Ok(out) if out.success && !out.stdout.trim().is_empty() => Some(out.stdout.trim().to_string()),
            _ => None,
        }
    }
}
