//! Push the current branch without ever forcing it.
//!
//! Before pushing to an existing upstream the remote refs are refreshed and
//! compared with the local head. If the upstream has commits we don't, the
//! push is abandoned and reported as a conflict for the user to sort out.

use std::fmt;
use std::path::Path;

use crate::error::Result;
use crate::git_cli::GitCli;
use crate::repo_status::RepoStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// The remote moved on; nothing was pushed.
    Conflict {
        ahead: usize,
        behind: usize,
        reason: String,
    },
    Failed {
        reason: String,
    },
}

impl PushOutcome {
    pub fn is_pushed(&self) -> bool {
        matches!(self, PushOutcome::Pushed)
    }
}

impl fmt::Display for PushOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushOutcome::Pushed => write!(f, "pushed"),
            PushOutcome::Conflict {
                ahead,
                behind,
                reason,
            } => write!(f, "{reason} (ahead {ahead}, behind {behind})"),
            PushOutcome::Failed { reason } => write!(f, "push failed: {reason}"),
        }
    }
}

/// Arguments for `git push`. There is no way to ask for a force push.
///
/// `refspec` is either a bare branch name or `HEAD:<upstream ref>`; a leading
/// `+` is stripped so the refspec can never force either.
pub fn push_args(remote: &str, refspec: &str, set_upstream: bool) -> Vec<String> {
    let mut args = vec!["push".to_string()];
    if set_upstream {
        args.push("--set-upstream".to_string());
    }
    args.push(remote.to_string());
    args.push(refspec.trim_start_matches('+').to_string());
    args
}

/// The refspec that updates exactly the upstream the divergence check used.
pub fn upstream_refspec(merge_ref: &str) -> String {
    format!("HEAD:{merge_ref}")
}

/// Sort a failed push into conflict or hard failure from git's stderr.
pub fn classify_push_error(stderr: &str) -> PushOutcome {
    let lower = stderr.to_lowercase();
    let conflict_markers = [
        "non-fast-forward",
        "fetch first",
        "[rejected]",
        "updates were rejected",
    ];
    if conflict_markers.iter().any(|m| lower.contains(m)) {
        return PushOutcome::Conflict {
            ahead: 0,
            behind: 0,
            reason: "remote rejected a non-fast-forward push".to_string(),
        };
    }

    let auth_markers = [
        "authentication failed",
        "permission denied",
        "could not read username",
        "403",
        "access denied",
    ];
    let reason = if auth_markers.iter().any(|m| lower.contains(m)) {
        "authentication or permission problem".to_string()
    } else if lower.contains("could not resolve host") || lower.contains("unable to access") {
        "remote is unreachable".to_string()
    } else {
        stderr
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("unknown error")
            .to_string()
    };
    PushOutcome::Failed { reason }
}

pub struct PushGuard {
    git: GitCli,
}

impl PushGuard {
    pub fn new(repo: &Path) -> Self {
        Self {
            git: GitCli::new(repo),
        }
    }

    pub fn push(&self) -> Result<PushOutcome> {
        let status = RepoStatus::probe(self.git.dir())?;
        let branch = match status.branch.as_deref() {
            Some(branch) => branch.to_string(),
            None => {
                return Ok(PushOutcome::Failed {
                    reason: "HEAD is detached".to_string(),
                })
            }
        };
        let remote = self.git.remote_for(&branch);

        if !status.has_tracking_branch() {
            tracing::info!(branch = %branch, remote = %remote, "no upstream, pushing with --set-upstream");
            return self.do_push(&remote, &branch, true);
        }

        if let Err(e) = self.git.fetch(&remote) {
            return Ok(PushOutcome::Failed {
                reason: format!("could not refresh {remote}: {e}"),
            });
        }

        let refreshed = RepoStatus::probe(self.git.dir())?;
        if refreshed.is_behind() {
            tracing::warn!(
                branch = %branch,
                ahead = refreshed.ahead,
                behind = refreshed.behind,
                "upstream has diverged, not pushing"
            );
            return Ok(PushOutcome::Conflict {
                ahead: refreshed.ahead,
                behind: refreshed.behind,
                reason: format!(
                    "{} has commits that are not in your local branch",
                    refreshed.upstream.as_deref().unwrap_or("upstream")
                ),
            });
        }

        let refspec = match self.git.merge_ref_for(&branch) {
            Some(merge_ref) => upstream_refspec(&merge_ref),
            None => branch.clone(),
        };
        self.do_push(&remote, &refspec, false)
    }

    fn do_push(&self, remote: &str, refspec: &str, set_upstream: bool) -> Result<PushOutcome> {
        let args = push_args(remote, refspec, set_upstream);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = self.git.output(&args)?;
        if out.success {
            tracing::info!(refspec, remote, "pushed");
            return Ok(PushOutcome::Pushed);
        }

        let outcome = classify_push_error(&out.stderr);
        tracing::warn!(refspec, remote, stderr = %out.stderr.trim(), "push did not succeed");
        Ok(outcome)
    }
}
