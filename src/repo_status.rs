use std::path::{Path, PathBuf};

use git2::{BranchType, Oid, Repository, Status, StatusOptions};

use crate::error::Result;

pub const DETACHED: &str = "detached";

/// A snapshot of one repository, taken by the prober. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RepoStatus {
    pub path: PathBuf,
    /// `None` when HEAD is detached.
    pub branch: Option<String>,
    /// Short name of the upstream tracking branch, e.g. `origin/alice/fix`.
    pub upstream: Option<String>,
    pub ahead: usize,
    pub behind: usize,
    pub staged: Vec<String>,
    pub modified: Vec<String>,
    pub untracked: Vec<String>,
    /// Subjects of commits not yet on the upstream, newest first.
    pub unpushed: Vec<String>,
}

impl RepoStatus {
    pub fn probe(path: &Path) -> Result<Self> {
        let repo = Repository::open(path)?;
        let mut status = RepoStatus {
            path: path.to_path_buf(),
            branch: current_branch(&repo)?,
            ..Default::default()
        };

        status.read_file_status(&repo)?;

        if let Some(branch) = status.branch.clone() {
            if let Some((upstream_name, upstream_oid)) = upstream_of(&repo, &branch) {
                status.upstream = Some(upstream_name);
                if let Some(local_oid) = head_oid(&repo) {
                    let (ahead, behind) = repo.graph_ahead_behind(local_oid, upstream_oid)?;
                    status.ahead = ahead;
                    status.behind = behind;
                    if ahead > 0 {
                        status.unpushed = commit_subjects(&repo, local_oid, upstream_oid)?;
                    }
                }
            }
        }

        Ok(status)
    }

    fn read_file_status(&mut self, repo: &Repository) -> Result<()> {
        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(true)
            .include_ignored(false)
            .include_unmodified(false);

        let index_bits = Status::INDEX_NEW
            | Status::INDEX_MODIFIED
            | Status::INDEX_DELETED
            | Status::INDEX_RENAMED
            | Status::INDEX_TYPECHANGE;
        let worktree_bits = Status::WT_MODIFIED
            | Status::WT_DELETED
            | Status::WT_RENAMED
            | Status::WT_TYPECHANGE;

        for entry in repo.statuses(Some(&mut opts))?.iter() {
            let Some(file) = entry.path() else { continue };
            let flags = entry.status();
            if flags.intersects(index_bits) {
                self.staged.push(file.to_string());
            }
            if flags.intersects(worktree_bits) {
                self.modified.push(file.to_string());
            }
            if flags.contains(Status::WT_NEW) {
                self.untracked.push(file.to_string());
            }
        }
        Ok(())
    }

    pub fn branch_name(&self) -> &str {
        self.branch.as_deref().unwrap_or(DETACHED)
    }

    pub fn is_detached(&self) -> bool {
        self.branch.is_none()
    }

    pub fn has_tracking_branch(&self) -> bool {
        self.upstream.is_some()
    }

    pub fn has_uncommitted_changes(&self) -> bool {
        !(self.staged.is_empty() && self.modified.is_empty() && self.untracked.is_empty())
    }

    /// Commits on the local branch that the upstream doesn't have. No upstream
    /// means nothing counts as unpushed.
    pub fn has_unpushed_commits(&self) -> bool {
        self.has_tracking_branch() && self.ahead > 0
    }

    pub fn needs_sync(&self) -> bool {
        self.has_uncommitted_changes() || self.has_unpushed_commits()
    }

    /// Upstream has commits the local branch lacks.
    pub fn is_behind(&self) -> bool {
        self.has_tracking_branch() && self.behind > 0
    }
}

/// The checked-out branch, or `None` for a detached HEAD. An unborn branch
/// (fresh `git init`) still reports its name.
pub fn current_branch(repo: &Repository) -> Result<Option<String>> {
    if repo.head_detached()? {
        return Ok(None);
    }
    match repo.head() {
        Ok(head) if head.is_branch() => Ok(head.shorthand().map(str::to_string)),
        Ok(_) => Ok(None),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => {
            let head = repo.find_reference("HEAD")?;
            Ok(head
                .symbolic_target()
                .and_then(|t| t.strip_prefix("refs/heads/"))
                .map(str::to_string))
        }
        Err(e) => Err(e.into()),
    }
}

fn head_oid(repo: &Repository) -> Option<Oid> {
    repo.head().ok().and_then(|h| h.target())
}

fn upstream_of(repo: &Repository, branch: &str) -> Option<(String, Oid)> {
    let local = repo.find_branch(branch, BranchType::Local).ok()?;
    let upstream = local.upstream().ok()?;
    let name = upstream.name().ok().flatten()?.to_string();
    let oid = upstream.get().target()?;
    Some((name, oid))
}

fn commit_subjects(repo: &Repository, local: Oid, upstream: Oid) -> Result<Vec<String>> {
    let mut walk = repo.revwalk()?;
    walk.push(local)?;
    walk.hide(upstream)?;
    let mut subjects = Vec::new();
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        subjects.push(commit.summary().unwrap_or("<no subject>").to_string());
    }
    Ok(subjects)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(upstream: Option<&str>, ahead: usize, behind: usize) -> RepoStatus {
        RepoStatus {
            path: PathBuf::from("/tmp/r"),
            branch: Some("alice/x".into()),
            upstream: upstream.map(str::to_string),
            ahead,
            behind,
            ..Default::default()
        }
    }

    #[test]
    fn tracking_branch_in_sync_has_nothing_unpushed() {
        assert!(!status(Some("origin/alice/x"), 0, 0).has_unpushed_commits());
    }

    #[test]
    fn no_tracking_branch_means_nothing_unpushed() {
        assert!(!status(None, 3, 0).has_unpushed_commits());
    }

    #[test]
    fn ahead_of_upstream_is_unpushed() {
        let s = status(Some("origin/alice/x"), 2, 0);
        assert!(s.has_unpushed_commits());
        assert!(s.needs_sync());
    }

    #[test]
    fn clean_repo_needs_nothing() {
        assert!(!status(Some("origin/alice/x"), 0, 4).needs_sync());
    }
}
