//! Repository discovery: walk the projects root, read each repository and
//! keep the ones on a matching branch that have something to sync.

use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::git_repo_iter::GitRepoIter;
use crate::matcher::RepoFilter;
use crate::repo_status::RepoStatus;

#[derive(Debug)]
pub struct Prober {
    root: PathBuf,
    max_depth: u8,
    filter: RepoFilter,
}

impl Prober {
    pub fn new(root: impl Into<PathBuf>, max_depth: u8, filter: RepoFilter) -> Self {
        Self {
            root: root.into(),
            max_depth,
            filter,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            &config.projects_root,
            config.max_depth,
            RepoFilter::from_config(config)?,
        ))
    }

    /// Every repository under the root that isn't excluded by path, in
    /// traversal order. Branches are not considered.
    pub fn candidates(&self) -> impl Iterator<Item = PathBuf> + '_ {
        GitRepoIter::new(&self.root, self.max_depth).filter(move |path| {
            let excluded = self.filter.is_excluded(path);
            if excluded {
                tracing::debug!(path = %path.display(), "excluded by config");
            }
            !excluded
        })
    }

    /// Read one candidate and decide whether it qualifies for a sync.
    pub fn inspect(&self, path: &Path) -> Option<RepoStatus> {
        let status = match RepoStatus::probe(path) {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "unable to read repository");
                return None;
            }
        };

        let branch = match &status.branch {
            Some(branch) => branch,
            None => {
                tracing::debug!(path = %path.display(), "detached HEAD, skipping");
                return None;
            }
        };

        if !self.filter.branch_matches(branch) {
            tracing::debug!(path = %path.display(), branch = %branch, "branch does not match prefix");
            return None;
        }

        if !status.needs_sync() {
            tracing::debug!(path = %path.display(), "nothing to sync");
            return None;
        }

        Some(status)
    }

    pub fn discover(&self) -> Vec<RepoStatus> {
        let found: Vec<RepoStatus> = self
            .candidates()
            .filter_map(|path| self.inspect(&path))
            .collect();
        tracing::info!(
            root = %self.root.display(),
            count = found.len(),
            "discovery finished"
        );
        found
    }
}
