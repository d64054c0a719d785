use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Directory names never worth descending into while looking for repositories.
const SKIP_DIRS: [&str; 4] = ["node_modules", "target", ".venv", "__pycache__"];

pub fn is_git_repo(path: &Path) -> bool {
    // `.git` is a directory for normal clones and a file for worktrees and submodules.
    path.join(".git").exists()
}

/// Walks `root` down to `max_depth` levels and yields every directory that
/// holds a `.git` marker. The working tree of a repository is not searched
/// further. Entries that can't be read are logged and skipped.
pub struct GitRepoIter {
    walker: walkdir::IntoIter,
}

impl GitRepoIter {
    pub fn new(root: &Path, max_depth: u8) -> Self {
        let walker = WalkDir::new(root)
            .max_depth(max_depth as usize)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();
        Self { walker }
    }
}

impl Iterator for GitRepoIter {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(
                        path = ?e.path(),
                        error = %e,
                        "skipping unreadable entry"
                    );
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            if entry.depth() > 0 && entry.file_name() == ".git" {
                self.walker.skip_current_dir();
                continue;
            }

            if is_git_repo(entry.path()) {
                self.walker.skip_current_dir();
                return Some(entry.into_path());
            }

            let name = entry.file_name().to_string_lossy();
            if entry.depth() > 0 && SKIP_DIRS.contains(&name.as_ref()) {
                self.walker.skip_current_dir();
            }
        }
    }
}
