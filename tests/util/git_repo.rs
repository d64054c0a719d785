use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

/// A throwaway repository driven through the `git` executable.
pub struct GitRepo {
    pub dir: PathBuf,
}

pub fn git(dir: &Path, args: &[&str]) -> Option<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_TERMINAL_PROMPT", "0")
        .output()
        .ok()?;
    if output.status.success() {
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    } else {
        println!(
            "git {args:?} failed in {}: {}",
            dir.display(),
            String::from_utf8_lossy(&output.stderr)
        );
        None
    }
}

impl GitRepo {
    /// `git init` with a local identity and HEAD pointing at `branch`.
    pub fn init(dir: PathBuf, branch: &str) -> Self {
        fs::create_dir_all(&dir).unwrap();
        let repo = Self { dir };
        repo.git(&["init", "-q"]).unwrap();
        repo.configure();
        repo.git(&["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")])
            .unwrap();
        repo
    }

    /// Clone `remote` into `dir` and check out `branch` if given.
    pub fn clone_from(remote: &Path, dir: PathBuf) -> Self {
        let parent = dir.parent().unwrap();
        fs::create_dir_all(parent).unwrap();
        git(
            parent,
            &["clone", "-q", remote.to_str().unwrap(), dir.to_str().unwrap()],
        )
        .unwrap();
        let repo = Self { dir };
        repo.configure();
        repo
    }

    fn configure(&self) {
        self.git(&["config", "user.email", "dev@example.com"]).unwrap();
        self.git(&["config", "user.name", "Dev"]).unwrap();
        self.git(&["config", "commit.gpgsign", "false"]).unwrap();
    }

    pub fn git(&self, args: &[&str]) -> Option<String> {
        git(&self.dir, args)
    }

    pub fn write_file(&self, path: &str, content: &str) {
        let file = self.dir.join(path);
        if let Some(parent) = file.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(file, content).unwrap();
    }

    pub fn commit_file(&self, path: &str, content: &str, message: &str) {
        self.write_file(path, content);
        self.git(&["add", path]).unwrap();
        self.git(&["commit", "-q", "-m", message]).unwrap();
    }

    pub fn head(&self) -> String {
        self.git(&["rev-parse", "HEAD"]).unwrap_or_default()
    }

    pub fn stash_list(&self) -> String {
        self.git(&["stash", "list"]).unwrap_or_default()
    }

    pub fn index_bytes(&self) -> Vec<u8> {
        fs::read(self.dir.join(".git/index")).unwrap_or_default()
    }
}

/// A bare remote with one commit on `branch`, plus a working clone tracking it.
pub fn remote_with_clone(root: &Path, name: &str, branch: &str) -> (PathBuf, GitRepo) {
    let seed = GitRepo::init(root.join(format!("{name}-seed")), branch);
    seed.commit_file("README.md", "hello\n", "initial");

    let bare = root.join(format!("{name}.git"));
    git(
        root,
        &["clone", "-q", "--bare", seed.dir.to_str().unwrap(), bare.to_str().unwrap()],
    )
    .unwrap();
    fs::remove_dir_all(&seed.dir).unwrap();

    let clone = GitRepo::clone_from(&bare, root.join("projects").join(name));
    (bare, clone)
}
