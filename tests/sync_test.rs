mod util;

use std::path::Path;

use gitday::config::Config;
use gitday::git_cli::GitCli;
use gitday::prompt::{Prompter, ScriptedPrompter};
use gitday::repo_status::RepoStatus;
use gitday::sync::{Orchestrator, RunEnd, SyncSummary};
use tempfile::TempDir;
use util::git_repo::{git, remote_with_clone, GitRepo};

fn config(root: &Path) -> Config {
    Config::new(root, "alice/*")
}

fn probe(repo: &GitRepo) -> RepoStatus {
    RepoStatus::probe(&repo.dir).unwrap()
}

#[test]
fn dry_run_leaves_repository_untouched() {
    let tmp = TempDir::new().unwrap();
    let (_bare, repo) = remote_with_clone(tmp.path(), "app", "alice/fix");
    repo.commit_file("committed.txt", "c\n", "unpushed");
    repo.write_file("README.md", "edited\n");
    repo.write_file("staged.txt", "s\n");
    repo.git(&["add", "staged.txt"]).unwrap();
    repo.write_file("untracked.txt", "u\n");

    let head = repo.head();
    let index = repo.index_bytes();
    let stashes = repo.stash_list();
    let status = probe(&repo);

    let config = config(tmp.path());
    for script in [vec!["a", "msg"], vec!["i", "msg"]] {
        let report = Orchestrator::new(&config, ScriptedPrompter::new(script), true)
            .run(std::slice::from_ref(&status));
        assert_eq!(report.end, RunEnd::Completed);
        assert_eq!(report.summary.synced, 1);
    }

    assert_eq!(repo.head(), head);
    assert_eq!(repo.index_bytes(), index);
    assert_eq!(repo.stash_list(), stashes);
    assert_eq!(probe(&repo), status);
}

#[test]
fn stage_all_commits_and_pushes() {
    let tmp = TempDir::new().unwrap();
    let (bare, repo) = remote_with_clone(tmp.path(), "app", "alice/fix");
    repo.write_file("README.md", "edited\n");
    repo.write_file("new.txt", "n\n");

    let config = config(tmp.path());
    let report = Orchestrator::new(&config, ScriptedPrompter::new(["a", "wrap up"]), false)
        .run(&[probe(&repo)]);

    assert_eq!(
        report.summary,
        SyncSummary {
            synced: 1,
            skipped: 0,
            errored: 0
        }
    );
    assert_eq!(repo.git(&["log", "-1", "--format=%s"]).unwrap(), "wrap up");
    assert_eq!(
        git(&bare, &["rev-parse", "refs/heads/alice/fix"]).unwrap(),
        repo.head()
    );
    assert!(!probe(&repo).needs_sync());
}

#[test]
fn empty_commit_message_uses_default() {
    let tmp = TempDir::new().unwrap();
    let (_bare, repo) = remote_with_clone(tmp.path(), "app", "alice/fix");
    repo.write_file("README.md", "edited\n");

    let config = config(tmp.path());
    Orchestrator::new(&config, ScriptedPrompter::new(["a", ""]), false).run(&[probe(&repo)]);

    let subject = repo.git(&["log", "-1", "--format=%s"]).unwrap();
    assert!(subject.starts_with("End of day sync"), "{subject}");
}

#[test]
fn unknown_reply_skips_repository() {
    let tmp = TempDir::new().unwrap();
    let (_bare, repo) = remote_with_clone(tmp.path(), "app", "alice/fix");
    repo.write_file("README.md", "edited\n");
    let head = repo.head();

    let config = config(tmp.path());
    let report = Orchestrator::new(&config, ScriptedPrompter::new(["what?"]), false)
        .run(&[probe(&repo)]);

    assert_eq!(report.summary.skipped, 1);
    assert_eq!(report.end, RunEnd::Completed);
    assert_eq!(repo.head(), head);
}

#[test]
fn quit_stops_the_whole_run() {
    let tmp = TempDir::new().unwrap();
    let (_bare_a, a) = remote_with_clone(tmp.path(), "a", "alice/fix");
    let (_bare_b, b) = remote_with_clone(tmp.path(), "b", "alice/fix");
    a.write_file("README.md", "edited\n");
    b.write_file("README.md", "edited\n");
    let head_b = b.head();

    let config = config(tmp.path());
    let report = Orchestrator::new(&config, ScriptedPrompter::new(["s", "q", "a"]), false)
        .run(&[probe(&a), probe(&b)]);

    assert_eq!(report.end, RunEnd::Quit);
    assert_eq!(
        report.summary,
        SyncSummary {
            synced: 0,
            skipped: 1,
            errored: 0
        }
    );
    assert_eq!(b.head(), head_b);
}

#[test]
fn diverged_remote_is_counted_as_skipped_and_errors_continue() {
    let tmp = TempDir::new().unwrap();
    let (bare, mine) = remote_with_clone(tmp.path(), "app", "alice/fix");
    let theirs = GitRepo::clone_from(&bare, tmp.path().join("elsewhere/app"));
    theirs.commit_file("theirs.txt", "t\n", "their change");
    theirs.git(&["push", "-q"]).unwrap();
    mine.write_file("README.md", "mine\n");

    let (gone, broken) = remote_with_clone(tmp.path(), "broken", "alice/fix");
    broken.write_file("README.md", "edited\n");
    std::fs::remove_dir_all(&gone).unwrap();

    let config = config(tmp.path());
    let report = Orchestrator::new(
        &config,
        ScriptedPrompter::new(["a", "mine", "a", "broken"]),
        false,
    )
    .run(&[probe(&mine), probe(&broken)]);

    assert_eq!(report.end, RunEnd::Completed);
    assert_eq!(
        report.summary,
        SyncSummary {
            synced: 0,
            skipped: 1,
            errored: 1
        }
    );
    // the local commit stays for the user to reconcile
    assert_eq!(mine.git(&["log", "-1", "--format=%s"]).unwrap(), "mine");
}

#[test]
fn interrupt_flag_stops_before_next_repository() {
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    let tmp = TempDir::new().unwrap();
    let (_bare, repo) = remote_with_clone(tmp.path(), "app", "alice/fix");
    repo.write_file("README.md", "edited\n");

    let config = config(tmp.path());
    let report = Orchestrator::new(&config, ScriptedPrompter::new(["a"]), false)
        .with_interrupt_flag(Arc::new(AtomicBool::new(true)))
        .run(&[probe(&repo)]);

    assert_eq!(report.end, RunEnd::Interrupted);
    assert_eq!(report.summary, SyncSummary::default());
}

/// A repository with one staged new file, one unstaged edit and one
/// untracked file.
fn partly_staged(tmp: &TempDir) -> (std::path::PathBuf, GitRepo) {
    let (bare, repo) = remote_with_clone(tmp.path(), "app", "alice/fix");
    repo.write_file("a.txt", "a\n");
    repo.git(&["add", "a.txt"]).unwrap();
    repo.write_file("README.md", "edited\n");
    repo.write_file("scratch.txt", "s\n");
    (bare, repo)
}

#[test]
fn interactive_with_nothing_staged_is_skipped() {
    let tmp = TempDir::new().unwrap();
    let (_bare, repo) = remote_with_clone(tmp.path(), "app", "alice/fix");
    repo.write_file("README.md", "edited\n");
    let head = repo.head();

    let config = config(tmp.path());
    let report = Orchestrator::new(&config, ScriptedPrompter::new(["i"]), false)
        .run(&[probe(&repo)]);

    assert_eq!(report.end, RunEnd::Completed);
    assert_eq!(report.summary.skipped, 1);
    assert_eq!(repo.head(), head);
    assert!(repo.stash_list().is_empty());
}

#[test]
fn interactive_commits_staged_and_stashes_the_rest() {
    let tmp = TempDir::new().unwrap();
    let (bare, repo) = partly_staged(&tmp);

    let config = config(tmp.path());
    let report = Orchestrator::new(&config, ScriptedPrompter::new(["i", "partial", "y"]), false)
        .run(&[probe(&repo)]);

    assert_eq!(report.summary.synced, 1);
    assert_eq!(repo.git(&["log", "-1", "--format=%s"]).unwrap(), "partial");
    assert_eq!(
        git(&bare, &["rev-parse", "refs/heads/alice/fix"]).unwrap(),
        repo.head()
    );
    assert!(repo.stash_list().contains("gitday: left over"), "{}", repo.stash_list());
    let after = probe(&repo);
    assert!(after.modified.is_empty());
    assert!(after.untracked.is_empty());
}

#[test]
fn interactive_leaves_the_rest_when_stash_declined() {
    let tmp = TempDir::new().unwrap();
    let (_bare, repo) = partly_staged(&tmp);

    let config = config(tmp.path());
    let report = Orchestrator::new(&config, ScriptedPrompter::new(["i", "partial", "n"]), false)
        .run(&[probe(&repo)]);

    assert_eq!(report.summary.synced, 1);
    assert!(repo.stash_list().is_empty());
    assert_eq!(probe(&repo).modified, vec!["README.md".to_string()]);
}

#[test]
fn auto_stash_skips_the_question() {
    let tmp = TempDir::new().unwrap();
    let (_bare, repo) = partly_staged(&tmp);

    let mut config = config(tmp.path());
    config.auto_stash_remaining = true;
    // no reply left for a stash question; an unexpected prompt would decline
    let report = Orchestrator::new(&config, ScriptedPrompter::new(["i", "partial"]), false)
        .run(&[probe(&repo)]);

    assert_eq!(report.summary.synced, 1);
    assert!(!repo.stash_list().is_empty());
    assert!(probe(&repo).modified.is_empty());
}

/// Scripted replies, except Ctrl-C arrives at the stash question.
struct InterruptAtStash(ScriptedPrompter);

impl Prompter for InterruptAtStash {
    fn action(&mut self, repo: &RepoStatus) -> gitday::Result<String> {
        self.0.action(repo)
    }

    fn commit_message(&mut self, default: &str) -> gitday::Result<String> {
        self.0.commit_message(default)
    }

    fn stash_remaining(&mut self, _default_message: &str) -> gitday::Result<Option<String>> {
        Err(gitday::Error::Interrupted)
    }

    fn stage_patch(&mut self, git: &GitCli) -> gitday::Result<()> {
        self.0.stage_patch(git)
    }
}

#[test]
fn interrupt_after_push_still_counts_the_repository() {
    let tmp = TempDir::new().unwrap();
    let (bare, repo) = partly_staged(&tmp);
    let (_bare_b, other) = remote_with_clone(tmp.path(), "other", "alice/fix");
    other.write_file("README.md", "edited\n");
    let other_head = other.head();

    let config = config(tmp.path());
    let prompter = InterruptAtStash(ScriptedPrompter::new(["i", "partial", "a", "other"]));
    let report = Orchestrator::new(&config, prompter, false).run(&[probe(&repo), probe(&other)]);

    assert_eq!(report.end, RunEnd::Interrupted);
    assert_eq!(
        report.summary,
        SyncSummary {
            synced: 1,
            skipped: 0,
            errored: 0
        }
    );
    assert_eq!(
        git(&bare, &["rev-parse", "refs/heads/alice/fix"]).unwrap(),
        repo.head()
    );
    assert_eq!(other.head(), other_head);
}
