use std::io::IsTerminal;

use colored::Colorize;

use crate::repo_status::RepoStatus;
use crate::sync::SyncSummary;

/// How many file names or commit subjects to list before "+N more".
pub const DISPLAY_LIMIT: usize = 10;

const SYMBOLS_FANCY: [&str; 5] = ["✓", "📝", "❌", "⚠️", "📁"];
const SYMBOLS_PLAIN: [&str; 5] = ["[OK]", "[M]", "[X]", "!", "*"];

fn symbols() -> &'static [&'static str; 5] {
    if std::env::var("GITDAY_PLAIN_TEXT").is_ok() {
        return &SYMBOLS_PLAIN;
    }
    if std::env::var("GITDAY_FANCY").is_ok() {
        return &SYMBOLS_FANCY;
    }
    if !std::io::stdout().is_terminal() || std::env::var("NO_COLOR").is_ok() {
        return &SYMBOLS_PLAIN;
    }
    if let Ok(term) = std::env::var("TERM") {
        let term = term.to_lowercase();
        if term == "dumb" || term == "vt100" || term.contains("linux") {
            return &SYMBOLS_PLAIN;
        }
    }
    &SYMBOLS_FANCY
}

/// Up to `limit` items, then a "+N more" line.
pub fn capped(items: &[String], limit: usize) -> Vec<String> {
    let mut lines: Vec<String> = items.iter().take(limit).cloned().collect();
    if items.len() > limit {
        lines.push(format!("+{} more", items.len() - limit));
    }
    lines
}

/// The short form used by `--status`: header, branch, one line per non-zero count.
pub fn status_block(repo: &RepoStatus) -> String {
    let [_, _, _, _, folder] = symbols();
    let mut out = format!("{} {}\n", folder, repo.path.display().to_string().bold());
    out.push_str(&format!("  Branch: {}\n", repo.branch_name().cyan()));
    let counts = [
        (repo.staged.len(), "staged files"),
        (repo.modified.len(), "modified files"),
        (repo.untracked.len(), "untracked files"),
        (
            if repo.has_unpushed_commits() { repo.ahead } else { 0 },
            "unpushed commits",
        ),
    ];
    for (count, label) in counts {
        if count > 0 {
            out.push_str(&format!("  {count} {label}\n"));
        }
    }
    out
}

/// The long form shown before asking what to do with a repository.
pub fn detail_block(repo: &RepoStatus, limit: usize) -> String {
    let mut out = status_block(repo);
    let sections = [
        ("Staged", &repo.staged, "green"),
        ("Modified", &repo.modified, "yellow"),
        ("Untracked", &repo.untracked, "red"),
    ];
    for (title, files, color) in sections {
        if files.is_empty() {
            continue;
        }
        out.push_str(&format!("  {title}:\n"));
        for line in capped(files, limit) {
            out.push_str(&format!("    {}\n", line.color(color)));
        }
    }
    if repo.has_unpushed_commits() {
        out.push_str("  Unpushed commits:\n");
        for line in capped(&repo.unpushed, limit) {
            out.push_str(&format!("    {line}\n"));
        }
    }
    if repo.is_behind() {
        out.push_str(&format!(
            "  {} upstream is {} commit(s) ahead of you\n",
            symbols()[3],
            repo.behind
        ));
    }
    out
}

pub fn summary_block(summary: &SyncSummary) -> String {
    let [ok, skipped, error, _, _] = symbols();
    format!(
        "\nSync Summary\n------------\n{} Synced:  {}\n{} Skipped: {}\n{} Errors:  {}\n",
        ok,
        summary.synced.to_string().green(),
        skipped,
        summary.skipped.to_string().yellow(),
        error,
        summary.errored.to_string().red(),
    )
}

pub fn error(msg: impl AsRef<str>) {
    eprintln!("{}: {}", "error".red().bold(), msg.as_ref());
}

pub fn warn(msg: impl AsRef<str>) {
    eprintln!("{}: {}", "warning".yellow().bold(), msg.as_ref());
}

pub fn info(msg: impl AsRef<str>) {
    println!("{} {}", "::".blue().bold(), msg.as_ref());
}
