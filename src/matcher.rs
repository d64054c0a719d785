//! Compiled include/exclude rules for repository discovery.
//!
//! Glob-like patterns are turned into regexes once per discovery run.

use std::path::{Path, PathBuf};

use regex::Regex;

use crate::config::Config;
use crate::error::{Error, Result};

/// Translate a glob-like exclude pattern into an unanchored regex.
///
/// `**` matches anything, `*` matches within one path segment and `?` matches
/// a single non-separator character. Everything else is literal.
pub fn glob_to_regex(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' if chars.peek() == Some(&'*') => {
                chars.next();
                out.push_str(".*");
            }
            '*' => out.push_str("[^/]*"),
            '?' => out.push_str("[^/]"),
            other => out.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    out
}

/// Translate a branch prefix such as `alice/*` into an anchored regex.
///
/// Without a wildcard the prefix is matched literally at the start.
pub fn branch_prefix_to_regex(prefix: &str) -> String {
    let escaped: Vec<String> = prefix.split('*').map(regex::escape).collect();
    format!("^{}", escaped.join(".*"))
}

#[derive(Debug, Clone)]
pub struct RepoFilter {
    exclude_paths: Vec<PathBuf>,
    exclude_patterns: Vec<Regex>,
    branch: Regex,
}

impl RepoFilter {
    pub fn new(exclude_paths: &[PathBuf], exclude_patterns: &[String], branch_prefix: &str) -> Result<Self> {
        let exclude_patterns = exclude_patterns
            .iter()
            .map(|pattern| compile(pattern, &glob_to_regex(pattern)))
            .collect::<Result<Vec<_>>>()?;
        let branch = compile(branch_prefix, &branch_prefix_to_regex(branch_prefix))?;

        Ok(Self {
            exclude_paths: exclude_paths.iter().map(|p| trim_trailing(p)).collect(),
            exclude_patterns,
            branch,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.exclude_repos, &config.exclude_patterns, &config.branch_prefix)
    }

    pub fn is_excluded(&self, path: &Path) -> bool {
        let path = trim_trailing(path);
        if self.exclude_paths.iter().any(|p| *p == path) {
            return true;
        }
        let text = path.to_string_lossy();
        self.exclude_patterns.iter().any(|re| re.is_match(&text))
    }

    pub fn branch_matches(&self, branch: &str) -> bool {
        self.branch.is_match(branch)
    }
}

fn compile(pattern: &str, regex: &str) -> Result<Regex> {
    Regex::new(regex).map_err(|source| Error::Pattern {
        pattern: pattern.to_string(),
        source,
    })
}

fn trim_trailing(path: &Path) -> PathBuf {
    path.components().collect()
}
