//! Move documents between a working tree and an archive.
//!
//! `store` takes files from a working directory into an archive, `restore`
//! brings them back. Paths are mirrored relative to the roots unless `flat`
//! is set. Every transfer is recorded in the destination's
//! [`MetadataStore`] so `restore_exact` can put files back where they came
//! from even if the archive was laid out flat.

pub mod metadata;

use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use walkdir::WalkDir;

use crate::error::{Error, Result};
pub use metadata::{MetadataStore, MoveRecord, METADATA_FILE};

/// Directory names that never hold documents worth relocating.
pub const EXCLUDED_DIRS: [&str; 11] = [
    ".git",
    "node_modules",
    "target",
    "dist",
    "build",
    "vendor",
    ".venv",
    "venv",
    "__pycache__",
    ".next",
    ".cache",
];

pub const EXCLUDED_FILE: &str = "README.md";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Store,
    Restore,
}

impl Direction {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "store" => Some(Direction::Store),
            "restore" => Some(Direction::Restore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    Move,
    Copy,
}

impl fmt::Display for Transfer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transfer::Move => f.write_str("move"),
            Transfer::Copy => f.write_str("copy"),
        }
    }
}

impl Transfer {
    pub fn past_tense(&self) -> &'static str {
        match self {
            Transfer::Move => "moved",
            Transfer::Copy => "copied",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RelocateOptions {
    pub direction: Direction,
    pub transfer: Transfer,
    pub flat: bool,
    pub restore_exact: bool,
    pub cleanup: bool,
    pub dry_run: bool,
    /// Without the leading dot.
    pub extension: String,
}

impl RelocateOptions {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            transfer: Transfer::Move,
            flat: false,
            restore_exact: false,
            cleanup: true,
            dry_run: false,
            extension: "md".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedMove {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Path relative to the source root, as recorded in the metadata.
    pub relative: PathBuf,
    /// Set when `restore_exact` had no record and fell back to the file name.
    pub fallback: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelocateReport {
    pub transferred: usize,
    pub backups: usize,
    pub fallbacks: usize,
    pub removed_dirs: usize,
}

pub struct Relocator {
    from: PathBuf,
    to: PathBuf,
    opts: RelocateOptions,
}

impl Relocator {
    pub fn new(from: &Path, to: &Path, opts: RelocateOptions) -> Result<Self> {
        if !from.is_dir() {
            return Err(Error::io(
                from,
                std::io::Error::new(std::io::ErrorKind::NotFound, "source directory does not exist"),
            ));
        }
        let from = absolutize(from)?;
        let to = absolutize(to)?;
        if opts.restore_exact && opts.direction == Direction::Store {
            tracing::warn!("--restore-exact only applies to restore, ignoring");
        }
        Ok(Self { from, to, opts })
    }

    pub fn source_root(&self) -> &Path {
        &self.from
    }

    pub fn dest_root(&self) -> &Path {
        &self.to
    }

    fn wants_extension(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().eq_ignore_ascii_case(&self.opts.extension))
            .unwrap_or(false)
    }

    fn is_excluded_dir(&self, path: &Path) -> bool {
        if path == self.to {
            return true;
        }
        path.file_name()
            .map(|n| EXCLUDED_DIRS.contains(&n.to_string_lossy().as_ref()))
            .unwrap_or(false)
    }

    /// Documents under the source root, in a stable order.
    pub fn collect_files(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.from)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !(e.file_type().is_dir() && self.is_excluded_dir(e.path())))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .filter(|e| {
                let name = e.file_name().to_string_lossy();
                name != EXCLUDED_FILE && name != METADATA_FILE
            })
            .filter(|e| self.wants_extension(e.path()))
            .map(|e| e.into_path())
            .collect()
    }

    /// Work out where every file goes without touching anything.
    pub fn plan(&self) -> Result<Vec<PlannedMove>> {
        let exact = self.opts.restore_exact && self.opts.direction == Direction::Restore;
        let source_store = MetadataStore::for_root(&self.from);
        let records = if exact { source_store.records()? } else { vec![] };

        let mut plan = Vec::new();
        for source in self.collect_files() {
            let relative = source
                .strip_prefix(&self.from)
                .map(Path::to_path_buf)
                .unwrap_or_else(|_| file_name_of(&source));

            let (target, fallback) = if exact {
                match metadata::latest_for(&records, &source) {
                    Some(record) => (self.to.join(&record.relative_path), false),
                    None => {
                        tracing::warn!(
                            file = %source.display(),
                            "no metadata record, restoring by file name"
                        );
                        (self.to.join(file_name_of(&source)), true)
                    }
                }
            } else if self.opts.flat {
                (self.to.join(file_name_of(&source)), false)
            } else {
                (self.to.join(&relative), false)
            };

            plan.push(PlannedMove {
                source,
                target,
                relative,
                fallback,
            });
        }
        Ok(plan)
    }

    pub fn run(&self) -> Result<RelocateReport> {
        let plan = self.plan()?;
        let mut report = RelocateReport::default();
        let dest_store = MetadataStore::for_root(&self.to);
        let verb = self.opts.transfer;

        for item in &plan {
            if item.fallback {
                report.fallbacks += 1;
            }
            if item.source == item.target {
                continue;
            }

            if self.opts.dry_run {
                if item.target.exists() && !backup_path(&item.target).exists() {
                    println!("[dry-run] would back up {}", item.target.display());
                }
                println!(
                    "[dry-run] would {verb} {} -> {}",
                    item.source.display(),
                    item.target.display()
                );
                report.transferred += 1;
                continue;
            }

            if let Some(dir) = item.target.parent() {
                fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
            }
            if backup_existing(&item.target)? {
                report.backups += 1;
            }

            match self.opts.transfer {
                Transfer::Move => move_file(&item.source, &item.target)?,
                Transfer::Copy => {
                    fs::copy(&item.source, &item.target).map_err(|e| Error::io(&item.target, e))?;
                }
            }

            dest_store.append(&MoveRecord {
                source: item.source.clone(),
                relative_path: item.relative.clone(),
                destination: item.target.clone(),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
                original_root: self.from.clone(),
            })?;

            println!("{} {} -> {}", verb.past_tense(), item.source.display(), item.target.display());
            tracing::info!(
                source = %item.source.display(),
                target = %item.target.display(),
                transfer = %verb,
                "relocated"
            );
            report.transferred += 1;
        }

        let cleanup = self.opts.cleanup
            && self.opts.direction == Direction::Store
            && self.opts.transfer == Transfer::Move
            && !self.opts.dry_run;
        if cleanup {
            report.removed_dirs = self.remove_empty_dirs(&plan)?;
        }

        Ok(report)
    }

    /// Remove directories under the source root that the moves in `plan`
    /// left empty, deepest first. Only the parent chains of moved files are
    /// considered, so directories that were empty beforehand stay. The root
    /// itself stays.
    fn remove_empty_dirs(&self, plan: &[PlannedMove]) -> Result<usize> {
        let mut dirs = BTreeSet::new();
        for item in plan {
            let mut dir = item.source.parent();
            while let Some(d) = dir {
                if d == self.from || !d.starts_with(&self.from) {
                    break;
                }
                dirs.insert(d.to_path_buf());
                dir = d.parent();
            }
        }

        let mut dirs: Vec<PathBuf> = dirs.into_iter().collect();
        dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));

        let mut removed = 0;
        for dir in &dirs {
            let empty = fs::read_dir(dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if empty {
                fs::remove_dir(dir).map_err(|e| Error::io(dir, e))?;
                tracing::debug!(dir = %dir.display(), "removed empty directory");
                removed += 1;
            }
        }
        Ok(removed)
    }
}

fn file_name_of(path: &Path) -> PathBuf {
    path.file_name().map(PathBuf::from).unwrap_or_default()
}

/// An absolute path without `.` or `..`, resolved through the deepest
/// ancestor that exists so it matches what a later `canonicalize` returns.
fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return fs::canonicalize(path).map_err(|e| Error::io(path, e));
    }
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map_err(|e| Error::io(path, e))?
            .join(path)
    };
    let normal = normalize(&joined);

    let mut existing = normal.as_path();
    let mut rest = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(normal),
        }
    }
    let mut resolved = fs::canonicalize(existing).map_err(|e| Error::io(existing, e))?;
    resolved.extend(rest.iter().rev());
    Ok(resolved)
}

/// Drop `.` and fold `..` into its parent without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() && !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

pub fn backup_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    target.with_file_name(name)
}

/// Copy an existing `target` aside once. Later overwrites keep the first backup.
fn backup_existing(target: &Path) -> Result<bool> {
    if !target.exists() {
        return Ok(false);
    }
    let backup = backup_path(target);
    if backup.exists() {
        return Ok(false);
    }
    fs::copy(target, &backup).map_err(|e| Error::io(&backup, e))?;
    tracing::info!(backup = %backup.display(), "backed up existing file");
    Ok(true)
}

fn move_file(from: &Path, to: &Path) -> Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems
    fs::copy(from, to).map_err(|e| Error::io(to, e))?;
    fs::remove_file(from).map_err(|e| Error::io(from, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_direction() {
        assert_eq!(Direction::parse("store"), Some(Direction::Store));
        assert_eq!(Direction::parse("restore"), Some(Direction::Restore));
        assert_eq!(Direction::parse("stash"), None);
    }

    #[test]
    fn normalize_folds_parent_components() {
        assert_eq!(normalize(Path::new("/tmp/sub/../archive/./x")), PathBuf::from("/tmp/archive/x"));
        assert_eq!(normalize(Path::new("/../a")), PathBuf::from("/a"));
    }

    #[test]
    fn absolutize_resolves_missing_tail_through_existing_ancestor() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = tmp.path().join("sub").join("..").join("archive").join("deep");
        let resolved = absolutize(&missing).unwrap();
        assert_eq!(resolved, tmp.path().canonicalize().unwrap().join("archive").join("deep"));
    }

    #[test]
    fn backup_keeps_extension_and_appends_bak() {
        assert_eq!(
            backup_path(Path::new("/a/notes.md")),
            PathBuf::from("/a/notes.md.bak")
        );
    }
}
