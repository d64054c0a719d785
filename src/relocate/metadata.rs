//! Sidecar record of relocated files.
//!
//! One JSON object per line in `<destination root>/.mdshelf-metadata.jsonl`.
//! Appending never rewrites earlier records, so an interrupted write can only
//! damage the last line, which the reader skips.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const METADATA_FILE: &str = ".mdshelf-metadata.jsonl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub source: PathBuf,
    /// Path of the file relative to `original_root`.
    pub relative_path: PathBuf,
    pub destination: PathBuf,
    /// RFC 3339 / ISO-8601.
    pub timestamp: String,
    pub original_root: PathBuf,
}

#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn for_root(root: &Path) -> Self {
        Self {
            path: root.join(METADATA_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &MoveRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        let mut line = String::new();
        if self.has_partial_tail() {
            line.push('\n');
        }
        line.push_str(&serde_json::to_string(record)?);
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| Error::io(&self.path, e))?;
        file.write_all(line.as_bytes())
            .map_err(|e| Error::io(&self.path, e))
    }

    /// All readable records in append order. A missing file is an empty store.
    pub fn records(&self) -> Result<Vec<MoveRecord>> {
        let file = match fs::File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(Error::io(&self.path, e)),
        };

        let mut records = Vec::new();
        for (n, line) in BufReader::new(file).lines().enumerate() {
            let line = line.map_err(|e| Error::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(&line) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(
                    path = %self.path.display(),
                    line = n + 1,
                    error = %e,
                    "skipping unreadable metadata record"
                ),
            }
        }
        Ok(records)
    }

    /// Whether the last write was cut short and left no trailing newline.
    fn has_partial_tail(&self) -> bool {
        let Ok(mut file) = fs::File::open(&self.path) else {
            return false;
        };
        let mut last = [0u8; 1];
        file.seek(SeekFrom::End(-1)).is_ok()
            && file.read_exact(&mut last).is_ok()
            && last[0] != b'\n'
    }
}

/// The latest record whose destination is `file`.
pub fn latest_for<'a>(records: &'a [MoveRecord], file: &Path) -> Option<&'a MoveRecord> {
    records.iter().rev().find(|r| r.destination == file)
}
