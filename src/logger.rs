//! Tracing setup shared by both binaries.
//!
//! Human-facing output goes through `println!`; `tracing` events go to stderr
//! and are also appended, timestamped and without colour, to an operation log.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LogLevel;

/// Install the global subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Failing to open the log file only drops the file layer.
pub fn init(level: LogLevel, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gitday={level},mdshelf={level}")));

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .compact();

    let file_layer = log_file.and_then(open_log).map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init();
}

fn open_log(path: &Path) -> Option<fs::File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).ok()?;
    }
    OpenOptions::new().create(true).append(true).open(path).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn init_creates_log_file() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("logs").join("gitday.log");
        init(LogLevel::Debug, Some(&log));
        tracing::info!("operation log ready");
        assert!(log.exists());
    }
}
