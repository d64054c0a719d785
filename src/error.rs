//! Error types for gitday

use std::path::{Path, PathBuf};

/// Result type for gitday operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading config, probing repositories,
/// syncing or relocating files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No configuration found at {}. Run `gitday --init` to create one.", path.display())]
    ConfigMissing { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    ConfigInvalid { message: String },

    #[error("Unknown configuration key '{key}'")]
    UnknownKey { key: String },

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("`git {command}` failed: {message}")]
    GitCommand { command: String, message: String },

    #[error("Invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Interactive prompt error: {0}")]
    Prompt(String),

    #[error("Interrupted")]
    Interrupted,
}

impl Error {
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::ConfigInvalid {
            message: message.into(),
        }
    }
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        match e {
            dialoguer::Error::IO(io) if io.kind() == std::io::ErrorKind::Interrupted => {
                Error::Interrupted
            }
            other => Error::Prompt(other.to_string()),
        }
    }
}
