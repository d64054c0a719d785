pub mod config;
pub mod discovery;
pub mod display;
pub mod error;
pub mod git_cli;
pub mod git_repo_iter;
pub mod logger;
pub mod matcher;
pub mod notify;
pub mod prompt;
pub mod pull_all;
pub mod push;
pub mod relocate;
pub mod repo_status;
pub mod sync;

pub use error::{Error, Result};
