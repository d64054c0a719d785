use std::fs::{self, create_dir_all};
use std::path::{Path, PathBuf};
use std::{env, fmt};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

pub const CONFIG_FILE: &str = "config.json";
pub const MAX_DEPTH_LIMIT: u8 = 10;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub projects_root: PathBuf,
    pub branch_prefix: String,
    #[serde(default = "default_sync_time")]
    pub sync_time: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: u8,
    #[serde(default)]
    pub exclude_patterns: Vec<String>,
    #[serde(default)]
    pub exclude_repos: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_config_repo: Option<String>,
    #[serde(default)]
    pub auto_stash_remaining: bool,
    #[serde(default = "default_true")]
    pub notification_enabled: bool,
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_sync_time() -> String {
    "18:00".to_string()
}

fn default_max_depth() -> u8 {
    3
}

fn default_true() -> bool {
    true
}

impl Config {
    pub fn new(projects_root: impl Into<PathBuf>, branch_prefix: impl Into<String>) -> Self {
        Self {
            projects_root: projects_root.into(),
            branch_prefix: branch_prefix.into(),
            sync_time: default_sync_time(),
            max_depth: default_max_depth(),
            exclude_patterns: vec![],
            exclude_repos: vec![],
            git_config_repo: None,
            auto_stash_remaining: false,
            notification_enabled: true,
            log_level: LogLevel::Info,
        }
    }

    /// A starting config for `--init`: `~/projects` and a `$USER/*` prefix.
    pub fn starter() -> Self {
        let root = dirs::home_dir()
            .map(|home| home.join("projects"))
            .unwrap_or_else(|| PathBuf::from("~/projects"));
        let user = env::var("USER")
            .or_else(|_| env::var("USERNAME"))
            .unwrap_or_else(|_| "me".to_string());
        Self::new(root, format!("{user}/*"))
    }

    pub fn default_path() -> PathBuf {
        Self::config_home().join(CONFIG_FILE)
    }

    /// Location of all gitday state. By default
    ///
    /// Linux   :   $XDG_CONFIG_HOME/gitday or $HOME/.config/gitday
    /// macOS   :   $HOME/Library/Application Support/gitday
    /// Windows :   %AppData%\Roaming\gitday
    ///
    /// This can be overridden by setting the GITDAY_CONFIG_HOME environment variable.
    pub fn config_home() -> PathBuf {
        // The environment variable lets tests run against a throwaway home.
        if let Ok(env_var) = env::var("GITDAY_CONFIG_HOME") {
            if !env_var.is_empty() {
                return env_var.into();
            }
        }

        dirs::config_dir()
            .map(|dir| dir.join("gitday"))
            .unwrap_or_else(|| PathBuf::from(".gitday"))
    }

    /// Load Config from the default path
    pub fn load() -> Result<Self> {
        Self::load_file(Self::default_path().as_path())
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ConfigMissing {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let mut config: Config =
            serde_json::from_str(raw).map_err(|e| Error::invalid(e.to_string()))?;
        config.validate()?;
        config.expand_paths();
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.projects_root.as_os_str().is_empty() {
            return Err(Error::invalid("projectsRoot must not be empty"));
        }
        if self.branch_prefix.is_empty() {
            return Err(Error::invalid("branchPrefix must not be empty"));
        }
        if self.branch_prefix.matches('*').count() > 1 {
            return Err(Error::invalid(format!(
                "branchPrefix '{}' may contain at most one '*'",
                self.branch_prefix
            )));
        }
        if !(1..=MAX_DEPTH_LIMIT).contains(&self.max_depth) {
            return Err(Error::invalid(format!(
                "maxDepth must be between 1 and {MAX_DEPTH_LIMIT}, got {}",
                self.max_depth
            )));
        }
        self.reminder_time()?;
        Ok(())
    }

    pub fn reminder_time(&self) -> Result<NaiveTime> {
        NaiveTime::parse_from_str(&self.sync_time, "%H:%M").map_err(|_| {
            Error::invalid(format!(
                "syncTime must be HH:MM, got '{}'",
                self.sync_time
            ))
        })
    }

    fn expand_paths(&mut self) {
        self.projects_root = expand_tilde(&self.projects_root);
        self.exclude_repos = self.exclude_repos.iter().map(|p| expand_tilde(p)).collect();
    }

    pub fn create_dir(path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        }
        Ok(())
    }

    /// Serialize `self` as pretty JSON and write it to `path` through a temp file.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        Self::create_dir(path)?;
        let mut config_string = serde_json::to_string_pretty(self)?;
        config_string.push('\n');
        write_replacing(path, config_string.as_bytes())
    }

    /// Replace a single top-level key in the config file at `path`.
    ///
    /// `value` is parsed as JSON when possible and otherwise taken as a string.
    /// List keys also accept a comma separated string. The previous file is
    /// kept as `<file>.bak`.
    pub fn set_key(path: &Path, key: &str, value: &str) -> Result<Self> {
        if !KNOWN_KEYS.contains(&key) {
            return Err(Error::UnknownKey {
                key: key.to_string(),
            });
        }
        if !path.exists() {
            return Err(Error::ConfigMissing {
                path: path.to_path_buf(),
            });
        }

        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut doc: Value = serde_json::from_str(&raw).map_err(|e| Error::invalid(e.to_string()))?;
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| Error::invalid("config root must be a JSON object"))?;
        obj.insert(key.to_string(), parse_value(key, value));

        let updated = serde_json::to_string_pretty(&doc)?;
        let config = Self::from_json(&updated)?;

        let backup = backup_path(path);
        fs::copy(path, &backup).map_err(|e| Error::io(&backup, e))?;
        write_replacing(path, format!("{updated}\n").as_bytes())?;

        tracing::info!(key, path = %path.display(), "updated configuration");
        Ok(config)
    }

    pub fn print(&self, path: &Path) {
        println!("Config file: {}", path.display());
        match serde_json::to_string_pretty(self) {
            Ok(s) => println!("{s}"),
            Err(e) => println!("Unable to render config: {e}"),
        }
    }
}

const KNOWN_KEYS: [&str; 10] = [
    "projectsRoot",
    "branchPrefix",
    "syncTime",
    "maxDepth",
    "excludePatterns",
    "excludeRepos",
    "gitConfigRepo",
    "autoStashRemaining",
    "notificationEnabled",
    "logLevel",
];

const STRING_KEYS: [&str; 4] = ["projectsRoot", "branchPrefix", "syncTime", "logLevel"];

fn parse_value(key: &str, value: &str) -> Value {
    if STRING_KEYS.contains(&key) {
        return Value::String(value.to_string());
    }
    if let Ok(parsed) = serde_json::from_str::<Value>(value) {
        return parsed;
    }
    if key == "excludePatterns" || key == "excludeRepos" {
        let items = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect();
        return Value::Array(items);
    }
    Value::String(value.to_string())
}

pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".bak");
    path.with_file_name(name)
}

fn write_replacing(path: &Path, content: &[u8]) -> Result<()> {
    let temp_name = format!(
        ".{}.{}.tmp",
        path.file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default(),
        std::process::id()
    );
    let temp_path = path.with_file_name(temp_name);
    fs::write(&temp_path, content).map_err(|e| Error::io(&temp_path, e))?;
    fs::rename(&temp_path, path).map_err(|e| Error::io(path, e))
}

pub fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}
