//! Configuration loading and skip rules.
//!
//! Settings come from a TOML file. The category table is built in and is
//! not configurable; the file controls which files are skipped and where the
//! history files live.
//!
//! # Configuration File Format
//!
//! ```toml
//! [skip]
//! filenames = ["day_01.py"]
//! patterns = ["*.part"]
//! regex = []
//!
//! [storage]
//! audit_log = "sort_log.txt"
//! restore_ledger = "restore_log.txt"
//! ```

use crate::history::{AuditLog, DEFAULT_AUDIT_LOG, DEFAULT_RESTORE_LEDGER, RestoreLedger};
use glob::Pattern;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the per-directory configuration file.
pub const LOCAL_CONFIG_FILE: &str = ".sortifyrc.toml";

/// Errors that can occur during configuration loading.
#[derive(Error, Debug, Clone)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    ConfigNotFound(PathBuf),
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),
    #[error("Invalid glob pattern '{pattern}': {reason}")]
    InvalidGlobPattern { pattern: String, reason: String },
    #[error("Invalid regex pattern '{pattern}': {reason}")]
    InvalidRegexPattern { pattern: String, reason: String },
    #[error("IO error reading configuration: {0}")]
    IoError(String),
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortConfig {
    #[serde(default)]
    pub skip: SkipConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Files that are never sorted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipConfig {
    /// Exact filenames, compared against the bare name.
    #[serde(default = "default_skip_filenames")]
    pub filenames: Vec<String>,

    /// Glob patterns matched against the bare name (e.g. "*.part").
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Regular expressions matched against the bare name.
    #[serde(default)]
    pub regex: Vec<String>,
}

fn default_skip_filenames() -> Vec<String> {
    vec!["day_01.py".to_string()]
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            filenames: default_skip_filenames(),
            patterns: Vec::new(),
            regex: Vec::new(),
        }
    }
}

/// Locations of the audit log and restore ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_audit_log")]
    pub audit_log: PathBuf,
    #[serde(default = "default_restore_ledger")]
    pub restore_ledger: PathBuf,
}

fn default_audit_log() -> PathBuf {
    PathBuf::from(DEFAULT_AUDIT_LOG)
}

fn default_restore_ledger() -> PathBuf {
    PathBuf::from(DEFAULT_RESTORE_LEDGER)
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            audit_log: default_audit_log(),
            restore_ledger: default_restore_ledger(),
        }
    }
}

impl StorageConfig {
    pub fn restore_ledger(&self) -> RestoreLedger {
        RestoreLedger::new(&self.restore_ledger)
    }

    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(&self.audit_log)
    }
}

impl SortConfig {
    /// Load configuration, falling back to defaults.
    ///
    /// Attempts to load configuration in the following order:
    /// 1. If `config_path` is provided, load from that file
    /// 2. Look for `.sortifyrc.toml` in the current directory
    /// 3. Look for `~/.config/sortify/config.toml` in home directory
    /// 4. Fall back to default configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the chosen file cannot be read or parsed.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        let local_config = PathBuf::from(LOCAL_CONFIG_FILE);
        if local_config.exists() {
            return Self::load_from_file(&local_config);
        }

        if let Ok(home) = std::env::var("HOME") {
            let home_config = PathBuf::from(home)
                .join(".config")
                .join("sortify")
                .join("config.toml");
            if home_config.exists() {
                return Self::load_from_file(&home_config);
            }
        }

        Ok(Self::default())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    ///
    /// Skip patterns are compiled here too, so a broken pattern is reported
    /// whatever command is about to run.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ConfigInvalid(e.to_string()))?;
        config.skip.compile()?;
        Ok(config)
    }
}

impl SkipConfig {
    /// Compiles the rules, validating every pattern up front.
    pub fn compile(&self) -> Result<SkipRules, ConfigError> {
        let patterns = self
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| ConfigError::InvalidGlobPattern {
                    pattern: pattern.clone(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let regexes = self
            .regex
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| ConfigError::InvalidRegexPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SkipRules {
            filenames: self.filenames.iter().cloned().collect(),
            patterns,
            regexes,
        })
    }
}

/// Compiled skip rules. A file is skipped when its bare name matches any rule.
#[derive(Debug, Clone)]
pub struct SkipRules {
    filenames: HashSet<String>,
    patterns: Vec<Pattern>,
    regexes: Vec<Regex>,
}

impl SkipRules {
    /// Rules that only skip the given exact filenames.
    pub fn from_filenames<I, S>(filenames: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filenames: filenames.into_iter().map(Into::into).collect(),
            patterns: Vec::new(),
            regexes: Vec::new(),
        }
    }

    /// Rules that skip nothing.
    pub fn none() -> Self {
        Self::from_filenames(Vec::<String>::new())
    }

    pub fn is_skipped(&self, file_name: &str) -> bool {
        self.filenames.contains(file_name)
            || self.patterns.iter().any(|p| p.matches(file_name))
            || self.regexes.iter().any(|r| r.is_match(file_name))
    }
}

impl Default for SkipRules {
    fn default() -> Self {
        Self::from_filenames(default_skip_filenames())
    }
}
