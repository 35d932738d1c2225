//! Configuration for the backup engine.
//!
//! The config file is JSON with comments (`config.jsonc`). Keys are PascalCase. Every key is
//! optional; missing keys take the defaults below. The loaded value is immutable and is
//! shared by `Arc` with every component.

use crate::naming::SNAPSHOT_EXTENSION;
use crate::retention::RetentionLimit;
use crate::{AutoBackupError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "config.jsonc";

/// Binds a host route to the label used in backup file names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AutoBackupEvent {
    /// Event label, used verbatim in backup file names
    pub name: String,
    /// Host route that triggers the event
    pub route: String,
}

impl AutoBackupEvent {
    pub fn new(name: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            route: route.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AutoBackupConfig {
    /// Master switch for backups and startup restore
    pub enabled: bool,
    /// Log every completed backup
    pub backup_saved_log: bool,
    /// Log how many old backups were pruned
    pub maximum_backup_delete_log: bool,
    /// Backups kept per profile; negative disables pruning
    pub maximum_backup_per_profile: i32,
    /// Log how many archived restore files were pruned
    pub maximum_restored_delete_log: bool,
    /// Archived restore files kept; negative disables pruning
    pub maximum_restored_files: i32,
    /// Root of the backups, restore-staging and restore-archive folders
    pub directory: PathBuf,
    pub auto_backup_events: Vec<AutoBackupEvent>,
}

impl Default for AutoBackupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            backup_saved_log: true,
            maximum_backup_delete_log: false,
            maximum_backup_per_profile: 20,
            maximum_restored_delete_log: false,
            maximum_restored_files: 10,
            directory: PathBuf::from("./user/profiles/AutoProfileBackups"),
            auto_backup_events: Vec::new(),
        }
    }
}

impl AutoBackupConfig {
    /// Load and validate a config file
    ///
    /// A missing file yields the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(AutoBackupError::io(path, e)),
        };

        Self::from_jsonc(&content)
            .map_err(|e| AutoBackupError::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse and validate config text, comments allowed
    pub fn from_jsonc(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(&strip_json_comments(content))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject events that cannot be routed or named
    pub fn validate(&self) -> Result<()> {
        for event in &self.auto_backup_events {
            if event.name.trim().is_empty() {
                return Err(AutoBackupError::validation(format!(
                    "AutoBackupEvent on route {:?} has an empty Name",
                    event.route
                )));
            }
            if event.route.trim().is_empty() {
                return Err(AutoBackupError::validation(format!(
                    "AutoBackupEvent {:?} has an empty Route",
                    event.name
                )));
            }
            if event.name.contains(['/', '\\']) {
                return Err(AutoBackupError::validation(format!(
                    "AutoBackupEvent Name {:?} must not contain path separators",
                    event.name
                )));
            }
            if event.name.ends_with(&format!(".{SNAPSHOT_EXTENSION}")) {
                return Err(AutoBackupError::validation(format!(
                    "AutoBackupEvent Name {:?} must not end with .{SNAPSHOT_EXTENSION}",
                    event.name
                )));
            }
        }
        Ok(())
    }

    pub fn backup_retention(&self) -> RetentionLimit {
        RetentionLimit::from_config(self.maximum_backup_per_profile)
    }

    pub fn restored_retention(&self) -> RetentionLimit {
        RetentionLimit::from_config(self.maximum_restored_files)
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Scan {
    Code,
    InString,
    Escaped,
    LineComment,
    BlockComment,
    BlockCommentStar,
}

/// Remove `//` and `/* */` comments that sit outside string literals
///
/// Newlines ending line comments are kept so parse errors still point at the right line.
pub fn strip_json_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut state = Scan::Code;

    while let Some(c) = chars.next() {
        state = match (state, c) {
            (Scan::Code, '"') => {
                out.push(c);
                Scan::InString
            }
            (Scan::Code, '/') if chars.peek() == Some(&'/') => {
                chars.next();
                Scan::LineComment
            }
            (Scan::Code, '/') if chars.peek() == Some(&'*') => {
                chars.next();
                Scan::BlockComment
            }
            (Scan::Code, _) => {
                out.push(c);
                Scan::Code
            }
            (Scan::InString, '\\') => {
                out.push(c);
                Scan::Escaped
            }
            (Scan::InString, '"') => {
                out.push(c);
                Scan::Code
            }
            (Scan::InString, _) | (Scan::Escaped, _) => {
                out.push(c);
                Scan::InString
            }
            (Scan::LineComment, '\n') => {
                out.push(c);
                Scan::Code
            }
            (Scan::LineComment, _) => Scan::LineComment,
            (Scan::BlockComment, '*') | (Scan::BlockCommentStar, '*') => Scan::BlockCommentStar,
            (Scan::BlockCommentStar, '/') => Scan::Code,
            (Scan::BlockComment, _) | (Scan::BlockCommentStar, _) => Scan::BlockComment,
        };
    }

    out
}
