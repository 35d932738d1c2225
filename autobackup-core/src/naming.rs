/*!
Snapshot file naming.

Backup names start with a fixed-width, zero-padded local timestamp, so plain string order is
creation order and "newest"/"oldest" never needs file metadata.
*/

use chrono::{DateTime, TimeZone};
use std::fmt::Display;
use std::path::{Component, Path};

/// Timestamp prefix format: `YYYY-MM-DD_HH-mm-ss`
pub const BACKUP_DATE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Extension of every snapshot, backup and archive file (without the dot)
pub const SNAPSHOT_EXTENSION: &str = "json";

/// Backup file name for an event at `when`
///
/// The label is used verbatim. Two calls in the same wall-clock second with the same label
/// produce the same name, and the later write replaces the earlier file.
///
/// # Example
/// ```rust
/// use autobackup_core::naming::snapshot_file_name;
/// use chrono::{TimeZone, Utc};
///
/// let when = Utc.with_ymd_and_hms(2025, 3, 7, 9, 5, 2).unwrap();
/// assert_eq!(snapshot_file_name("GameStart", &when), "2025-03-07_09-05-02_GameStart.json");
/// ```
pub fn snapshot_file_name<Tz>(event_label: &str, when: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    format!(
        "{}_{}.{}",
        when.format(BACKUP_DATE_FORMAT),
        event_label,
        SNAPSHOT_EXTENSION
    )
}

/// Per-session backup folder name: `<sessionId>-<username>`
pub fn session_folder_name(session_id: &str, username: &str) -> String {
    format!("{session_id}-{username}")
}

/// True when `name` is a single ordinary path component
///
/// Usernames and event labels end up inside file and folder names. Separators of either
/// platform, NUL, `.`, `..` and empty names are rejected so a name can never leave its
/// parent directory.
pub fn is_plain_component(name: &str) -> bool {
    if name.contains(['/', '\\', '\0']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// True when `file_name` has exactly the `json` extension (case-sensitive)
///
/// This single rule decides which files are restore candidates and which files count
/// toward a retention cap. `a.JSON`, `a.json.tmp` and a bare `.json` do not match.
pub fn has_snapshot_extension(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .is_some_and(|ext| ext == SNAPSHOT_EXTENSION)
}
