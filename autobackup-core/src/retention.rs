/*!
Retention policy: keep the newest `N` snapshot files in a folder, delete the rest oldest first.

Ordering comes from file names alone (see [`crate::naming`]). Enforcement stops at the first
delete that fails and reports how many files it managed to remove; it never retries.
*/

use crate::naming::has_snapshot_extension;
use crate::storage::FileSystem;
use std::path::Path;
use tracing::{debug, error, warn};

/// Retention cap derived from a signed configuration value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionLimit {
    /// Negative cap: retention is off and the folder grows without bound
    Disabled,
    /// Keep at most this many files
    Keep(usize),
}

impl RetentionLimit {
    pub fn from_config(value: i32) -> Self {
        usize::try_from(value).map_or(Self::Disabled, Self::Keep)
    }

    /// Log the standing misconfiguration warnings for this cap and return the number of files
    /// to keep, or `None` when retention must be skipped.
    ///
    /// `setting` names the config option and `folder` describes what is being capped.
    pub fn checked(self, setting: &str, folder: &str) -> Option<usize> {
        match self {
            Self::Disabled => {
                warn!(
                    "{} is negative, retention for {} is disabled. This may cause the folder to grow indefinitely and is not recommended",
                    setting, folder
                );
                None
            }
            Self::Keep(0) => {
                warn!(
                    "{} is set to 0, every file in {} will be deleted on each run",
                    setting, folder
                );
                Some(0)
            }
            Self::Keep(keep) => Some(keep),
        }
    }
}

/// Names to delete so that at most `keep` remain, oldest first
///
/// Pure planning step; no I/O.
pub fn plan_deletions(files: &[String], keep: usize) -> Vec<String> {
    let mut sorted: Vec<&String> = files.iter().collect();
    sorted.sort_unstable_by(|a, b| b.cmp(a));

    sorted
        .into_iter()
        .skip(keep)
        .rev()
        .cloned()
        .collect()
}

/// Delete the oldest of `files` (names inside `dir`) until at most `keep` remain
///
/// Returns the number of files deleted. The first failed delete ends the pass.
pub async fn enforce(fs: &dyn FileSystem, dir: &Path, files: &[String], keep: usize) -> usize {
    let mut deleted = 0;

    for name in plan_deletions(files, keep) {
        debug!("Deleting file: {}", name);
        match fs.remove_file(&dir.join(&name)).await {
            Ok(()) => {
                deleted += 1;
                debug!("Deleted successfully: {}", name);
            }
            Err(e) => {
                error!("Error deleting file: {}: {}", name, e);
                return deleted;
            }
        }
    }

    deleted
}

/// List the snapshot files in `dir` and enforce the cap on them
pub async fn prune_directory(fs: &dyn FileSystem, dir: &Path, keep: usize) -> usize {
    debug!(
        "Cleaning up folder: {} to keep only {} files.",
        dir.display(),
        keep
    );

    let files: Vec<String> = match fs.list_files(dir).await {
        Ok(names) => names
            .into_iter()
            .filter(|name| has_snapshot_extension(name))
            .collect(),
        Err(e) => {
            error!("Could not list folder {} for cleanup: {}", dir.display(), e);
            return 0;
        }
    };
    debug!("Found {} files in the folder.", files.len());

    enforce(fs, dir, &files, keep).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryFileSystem;
    use std::path::PathBuf;

    fn names(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_limit_from_config() {
        assert_eq!(RetentionLimit::from_config(-1), RetentionLimit::Disabled);
        assert_eq!(RetentionLimit::from_config(i32::MIN), RetentionLimit::Disabled);
        assert_eq!(RetentionLimit::from_config(0), RetentionLimit::Keep(0));
        assert_eq!(RetentionLimit::from_config(20), RetentionLimit::Keep(20));
    }

    #[test]
    fn test_checked() {
        assert_eq!(RetentionLimit::Disabled.checked("MaximumBackupPerProfile", "x"), None);
        assert_eq!(RetentionLimit::Keep(0).checked("MaximumBackupPerProfile", "x"), Some(0));
        assert_eq!(RetentionLimit::Keep(3).checked("MaximumBackupPerProfile", "x"), Some(3));
    }

    #[test]
    fn test_plan_keeps_largest_names() {
        let files = names(&[
            "2024-01-03_00-00-00_C.json",
            "2024-01-01_00-00-00_A.json",
            "2024-01-04_00-00-00_D.json",
            "2024-01-02_00-00-00_B.json",
        ]);

        let plan = plan_deletions(&files, 2);
        assert_eq!(
            plan,
            names(&["2024-01-01_00-00-00_A.json", "2024-01-02_00-00-00_B.json"])
        );
    }

    #[test]
    fn test_plan_counts_for_every_cap() {
        let files: Vec<String> = (0..7)
            .map(|i| format!("2024-01-0{}_00-00-00_E.json", i + 1))
            .collect();

        for keep in 0..=files.len() + 2 {
            let plan = plan_deletions(&files, keep);
            assert_eq!(plan.len(), files.len().saturating_sub(keep));

            let mut survivors: Vec<&String> =
                files.iter().filter(|f| !plan.contains(f)).collect();
            survivors.sort();
            let mut expected: Vec<&String> = files.iter().collect();
            expected.sort();
            let expected = &expected[expected.len() - survivors.len()..];
            assert_eq!(survivors, expected);
        }
    }

    #[test]
    fn test_plan_empty_input() {
        assert!(plan_deletions(&[], 0).is_empty());
    }

    #[tokio::test]
    async fn test_enforce_deletes_oldest_first() {
        let fs = MemoryFileSystem::new();
        let dir = PathBuf::from("backups/s");
        for name in ["b.json", "a.json", "c.json", "d.json"] {
            fs.insert(dir.join(name), "{}");
        }

        let deleted = prune_directory(&fs, &dir, 2).await;

        assert_eq!(deleted, 2);
        assert_eq!(fs.removed(), vec![dir.join("a.json"), dir.join("b.json")]);
        assert_eq!(fs.names_in(&dir), names(&["c.json", "d.json"]));
    }

    #[tokio::test]
    async fn test_enforce_stops_at_first_failure() {
        let fs = MemoryFileSystem::new();
        let dir = PathBuf::from("archive");
        for name in ["1.json", "2.json", "3.json", "4.json", "5.json"] {
            fs.insert(dir.join(name), "{}");
        }
        fs.fail_remove(dir.join("2.json"));

        let deleted = prune_directory(&fs, &dir, 1).await;

        assert_eq!(deleted, 1);
        assert_eq!(fs.removed(), vec![dir.join("1.json")]);
        assert_eq!(
            fs.names_in(&dir),
            names(&["2.json", "3.json", "4.json", "5.json"])
        );
    }

    #[tokio::test]
    async fn test_prune_ignores_other_extensions() {
        let fs = MemoryFileSystem::new();
        let dir = PathBuf::from("archive");
        fs.insert(dir.join("0-notes.txt"), "keep me");
        fs.insert(dir.join("1.json.tmp"), "keep me");
        fs.insert(dir.join("2.json"), "{}");
        fs.insert(dir.join("3.json"), "{}");

        let deleted = prune_directory(&fs, &dir, 0).await;

        assert_eq!(deleted, 2);
        assert_eq!(fs.names_in(&dir), names(&["0-notes.txt", "1.json.tmp"]));
    }

    #[tokio::test]
    async fn test_prune_missing_folder() {
        let fs = MemoryFileSystem::new();
        assert_eq!(prune_directory(&fs, Path::new("nowhere"), 1).await, 0);
        assert!(fs.removed().is_empty());
    }
}
