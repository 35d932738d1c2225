//! Directory layout under the configured backup root.
//!
//! ```text
//! <root>/
//! ├── backups/<sessionId>-<username>/<timestamp>_<event>.json
//! ├── restore-staging/*.json
//! └── restore-archive/<original name>.json
//! ```

use crate::naming::session_folder_name;
use crate::storage::FileSystem;
use crate::{Result, SessionId};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const BACKUPS_DIR: &str = "backups";
pub const STAGING_DIR: &str = "restore-staging";
pub const ARCHIVE_DIR: &str = "restore-archive";

/// Resolved paths of the three managed directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLayout {
    root: PathBuf,
    backups: PathBuf,
    staging: PathBuf,
    archive: PathBuf,
}

impl DirectoryLayout {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            backups: root.join(BACKUPS_DIR),
            staging: root.join(STAGING_DIR),
            archive: root.join(ARCHIVE_DIR),
            root,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn backups(&self) -> &Path {
        &self.backups
    }

    pub fn staging(&self) -> &Path {
        &self.staging
    }

    pub fn archive(&self) -> &Path {
        &self.archive
    }

    /// Backup folder of one session
    pub fn session_backups(&self, session_id: &SessionId, username: &str) -> PathBuf {
        self.backups
            .join(session_folder_name(session_id.as_str(), username))
    }

    /// Create all three directories. Safe to call repeatedly.
    pub async fn ensure(&self, fs: &dyn FileSystem) -> Result<()> {
        for dir in [&self.backups, &self.staging, &self.archive] {
            fs.create_dir_all(dir).await?;
            debug!("Ensured directory {}", dir.display());
        }
        Ok(())
    }
}
