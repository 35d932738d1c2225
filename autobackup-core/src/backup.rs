/*!
Backup writer: copies a live profile to a timestamped file and prunes old backups.

Every step short-circuits into a [`BackupOutcome`]. Nothing here returns an error to the
caller; failures are reported through `tracing` and the outcome value.
*/

use crate::clock::Clock;
use crate::codec::SnapshotCodec;
use crate::config::AutoBackupConfig;
use crate::layout::DirectoryLayout;
use crate::naming::{is_plain_component, snapshot_file_name};
use crate::profile::is_headless_username;
use crate::retention;
use crate::storage::FileSystem;
use crate::store::SessionStore;
use crate::SessionId;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Result of one backup attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    /// Backup written; `deleted` old backups were pruned afterwards
    Saved { path: PathBuf, deleted: usize },
    /// No live profile, or the profile has no username
    ProfileNotFound,
    /// Headless client profile, skipped on purpose
    Excluded,
    /// The username is not usable as a folder name; nothing was touched
    UnsafeUsername(String),
    /// The codec failed or produced empty output; nothing was written
    SerializationFailed(String),
    /// The folder or the file could not be written
    WriteFailed(String),
}

impl BackupOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, Self::Saved { .. })
    }
}

pub struct BackupWriter {
    config: Arc<AutoBackupConfig>,
    layout: DirectoryLayout,
    store: Arc<dyn SessionStore>,
    fs: Arc<dyn FileSystem>,
    clock: Arc<dyn Clock>,
    codec: Arc<dyn SnapshotCodec>,
}

impl BackupWriter {
    pub fn new(
        config: Arc<AutoBackupConfig>,
        store: Arc<dyn SessionStore>,
        fs: Arc<dyn FileSystem>,
        clock: Arc<dyn Clock>,
        codec: Arc<dyn SnapshotCodec>,
    ) -> Self {
        let layout = DirectoryLayout::new(&config.directory);
        Self {
            config,
            layout,
            store,
            fs,
            clock,
            codec,
        }
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    /// Back up the live profile of `session_id`, labelling the file with `event_label`
    pub async fn backup(&self, event_label: &str, session_id: &SessionId) -> BackupOutcome {
        debug!("Backing up profile for session: {}", session_id);

        let outcome = self.run(event_label, session_id).await;

        #[cfg(feature = "metrics")]
        crate::observability::record_backup(&outcome);

        outcome
    }

    async fn run(&self, event_label: &str, session_id: &SessionId) -> BackupOutcome {
        let Some(profile) = self.store.get(session_id).await else {
            warn!(
                "Could not find profile for session: {}. Backup aborted.",
                session_id
            );
            return BackupOutcome::ProfileNotFound;
        };
        let Some(username) = profile.username().map(str::to_owned) else {
            warn!(
                "Could not find profile for session: {}. Backup aborted.",
                session_id
            );
            return BackupOutcome::ProfileNotFound;
        };

        if !is_plain_component(&username) {
            warn!(
                "Username {:?} of session {} cannot be used as a folder name. Backup aborted.",
                username, session_id
            );
            return BackupOutcome::UnsafeUsername(username);
        }

        if is_headless_username(&username) {
            trace!(
                "Skipping backup for headless client profile: {}({})",
                session_id,
                username
            );
            return BackupOutcome::Excluded;
        }

        let text = match self.codec.encode(&profile) {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => {
                error!(
                    "Could not get and serialize profile for user: {}({}). Backup aborted.",
                    session_id, username
                );
                return BackupOutcome::SerializationFailed("empty output".to_string());
            }
            Err(e) => {
                error!(
                    "Could not get and serialize profile for user: {}({}): {}. Backup aborted.",
                    session_id, username, e
                );
                return BackupOutcome::SerializationFailed(e.to_string());
            }
        };

        let folder = self.layout.session_backups(session_id, &username);
        let path = folder.join(snapshot_file_name(event_label, &self.clock.now()));

        if let Err(e) = self.fs.create_dir_all(&folder).await {
            error!("Could not create backup folder for user: {}: {}", username, e);
            return BackupOutcome::WriteFailed(e.to_string());
        }
        if let Err(e) = self.fs.write(&path, text.as_bytes()).await {
            error!("Could not write backup for user: {}: {}", username, e);
            return BackupOutcome::WriteFailed(e.to_string());
        }

        if self.config.backup_saved_log {
            info!(
                "Backed up profile for user: {} to {}",
                username,
                path.display()
            );
        }

        let deleted = match self.config.backup_retention().checked(
            "MaximumBackupPerProfile",
            &format!("the backups of {username}"),
        ) {
            Some(keep) => {
                let deleted = retention::prune_directory(self.fs.as_ref(), &folder, keep).await;
                if deleted > 0 && self.config.maximum_backup_delete_log {
                    info!(
                        "Maximum backups for user: {} reached. Deleted {} old backup files",
                        username, deleted
                    );
                } else if deleted == 0 {
                    debug!(
                        "No cleanup needed for user: {}. Current backups are within the limit.",
                        username
                    );
                }
                deleted
            }
            None => 0,
        };

        BackupOutcome::Saved { path, deleted }
    }
}
