/*!
Restore importer: replaces live profiles with snapshots dropped into the staging folder.

Per file the order is fixed: decode and validate, drop any live profile with the same id,
insert, persist, copy into the archive, delete from staging, prune the archive. A file that
fails before the copy stays in staging untouched so the next start retries it.
*/

use crate::codec::SnapshotCodec;
use crate::config::AutoBackupConfig;
use crate::layout::DirectoryLayout;
use crate::naming::{has_snapshot_extension, is_plain_component};
use crate::retention;
use crate::storage::FileSystem;
use crate::store::SessionStore;
use crate::SessionId;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result of importing one staged file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Profile replaced and persisted; the file now lives in the archive
    Restored {
        session_id: SessionId,
        username: Option<String>,
        archive_deleted: usize,
    },
    /// Unreadable file, bad JSON, or missing identity; left in staging
    Invalid(String),
    /// The store could not persist the profile; left in staging
    PersistFailed(String),
    /// Persisted, but moving the file into the archive failed; left in staging
    ArchiveFailed(String),
}

/// Counts for one pass over the staging folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub restored: usize,
    pub invalid: usize,
    pub persist_failed: usize,
    pub archive_failed: usize,
    pub archive_deleted: usize,
}

impl RestoreSummary {
    fn record(&mut self, outcome: &RestoreOutcome) {
        match outcome {
            RestoreOutcome::Restored {
                archive_deleted, ..
            } => {
                self.restored += 1;
                self.archive_deleted += archive_deleted;
            }
            RestoreOutcome::Invalid(_) => self.invalid += 1,
            RestoreOutcome::PersistFailed(_) => self.persist_failed += 1,
            RestoreOutcome::ArchiveFailed(_) => self.archive_failed += 1,
        }
    }

    /// Files looked at in this pass
    pub fn total(&self) -> usize {
        self.restored + self.invalid + self.persist_failed + self.archive_failed
    }
}

pub struct RestoreImporter {
    config: Arc<AutoBackupConfig>,
    layout: DirectoryLayout,
    store: Arc<dyn SessionStore>,
    fs: Arc<dyn FileSystem>,
    codec: Arc<dyn SnapshotCodec>,
}

impl RestoreImporter {
    pub fn new(
        config: Arc<AutoBackupConfig>,
        store: Arc<dyn SessionStore>,
        fs: Arc<dyn FileSystem>,
        codec: Arc<dyn SnapshotCodec>,
    ) -> Self {
        let layout = DirectoryLayout::new(&config.directory);
        Self {
            config,
            layout,
            store,
            fs,
            codec,
        }
    }

    /// Import every `*.json` file directly under the staging folder, one at a time
    ///
    /// A failing file never stops the batch.
    pub async fn restore_all(&self) -> RestoreSummary {
        let mut summary = RestoreSummary::default();

        let mut files: Vec<String> = match self.fs.list_files(self.layout.staging()).await {
            Ok(names) => names
                .into_iter()
                .filter(|name| has_snapshot_extension(name))
                .collect(),
            Err(e) => {
                error!(
                    "Could not list restore folder {}: {}",
                    self.layout.staging().display(),
                    e
                );
                return summary;
            }
        };
        files.sort();

        for file_name in &files {
            let outcome = self.restore_one(file_name).await;
            summary.record(&outcome);
        }

        if summary.total() > 0 {
            info!(
                "Restore pass finished: {} restored, {} invalid, {} failed",
                summary.restored,
                summary.invalid,
                summary.persist_failed + summary.archive_failed
            );
        }
        summary
    }

    /// Import one staged file, `file_name` being its name inside the staging folder
    pub async fn restore_one(&self, file_name: &str) -> RestoreOutcome {
        let outcome = self.run(file_name).await;

        #[cfg(feature = "metrics")]
        crate::observability::record_restore(&outcome);

        outcome
    }

    async fn run(&self, file_name: &str) -> RestoreOutcome {
        info!("Restoring {}", file_name);
        let staged = self.layout.staging().join(file_name);

        let data = match self.fs.read(&staged).await {
            Ok(data) => data,
            Err(e) => {
                warn!("Could not read restore file {}: {}", file_name, e);
                return RestoreOutcome::Invalid(e.to_string());
            }
        };
        let snapshot = match self.codec.decode(&data) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Profile is invalid for file: {}: {}", file_name, e);
                return RestoreOutcome::Invalid(e.to_string());
            }
        };
        let session_id = match snapshot.session_id() {
            Ok(id) => id,
            Err(e) => {
                warn!(
                    "Profile or Profile ID is null/invalid for file: {}: {}",
                    file_name, e
                );
                return RestoreOutcome::Invalid(e.to_string());
            }
        };
        let username = snapshot.username().map(str::to_owned);
        if let Some(name) = username.as_deref().filter(|name| !is_plain_component(name)) {
            warn!(
                "Profile username {:?} in file: {} cannot be used as a folder name",
                name, file_name
            );
            return RestoreOutcome::Invalid(format!("unsafe username {name:?}"));
        }

        if self.store.exists(&session_id).await {
            debug!(
                "Profile with ID: {} already exists. Deleting existing profile before restore.",
                session_id
            );
            self.store.remove(&session_id).await;
            if let Err(e) = self.store.delete_persisted(&session_id).await {
                warn!(
                    "Could not delete the saved file of profile {}: {}",
                    session_id, e
                );
            }
        }

        if let Err(e) = self.store.insert(snapshot).await {
            error!("Could not add restored profile {}: {}", session_id, e);
            return RestoreOutcome::PersistFailed(e.to_string());
        }
        if let Err(e) = self.store.persist(&session_id).await {
            error!(
                "Could not save restored profile {} from {}: {}. The file stays in the restore folder.",
                session_id, file_name, e
            );
            return RestoreOutcome::PersistFailed(e.to_string());
        }
        info!(
            "Restored {} for user: {} with ID: {}",
            file_name,
            username.as_deref().unwrap_or("<unknown>"),
            session_id
        );

        // Copy first, then delete: a crash in between leaves two copies, never zero
        let archived = self.layout.archive().join(file_name);
        if let Err(e) = self.fs.copy(&staged, &archived).await {
            error!("Could not archive restore file {}: {}", file_name, e);
            return RestoreOutcome::ArchiveFailed(e.to_string());
        }
        if let Err(e) = self.fs.remove_file(&staged).await {
            error!(
                "Archived {} but could not remove it from the restore folder: {}",
                file_name, e
            );
            return RestoreOutcome::ArchiveFailed(e.to_string());
        }
        debug!("Moved restored profile file to the archive folder.");

        let archive_deleted = self.prune_archive().await;

        RestoreOutcome::Restored {
            session_id,
            username,
            archive_deleted,
        }
    }

    async fn prune_archive(&self) -> usize {
        let Some(keep) = self
            .config
            .restored_retention()
            .checked("MaximumRestoredFiles", "the restore archive")
        else {
            return 0;
        };

        let deleted = retention::prune_directory(self.fs.as_ref(), self.layout.archive(), keep).await;
        if deleted > 0 && self.config.maximum_restored_delete_log {
            info!(
                "Maximum restored profiles reached. Deleted {} old restored profile files",
                deleted
            );
        } else if deleted == 0 {
            debug!("No cleanup needed for the archive folder. Current restored profiles are within the limit.");
        }
        deleted
    }
}
