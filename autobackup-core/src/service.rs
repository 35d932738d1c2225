/*!
Startup wiring: directory layout, restore of staged files, then the event router.

[`AutoBackupService::start`] never fails. A disabled config or a layout that cannot be
created leaves the service in a passive state with an empty router, so the host keeps running
without backups.
*/

use crate::backup::BackupWriter;
use crate::clock::Clock;
use crate::codec::SnapshotCodec;
use crate::config::AutoBackupConfig;
use crate::layout::DirectoryLayout;
use crate::restore::{RestoreImporter, RestoreSummary};
use crate::router::EventRouter;
use crate::storage::FileSystem;
use crate::store::SessionStore;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Collaborators the service runs against
#[derive(Clone)]
pub struct ServicePorts {
    pub store: Arc<dyn SessionStore>,
    pub fs: Arc<dyn FileSystem>,
    pub clock: Arc<dyn Clock>,
    pub codec: Arc<dyn SnapshotCodec>,
}

/// How startup ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    /// `Enabled` is false in the config
    Disabled,
    /// The directory layout could not be created
    LayoutFailed(String),
    /// Restore ran and the router is live
    Running,
}

pub struct AutoBackupService {
    state: ServiceState,
    layout: DirectoryLayout,
    restore: RestoreSummary,
    router: EventRouter,
    writer: Option<Arc<BackupWriter>>,
}

impl AutoBackupService {
    pub async fn start(config: Arc<AutoBackupConfig>, ports: ServicePorts) -> Self {
        let layout = DirectoryLayout::new(&config.directory);

        if !config.enabled {
            warn!("AutoBackup is disabled in the config. No backups will be made and staged profiles will not be restored.");
            return Self::passive(ServiceState::Disabled, layout);
        }

        if let Err(e) = layout.ensure(ports.fs.as_ref()).await {
            error!("Could not create backup directories under {}: {}", layout.root().display(), e);
            warn!("AutoBackup is disabled for this run.");
            return Self::passive(ServiceState::LayoutFailed(e.to_string()), layout);
        }
        info!("Backup directories ready under {}", layout.root().display());

        let importer = RestoreImporter::new(
            config.clone(),
            ports.store.clone(),
            ports.fs.clone(),
            ports.codec.clone(),
        );
        let restore = importer.restore_all().await;

        let writer = Arc::new(BackupWriter::new(
            config.clone(),
            ports.store,
            ports.fs,
            ports.clock,
            ports.codec,
        ));
        let router = EventRouter::new(&config.auto_backup_events, writer.clone());

        Self {
            state: ServiceState::Running,
            layout,
            restore,
            router,
            writer: Some(writer),
        }
    }

    fn passive(state: ServiceState, layout: DirectoryLayout) -> Self {
        Self {
            state,
            layout,
            restore: RestoreSummary::default(),
            router: EventRouter::empty(),
            writer: None,
        }
    }

    pub fn state(&self) -> &ServiceState {
        &self.state
    }

    pub fn is_enabled(&self) -> bool {
        self.state == ServiceState::Running
    }

    pub fn layout(&self) -> &DirectoryLayout {
        &self.layout
    }

    /// Counts from the startup restore pass
    pub fn restore_summary(&self) -> &RestoreSummary {
        &self.restore
    }

    pub fn router(&self) -> &EventRouter {
        &self.router
    }

    /// Backup writer, when the service is running
    pub fn writer(&self) -> Option<&Arc<BackupWriter>> {
        self.writer.as_ref()
    }
}
