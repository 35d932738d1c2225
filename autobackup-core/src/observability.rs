/*!
Logging setup and optional Prometheus counters.

Logging goes through `tracing`. [`init_observability`] installs a subscriber with an
`EnvFilter` (`RUST_LOG` wins over the default `autobackup=info`) and either plain or JSON
output.

With the `metrics` feature the backup writer and restore importer also bump counters in a
process-wide registry, readable as Prometheus text through [`gather_metrics`].
*/

#[cfg(feature = "metrics")]
use crate::backup::BackupOutcome;
#[cfg(feature = "metrics")]
use crate::restore::RestoreOutcome;
#[cfg(feature = "metrics")]
use prometheus::{IntCounter, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{EnvFilter, Registry as TracingRegistry};

use crate::{AutoBackupError, Result};

#[cfg(feature = "metrics")]
static METRICS: OnceLock<Option<BackupMetrics>> = OnceLock::new();

#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct BackupMetrics {
    pub backups_saved_total: IntCounter,
    pub backups_skipped_total: IntCounter,
    pub backup_failures_total: IntCounter,
    pub backup_files_pruned_total: IntCounter,
    pub profiles_restored_total: IntCounter,
    pub restore_failures_total: IntCounter,
    pub archive_files_pruned_total: IntCounter,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter> {
    let counter = IntCounter::new(name, help)
        .map_err(|e| AutoBackupError::storage(format!("Failed to create {name} metric: {e}")))?;
    registry
        .register(Box::new(counter.clone()))
        .map_err(|e| AutoBackupError::storage(format!("Failed to register {name}: {e}")))?;
    Ok(counter)
}

#[cfg(feature = "metrics")]
impl BackupMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        Ok(Self {
            backups_saved_total: counter(
                &registry,
                "autobackup_backups_saved_total",
                "Backup files written",
            )?,
            backups_skipped_total: counter(
                &registry,
                "autobackup_backups_skipped_total",
                "Backups skipped for missing or headless profiles",
            )?,
            backup_failures_total: counter(
                &registry,
                "autobackup_backup_failures_total",
                "Backups that failed to serialize or write",
            )?,
            backup_files_pruned_total: counter(
                &registry,
                "autobackup_backup_files_pruned_total",
                "Old backup files deleted by retention",
            )?,
            profiles_restored_total: counter(
                &registry,
                "autobackup_profiles_restored_total",
                "Staged profiles imported into the store",
            )?,
            restore_failures_total: counter(
                &registry,
                "autobackup_restore_failures_total",
                "Staged files that could not be imported or archived",
            )?,
            archive_files_pruned_total: counter(
                &registry,
                "autobackup_archive_files_pruned_total",
                "Archived restore files deleted by retention",
            )?,
            registry,
        })
    }

    /// Process-wide instance; `None` if the registry could not be built
    pub fn global() -> Option<&'static BackupMetrics> {
        METRICS
            .get_or_init(|| match Self::new() {
                Ok(metrics) => Some(metrics),
                Err(e) => {
                    tracing::error!("Metrics are unavailable: {}", e);
                    None
                }
            })
            .as_ref()
    }

    pub fn record_backup(&self, outcome: &BackupOutcome) {
        match outcome {
            BackupOutcome::Saved { deleted, .. } => {
                self.backups_saved_total.inc();
                self.backup_files_pruned_total.inc_by(*deleted as u64);
            }
            BackupOutcome::ProfileNotFound
            | BackupOutcome::Excluded
            | BackupOutcome::UnsafeUsername(_) => self.backups_skipped_total.inc(),
            BackupOutcome::SerializationFailed(_) | BackupOutcome::WriteFailed(_) => {
                self.backup_failures_total.inc()
            }
        }
    }

    pub fn record_restore(&self, outcome: &RestoreOutcome) {
        match outcome {
            RestoreOutcome::Restored {
                archive_deleted, ..
            } => {
                self.profiles_restored_total.inc();
                self.archive_files_pruned_total
                    .inc_by(*archive_deleted as u64);
            }
            _ => self.restore_failures_total.inc(),
        }
    }

    pub fn gather(&self) -> Result<String> {
        TextEncoder::new()
            .encode_to_string(&self.registry.gather())
            .map_err(|e| AutoBackupError::storage(format!("Failed to encode metrics: {e}")))
    }
}

#[cfg(feature = "metrics")]
pub(crate) fn record_backup(outcome: &BackupOutcome) {
    if let Some(metrics) = BackupMetrics::global() {
        metrics.record_backup(outcome);
    }
}

#[cfg(feature = "metrics")]
pub(crate) fn record_restore(outcome: &RestoreOutcome) {
    if let Some(metrics) = BackupMetrics::global() {
        metrics.record_restore(outcome);
    }
}

/// All counters in the Prometheus text format
#[cfg(feature = "metrics")]
pub fn gather_metrics() -> Result<String> {
    BackupMetrics::global()
        .ok_or_else(|| AutoBackupError::storage("metrics registry is unavailable"))?
        .gather()
}

/// Install the global tracing subscriber
///
/// `verbose` lowers the default level to debug. `RUST_LOG`, when set, takes precedence.
/// Fails if a global subscriber is already installed.
pub fn init_observability(json: bool, verbose: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    BackupMetrics::global();

    let default_directive = if verbose {
        "autobackup=debug"
    } else {
        "autobackup=info"
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directive))
        .map_err(|e| AutoBackupError::config(format!("Invalid log filter: {e}")))?;

    let registry = TracingRegistry::default().with(filter);
    let result = if json {
        set_global_default(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(false),
            ),
        )
    } else {
        set_global_default(registry.with(tracing_subscriber::fmt::layer().with_target(false)))
    };
    result.map_err(|e| {
        AutoBackupError::config(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::debug!("Logging initialized");
    Ok(())
}
