/*!
AutoBackup CLI - operator front end for the profile backup engine.

Plays the host locally: runs the startup restore, fires backup events, and lists or prunes
the backup folders described by a `config.jsonc`.
*/

use anyhow::{bail, Context};
use autobackup_core::layout::DirectoryLayout;
use autobackup_core::{
    init_observability, retention, AutoBackupConfig, AutoBackupService, BackupOutcome,
    BackupWriter, FileSystem, JsonCodec, JsonDirSessionStore, LocalFileSystem, RestoreSummary,
    ServicePorts, ServiceState, SessionId, SystemClock,
};
use chrono::{DateTime, Local};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabled::{Table, Tabled};
use tracing::{error, info, warn};

#[derive(Parser)]
#[command(name = "autobackup")]
#[command(about = "Event-driven profile backups with retention and staged restore")]
#[command(version)]
struct Cli {
    /// Config file (JSON with comments)
    #[arg(short, long, global = true, env = "AUTOBACKUP_CONFIG", default_value = "config.jsonc")]
    config: PathBuf,

    /// Directory holding the live `<sessionId>.json` profiles
    #[arg(short, long, global = true, env = "AUTOBACKUP_PROFILES", default_value = "./user/profiles")]
    profiles: PathBuf,

    /// Write backups and profiles without indentation
    #[arg(long, global = true)]
    compress: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the backup folders and import every staged profile
    Restore,
    /// Back up one profile now
    Backup {
        /// Session id of the profile
        session_id: String,
        /// Event label used in the file name
        #[arg(short, long, default_value = "Manual")]
        event: String,
    },
    /// Start up, then fire the event bound to a route
    Trigger {
        /// Host route, e.g. /client/game/start
        route: String,
        /// Session id passed along with the route
        session_id: String,
    },
    /// List backup files
    List {
        /// Only show backups of this session
        session_id: Option<String>,
    },
    /// Apply the retention caps to every backup folder and the restore archive
    Prune,
    /// Show the configured backup events
    Routes,
}

#[derive(Tabled)]
struct BackupRow {
    #[tabled(rename = "Profile")]
    folder: String,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Modified")]
    modified: String,
    #[tabled(rename = "Size")]
    size: String,
}

#[derive(Tabled)]
struct RouteRow {
    #[tabled(rename = "Event")]
    name: String,
    #[tabled(rename = "Route")]
    route: String,
}

struct App {
    config: Arc<AutoBackupConfig>,
    fs: Arc<LocalFileSystem>,
    layout: DirectoryLayout,
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    init_observability(cli.json_logs, cli.verbose)?;

    let config = AutoBackupConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let app = App {
        layout: DirectoryLayout::new(&config.directory),
        config: Arc::new(config),
        fs: Arc::new(LocalFileSystem::new()),
    };

    match cli.command {
        Commands::Restore => run_restore(&cli, &app).await?,
        Commands::Backup {
            ref session_id,
            ref event,
        } => run_backup(&cli, &app, session_id, event).await?,
        Commands::Trigger {
            ref route,
            ref session_id,
        } => run_trigger(&cli, &app, route, session_id).await?,
        Commands::List { ref session_id } => list_backups(&app, session_id.as_deref())?,
        Commands::Prune => prune(&cli, &app).await?,
        Commands::Routes => list_routes(&app),
    }

    Ok(())
}

async fn open_store(cli: &Cli, app: &App) -> Result<Arc<JsonDirSessionStore>, anyhow::Error> {
    let store = JsonDirSessionStore::open(
        &cli.profiles,
        app.fs.clone(),
        Arc::new(JsonCodec::new(cli.compress)),
    )
    .await
    .with_context(|| format!("opening profiles in {}", cli.profiles.display()))?;
    Ok(Arc::new(store))
}

async fn start_service(cli: &Cli, app: &App) -> Result<AutoBackupService, anyhow::Error> {
    let ports = ServicePorts {
        store: open_store(cli, app).await?,
        fs: app.fs.clone(),
        clock: Arc::new(SystemClock),
        codec: Arc::new(JsonCodec::new(cli.compress)),
    };

    let service = AutoBackupService::start(app.config.clone(), ports).await;
    match service.state() {
        ServiceState::Running => Ok(service),
        ServiceState::Disabled => bail!("AutoBackup is disabled in {}", cli.config.display()),
        ServiceState::LayoutFailed(reason) => bail!("could not prepare backup folders: {reason}"),
    }
}

/// Commands that write or delete backups honour `Enabled` like the service does
fn ensure_enabled(config: &AutoBackupConfig, path: &Path) -> Result<(), anyhow::Error> {
    if !config.enabled {
        bail!("AutoBackup is disabled in {}", path.display());
    }
    Ok(())
}

async fn run_restore(cli: &Cli, app: &App) -> Result<(), anyhow::Error> {
    let service = start_service(cli, app).await?;
    print_summary(service.restore_summary());
    Ok(())
}

fn print_summary(summary: &RestoreSummary) {
    if summary.total() == 0 {
        println!("Nothing to restore");
        return;
    }
    println!("Restore summary:");
    println!("  Restored: {}", summary.restored);
    println!("  Invalid (left in staging): {}", summary.invalid);
    println!("  Persist failures: {}", summary.persist_failed);
    println!("  Archive failures: {}", summary.archive_failed);
    println!("  Archive files pruned: {}", summary.archive_deleted);
}

async fn run_backup(
    cli: &Cli,
    app: &App,
    session_id: &str,
    event: &str,
) -> Result<(), anyhow::Error> {
    ensure_enabled(&app.config, &cli.config)?;
    let session_id = SessionId::parse(session_id)?;
    let writer = BackupWriter::new(
        app.config.clone(),
        open_store(cli, app).await?,
        app.fs.clone(),
        Arc::new(SystemClock),
        Arc::new(JsonCodec::new(cli.compress)),
    );

    report_backup(writer.backup(event, &session_id).await)
}

async fn run_trigger(
    cli: &Cli,
    app: &App,
    route: &str,
    session_id: &str,
) -> Result<(), anyhow::Error> {
    let service = start_service(cli, app).await?;

    let Some(task) = service.router().dispatch(route, session_id) else {
        bail!("no backup event fires for route {route} and session {session_id}");
    };
    report_backup(task.await?)
}

fn report_backup(outcome: BackupOutcome) -> Result<(), anyhow::Error> {
    match outcome {
        BackupOutcome::Saved { path, deleted } => {
            println!("✓ Backup written to {}", path.display());
            if deleted > 0 {
                println!("  Pruned {deleted} old backups");
            }
            Ok(())
        }
        BackupOutcome::Excluded => {
            println!("Headless profile, no backup made");
            Ok(())
        }
        BackupOutcome::ProfileNotFound => bail!("profile not found"),
        BackupOutcome::UnsafeUsername(username) => {
            bail!("username {username:?} cannot be used as a backup folder name")
        }
        BackupOutcome::SerializationFailed(reason) => bail!("could not serialize profile: {reason}"),
        BackupOutcome::WriteFailed(reason) => bail!("could not write backup: {reason}"),
    }
}

/// Session folders under the backups directory, sorted by name
fn session_folders(backups: &Path) -> Result<Vec<PathBuf>, anyhow::Error> {
    if !backups.exists() {
        return Ok(Vec::new());
    }
    let mut folders = Vec::new();
    for entry in std::fs::read_dir(backups)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            folders.push(entry.path());
        }
    }
    folders.sort();
    Ok(folders)
}

fn folder_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn list_backups(app: &App, session_id: Option<&str>) -> Result<(), anyhow::Error> {
    let backups = app.layout.backups();
    info!("Listing backups in {}", backups.display());

    let prefix = session_id.map(|id| format!("{id}-"));
    let mut rows = Vec::new();

    for folder in session_folders(backups)? {
        let name = folder_name(&folder);
        if prefix.as_ref().is_some_and(|p| !name.starts_with(p.as_str())) {
            continue;
        }

        let mut files: Vec<(String, std::fs::Metadata)> = Vec::new();
        for entry in std::fs::read_dir(&folder)? {
            let entry = entry?;
            let metadata = entry.metadata()?;
            if metadata.is_file() {
                files.push((entry.file_name().to_string_lossy().into_owned(), metadata));
            }
        }
        files.sort_by(|a, b| a.0.cmp(&b.0));

        for (file, metadata) in files {
            let modified = match metadata.modified() {
                Ok(time) => DateTime::<Local>::from(time)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string(),
                Err(_) => "Unknown".to_string(),
            };
            rows.push(BackupRow {
                folder: name.clone(),
                file,
                modified,
                size: format_size(metadata.len()),
            });
        }
    }

    if rows.is_empty() {
        println!("No backups found");
    } else {
        println!("{}", Table::new(rows));
    }
    Ok(())
}

async fn prune(cli: &Cli, app: &App) -> Result<(), anyhow::Error> {
    ensure_enabled(&app.config, &cli.config)?;

    let mut backups_deleted = 0;
    if let Some(keep) = app
        .config
        .backup_retention()
        .checked("MaximumBackupPerProfile", "every profile backup folder")
    {
        match session_folders(app.layout.backups()) {
            Ok(folders) => {
                for folder in folders {
                    backups_deleted +=
                        retention::prune_directory(&*app.fs, &folder, keep).await;
                }
            }
            Err(e) => error!("Could not read {}: {}", app.layout.backups().display(), e),
        }
    }

    let mut archive_deleted = 0;
    if let Some(keep) = app
        .config
        .restored_retention()
        .checked("MaximumRestoredFiles", "the restore archive")
    {
        if app.fs.list_files(app.layout.archive()).await.is_ok() {
            archive_deleted =
                retention::prune_directory(&*app.fs, app.layout.archive(), keep).await;
        } else {
            warn!("No restore archive at {}", app.layout.archive().display());
        }
    }

    println!("Pruned {backups_deleted} backup files and {archive_deleted} archived restore files");
    Ok(())
}

fn list_routes(app: &App) {
    let rows: Vec<RouteRow> = app
        .config
        .auto_backup_events
        .iter()
        .map(|event| RouteRow {
            name: event.name.clone(),
            route: event.route.clone(),
        })
        .collect();

    if rows.is_empty() {
        println!("No AutoBackupEvents configured");
    } else {
        println!("{}", Table::new(rows));
    }
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
