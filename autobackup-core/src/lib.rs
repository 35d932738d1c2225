/*!
# AutoBackup Core Engine

Event-driven profile backups for a live session store.

On configured lifecycle events the engine copies a session's current profile into a
timestamped file and keeps only the newest `N` per session. At startup it imports profiles
dropped into a staging folder, replacing the live ones, and keeps a capped archive of what it
imported.

## Architecture

The engine talks to the outside world through ports:
- [`SessionStore`] for the live profiles ([`JsonDirSessionStore`] ships with the crate)
- [`FileSystem`] for backup, staging and archive files ([`LocalFileSystem`] on `tokio::fs`)
- [`Clock`] for file timestamps
- [`SnapshotCodec`] for the on-disk text form ([`JsonCodec`])

[`AutoBackupService`] wires them together: directory layout, startup restore, then an
[`EventRouter`] the host calls on every configured route.

## Usage

```rust
use autobackup_core::naming::snapshot_file_name;
use autobackup_core::{JsonCodec, SessionId, SessionSnapshot, SnapshotCodec};
use chrono::{Local, TimeZone};

let id = SessionId::parse("65f1c0ffee0123456789abcd")?;
let profile = SessionSnapshot::new(&id, "operator");

let text = JsonCodec::pretty().encode(&profile)?;
assert_eq!(JsonCodec::pretty().decode(text.as_bytes())?, profile);

let when = Local.with_ymd_and_hms(2025, 1, 15, 9, 5, 0).unwrap();
assert_eq!(snapshot_file_name("GameStart", &when), "2025-01-15_09-05-00_GameStart.json");
# Ok::<(), autobackup_core::AutoBackupError>(())
```
*/

pub mod backup;
pub mod clock;
pub mod codec;
pub mod config;
pub mod error;
pub mod layout;
pub mod naming;
pub mod observability;
pub mod profile;
pub mod restore;
pub mod retention;
pub mod router;
pub mod service;
pub mod storage;
pub mod store;

#[cfg(test)]
mod error_tests;

pub use backup::{BackupOutcome, BackupWriter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use codec::{JsonCodec, SnapshotCodec};
pub use config::{AutoBackupConfig, AutoBackupEvent};
pub use error::{AutoBackupError, Result};
pub use layout::DirectoryLayout;
pub use observability::init_observability;
pub use profile::{SessionId, SessionSnapshot};
pub use restore::{RestoreImporter, RestoreOutcome, RestoreSummary};
pub use retention::RetentionLimit;
pub use router::EventRouter;
pub use service::{AutoBackupService, ServicePorts, ServiceState};
pub use storage::{FileSystem, LocalFileSystem};
pub use store::{JsonDirSessionStore, SessionStore};
