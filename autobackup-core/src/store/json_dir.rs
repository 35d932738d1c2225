//! Session store backed by a directory of `<sessionId>.json` files.
//!
//! ```text
//! profiles/
//! ├── 65f1c0ffee0123456789abcd.json
//! └── 65f1c0ffee0123456789abce.json
//! ```
//!
//! All profiles are loaded into memory on open. Mutations only touch memory until
//! [`SessionStore::persist`] is called.

use super::SessionStore;
use crate::codec::SnapshotCodec;
use crate::naming::{has_snapshot_extension, SNAPSHOT_EXTENSION};
use crate::storage::FileSystem;
use crate::{AutoBackupError, Result, SessionId, SessionSnapshot};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

pub struct JsonDirSessionStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    codec: Arc<dyn SnapshotCodec>,
    profiles: RwLock<HashMap<SessionId, SessionSnapshot>>,
}

impl JsonDirSessionStore {
    /// Store with no loaded profiles; nothing is read from `dir`
    pub fn empty<P: AsRef<Path>>(
        dir: P,
        fs: Arc<dyn FileSystem>,
        codec: Arc<dyn SnapshotCodec>,
    ) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            fs,
            codec,
            profiles: RwLock::new(HashMap::new()),
        }
    }

    /// Create `dir` if needed and load every profile file in it
    ///
    /// Files that fail to parse or carry no valid session id are skipped with a warning.
    pub async fn open<P: AsRef<Path>>(
        dir: P,
        fs: Arc<dyn FileSystem>,
        codec: Arc<dyn SnapshotCodec>,
    ) -> Result<Self> {
        let store = Self::empty(dir, fs, codec);
        store.fs.create_dir_all(&store.dir).await?;

        let mut loaded = HashMap::new();
        for name in store.fs.list_files(&store.dir).await? {
            if !has_snapshot_extension(&name) {
                continue;
            }
            let path = store.dir.join(&name);
            let snapshot = match store.load_file(&path).await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Skipping unreadable profile {}: {}", path.display(), e);
                    continue;
                }
            };
            match snapshot.session_id() {
                Ok(id) => {
                    loaded.insert(id, snapshot);
                }
                Err(e) => warn!("Skipping profile {}: {}", path.display(), e),
            }
        }

        info!(
            "Loaded {} profiles from {} ({})",
            loaded.len(),
            store.dir.display(),
            store.codec.format_name()
        );
        *store.write_profiles() = loaded;
        Ok(store)
    }

    async fn load_file(&self, path: &Path) -> Result<SessionSnapshot> {
        let data = self.fs.read(path).await?;
        self.codec.decode(&data)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the persisted file for a session
    pub fn profile_path(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.{SNAPSHOT_EXTENSION}"))
    }

    pub fn len(&self) -> usize {
        self.read_profiles().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted ids of the loaded profiles
    pub fn ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<SessionId> = self.read_profiles().keys().cloned().collect();
        ids.sort();
        ids
    }

    fn read_profiles(&self) -> RwLockReadGuard<'_, HashMap<SessionId, SessionSnapshot>> {
        self.profiles
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_profiles(&self) -> RwLockWriteGuard<'_, HashMap<SessionId, SessionSnapshot>> {
        self.profiles
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl SessionStore for JsonDirSessionStore {
    async fn get(&self, id: &SessionId) -> Option<SessionSnapshot> {
        self.read_profiles().get(id).cloned()
    }

    async fn exists(&self, id: &SessionId) -> bool {
        self.read_profiles().contains_key(id)
    }

    async fn remove(&self, id: &SessionId) {
        self.write_profiles().remove(id);
    }

    async fn delete_persisted(&self, id: &SessionId) -> Result<()> {
        match self.fs.remove_file(&self.profile_path(id)).await {
            Err(e) if e.is_not_found() => Ok(()),
            other => other,
        }
    }

    async fn insert(&self, snapshot: SessionSnapshot) -> Result<SessionId> {
        let id = snapshot.session_id()?;
        self.write_profiles().insert(id.clone(), snapshot);
        Ok(id)
    }

    async fn persist(&self, id: &SessionId) -> Result<()> {
        let snapshot = self
            .get(id)
            .await
            .ok_or_else(|| AutoBackupError::storage(format!("profile {id} is not loaded")))?;

        let text = self.codec.encode(&snapshot)?;
        let path = self.profile_path(id);
        self.fs.write(&path, text.as_bytes()).await?;
        debug!("Saved profile {} to {}", id, path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;
    use crate::storage::memory::MemoryFileSystem;
    use serde_json::json;

    const ID: &str = "65f1c0ffee0123456789abcd";

    fn id() -> SessionId {
        SessionId::parse(ID).unwrap()
    }

    fn store_on(fs: Arc<MemoryFileSystem>) -> JsonDirSessionStore {
        JsonDirSessionStore::empty("profiles", fs, Arc::new(JsonCodec::pretty()))
    }

    #[tokio::test]
    async fn test_open_loads_valid_profiles_only() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert(
            format!("profiles/{ID}.json"),
            json!({"info": {"id": ID, "username": "operator"}}).to_string(),
        );
        fs.insert("profiles/broken.json", "{ not json");
        fs.insert("profiles/anonymous.json", json!({"characters": {}}).to_string());
        fs.insert("profiles/readme.txt", "ignored");

        let store = JsonDirSessionStore::open("profiles", fs, Arc::new(JsonCodec::pretty()))
            .await
            .unwrap();

        assert_eq!(store.ids(), vec![id()]);
        assert_eq!(store.get(&id()).await.unwrap().username(), Some("operator"));
    }

    #[tokio::test]
    async fn test_insert_and_persist() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.insert("profiles/.keep", "");
        let store = store_on(fs.clone());

        let snapshot = SessionSnapshot::new(&id(), "operator").with_field("level", json!(3));
        let inserted = store.insert(snapshot.clone()).await.unwrap();
        assert_eq!(inserted, id());
        assert!(store.exists(&id()).await);
        // Nothing on disk until persisted
        assert!(fs.contents(store.profile_path(&id())).is_none());

        store.persist(&id()).await.unwrap();
        let written = fs.contents(store.profile_path(&id())).unwrap();
        let decoded: SessionSnapshot = serde_json::from_slice(&written).unwrap();
        assert_eq!(decoded, snapshot);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_snapshot() {
        let store = store_on(Arc::new(MemoryFileSystem::new()));
        let result = store.insert(SessionSnapshot::default()).await;
        assert!(matches!(result, Err(AutoBackupError::InvalidSnapshot(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_persist_unknown_profile_fails() {
        let store = store_on(Arc::new(MemoryFileSystem::new()));
        assert!(matches!(
            store.persist(&id()).await,
            Err(AutoBackupError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_and_delete_persisted() {
        let fs = Arc::new(MemoryFileSystem::new());
        let store = store_on(fs.clone());
        fs.insert(store.profile_path(&id()), "{}");
        store.insert(SessionSnapshot::new(&id(), "operator")).await.unwrap();

        store.remove(&id()).await;
        assert!(!store.exists(&id()).await);

        store.delete_persisted(&id()).await.unwrap();
        assert!(fs.contents(store.profile_path(&id())).is_none());

        // Already gone
        store.delete_persisted(&id()).await.unwrap();
    }
}
