//! In-memory file system for unit tests, with per-path failure injection.

use super::FileSystem;
use crate::{AutoBackupError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[derive(Default)]
struct State {
    dirs: BTreeSet<PathBuf>,
    files: BTreeMap<PathBuf, Vec<u8>>,
    failing_removes: HashSet<PathBuf>,
    failing_writes: HashSet<PathBuf>,
    failing_dirs: HashSet<PathBuf>,
    removed: Vec<PathBuf>,
}

#[derive(Default)]
pub(crate) struct MemoryFileSystem {
    state: Mutex<State>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delete of `path` fail with a permission error
    pub fn fail_remove(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().failing_removes.insert(path.into());
    }

    /// Make every write or copy targeting `path` fail
    pub fn fail_write(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().failing_writes.insert(path.into());
    }

    /// Make creating `dir` fail
    pub fn fail_create_dir(&self, dir: impl Into<PathBuf>) {
        self.state.lock().unwrap().failing_dirs.insert(dir.into());
    }

    /// Seed a file, creating its parent directories
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let path = path.into();
        let mut state = self.state.lock().unwrap();
        if let Some(parent) = path.parent() {
            for ancestor in parent.ancestors() {
                state.dirs.insert(ancestor.to_path_buf());
            }
        }
        state.files.insert(path, contents.into());
    }

    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path.as_ref()).cloned()
    }

    pub fn dir_exists(&self, dir: impl AsRef<Path>) -> bool {
        self.state.lock().unwrap().dirs.contains(dir.as_ref())
    }

    /// Sorted names of the files directly under `dir`
    pub fn names_in(&self, dir: impl AsRef<Path>) -> Vec<String> {
        let state = self.state.lock().unwrap();
        list_in(&state, dir.as_ref())
    }

    /// Every path passed to a successful `remove_file`, in call order
    pub fn removed(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().removed.clone()
    }
}

fn list_in(state: &State, dir: &Path) -> Vec<String> {
    state
        .files
        .keys()
        .filter(|path| path.parent() == Some(dir))
        .filter_map(|path| path.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect()
}

fn not_found(path: &Path) -> AutoBackupError {
    AutoBackupError::io(path, io::Error::from(io::ErrorKind::NotFound))
}

fn denied(path: &Path) -> AutoBackupError {
    AutoBackupError::io(path, io::Error::from(io::ErrorKind::PermissionDenied))
}

fn check_parent(state: &State, path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !state.dirs.contains(parent) => {
            Err(not_found(parent))
        }
        _ => Ok(()),
    }
}

#[async_trait]
impl FileSystem for MemoryFileSystem {
    async fn create_dir_all(&self, dir: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_dirs.contains(dir) {
            return Err(denied(dir));
        }
        for ancestor in dir.ancestors() {
            state.dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_writes.contains(path) {
            return Err(denied(path));
        }
        check_parent(&state, path)?;
        state.files.insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let state = self.state.lock().unwrap();
        state.files.get(path).cloned().ok_or_else(|| not_found(path))
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_writes.contains(to) {
            return Err(denied(to));
        }
        check_parent(&state, to)?;
        let contents = state.files.get(from).cloned().ok_or_else(|| not_found(from))?;
        state.files.insert(to.to_path_buf(), contents);
        Ok(())
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.failing_removes.contains(path) {
            return Err(denied(path));
        }
        state.files.remove(path).ok_or_else(|| not_found(path))?;
        state.removed.push(path.to_path_buf());
        Ok(())
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let state = self.state.lock().unwrap();
        if !state.dirs.contains(dir) {
            return Err(not_found(dir));
        }
        Ok(list_in(&state, dir))
    }
}
