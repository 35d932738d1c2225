/*!
Local filesystem adapter implementation.
*/

use super::FileSystem;
use crate::{AutoBackupError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Local filesystem adapter on top of `tokio::fs`
///
/// # Example
/// ```rust,no_run
/// use autobackup_core::{FileSystem, LocalFileSystem};
/// use std::path::Path;
///
/// # async fn demo() -> autobackup_core::Result<()> {
/// let fs = LocalFileSystem::with_base_dir("/srv/host");
/// // Resolves to /srv/host/user/profiles/AutoProfileBackups/backups
/// fs.create_dir_all(Path::new("user/profiles/AutoProfileBackups/backups")).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    /// Optional base directory that relative paths are resolved against
    base_dir: Option<PathBuf>,
}

impl LocalFileSystem {
    /// Use paths as given
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Resolve relative paths against `base_dir`; absolute paths are unaffected
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => path.to_path_buf(),
        }
    }
}

#[async_trait]
impl FileSystem for LocalFileSystem {
    async fn create_dir_all(&self, dir: &Path) -> Result<()> {
        let full_path = self.resolve_path(dir);
        fs::create_dir_all(&full_path)
            .await
            .map_err(|e| AutoBackupError::io(&full_path, e))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let full_path = self.resolve_path(path);
        fs::write(&full_path, contents)
            .await
            .map_err(|e| AutoBackupError::io(&full_path, e))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);
        fs::read(&full_path)
            .await
            .map_err(|e| AutoBackupError::io(&full_path, e))
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        let source = self.resolve_path(from);
        let target = self.resolve_path(to);
        fs::copy(&source, &target)
            .await
            .map(|_| ())
            .map_err(|e| AutoBackupError::io(&target, e))
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        let full_path = self.resolve_path(path);
        fs::remove_file(&full_path)
            .await
            .map_err(|e| AutoBackupError::io(&full_path, e))
    }

    async fn list_files(&self, dir: &Path) -> Result<Vec<String>> {
        let full_path = self.resolve_path(dir);
        let mut entries = fs::read_dir(&full_path)
            .await
            .map_err(|e| AutoBackupError::io(&full_path, e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AutoBackupError::io(&full_path, e))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(|e| AutoBackupError::io(entry.path(), e))?;
            if !file_type.is_file() {
                continue;
            }
            // Non UTF-8 names can never match a snapshot name
            if let Ok(name) = entry.file_name().into_string() {
                names.push(name);
            }
        }

        Ok(names)
    }
}
