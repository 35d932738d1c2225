/*!
File system port.

Backup, restore and retention code only touch the disk through [`FileSystem`]. The
production adapter is [`LocalFileSystem`]; unit tests use an in-memory implementation with
failure injection.
*/

pub mod local;
#[cfg(test)]
pub(crate) mod memory;

use crate::Result;
use async_trait::async_trait;
use std::path::Path;

/// Asynchronous file system abstraction
///
/// Every method is a potential suspension point. Implementations make no attempt at
/// cross-process coordination.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Create a directory and all missing parents; existing directories are not an error
    async fn create_dir_all(&self, dir: &Path) -> Result<()>;

    /// Write a whole file, replacing any existing file at `path`
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    /// Read a whole file
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Copy `from` to `to`, overwriting `to` if it exists
    async fn copy(&self, from: &Path, to: &Path) -> Result<()>;

    /// Delete a single file
    async fn remove_file(&self, path: &Path) -> Result<()>;

    /// Names of the regular files directly under `dir` (not recursive)
    async fn list_files(&self, dir: &Path) -> Result<Vec<String>>;
}

pub use local::LocalFileSystem;
