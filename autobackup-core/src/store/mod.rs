/*!
Live session store port.

The engine treats the store as a key-value store keyed by [`SessionId`]. Each method is
atomic at the granularity of one session; callers never leave a multi-step mutation
unpersisted.
*/

pub mod json_dir;

use crate::{Result, SessionId, SessionSnapshot};
use async_trait::async_trait;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Current in-memory state of a session
    async fn get(&self, id: &SessionId) -> Option<SessionSnapshot>;

    async fn exists(&self, id: &SessionId) -> bool;

    /// Drop the in-memory entry
    async fn remove(&self, id: &SessionId);

    /// Delete the on-disk representation of a session; absence is not an error
    async fn delete_persisted(&self, id: &SessionId) -> Result<()>;

    /// Insert or replace the in-memory entry keyed by the snapshot's own session id
    async fn insert(&self, snapshot: SessionSnapshot) -> Result<SessionId>;

    /// Write the in-memory entry to durable storage
    async fn persist(&self, id: &SessionId) -> Result<()>;
}

pub use json_dir::JsonDirSessionStore;
