//! Persisted identity mirror.
//!
//! Layout (one value per key):
//!
//! - `user` → JSON snapshot of the identity plus its write time
//! - `loggedIn` → `"true"` while an authenticated identity is mirrored
//!
//! The two keys move in lockstep. The flag is only ever present when `user`
//! holds an authenticated identity: it is written after `user` and removed
//! before it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use clinica_auth::SnapshotSource;
use clinica_core::{Identity, IdentitySnapshot};

use crate::storage::{KeyValueStorage, MemoryStorage, StorageError};

pub const USER_KEY: &str = "user";
pub const LOGGED_IN_KEY: &str = "loggedIn";

const LOGGED_IN_VALUE: &str = "true";

#[derive(Debug, Error)]
pub enum CacheWriteError {
    #[error("failed to serialize identity snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Synchronous identity mirror over a [`KeyValueStorage`].
#[derive(Clone)]
pub struct IdentityCache {
    storage: Arc<dyn KeyValueStorage>,
}

impl IdentityCache {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStorage::new()))
    }

    /// Mirror `identity`, replacing any previous snapshot.
    pub fn write(&self, identity: &Identity) -> Result<(), CacheWriteError> {
        self.write_at(identity, Utc::now())
    }

    pub fn write_at(&self, identity: &Identity, written_at: DateTime<Utc>) -> Result<(), CacheWriteError> {
        let snapshot = IdentitySnapshot::capture(identity, written_at);
        let payload = serde_json::to_string(&snapshot)?;

        if snapshot.logged_in {
            self.storage.set(USER_KEY, &payload)?;
            self.storage.set(LOGGED_IN_KEY, LOGGED_IN_VALUE)?;
        } else {
            self.storage.remove(LOGGED_IN_KEY)?;
            self.storage.set(USER_KEY, &payload)?;
        }
        Ok(())
    }

    /// Last written snapshot; `None` if never written, cleared, or unreadable.
    pub fn read(&self) -> Option<IdentitySnapshot> {
        let raw = match self.storage.get(USER_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!(error = %err, "failed to read identity snapshot");
                return None;
            }
        };

        let mut snapshot: IdentitySnapshot = match serde_json::from_str(&raw) {
            Ok(snapshot) => snapshot,
            Err(err) => {
                tracing::warn!(error = %err, "ignoring unreadable identity snapshot");
                return None;
            }
        };
        snapshot.logged_in = self.logged_in_flag() && snapshot.identity.is_logged_in();
        Some(snapshot)
    }

    /// Remove both keys.
    pub fn clear(&self) -> Result<(), CacheWriteError> {
        self.storage.remove(LOGGED_IN_KEY)?;
        self.storage.remove(USER_KEY)?;
        Ok(())
    }

    fn logged_in_flag(&self) -> bool {
        match self.storage.get(LOGGED_IN_KEY) {
            Ok(value) => value.as_deref() == Some(LOGGED_IN_VALUE),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read logged-in flag");
                false
            }
        }
    }
}

impl core::fmt::Debug for IdentityCache {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IdentityCache").finish_non_exhaustive()
    }
}

impl SnapshotSource for IdentityCache {
    fn read_snapshot(&self) -> Option<IdentitySnapshot> {
        self.read()
    }

    fn is_logged_in(&self) -> bool {
        self.logged_in_flag()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clinica_core::{PhotoVersion, Role, UserId};

    fn identity() -> Identity {
        Identity {
            id: Some(UserId::new(12)),
            display_name: "Dra. López".to_string(),
            username: "mlopez".to_string(),
            email: "mlopez@cau.org".to_string(),
            role: Role::DIRECTOR,
            slot_minutes: 40,
            photo: Some("mlopez.jpg".to_string()),
            photo_version: PhotoVersion::from_millis(1_700_000_000_000),
        }
    }

    #[test]
    fn write_then_read_preserves_every_field() {
        let cache = IdentityCache::in_memory();
        let written_at = Utc::now();
        cache.write_at(&identity(), written_at).unwrap();

        let snapshot = cache.read().unwrap();
        assert_eq!(snapshot.identity, identity());
        assert!(snapshot.logged_in);
        assert_eq!(snapshot.written_at, written_at);
        assert!(cache.is_logged_in());
    }

    #[test]
    fn never_written_reads_absent() {
        let cache = IdentityCache::in_memory();
        assert!(cache.read().is_none());
        assert!(!cache.is_logged_in());
    }

    #[test]
    fn clear_leaves_no_logged_in_residue() {
        let storage = Arc::new(MemoryStorage::new());
        let cache = IdentityCache::new(storage.clone());
        cache.write(&identity()).unwrap();
        assert_eq!(storage.keys(), vec![LOGGED_IN_KEY.to_string(), USER_KEY.to_string()]);

        cache.clear().unwrap();
        assert!(storage.keys().is_empty());
        assert!(cache.read().is_none());
        assert!(!cache.is_logged_in());
    }

    #[test]
    fn writing_an_unauthenticated_identity_drops_the_flag() {
        let cache = IdentityCache::in_memory();
        cache.write(&identity()).unwrap();
        cache.write(&Identity::empty()).unwrap();

        let snapshot = cache.read().unwrap();
        assert!(!snapshot.logged_in);
        assert!(!cache.is_logged_in());
    }

    #[test]
    fn corrupt_snapshot_reads_absent() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(USER_KEY, "{not json").unwrap();
        storage.set(LOGGED_IN_KEY, "true").unwrap();

        let cache = IdentityCache::new(storage);
        assert!(cache.read().is_none());
    }

    #[test]
    fn quota_failure_surfaces_as_cache_write_error() {
        let cache = IdentityCache::new(Arc::new(MemoryStorage::with_quota(8)));
        let err = cache.write(&identity()).unwrap_err();
        assert!(matches!(err, CacheWriteError::Storage(StorageError::QuotaExceeded { .. })));
        assert!(!cache.is_logged_in());
    }
}
