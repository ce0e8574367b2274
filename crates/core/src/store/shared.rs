//! Helpers shared by the store implementations.

use crate::error::{RecordError, RecordResult};
use dxr_uuid::ShardableUuid;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

/// Creates a unique sharded directory within `base_dir`.
///
/// Guards against UUID collisions or pre-existing directories by retrying up to 5 times with
/// different UUIDs.
///
/// # Errors
///
/// Returns `RecordError::RecordDirCreation` if no directory could be created.
pub(crate) fn create_uuid_and_shard_dir(
    base_dir: &Path,
    mut uuid_source: impl FnMut() -> ShardableUuid,
) -> RecordResult<(ShardableUuid, PathBuf)> {
    for _attempt in 0..5 {
        let uuid = uuid_source();
        let candidate = uuid.sharded_dir(base_dir);

        if candidate.exists() {
            continue;
        }

        if let Some(parent) = candidate.parent() {
            fs::create_dir_all(parent).map_err(RecordError::RecordDirCreation)?;
        }

        match fs::create_dir(&candidate) {
            Ok(()) => return Ok((uuid, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RecordError::RecordDirCreation(e)),
        }
    }

    Err(RecordError::RecordDirCreation(io::Error::new(
        ErrorKind::AlreadyExists,
        "failed to allocate a unique record directory after 5 attempts",
    )))
}

/// One in-process mutex per key, created on first use.
pub(crate) struct KeyedLocks<K> {
    locks: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub(crate) fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) fn lock_for(&self, key: &K) -> RecordResult<Arc<Mutex<()>>> {
        let mut locks = self.locks.lock().map_err(|_| RecordError::LockPoisoned)?;
        Ok(locks.entry(key.clone()).or_default().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_uuid_and_shard_dir_skips_existing() {
        let temp = TempDir::new().expect("TempDir::new should succeed");
        let taken = ShardableUuid::parse("00112233445566778899aabbccddeeff").unwrap();
        fs::create_dir_all(taken.sharded_dir(temp.path())).expect("create_dir_all should succeed");

        let fresh = ShardableUuid::parse("ffeeddccbbaa99887766554433221100").unwrap();
        let mut candidates = vec![fresh.clone(), taken.clone()];

        let (uuid, dir) = create_uuid_and_shard_dir(temp.path(), || {
            candidates.pop().expect("candidate available")
        })
        .expect("allocation should succeed");

        assert_eq!(uuid, fresh);
        assert!(dir.is_dir());
        assert!(dir.ends_with("ff/ee/ffeeddccbbaa99887766554433221100"));
    }

    #[test]
    fn test_create_uuid_and_shard_dir_gives_up_after_five_attempts() {
        let temp = TempDir::new().expect("TempDir::new should succeed");
        let taken = ShardableUuid::parse("00112233445566778899aabbccddeeff").unwrap();
        fs::create_dir_all(taken.sharded_dir(temp.path())).expect("create_dir_all should succeed");

        let result = create_uuid_and_shard_dir(temp.path(), || taken.clone());
        assert!(matches!(result, Err(RecordError::RecordDirCreation(_))));
    }

    #[test]
    fn test_keyed_locks_share_one_mutex_per_key() {
        let locks = KeyedLocks::new();
        let a1 = locks.lock_for(&"a").expect("lock_for should succeed");
        let a2 = locks.lock_for(&"a").expect("lock_for should succeed");
        let b = locks.lock_for(&"b").expect("lock_for should succeed");

        assert!(Arc::ptr_eq(&a1, &a2));
        assert!(!Arc::ptr_eq(&a1, &b));
    }
}
