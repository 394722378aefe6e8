//! In-memory implementations of the store traits.
//!
//! These are primarily for tests and as a process-local cache. They have the
//! same semantics as the SQLite backends but keep nothing on disk.

use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use bytes::Bytes;
use tether_core::{ContentPointer, Identity};

use crate::error::{Result, StoreError};
use crate::traits::{ContentStore, KeyRecord, LocalKeyStore};

fn read<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|e| StoreError::Internal(format!("lock poisoned: {}", e)))
}

fn write<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|e| StoreError::Internal(format!("lock poisoned: {}", e)))
}

/// In-memory content store. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<ContentPointer, Bytes>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the bytes under `pointer` without rehashing.
    ///
    /// Lets tests model a corrupted or tampered backend.
    pub fn overwrite(&self, pointer: ContentPointer, data: impl Into<Bytes>) {
        if let Ok(mut blobs) = self.blobs.write() {
            blobs.insert(pointer, data.into());
        }
    }

    /// Drop a blob. Lets tests model an unpinned object.
    pub fn evict(&self, pointer: &ContentPointer) -> bool {
        self.blobs
            .write()
            .map(|mut b| b.remove(pointer).is_some())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: &[u8]) -> Result<ContentPointer> {
        let pointer = ContentPointer::of(data);
        write(&self.blobs)?
            .entry(pointer)
            .or_insert_with(|| Bytes::copy_from_slice(data));
        Ok(pointer)
    }

    async fn get_raw(&self, pointer: &ContentPointer) -> Result<Bytes> {
        read(&self.blobs)?
            .get(pointer)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(pointer.to_hex()))
    }

    async fn has(&self, pointer: &ContentPointer) -> Result<bool> {
        Ok(read(&self.blobs)?.contains_key(pointer))
    }
}

/// In-memory key store.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: RwLock<BTreeMap<Identity, KeyRecord>>,
}

impl MemoryKeyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LocalKeyStore for MemoryKeyStore {
    async fn load(&self, identity: &Identity) -> Result<Option<KeyRecord>> {
        Ok(read(&self.keys)?.get(identity).cloned())
    }

    async fn save(&self, record: &KeyRecord) -> Result<()> {
        write(&self.keys)?.insert(record.identity, record.clone());
        Ok(())
    }

    async fn remove(&self, identity: &Identity) -> Result<bool> {
        Ok(write(&self.keys)?.remove(identity).is_some())
    }

    async fn list(&self) -> Result<Vec<Identity>> {
        Ok(read(&self.keys)?.keys().copied().collect())
    }

    async fn clear(&self) -> Result<()> {
        write(&self.keys)?.clear();
        Ok(())
    }
}
