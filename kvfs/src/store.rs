//! The key-value backend seam and the generic fixed-record plumbing on top
//! of it.
//!
//! The durable state of the filesystem lives entirely behind
//! [`KeyValueStore`]: an unordered map from fixed-width keys to opaque blobs
//! with no transactions. A multi-key update is not atomic; callers sequence
//! their writes so that a record always exists before anything referencing
//! it becomes visible.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use zerocopy::{AsBytes, FromBytes};

use crate::error::{FsError, Result};

/// Storage backend for all durable filesystem state.
///
/// Keys are the 16-byte identifiers from [`crate::id`], except the one
/// well-known constant key naming the root descriptor. `store` overwrites,
/// and `delete` of an absent key succeeds.
pub trait KeyValueStore {
    fn fetch(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn store(&mut self, key: &[u8], value: &[u8]) -> Result<()>;
    fn delete(&mut self, key: &[u8]) -> Result<()>;
}

/// A fixed-size record image that round-trips through the backend byte for
/// byte.
pub trait Record: AsBytes + FromBytes + Sized {
    const SIZE: usize = std::mem::size_of::<Self>();

    /// The record with every field zero; also the initial image of a
    /// freshly allocated block.
    fn zeroed() -> Self;
}

/// Fetches and decodes one record, enforcing the exact-size check: a blob
/// whose length differs from the record size is corruption, never silently
/// truncated or zero-filled.
pub fn fetch_record<T, S>(store: &S, key: &[u8]) -> Result<Option<T>>
where
    T: Record,
    S: KeyValueStore + ?Sized,
{
    let blob = match store.fetch(key)? {
        Some(blob) => blob,
        None => return Ok(None),
    };
    if blob.len() != T::SIZE {
        return Err(FsError::Corruption(format!(
            "record has {} bytes, want {}",
            blob.len(),
            T::SIZE
        )));
    }
    let mut record = T::zeroed();
    record.as_bytes_mut().copy_from_slice(&blob);
    Ok(Some(record))
}

/// Persists one record under the given key, overwriting any prior image.
pub fn store_record<T, S>(store: &mut S, key: &[u8], record: &T) -> Result<()>
where
    T: Record,
    S: KeyValueStore + ?Sized,
{
    store.store(key, record.as_bytes())
}

/// In-memory backend backed by a shared `BTreeMap`.
///
/// Clones share the same map, so a handle kept aside can reopen the
/// "store" after the filesystem context is dropped. Used by tests and the
/// demo; a production embedding supplies its own [`KeyValueStore`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }

    fn map(&self) -> MutexGuard<'_, BTreeMap<Vec<u8>, Vec<u8>>> {
        // A poisoned lock still holds the map; single-threaded callers can
        // keep going.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn fetch(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.map().get(key).cloned())
    }

    fn store(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.map().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.map().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(C)]
    #[derive(AsBytes, FromBytes, Copy, Clone, PartialEq, Debug)]
    struct Pair {
        a: u32,
        b: u32,
    }

    impl Record for Pair {
        fn zeroed() -> Self {
            Pair { a: 0, b: 0 }
        }
    }

    #[test]
    fn fetch_store_delete_round_trip() {
        let mut store = MemoryStore::new();
        assert!(store.is_empty());

        store.store(b"k", b"value").unwrap();
        assert_eq!(store.fetch(b"k").unwrap(), Some(b"value".to_vec()));

        store.store(b"k", b"other").unwrap();
        assert_eq!(store.fetch(b"k").unwrap(), Some(b"other".to_vec()));

        store.delete(b"k").unwrap();
        assert_eq!(store.fetch(b"k").unwrap(), None);
        // Deleting again is not an error.
        store.delete(b"k").unwrap();
    }

    #[test]
    fn clones_share_state() {
        let mut store = MemoryStore::new();
        let handle = store.clone();
        store.store(b"shared", b"yes").unwrap();
        assert_eq!(handle.fetch(b"shared").unwrap(), Some(b"yes".to_vec()));
    }

    #[test]
    fn record_round_trip() {
        let mut store = MemoryStore::new();
        let pair = Pair { a: 7, b: 9 };
        store_record(&mut store, b"p", &pair).unwrap();
        let read: Pair = fetch_record(&store, b"p").unwrap().unwrap();
        assert_eq!(read, pair);
    }

    #[test]
    fn missing_record_is_none() {
        let store = MemoryStore::new();
        let read: Option<Pair> = fetch_record(&store, b"absent").unwrap();
        assert!(read.is_none());
    }

    #[test]
    fn short_blob_is_corruption() {
        let mut store = MemoryStore::new();
        store.store(b"p", b"xyz").unwrap();
        match fetch_record::<Pair, _>(&store, b"p") {
            Err(FsError::Corruption(_)) => (),
            other => panic!("expected corruption, got {:?}", other),
        }
    }
}
