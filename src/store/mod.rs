//! Durable key→record storage.
//!
//! Records are keyed by the content digest of their key string (see
//! [`crate::digest`]), so listing the store's entries enumerates every known
//! key digest without a separate index. The production implementation,
//! [`GitNotesStore`], layers the mapping on the archive repository's own
//! versioning: each write is a commit moving a dedicated ref, which makes
//! writes durable and ordered.

pub mod git_notes;

pub use git_notes::GitNotesStore;

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::digest::blob_digest;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to encode record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("{0}")]
    Backend(String),
}

/// Object-safe raw interface; values are JSON strings.
pub trait KvStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_raw(&self, key: &str, json: &str) -> Result<(), StoreError>;
    /// Digests of all stored keys.
    fn list_digests(&self) -> Result<BTreeSet<String>, StoreError>;
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get_raw(key)
    }

    fn set_raw(&self, key: &str, json: &str) -> Result<(), StoreError> {
        (**self).set_raw(key, json)
    }

    fn list_digests(&self) -> Result<BTreeSet<String>, StoreError> {
        (**self).list_digests()
    }
}

/// Typed accessors on top of any [`KvStore`].
pub trait KvStoreExt: KvStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StoreError> {
        match self.get_raw(key)? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string(value)?;
        self.set_raw(key, &json)
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.records.borrow().get(&blob_digest(key)).cloned())
    }

    fn set_raw(&self, key: &str, json: &str) -> Result<(), StoreError> {
        self.records
            .borrow_mut()
            .insert(blob_digest(key), json.to_string());
        Ok(())
    }

    fn list_digests(&self) -> Result<BTreeSet<String>, StoreError> {
        Ok(self.records.borrow().keys().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get_raw("missing").unwrap(), None);

        store.set("key-1", &vec![1, 2, 3]).unwrap();
        let value: Option<Vec<i32>> = store.get("key-1").unwrap();
        assert_eq!(value, Some(vec![1, 2, 3]));

        let digests = store.list_digests().unwrap();
        assert!(digests.contains(&blob_digest("key-1")));
        assert_eq!(digests.len(), 1);
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        store.set_raw("key-1", "\"old\"").unwrap();
        store.set_raw("key-1", "\"new\"").unwrap();
        assert_eq!(store.get_raw("key-1").unwrap().as_deref(), Some("\"new\""));
        assert_eq!(store.list_digests().unwrap().len(), 1);
    }
}
