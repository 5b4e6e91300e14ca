#![cfg(test)]

use crate::memory_store::MemoryObjectStore;
use crate::object_store::{ObjectStore, StorageError};
use crate::repository::BucketStateRepository;

pub const TEST_BUCKET: &str = "testbucket";

/// A repository over a fresh in-memory store whose bucket already exists.
pub fn new_test_repository() -> BucketStateRepository<MemoryObjectStore> {
    let store = MemoryObjectStore::new();
    store.create_bucket(TEST_BUCKET).unwrap();
    BucketStateRepository::builder(store, TEST_BUCKET)
        .build()
        .unwrap()
}

/// A store whose every request fails, standing in for an unreachable backend.
pub struct FailingStore;

impl ObjectStore for FailingStore {
    fn create_bucket(&self, _bucket: &str) -> Result<(), StorageError> {
        Err(StorageError::Backend("connection refused".into()))
    }

    fn get_object(&self, _bucket: &str, _key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Err(StorageError::Backend("connection refused".into()))
    }

    fn put_object(&self, _bucket: &str, _key: &str, _body: &[u8]) -> Result<(), StorageError> {
        Err(StorageError::Backend("connection refused".into()))
    }
}
