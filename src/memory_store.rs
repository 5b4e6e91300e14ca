use std::collections::HashMap;

use log::debug;
use parking_lot::RwLock;

use crate::object_store::{ObjectStore, StorageError};

/// MemoryObjectStore keeps buckets and their objects in process memory.
///
/// It is safe to share between threads. Contents are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    buckets: RwLock<HashMap<String, HashMap<String, Vec<u8>>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects currently held in `bucket`, or `None` if it does not exist.
    pub fn object_count(&self, bucket: &str) -> Option<usize> {
        self.buckets.read().get(bucket).map(HashMap::len)
    }
}

impl ObjectStore for MemoryObjectStore {
    fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        if bucket.is_empty() {
            return Err(StorageError::InvalidBucket(bucket.to_string()));
        }
        self.buckets.write().entry(bucket.to_string()).or_default();
        debug!("created in-memory bucket {}", bucket);
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let buckets = self.buckets.read();
        let objects = buckets
            .get(bucket)
            .ok_or_else(|| StorageError::NoSuchBucket(bucket.to_string()))?;
        Ok(objects.get(key).cloned())
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write();
        let objects = buckets
            .get_mut(bucket)
            .ok_or_else(|| StorageError::NoSuchBucket(bucket.to_string()))?;
        objects.insert(key.to_string(), body.to_vec());
        Ok(())
    }
}
