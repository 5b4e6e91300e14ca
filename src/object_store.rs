use std::io;

use thiserror::Error;

/// ObjectStore is the narrow view of an object-storage backend the repository relies on:
/// named buckets holding opaque byte objects addressed by key.
///
/// Any backend can satisfy it, whether a cloud bucket, a local directory, or the in-memory
/// [crate::MemoryObjectStore]. Implementations own their transport concerns (connections,
/// authentication, retries, timeouts); failures surface as [StorageError].
pub trait ObjectStore {
    /// Create `bucket`. Creating a bucket that already exists is not an error.
    fn create_bucket(&self, bucket: &str) -> Result<(), StorageError>;

    /// Retrieve the object stored under `key`.
    ///
    /// A key with no object must yield `Ok(None)` rather than an error, so callers can tell
    /// "nothing stored" apart from a failing backend.
    fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Store `body` under `key`, replacing any existing object.
    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError>;
}

impl<T: ObjectStore + ?Sized> ObjectStore for &T {
    fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        (**self).create_bucket(bucket)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get_object(bucket, key)
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        (**self).put_object(bucket, key, body)
    }
}

impl<T: ObjectStore + ?Sized> ObjectStore for std::sync::Arc<T> {
    fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        (**self).create_bucket(bucket)
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get_object(bucket, key)
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        (**self).put_object(bucket, key, body)
    }
}

/// StorageError describes a failure reported by an [ObjectStore].
#[derive(Debug, Error)]
pub enum StorageError {
    /// The bucket does not exist. Buckets are created once with [ObjectStore::create_bucket].
    #[error("bucket {0} does not exist")]
    NoSuchBucket(String),

    #[error("invalid bucket name {0:?}")]
    InvalidBucket(String),

    #[error("invalid object key {0:?}")]
    InvalidKey(String),

    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other backend failure (network, permissions, throttling).
    #[error("storage backend error: {0}")]
    Backend(String),
}
