use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;
use sha2::{Digest, Sha256};
use tempfile::Builder;
use urlencoding::encode;

use crate::object_store::{ObjectStore, StorageError};

// Well below the 255 byte file name limit of common filesystems.
const MAX_FILE_NAME_LEN: usize = 200;
const HASHED_NAME_HEAD_LEN: usize = 120;

// Neither marker can be produced by percent-encoding, which only emits `%` followed by two
// uppercase hex digits.
const HASH_MARKER: &str = "%H";
const TEMP_FILE_PREFIX: &str = "%tmp.";

/// FileObjectStore keeps each bucket as a directory below a root directory, and each object
/// as one file in its bucket directory.
///
/// Object keys are percent-encoded to form file names, so keys with `/` from a prefix stay
/// inside their bucket. Keys whose encoding would exceed [MAX_FILE_NAME_LEN] bytes are stored
/// under the start of their encoding followed by the SHA-256 of the whole key. Keys that differ
/// only in letter case need a case-sensitive filesystem to be kept apart.
///
/// Writes go to a temporary file in the bucket directory which is then renamed over the
/// object, so readers see either the previous or the new object, never a partial one.
#[derive(Clone, Debug)]
pub struct FileObjectStore {
    root: PathBuf,
}

impl FileObjectStore {
    /// Create a store rooted at `root`. The directory is created on the first
    /// [ObjectStore::create_bucket] call if it does not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        let valid = !bucket.is_empty()
            && bucket != "."
            && bucket != ".."
            && !bucket.contains(['/', '\\']);
        if !valid {
            return Err(StorageError::InvalidBucket(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    fn existing_bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(StorageError::NoSuchBucket(bucket.to_string()))
        }
    }
}

fn object_file_name(key: &str) -> Result<String, StorageError> {
    // "." and ".." survive percent-encoding unchanged, and would not name a regular file.
    let encoded = match key {
        "" => return Err(StorageError::InvalidKey(key.to_string())),
        "." => return Ok("%2E".to_string()),
        ".." => return Ok("%2E%2E".to_string()),
        _ => encode(key),
    };
    if encoded.len() <= MAX_FILE_NAME_LEN {
        return Ok(encoded.into_owned());
    }

    // Never cut an escape sequence in half.
    let mut head_len = HASHED_NAME_HEAD_LEN;
    while let Some(escape) = encoded[..head_len].rfind('%') {
        if escape + 3 <= head_len {
            break;
        }
        head_len = escape;
    }
    let digest = Sha256::digest(key.as_bytes());
    Ok(format!(
        "{}{}{}",
        &encoded[..head_len],
        HASH_MARKER,
        base16ct::lower::encode_string(&digest)
    ))
}

impl ObjectStore for FileObjectStore {
    fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let dir = self.bucket_dir(bucket)?;
        fs::create_dir_all(&dir)?;
        debug!("created bucket directory {}", dir.display());
        Ok(())
    }

    fn get_object(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.existing_bucket_dir(bucket)?.join(object_file_name(key)?);
        match fs::read(&path) {
            Ok(body) => Ok(Some(body)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn put_object(&self, bucket: &str, key: &str, body: &[u8]) -> Result<(), StorageError> {
        let dir = self.existing_bucket_dir(bucket)?;
        let path = dir.join(object_file_name(key)?);

        let mut file = Builder::new().prefix(TEMP_FILE_PREFIX).tempfile_in(&dir)?;
        file.write_all(body)?;
        file.as_file().sync_data()?;
        file.persist(&path).map_err(|e| e.error)?;
        Ok(())
    }
}
