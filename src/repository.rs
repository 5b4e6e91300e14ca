use log::{debug, warn};
use serde::Deserialize;
use thiserror::Error;

use crate::feature_state::FeatureState;
use crate::object_store::{ObjectStore, StorageError};
use crate::serializer::{DecodeError, EncodeError, JsonSerializer, Serializer};

pub type Result<T> = std::result::Result<T, Error>;

/// Error is returned by [StateRepository] operations and repository construction.
#[derive(Debug, Error)]
pub enum Error {
    /// The object store failed. The repository never retries; a failed write must be treated
    /// as not having taken effect.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A stored object exists but does not hold a valid state.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("invalid feature identifier {0:?}")]
    InvalidFeature(String),

    #[error("invalid repository configuration: {0}")]
    InvalidConfig(String),
}

/// StateRepository persists and retrieves [FeatureState] records.
pub trait StateRepository {
    /// Retrieve the stored state of `feature`, or `None` if nothing has been stored for it, in
    /// which case callers should fall back to the feature's defaults.
    fn get_feature_state(&self, feature: &str) -> Result<Option<FeatureState>>;

    /// Store `state`, replacing any state previously stored for the same feature.
    fn set_feature_state(&self, state: &FeatureState) -> Result<()>;
}

/// Settings for a [BucketStateRepository], suitable for loading from a configuration file:
///
/// ```
/// # use feature_state_repository::RepositoryConfig;
/// let config: RepositoryConfig =
///     serde_json::from_str(r#"{"bucket": "flags", "prefix": "flags/"}"#).unwrap();
/// assert_eq!(config.bucket, "flags");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryConfig {
    pub bucket: String,
    /// Prepended to every feature identifier to form the object key.
    #[serde(default)]
    pub prefix: String,
}

/// BucketStateRepository stores one object per feature in a bucket of an [ObjectStore].
///
/// The object key is the configured prefix followed by the feature identifier, so any two
/// repositories configured with the same bucket and prefix see the same states. The
/// repository keeps no state between calls: every read and write is a single request to the
/// store, and concurrent writers to the same feature race with the last write winning.
///
/// ```
/// # use feature_state_repository::*;
/// let store = MemoryObjectStore::new();
/// store.create_bucket("flags").unwrap();
///
/// let repository = BucketStateRepository::builder(&store, "flags").build().unwrap();
/// assert!(repository.get_feature_state("F1").unwrap().is_none());
///
/// repository
///     .set_feature_state(&FeatureState::new("F1").enabled(true))
///     .unwrap();
/// let state = repository.get_feature_state("F1").unwrap().unwrap();
/// assert!(state.is_enabled());
/// ```
#[derive(Debug)]
pub struct BucketStateRepository<S, C = JsonSerializer> {
    store: S,
    serializer: C,
    bucket: String,
    prefix: String,
}

/// Builds a [BucketStateRepository]. The store and bucket are mandatory; the prefix defaults
/// to empty and the serializer to [JsonSerializer].
pub struct BucketStateRepositoryBuilder<S, C = JsonSerializer> {
    store: S,
    serializer: C,
    bucket: String,
    prefix: String,
}

impl<S: ObjectStore> BucketStateRepository<S> {
    pub fn builder(store: S, bucket: impl Into<String>) -> BucketStateRepositoryBuilder<S> {
        BucketStateRepositoryBuilder {
            store,
            serializer: JsonSerializer,
            bucket: bucket.into(),
            prefix: String::new(),
        }
    }

    pub fn from_config(store: S, config: RepositoryConfig) -> Result<Self> {
        Self::builder(store, config.bucket)
            .prefix(config.prefix)
            .build()
    }
}

impl<S: ObjectStore, C: Serializer> BucketStateRepositoryBuilder<S, C> {
    /// Sets the string prepended to each feature identifier to form its object key, for
    /// example `"flags/"`.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Replaces the default [JsonSerializer].
    pub fn serializer<T: Serializer>(self, serializer: T) -> BucketStateRepositoryBuilder<S, T> {
        BucketStateRepositoryBuilder {
            store: self.store,
            serializer,
            bucket: self.bucket,
            prefix: self.prefix,
        }
    }

    /// Creates the repository. Fails if the bucket name is empty.
    ///
    /// The bucket itself is not created or checked here; see
    /// [BucketStateRepository::create_bucket].
    pub fn build(self) -> Result<BucketStateRepository<S, C>> {
        if self.bucket.is_empty() {
            return Err(Error::InvalidConfig("bucket name cannot be empty".into()));
        }

        Ok(BucketStateRepository {
            store: self.store,
            serializer: self.serializer,
            bucket: self.bucket,
            prefix: self.prefix,
        })
    }
}

impl<S: ObjectStore, C: Serializer> BucketStateRepository<S, C> {
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Creates the configured bucket. This is a one-time setup step; it is not needed if the
    /// bucket was provisioned some other way.
    pub fn create_bucket(&self) -> Result<()> {
        self.store.create_bucket(&self.bucket)?;
        Ok(())
    }

    /// Returns the object key under which the state of `feature` is stored.
    pub fn key_for(&self, feature: &str) -> Result<String> {
        if feature.is_empty() {
            return Err(Error::InvalidFeature(feature.to_string()));
        }
        Ok(format!("{}{}", self.prefix, feature))
    }
}

impl<S: ObjectStore, C: Serializer> StateRepository for BucketStateRepository<S, C> {
    fn get_feature_state(&self, feature: &str) -> Result<Option<FeatureState>> {
        let key = self.key_for(feature)?;
        debug!("reading state of {} from {}/{}", feature, self.bucket, key);

        let body = match self.store.get_object(&self.bucket, &key)? {
            Some(body) if !body.is_empty() => body,
            _ => return Ok(None),
        };

        let decoded = std::str::from_utf8(&body)
            .map_err(|e| DecodeError::new(feature, e))
            .and_then(|text| self.serializer.decode(feature, text));
        match decoded {
            Ok(state) => Ok(Some(state)),
            Err(e) => {
                warn!("{}/{} does not hold a valid state: {}", self.bucket, key, e);
                Err(e.into())
            }
        }
    }

    fn set_feature_state(&self, state: &FeatureState) -> Result<()> {
        let key = self.key_for(state.feature())?;
        let text = self.serializer.encode(state)?;
        debug!(
            "writing state of {} to {}/{}",
            state.feature(),
            self.bucket,
            key
        );
        self.store.put_object(&self.bucket, &key, text.as_bytes())?;
        Ok(())
    }
}
