//! In-Memory Tag Store
//!
//! Keeps volume tags in process memory. Used for tests and for exercising the
//! controller without AWS credentials.

use crate::domain::ports::{RemoteTagSet, TagStore, VolumeTag};
use crate::error::{Error, Result};
use crate::tagging::EbsVolumeId;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Tag store backed by a map of volume id to tags
#[derive(Debug, Default)]
pub struct InMemoryTagStore {
    volumes: RwLock<BTreeMap<String, BTreeSet<VolumeTag>>>,
    /// Tag keys whose create call fails
    failing_keys: RwLock<BTreeSet<String>>,
    describe_calls: AtomicUsize,
    create_calls: AtomicUsize,
}

impl InMemoryTagStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a volume with its current tags
    pub fn insert_volume(&self, volume: &EbsVolumeId, tags: impl IntoIterator<Item = VolumeTag>) {
        self.volumes
            .write()
            .insert(volume.volume_id().to_string(), tags.into_iter().collect());
    }

    /// Make every create call for `key` fail
    pub fn fail_creates_for(&self, key: &str) {
        self.failing_keys.write().insert(key.to_string());
    }

    pub fn tags_of(&self, volume: &EbsVolumeId) -> Option<BTreeSet<VolumeTag>> {
        self.volumes.read().get(volume.volume_id()).cloned()
    }

    /// Number of describe calls received
    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::Relaxed)
    }

    /// Number of create calls received, failed ones included
    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl TagStore for InMemoryTagStore {
    async fn describe_tags(&self, volume: &EbsVolumeId) -> Result<RemoteTagSet> {
        self.describe_calls.fetch_add(1, Ordering::Relaxed);

        self.volumes
            .read()
            .get(volume.volume_id())
            .map(|tags| tags.iter().cloned().collect())
            .ok_or_else(|| Error::VolumeNotFound {
                volume_id: volume.volume_id().to_string(),
                region: volume.region().to_string(),
            })
    }

    async fn create_tag(&self, volume: &EbsVolumeId, tag: &VolumeTag) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::Relaxed);

        if self.failing_keys.read().contains(&tag.key) {
            return Err(Error::cloud("CreateTags", volume.volume_id(), "injected failure"));
        }

        let mut volumes = self.volumes.write();
        let tags = volumes.get_mut(volume.volume_id()).ok_or_else(|| Error::VolumeNotFound {
            volume_id: volume.volume_id().to_string(),
            region: volume.region().to_string(),
        })?;

        // Create overwrites the value of an existing key
        tags.retain(|existing| existing.key != tag.key);
        tags.insert(tag.clone());

        debug!("Tagged in-memory volume {} with {}", volume, tag);
        Ok(())
    }

    fn store_name(&self) -> &str {
        "memory"
    }
}
