//! Domain Ports - Core trait definitions for the volume tagger
//!
//! These traits define the boundaries between the reconciliation logic and
//! the two external APIs it talks to. Adapters implement these traits to
//! provide concrete functionality.

use crate::error::Result;
use crate::tagging::EbsVolumeId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// Tag Types
// =============================================================================

/// A single key/value tag on a volume
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VolumeTag {
    pub key: String,
    pub value: String,
}

impl VolumeTag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl std::fmt::Display for VolumeTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Tags currently attached to a volume in EC2
///
/// Fetched fresh for every reconciliation and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteTagSet {
    tags: BTreeSet<VolumeTag>,
}

impl RemoteTagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exact match on both key and value
    #[inline]
    pub fn contains(&self, tag: &VolumeTag) -> bool {
        self.tags.contains(tag)
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &VolumeTag> {
        self.tags.iter()
    }
}

impl FromIterator<VolumeTag> for RemoteTagSet {
    fn from_iter<I: IntoIterator<Item = VolumeTag>>(iter: I) -> Self {
        Self {
            tags: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Volume Resolver Port
// =============================================================================

/// Port for looking up the cloud volume behind a bound claim
#[async_trait]
pub trait VolumeResolver: Send + Sync {
    /// Return the provider volume URL (`aws://zone/vol-id`) of a PersistentVolume
    async fn resolve(&self, volume_name: &str) -> Result<String>;
}

// =============================================================================
// Tag Store Port
// =============================================================================

/// Port for reading and writing tags on cloud volumes
#[async_trait]
pub trait TagStore: Send + Sync {
    /// Fetch the tags currently attached to a volume
    async fn describe_tags(&self, volume: &EbsVolumeId) -> Result<RemoteTagSet>;

    /// Create (or overwrite) one tag on a volume
    async fn create_tag(&self, volume: &EbsVolumeId, tag: &VolumeTag) -> Result<()>;

    /// Get store name
    fn store_name(&self) -> &str;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type VolumeResolverRef = Arc<dyn VolumeResolver>;
pub type TagStoreRef = Arc<dyn TagStore>;
