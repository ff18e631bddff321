//! Volume Resolvers
//!
//! Map a bound PersistentVolume name to the EBS volume URL recorded on it.

use crate::domain::ports::VolumeResolver;
use crate::error::{Error, Result};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::PersistentVolume;
use kube::{Api, Client};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use tracing::debug;

/// Extract the EBS volume URL from a PersistentVolume
pub fn ebs_volume_url(volume: &PersistentVolume) -> Option<&str> {
    volume
        .spec
        .as_ref()?
        .aws_elastic_block_store
        .as_ref()
        .map(|source| source.volume_id.as_str())
}

// =============================================================================
// Kubernetes Resolver
// =============================================================================

/// Resolver reading PersistentVolumes from the API server
pub struct KubeVolumeResolver {
    volumes: Api<PersistentVolume>,
}

impl KubeVolumeResolver {
    pub fn new(client: Client) -> Self {
        Self {
            volumes: Api::all(client),
        }
    }
}

#[async_trait]
impl VolumeResolver for KubeVolumeResolver {
    async fn resolve(&self, volume_name: &str) -> Result<String> {
        let volume = self
            .volumes
            .get_opt(volume_name)
            .await
            .map_err(|source| Error::ResolveVolume {
                name: volume_name.into(),
                source,
            })?
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "PersistentVolume".into(),
                name: volume_name.into(),
            })?;

        let url = ebs_volume_url(&volume).ok_or_else(|| Error::UnsupportedVolumeSource {
            volume: volume_name.into(),
        })?;

        debug!("Resolved {} to {}", volume_name, url);
        Ok(url.to_string())
    }
}

// =============================================================================
// Static Resolver
// =============================================================================

/// Resolver backed by a fixed map, for tests
#[derive(Debug, Default)]
pub struct StaticVolumeResolver {
    volumes: RwLock<BTreeMap<String, String>>,
}

impl StaticVolumeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a PersistentVolume name to an EBS volume URL
    pub fn insert(&self, volume_name: impl Into<String>, url: impl Into<String>) {
        self.volumes.write().insert(volume_name.into(), url.into());
    }
}

#[async_trait]
impl VolumeResolver for StaticVolumeResolver {
    async fn resolve(&self, volume_name: &str) -> Result<String> {
        self.volumes
            .read()
            .get(volume_name)
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "PersistentVolume".into(),
                name: volume_name.into(),
            })
    }
}
