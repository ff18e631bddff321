//! EC2 Tag Store
//!
//! Reads and writes EBS volume tags through the EC2 API. Credentials come
//! from the standard AWS provider chain; the region comes from each volume.

use crate::domain::ports::{RemoteTagSet, TagStore, VolumeTag};
use crate::error::{Error, Result};
use crate::tagging::EbsVolumeId;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_ec2::error::DisplayErrorContext;
use aws_sdk_ec2::types::Tag;
use aws_sdk_ec2::Client;
use dashmap::DashMap;
use tracing::{debug, info};

/// Tag store backed by the EC2 API
pub struct Ec2TagStore {
    sdk_config: SdkConfig,
    /// One client per region, built on first use
    clients: DashMap<String, Client>,
}

impl Ec2TagStore {
    /// Create a store from an existing SDK configuration
    pub fn new(sdk_config: SdkConfig) -> Self {
        Self {
            sdk_config,
            clients: DashMap::new(),
        }
    }

    /// Load the SDK configuration from the environment
    pub async fn from_env() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        info!(
            "Loaded AWS configuration (default region: {:?})",
            sdk_config.region()
        );
        Self::new(sdk_config)
    }

    /// Get the client for a region
    fn client(&self, region: &str) -> Client {
        self.clients
            .entry(region.to_string())
            .or_insert_with(|| {
                debug!("Creating EC2 client for region {}", region);
                let config = aws_sdk_ec2::config::Builder::from(&self.sdk_config)
                    .region(Region::new(region.to_string()))
                    .build();
                Client::from_conf(config)
            })
            .value()
            .clone()
    }

    /// Number of regions with a cached client
    pub fn cached_regions(&self) -> usize {
        self.clients.len()
    }
}

#[async_trait]
impl TagStore for Ec2TagStore {
    async fn describe_tags(&self, volume: &EbsVolumeId) -> Result<RemoteTagSet> {
        let output = self
            .client(volume.region())
            .describe_volumes()
            .volume_ids(volume.volume_id())
            .send()
            .await
            .map_err(|e| {
                Error::cloud("DescribeVolumes", volume.volume_id(), DisplayErrorContext(&e))
            })?;

        let found = output
            .volumes()
            .first()
            .ok_or_else(|| Error::VolumeNotFound {
                volume_id: volume.volume_id().to_string(),
                region: volume.region().to_string(),
            })?;

        Ok(found
            .tags()
            .iter()
            .filter_map(|tag| Some(VolumeTag::new(tag.key()?, tag.value()?)))
            .collect())
    }

    async fn create_tag(&self, volume: &EbsVolumeId, tag: &VolumeTag) -> Result<()> {
        let output = self
            .client(volume.region())
            .create_tags()
            .resources(volume.volume_id())
            .tags(Tag::builder().key(&tag.key).value(&tag.value).build())
            .send()
            .await
            .map_err(|e| Error::cloud("CreateTags", volume.volume_id(), DisplayErrorContext(&e)))?;

        debug!("Returned value from CreateTags call: {:?}", output);
        Ok(())
    }

    fn store_name(&self) -> &str {
        "ec2"
    }
}
