//! EBS Volume Identifiers
//!
//! The in-tree EBS plugin records volumes as `aws://<availability-zone>/<volume-id>`.
//! EC2 calls need the region and the bare volume id instead.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// An EBS volume located by region and id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EbsVolumeId {
    region: String,
    volume_id: String,
}

impl EbsVolumeId {
    pub fn new(region: impl Into<String>, volume_id: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            volume_id: volume_id.into(),
        }
    }

    /// Decompose a provider volume URL such as `aws://eu-west-1b/vol-0123`
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidVolumeId {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let segments: Vec<&str> = input.split('/').collect();
        let [scheme, empty, zone, volume_id] = segments.as_slice() else {
            return Err(invalid("expected scheme://zone/volume-id"));
        };

        if !scheme.ends_with(':') || !empty.is_empty() {
            return Err(invalid("missing scheme separator"));
        }
        if zone.is_empty() {
            return Err(invalid("empty availability zone"));
        }
        if volume_id.is_empty() {
            return Err(invalid("empty volume id"));
        }

        Ok(Self::new(region_of(zone), *volume_id))
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }
}

impl std::fmt::Display for EbsVolumeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.region, self.volume_id)
    }
}

/// Strip a single trailing availability-zone letter
fn region_of(zone: &str) -> &str {
    match zone.chars().last() {
        Some(c) if c.is_ascii_lowercase() => &zone[..zone.len() - 1],
        _ => zone,
    }
}
