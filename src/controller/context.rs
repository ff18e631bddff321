//! Claim Context
//!
//! Correlation fields carried through the processing of one claim event.

use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use kube::ResourceExt;
use tracing::{info_span, Span};

/// Identifies the claim an event is about, for structured logging
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClaimContext {
    pub namespace: String,
    pub claim: String,
    /// Bound PersistentVolume, if the claim is bound yet
    pub volume: Option<String>,
}

impl ClaimContext {
    pub fn new(
        namespace: impl Into<String>,
        claim: impl Into<String>,
        volume: Option<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            claim: claim.into(),
            volume,
        }
    }

    pub fn from_claim(claim: &PersistentVolumeClaim) -> Self {
        let volume = claim
            .spec
            .as_ref()
            .and_then(|spec| spec.volume_name.clone())
            .filter(|name| !name.is_empty());

        Self::new(claim.namespace().unwrap_or_default(), claim.name_any(), volume)
    }

    pub fn volume_name(&self) -> &str {
        self.volume.as_deref().unwrap_or_default()
    }

    /// Span carrying the correlation fields
    pub fn span(&self) -> Span {
        info_span!(
            "claim",
            namespace = %self.namespace,
            volume_claim = %self.claim,
            volume_name = %self.volume_name(),
        )
    }
}

impl std::fmt::Display for ClaimContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::PersistentVolumeClaimSpec;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    #[test]
    fn test_from_bound_claim() {
        let claim = PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some("data".into()),
                namespace: Some("db".into()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                volume_name: Some("pvc-1234".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let ctx = ClaimContext::from_claim(&claim);
        assert_eq!(ctx, ClaimContext::new("db", "data", Some("pvc-1234".into())));
        assert_eq!(ctx.to_string(), "db/data");
        assert_eq!(ctx.volume_name(), "pvc-1234");
    }

    #[test]
    fn test_from_pending_claim() {
        let claim = PersistentVolumeClaim {
            metadata: ObjectMeta {
                name: Some("data".into()),
                namespace: Some("db".into()),
                ..Default::default()
            },
            spec: Some(PersistentVolumeClaimSpec {
                volume_name: Some(String::new()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let ctx = ClaimContext::from_claim(&claim);
        assert!(ctx.volume.is_none());
        assert_eq!(ctx.volume_name(), "");
    }
}
